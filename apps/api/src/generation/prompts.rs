// All LLM prompt constants for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.
//
// Every template takes: {grounding_instruction}, {job_description}, {candidate_text}

/// Fit analysis prompt. Always run.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the candidate's resume against the job description below.

JOB DESCRIPTION:
{job_description}

RESUME:
{candidate_text}

Provide a brief analysis of the resume's strengths and weaknesses for this role, then list the key skills and keywords the candidate should add or surface to align better with the job description."#;

/// Full tailored resume prompt. Premium only.
pub const FULL_DOCUMENT_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

Rewrite the candidate's resume so it is tailored to the job description below. Lead with the experience and skills that match the role most closely.

JOB DESCRIPTION:
{job_description}

CANDIDATE'S EXISTING RESUME:
{candidate_text}

Return the complete resume in a clean, professional plain-text format."#;

/// Cover letter prompt. Premium only.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

Write a personalized cover letter for the job description below, drawing on relevant experience and skills from the candidate's resume.

JOB DESCRIPTION:
{job_description}

CANDIDATE'S EXISTING RESUME:
{candidate_text}

Return only the cover letter, in a professional plain-text format."#;
