// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that keeps output as plain prose with no chatter.
pub const PLAIN_TEXT_SYSTEM: &str = "You are a precise career-document assistant. \
    Respond with the requested content only. \
    Do NOT include introductory or concluding remarks. \
    Do NOT wrap the answer in markdown code fences.";

/// Common instruction appended to every generation prompt.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Only use experience, skills and facts present in the candidate document. \
    Do NOT invent employers, dates, titles, degrees or metrics. \
    If the document does not support a claim, leave it out.";
