//! `LlmGenerator`: the production `Generator`, backed by the shared `LlmClient`.

use async_trait::async_trait;
use tracing::debug;

use crate::generation::prompts::{
    ANALYSIS_PROMPT_TEMPLATE, COVER_LETTER_PROMPT_TEMPLATE, FULL_DOCUMENT_PROMPT_TEMPLATE,
};
use crate::generation::{ArtifactKind, GenerationError, Generator};
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, PLAIN_TEXT_SYSTEM};
use crate::llm_client::LlmClient;

pub struct LlmGenerator {
    llm: LlmClient,
}

impl LlmGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(
        &self,
        kind: ArtifactKind,
        job_description: &str,
        candidate_text: &str,
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(kind, job_description, candidate_text);
        debug!("Requesting {} ({} prompt chars)", kind, prompt.len());

        // Every LlmError is a provider-side failure from the engine's point of view.
        self.llm
            .call_text(&prompt, PLAIN_TEXT_SYSTEM)
            .await
            .map_err(|e| GenerationError::Provider(e.to_string()))
    }
}

/// Fills the instruction template for `kind`.
fn build_prompt(kind: ArtifactKind, job_description: &str, candidate_text: &str) -> String {
    let template = match kind {
        ArtifactKind::Analysis => ANALYSIS_PROMPT_TEMPLATE,
        ArtifactKind::FullDocument => FULL_DOCUMENT_PROMPT_TEMPLATE,
        ArtifactKind::CoverLetter => COVER_LETTER_PROMPT_TEMPLATE,
    };

    fill(
        template,
        &[
            ("grounding_instruction", GROUNDING_INSTRUCTION),
            ("job_description", job_description),
            ("candidate_text", candidate_text),
        ],
    )
}

/// Single-pass `{name}` substitution. Substituted text is never rescanned.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = vars
            .iter()
            .find(|(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));

        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
