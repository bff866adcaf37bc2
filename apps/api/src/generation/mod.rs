// Generation Client: turns (artifact kind, job description, candidate text) into text.
// All LLM calls go through llm_client. The engine only sees the `Generator` trait.

pub mod generator;
pub mod prompts;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use generator::LlmGenerator;

/// The three artifacts a job can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Analysis,
    FullDocument,
    CoverLetter,
}

impl ArtifactKind {
    /// Human wording used in stored provider-failure text.
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Analysis => "analysis",
            ArtifactKind::FullDocument => "full resume",
            ArtifactKind::CoverLetter => "cover letter",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tagged outcome of a failed generation call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The provider reported a problem: auth, quota, network, bad or empty response.
    #[error("{0}")]
    Provider(String),

    /// Anything outside the provider contract.
    #[error("unexpected generation fault: {0}")]
    Unexpected(String),
}

/// Abstraction over the external text-generation service.
///
/// Stateless per call. Carried by the engine as `Arc<dyn Generator>`.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        kind: ArtifactKind,
        job_description: &str,
        candidate_text: &str,
    ) -> Result<String, GenerationError>;
}
