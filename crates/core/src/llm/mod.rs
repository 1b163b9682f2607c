pub mod anthropic;
pub mod error;
pub mod prompt;

pub use prompt::RefinementPrompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
}

/// Free-text rewrite of a rule-based narrative.
///
/// Output is passed through untouched; errors are surfaced to the caller as-is.
#[async_trait::async_trait]
pub trait RefinementService: Send + Sync {
    fn provider(&self) -> Provider;

    async fn refine(&self, prompt: &RefinementPrompt) -> anyhow::Result<String>;
}
