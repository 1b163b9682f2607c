pub mod classify;
pub mod domain;
pub mod explain;
pub mod ingest;
pub mod llm;
pub mod time;

#[cfg(test)]
pub(crate) mod test_support;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub price_provider_base_url: Option<String>,
        pub classifier_base_url: Option<String>,
        pub classifier_api_key: Option<String>,
        pub refine_enabled: bool,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                price_provider_base_url: std::env::var("PRICE_PROVIDER_BASE_URL").ok(),
                classifier_base_url: std::env::var("CLASSIFIER_BASE_URL").ok(),
                classifier_api_key: std::env::var("CLASSIFIER_API_KEY").ok(),
                refine_enabled: std::env::var("REFINE_ENABLED")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
            })
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_classifier_base_url(&self) -> anyhow::Result<&str> {
            self.classifier_base_url
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .context("CLASSIFIER_BASE_URL is required")
        }
    }

    pub fn parse_flag(v: &str) -> bool {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    }
}
