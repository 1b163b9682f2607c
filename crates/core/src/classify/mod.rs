//! Optional headline topic classification.
//!
//! The pipeline always holds an `Arc<dyn HeadlineClassifier>`. Which implementation it gets
//! is decided once, in [`classifier_from_settings`]; call sites never branch on availability.

pub mod zero_shot;

use crate::config::Settings;
use crate::domain::news::Classification;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait HeadlineClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Never fails: an unavailable or misbehaving backend yields [`Classification::UNAVAILABLE`].
    async fn classify(&self, text: &str) -> Classification;
}

/// Constant `other`/0.0 classifier used when no model is reachable.
#[derive(Debug, Clone, Default)]
pub struct FallbackClassifier;

#[async_trait::async_trait]
impl HeadlineClassifier for FallbackClassifier {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn classify(&self, _text: &str) -> Classification {
        Classification::UNAVAILABLE
    }
}

const CHECK_TEXT: &str = "Company reports quarterly earnings above expectations";

pub async fn classifier_from_settings(settings: &Settings) -> Arc<dyn HeadlineClassifier> {
    if settings.classifier_base_url.is_none() {
        tracing::info!("CLASSIFIER_BASE_URL not set; headline classification disabled");
        return Arc::new(FallbackClassifier);
    }

    let classifier = match zero_shot::ZeroShotClassifier::from_settings(settings) {
        Ok(c) => c,
        Err(err) => {
            tracing::warn!(error = %err, "zero-shot classifier misconfigured; using fallback");
            return Arc::new(FallbackClassifier);
        }
    };

    match classifier.try_classify(CHECK_TEXT).await {
        Ok(sample) => {
            tracing::info!(
                model = classifier.model(),
                sample_label = %sample.label,
                "zero-shot classifier available"
            );
            Arc::new(classifier)
        }
        Err(err) => {
            tracing::warn!(
                error = %err,
                "zero-shot classifier startup check failed; using fallback"
            );
            Arc::new(FallbackClassifier)
        }
    }
}
