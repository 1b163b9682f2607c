use crate::classify::HeadlineClassifier;
use crate::config::Settings;
use crate::domain::news::{Classification, TopicLabel};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MODEL: &str = "facebook/bart-large-mnli";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Zero-shot classifier behind a Hugging Face style inference endpoint.
#[derive(Debug, Clone)]
pub struct ZeroShotClassifier {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl ZeroShotClassifier {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_classifier_base_url()?.to_string();
        let api_key = settings.classifier_api_key.clone();
        let model = std::env::var("CLASSIFIER_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("CLASSIFIER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build classifier http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}", self.base_url.trim_end_matches('/'), self.model)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
        }
        Ok(headers)
    }

    pub async fn try_classify(&self, text: &str) -> Result<Classification> {
        let candidate_labels: Vec<&'static str> =
            TopicLabel::ALL.iter().map(|l| l.as_str()).collect();
        let req = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters { candidate_labels },
        };

        let res = self
            .http
            .post(self.url())
            .headers(self.headers()?)
            .json(&req)
            .send()
            .await
            .context("classifier request failed")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("failed to read classifier response")?;
        if !status.is_success() {
            anyhow::bail!("classifier HTTP {status}: {body}");
        }

        let parsed = serde_json::from_str::<ZeroShotResponse>(&body)
            .with_context(|| format!("classifier response has unexpected shape: {body}"))?;
        parsed.top()
    }
}

#[async_trait::async_trait]
impl HeadlineClassifier for ZeroShotClassifier {
    fn name(&self) -> &'static str {
        "zero_shot"
    }

    async fn classify(&self, text: &str) -> Classification {
        match tokio::time::timeout(self.timeout, self.try_classify(text)).await {
            Ok(Ok(c)) => c,
            Ok(Err(err)) => {
                tracing::warn!(
                    error = %err,
                    "headline classification failed; using fallback label"
                );
                Classification::UNAVAILABLE
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.timeout,
                    "headline classification timed out; using fallback label"
                );
                Classification::UNAVAILABLE
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters {
    candidate_labels: Vec<&'static str>,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelColumns {
    labels: Vec<String>,
    scores: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Columns(LabelColumns),
    ColumnsList(Vec<LabelColumns>),
    Pairs(Vec<LabelScore>),
}

impl ZeroShotResponse {
    fn top(self) -> Result<Classification> {
        let pairs: Vec<(String, f64)> = match self {
            ZeroShotResponse::Columns(c) => c.labels.into_iter().zip(c.scores).collect(),
            ZeroShotResponse::ColumnsList(list) => list
                .into_iter()
                .next()
                .map(|c| c.labels.into_iter().zip(c.scores).collect())
                .unwrap_or_default(),
            ZeroShotResponse::Pairs(p) => p.into_iter().map(|p| (p.label, p.score)).collect(),
        };

        let (label, score) = pairs
            .into_iter()
            .filter(|(_, s)| s.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .context("classifier returned no labels")?;
        let label = TopicLabel::parse(&label)
            .with_context(|| format!("classifier returned unknown label {label:?}"))?;

        Ok(Classification {
            label,
            confidence: score.clamp(0.0, 1.0),
        })
    }
}
