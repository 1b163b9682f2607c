use crate::config::Settings;
use crate::domain::price::PriceBar;
use crate::ingest::types::ChartResponse;
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const MAX_RETRIES: u32 = 10;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; finexplain/0.1)";

/// Daily close series for a ticker, ascending by date, trading days only.
#[async_trait::async_trait]
pub trait PriceSeriesSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>>;
}

#[derive(Debug, Clone)]
pub struct YahooChartSource {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
    backoff: Duration,
}

/// One failed request. Only transport failures, 429 and 5xx are worth another attempt.
#[derive(Debug)]
struct FetchFailure {
    transient: bool,
    error: anyhow::Error,
}

impl FetchFailure {
    fn transient(error: anyhow::Error) -> Self {
        Self {
            transient: true,
            error,
        }
    }

    fn permanent(error: anyhow::Error) -> Self {
        Self {
            transient: false,
            error,
        }
    }
}

impl YahooChartSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .price_provider_base_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("PRICE_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("PRICE_PROVIDER_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build price provider http client")?;

        Ok(Self {
            http,
            base_url,
            retries: retries.clamp(1, MAX_RETRIES),
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Attempts per fetch (clamped to `1..=10`) and the first backoff, doubled per retry.
    pub fn with_retry_policy(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries.clamp(1, MAX_RETRIES);
        self.backoff = backoff;
        self
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }

    fn url(&self, ticker: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            ticker
        )
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers
    }

    async fn fetch_once(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<PriceBar>, FetchFailure> {
        let (period1, period2) = period_bounds(start, end).map_err(FetchFailure::permanent)?;

        let res = self
            .http
            .get(self.url(ticker))
            .headers(Self::headers())
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .context("price provider request failed")
            .map_err(FetchFailure::transient)?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read price provider response")
            .map_err(FetchFailure::transient)?;

        // Unknown or delisted symbols come back as 404; that is "no data", not a failure.
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(ticker, "price provider returned 404; treating as empty series");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let error = anyhow::anyhow!("price provider HTTP {status}: {text}");
            return Err(
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    FetchFailure::transient(error)
                } else {
                    FetchFailure::permanent(error)
                },
            );
        }

        let parsed = serde_json::from_str::<ChartResponse>(&text)
            .with_context(|| format!("price provider response is not a chart payload: {text}"))
            .map_err(FetchFailure::permanent)?;

        if let Some(err) = parsed.chart.error {
            return Err(FetchFailure::permanent(anyhow::anyhow!(
                "price provider error {}: {}",
                err.code,
                err.description.unwrap_or_default()
            )));
        }

        let bars = parsed
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|r| r.into_bars())
            .unwrap_or_default();

        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }
}

#[async_trait::async_trait]
impl PriceSeriesSource for YahooChartSource {
    fn source_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        anyhow::ensure!(start <= end, "price window start {start} is after end {end}");

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(ticker, start, end).await {
                Ok(bars) => {
                    tracing::debug!(
                        ticker,
                        %start,
                        %end,
                        rows = bars.len(),
                        "fetched price series"
                    );
                    return Ok(bars);
                }
                Err(FetchFailure { transient, error }) => {
                    if !transient || attempt >= self.retries {
                        return Err(error.context(format!("price fetch for {ticker} failed")));
                    }
                    let backoff = self.backoff_for(attempt);
                    tracing::warn!(
                        attempt,
                        ?backoff,
                        ticker,
                        error = %error,
                        "price fetch failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

/// Unix-second bounds covering `start..=end` as whole UTC days.
fn period_bounds(start: NaiveDate, end: NaiveDate) -> Result<(i64, i64)> {
    let period1 = start
        .and_hms_opt(0, 0, 0)
        .context("invalid start date")?
        .and_utc()
        .timestamp();
    let period2 = end
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid end date")?
        .and_utc()
        .timestamp();
    Ok((period1, period2))
}
