use crate::classify::{classifier_from_settings, HeadlineClassifier};
use crate::config::Settings;
use crate::domain::explanation::QueryResult;
use crate::domain::query::ExplainQuery;
use crate::explain::agents::{self, NewsViewStyle};
use crate::explain::price_move::{self, DEFAULT_LOOKBACK_DAYS};
use crate::explain::{ranking, synthesis};
use crate::ingest::news::{CannedNewsSource, NewsSource};
use crate::ingest::price::{PriceSeriesSource, YahooChartSource};
use crate::llm::anthropic::AnthropicClient;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{RefinementPrompt, RefinementService};
use anyhow::Context;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REFINE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Calendar days of price history fetched, ending today.
    pub lookback_days: u32,
    pub news_style: NewsViewStyle,
    pub classifier_timeout: Duration,
    pub refine_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            news_style: NewsViewStyle::default(),
            classifier_timeout: Duration::from_secs(DEFAULT_CLASSIFIER_TIMEOUT_SECS),
            refine_timeout: Duration::from_secs(DEFAULT_REFINE_TIMEOUT_SECS),
        }
    }
}

impl PipelineOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("PRICE_LOOKBACK_DAYS") {
            if let Ok(n) = s.parse::<u32>() {
                out.lookback_days = n;
            }
        }

        if let Ok(s) = std::env::var("NEWS_VIEW_STYLE") {
            if let Some(style) = NewsViewStyle::parse(&s) {
                out.news_style = style;
            }
        }

        if let Ok(s) = std::env::var("CLASSIFIER_TIMEOUT_SECS") {
            if let Ok(n) = s.parse::<u64>() {
                out.classifier_timeout = Duration::from_secs(n);
            }
        }

        if let Ok(s) = std::env::var("REFINE_TIMEOUT_SECS") {
            if let Ok(n) = s.parse::<u64>() {
                out.refine_timeout = Duration::from_secs(n);
            }
        }

        out
    }
}

/// Runs one (ticker, date) query end to end. Holds no per-query state.
#[derive(Clone)]
pub struct Explainer {
    prices: Arc<dyn PriceSeriesSource>,
    news: Arc<dyn NewsSource>,
    classifier: Arc<dyn HeadlineClassifier>,
    refiner: Option<Arc<dyn RefinementService>>,
    options: PipelineOptions,
}

impl Explainer {
    pub fn new(
        prices: Arc<dyn PriceSeriesSource>,
        news: Arc<dyn NewsSource>,
        classifier: Arc<dyn HeadlineClassifier>,
    ) -> Self {
        Self {
            prices,
            news,
            classifier,
            refiner: None,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_refiner(mut self, refiner: Arc<dyn RefinementService>) -> Self {
        self.refiner = Some(refiner);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn refinement_enabled(&self) -> bool {
        self.refiner.is_some()
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// Wires the production collaborators. Classifier availability is checked here, once.
    pub async fn from_settings(
        settings: &Settings,
        options: PipelineOptions,
    ) -> anyhow::Result<Self> {
        let prices = YahooChartSource::from_settings(settings)?;
        let classifier = classifier_from_settings(settings).await;

        let mut explainer = Self::new(Arc::new(prices), Arc::new(CannedNewsSource), classifier)
            .with_options(options);

        if settings.refine_enabled {
            let refiner = AnthropicClient::from_settings(settings)
                .context("REFINE_ENABLED is set but the refinement client could not be built")?;
            explainer = explainer.with_refiner(Arc::new(refiner));
        }

        Ok(explainer)
    }

    /// Validates raw input, then runs the query with today's UTC date as the window end.
    pub async fn explain(&self, ticker: &str, date: &str) -> anyhow::Result<QueryResult> {
        let query = ExplainQuery::parse(ticker, date)?;
        let today = chrono::Utc::now().date_naive();
        self.explain_query(&query, today).await
    }

    pub async fn explain_query(
        &self,
        query: &ExplainQuery,
        today: NaiveDate,
    ) -> anyhow::Result<QueryResult> {
        let ticker = query.ticker.as_str();
        let date = query.date;

        let price_move = price_move::resolve_price_move(
            self.prices.as_ref(),
            ticker,
            date,
            self.options.lookback_days,
            today,
        )
        .await
        .with_context(|| format!("failed to resolve price move for {ticker} on {date}"))?;

        let articles = self
            .news
            .fetch(ticker, date)
            .await
            .with_context(|| format!("failed to fetch news for {ticker} on {date}"))?;
        let ranked = ranking::rank_news(articles, ticker);

        let news_view = agents::news_view(
            ticker,
            date,
            &ranked,
            self.options.news_style,
            &self.classifier,
            self.options.classifier_timeout,
        )
        .await;

        let structured = synthesis::synthesize(ticker, date, price_move.as_ref(), &ranked);
        let market_view = agents::market_view(ticker, price_move.as_ref());

        let (final_note, prompt_sent) = match &self.refiner {
            Some(refiner) => {
                let prompt = RefinementPrompt::from_structured(&structured)?;
                let note = self.refine(refiner.as_ref(), &prompt).await?;
                (note, Some(prompt.user))
            }
            None => (structured.explanation.clone(), None),
        };

        tracing::info!(
            ticker,
            %date,
            has_data = market_view.has_data,
            has_news = news_view.has_news,
            confidence = structured.confidence,
            refined = prompt_sent.is_some(),
            "explanation built"
        );

        Ok(QueryResult {
            ticker: ticker.to_string(),
            date,
            price_move,
            market_view,
            news_view,
            structured,
            prompt_sent,
            final_note,
        })
    }

    async fn refine(
        &self,
        refiner: &dyn RefinementService,
        prompt: &RefinementPrompt,
    ) -> anyhow::Result<String> {
        let timeout = self.options.refine_timeout;
        match tokio::time::timeout(timeout, refiner.refine(prompt)).await {
            Ok(res) => res.context("refinement failed"),
            Err(_) => Err(LlmDiagnosticsError::new(
                refiner.provider(),
                "timeout",
                format!("no response within {timeout:?}"),
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FallbackClassifier;
    use crate::domain::explanation::{ImpactTier, NewsDriver};
    use crate::domain::news::Article;
    use crate::domain::price::{Direction, PriceBar};
    use crate::domain::query::QueryValidationError;
    use crate::llm::Provider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    struct StaticPrices {
        bars: Vec<PriceBar>,
        calls: AtomicUsize,
    }

    impl StaticPrices {
        fn new(bars: Vec<PriceBar>) -> Arc<Self> {
            Arc::new(Self {
                bars,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl PriceSeriesSource for StaticPrices {
        fn source_name(&self) -> &'static str {
            "static"
        }

        async fn fetch(
            &self,
            _ticker: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> anyhow::Result<Vec<PriceBar>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .bars
                .iter()
                .copied()
                .filter(|b| b.date >= start && b.date <= end)
                .collect())
        }
    }

    struct StaticNews(Vec<Article>);

    #[async_trait::async_trait]
    impl NewsSource for StaticNews {
        fn source_name(&self) -> &'static str {
            "static"
        }

        async fn fetch(&self, _ticker: &str, _date: NaiveDate) -> anyhow::Result<Vec<Article>> {
            Ok(self.0.clone())
        }
    }

    struct EchoRefiner;

    #[async_trait::async_trait]
    impl RefinementService for EchoRefiner {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn refine(&self, prompt: &RefinementPrompt) -> anyhow::Result<String> {
            Ok(format!("refined ({} chars of prompt)", prompt.user.len()))
        }
    }

    struct FailingRefiner;

    #[async_trait::async_trait]
    impl RefinementService for FailingRefiner {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn refine(&self, _prompt: &RefinementPrompt) -> anyhow::Result<String> {
            Err(LlmDiagnosticsError::new(Provider::Anthropic, "http", "status=529").into())
        }
    }

    struct SlowRefiner;

    #[async_trait::async_trait]
    impl RefinementService for SlowRefiner {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn refine(&self, _prompt: &RefinementPrompt) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    fn article(title: &str, description: &str, source: &str) -> Article {
        Article {
            title: title.to_string(),
            description: description.to_string(),
            source_name: source.to_string(),
            url: "https://example.com/a".to_string(),
            published_at: "2025-11-04T14:00:00Z".to_string(),
        }
    }

    fn rising_series() -> Vec<PriceBar> {
        vec![
            PriceBar { date: d(3), close: 200.0 },
            PriceBar { date: d(4), close: 207.0 },
        ]
    }

    fn explainer(prices: Arc<StaticPrices>, news: Vec<Article>) -> Explainer {
        Explainer::new(prices, Arc::new(StaticNews(news)), Arc::new(FallbackClassifier))
    }

    #[tokio::test]
    async fn scenario_rising_move_with_authoritative_ticker_headline() {
        let news = vec![
            article("Sector peers rally", "Broader strength", "MockFinance"),
            article("AAPL beats on services revenue", "AAPL results", "Reuters"),
        ];
        let ex = explainer(StaticPrices::new(rising_series()), news);
        let query = ExplainQuery::parse("AAPL", "2025-11-04").unwrap();
        let res = ex.explain_query(&query, d(10)).await.unwrap();

        let mv = res.price_move.as_ref().unwrap();
        assert_eq!(mv.pct_change, 3.5);
        assert_eq!(res.market_view.direction, Some(Direction::Up));
        assert_eq!(res.market_view.impact, ImpactTier::Notable);
        assert_eq!(res.structured.confidence, 1.0);
        assert_eq!(
            res.structured.primary_driver.as_deref(),
            Some("AAPL beats on services revenue")
        );
        assert_eq!(res.final_note, res.structured.explanation);
        assert!(res.prompt_sent.is_none());
        assert!(res.news_view.has_news);
        assert!(matches!(
            res.news_view.drivers[0],
            NewsDriver::Classified(ref c) if c.label_confidence == 0.0
        ));
    }

    #[tokio::test]
    async fn scenario_missing_price_data() {
        // 2025-11-08 is a Saturday.
        let ex = explainer(
            StaticPrices::new(rising_series()),
            vec![article("AAPL news", "", "Reuters")],
        );
        let query = ExplainQuery::parse("AAPL", "2025-11-08").unwrap();
        let res = ex.explain_query(&query, d(10)).await.unwrap();

        assert!(res.price_move.is_none());
        assert_eq!(
            res.structured.explanation,
            "Could not find market data for AAPL on 2025-11-08."
        );
        assert_eq!(res.structured.confidence, 0.4);
        assert!(res.structured.primary_driver.is_none());
        assert!(!res.market_view.has_data);
    }

    #[tokio::test]
    async fn scenario_price_without_news() {
        let ex = explainer(StaticPrices::new(rising_series()), vec![]);
        let query = ExplainQuery::parse("AAPL", "2025-11-04").unwrap();
        let res = ex.explain_query(&query, d(10)).await.unwrap();

        assert!(res
            .structured
            .explanation
            .contains("No major company-specific headlines"));
        assert_eq!(res.structured.confidence, 0.6);
        assert!(!res.news_view.has_news);
    }

    #[tokio::test]
    async fn date_outside_lookback_window_has_no_data() {
        let ex = explainer(StaticPrices::new(rising_series()), vec![])
            .with_options(PipelineOptions {
                lookback_days: 5,
                ..PipelineOptions::default()
            });
        let query = ExplainQuery::parse("AAPL", "2025-11-04").unwrap();
        let res = ex.explain_query(&query, d(20)).await.unwrap();
        assert!(res.price_move.is_none());
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_fetching() {
        let prices = StaticPrices::new(rising_series());
        let ex = explainer(prices.clone(), vec![]);
        let err = ex.explain("AAPL", "2025/11/04").await.unwrap_err();
        let v = err.downcast_ref::<QueryValidationError>().unwrap();
        assert_eq!(v.field, "date");
        assert!(ex.explain("", "2025-11-04").await.is_err());
        assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refiner_output_becomes_final_note() {
        let ex = explainer(StaticPrices::new(rising_series()), vec![])
            .with_refiner(Arc::new(EchoRefiner));
        let query = ExplainQuery::parse("AAPL", "2025-11-04").unwrap();
        let res = ex.explain_query(&query, d(10)).await.unwrap();
        assert!(res.final_note.starts_with("refined ("));
        let prompt = res.prompt_sent.unwrap();
        assert!(prompt.contains(&res.structured.explanation));
    }

    #[tokio::test]
    async fn refiner_failure_fails_the_query() {
        let ex = explainer(StaticPrices::new(rising_series()), vec![])
            .with_refiner(Arc::new(FailingRefiner));
        let query = ExplainQuery::parse("AAPL", "2025-11-04").unwrap();
        let err = ex.explain_query(&query, d(10)).await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "http");
    }

    #[tokio::test(start_paused = true)]
    async fn refiner_timeout_fails_the_query() {
        let ex = explainer(StaticPrices::new(rising_series()), vec![])
            .with_refiner(Arc::new(SlowRefiner))
            .with_options(PipelineOptions {
                refine_timeout: Duration::from_millis(100),
                ..PipelineOptions::default()
            });
        let query = ExplainQuery::parse("AAPL", "2025-11-04").unwrap();
        let err = ex.explain_query(&query, d(10)).await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "timeout");
    }

    #[tokio::test]
    async fn canned_news_flows_through_plain_view() {
        let ex = Explainer::new(
            StaticPrices::new(rising_series()),
            Arc::new(CannedNewsSource),
            Arc::new(FallbackClassifier),
        )
        .with_options(PipelineOptions {
            news_style: NewsViewStyle::Plain,
            ..PipelineOptions::default()
        });
        let query = ExplainQuery::parse("msft", "2025-11-04").unwrap();
        let res = ex.explain_query(&query, d(10)).await.unwrap();

        assert_eq!(res.ticker, "MSFT");
        // Both canned headlines mention the ticker; the first also scores on its description.
        assert_eq!(
            res.structured.primary_driver.as_deref(),
            Some("MSFT posts stronger-than-expected results")
        );
        assert_eq!(res.structured.confidence, 1.0);
        assert_eq!(
            res.news_view.summary,
            "Top headlines for MSFT on 2025-11-04:\n\
- MSFT posts stronger-than-expected results (MockWire)\n\
- Sector peers rally, lifting MSFT (MockFinance)"
        );
        let v = serde_json::to_value(&res).unwrap();
        assert_eq!(v["move"]["pct_change"], 3.5);
        assert_eq!(v["market_view"]["impact"], "notable");
        assert_eq!(v["news_view"]["drivers"][0]["kind"], "headline");
    }
}
