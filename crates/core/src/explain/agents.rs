//! Two read-only presentations of the same query data: a market-impact view and a news view.

use crate::classify::HeadlineClassifier;
use crate::domain::explanation::{ImpactTier, MarketView, NewsDriver, NewsView};
use crate::domain::news::{Classification, ClassifiedHeadline, ScoredArticle};
use crate::domain::price::PriceMove;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub const VERY_LARGE_THRESHOLD_PCT: f64 = 5.0;
pub const NOTABLE_THRESHOLD_PCT: f64 = 2.0;

const PLAIN_TOP_N: usize = 3;
const ENRICHED_TOP_N: usize = 5;
const NO_HEADLINES_SUMMARY: &str = "No relevant company-specific headlines found.";

/// Lower bounds are inclusive.
pub fn impact_tier(magnitude: f64) -> ImpactTier {
    if magnitude >= VERY_LARGE_THRESHOLD_PCT {
        ImpactTier::VeryLarge
    } else if magnitude >= NOTABLE_THRESHOLD_PCT {
        ImpactTier::Notable
    } else {
        ImpactTier::Mild
    }
}

pub fn market_view(ticker: &str, price_move: Option<&PriceMove>) -> MarketView {
    let Some(mv) = price_move else {
        return MarketView {
            has_data: false,
            ticker: ticker.to_string(),
            date: None,
            direction: None,
            pct_change: None,
            impact: ImpactTier::Unknown,
            summary: format!("No market data for {ticker}."),
        };
    };

    let direction = mv.direction();
    let magnitude = mv.magnitude();
    let impact = impact_tier(magnitude);

    MarketView {
        has_data: true,
        ticker: ticker.to_string(),
        date: Some(mv.date),
        direction: Some(direction),
        pct_change: Some(magnitude),
        impact,
        summary: format!(
            "{ticker} was {direction} {magnitude:.2}% on {} ({impact} move).",
            mv.date
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewsViewStyle {
    /// Title and source only.
    Plain,
    /// Title plus predicted topic and its confidence.
    #[default]
    Enriched,
}

impl NewsViewStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Some(NewsViewStyle::Plain),
            "enriched" => Some(NewsViewStyle::Enriched),
            _ => None,
        }
    }

    fn top_n(self) -> usize {
        match self {
            NewsViewStyle::Plain => PLAIN_TOP_N,
            NewsViewStyle::Enriched => ENRICHED_TOP_N,
        }
    }
}

fn headline_line(driver: &NewsDriver) -> String {
    match driver {
        NewsDriver::Headline {
            title, source_name, ..
        } => format!("- {title} ({})", display_source(source_name)),
        NewsDriver::Classified(c) => format!(
            "- {} → {} ({:.2})",
            c.title, c.predicted_label, c.label_confidence
        ),
    }
}

fn display_source(source_name: &str) -> &str {
    if source_name.trim().is_empty() {
        "unknown"
    } else {
        source_name
    }
}

pub async fn news_view(
    ticker: &str,
    date: NaiveDate,
    ranked: &[ScoredArticle],
    style: NewsViewStyle,
    classifier: &Arc<dyn HeadlineClassifier>,
    classify_timeout: Duration,
) -> NewsView {
    if ranked.is_empty() {
        return NewsView {
            has_news: false,
            summary: NO_HEADLINES_SUMMARY.to_string(),
            drivers: Vec::new(),
            articles_used: Vec::new(),
        };
    }

    let top: Vec<ScoredArticle> = ranked.iter().take(style.top_n()).cloned().collect();

    let drivers: Vec<NewsDriver> = match style {
        NewsViewStyle::Plain => top
            .iter()
            .map(|s| NewsDriver::Headline {
                title: s.article.title.clone(),
                source_name: s.article.source_name.clone(),
                published_at: s.article.published_at.clone(),
            })
            .collect(),
        NewsViewStyle::Enriched => {
            let titles: Vec<String> = top.iter().map(|s| s.article.title.clone()).collect();
            let classes = classify_all(classifier, titles, classify_timeout).await;
            top.iter()
                .zip(classes)
                .map(|(s, c)| NewsDriver::Classified(ClassifiedHeadline::new(&s.article, c)))
                .collect()
        }
    };

    let lines: Vec<String> = drivers.iter().map(headline_line).collect();
    let summary = format!("Top headlines for {ticker} on {date}:\n{}", lines.join("\n"));

    NewsView {
        has_news: true,
        summary,
        drivers,
        articles_used: top,
    }
}

/// Classifies each text independently and concurrently; output order matches input order.
/// A timeout or a failed task counts as "capability unavailable" for that text only.
pub async fn classify_all(
    classifier: &Arc<dyn HeadlineClassifier>,
    texts: Vec<String>,
    timeout: Duration,
) -> Vec<Classification> {
    let mut out = vec![Classification::UNAVAILABLE; texts.len()];
    let mut set = JoinSet::new();
    for (idx, text) in texts.into_iter().enumerate() {
        let classifier = Arc::clone(classifier);
        set.spawn(async move {
            let res = tokio::time::timeout(timeout, classifier.classify(&text)).await;
            (idx, res)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, Ok(c))) => out[idx] = c,
            Ok((idx, Err(_))) => {
                tracing::warn!(
                    idx,
                    ?timeout,
                    "headline classification timed out; using fallback label"
                );
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "headline classification task failed; using fallback label"
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FallbackClassifier;
    use crate::domain::news::{Article, TopicLabel};
    use crate::domain::price::Direction;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 3).unwrap()
    }

    fn scored(title: &str, source: &str) -> ScoredArticle {
        ScoredArticle {
            article: Article {
                title: title.to_string(),
                description: String::new(),
                source_name: source.to_string(),
                url: String::new(),
                published_at: "2025-11-03T14:00:00Z".to_string(),
            },
            relevance_score: 0,
        }
    }

    struct KeywordClassifier;

    #[async_trait::async_trait]
    impl HeadlineClassifier for KeywordClassifier {
        fn name(&self) -> &'static str {
            "keyword"
        }

        async fn classify(&self, text: &str) -> Classification {
            if text.contains("results") {
                Classification {
                    label: TopicLabel::EarningsResults,
                    confidence: 0.9,
                }
            } else {
                Classification {
                    label: TopicLabel::SectorIndustry,
                    confidence: 0.5,
                }
            }
        }
    }

    struct StuckClassifier;

    #[async_trait::async_trait]
    impl HeadlineClassifier for StuckClassifier {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn classify(&self, _text: &str) -> Classification {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Classification {
                label: TopicLabel::MacroMarket,
                confidence: 1.0,
            }
        }
    }

    #[test]
    fn tier_boundaries_are_inclusive_at_lower_bound() {
        assert_eq!(impact_tier(5.0), ImpactTier::VeryLarge);
        assert_eq!(impact_tier(4.99), ImpactTier::Notable);
        assert_eq!(impact_tier(2.0), ImpactTier::Notable);
        assert_eq!(impact_tier(1.99), ImpactTier::Mild);
        assert_eq!(impact_tier(0.0), ImpactTier::Mild);
    }

    #[test]
    fn market_view_without_data() {
        let v = market_view("AAPL", None);
        assert!(!v.has_data);
        assert_eq!(v.impact, ImpactTier::Unknown);
        assert_eq!(v.summary, "No market data for AAPL.");
    }

    #[test]
    fn market_view_summarizes_move() {
        let mv = PriceMove::new(date(), 94.0, 100.0).unwrap();
        let v = market_view("TSLA", Some(&mv));
        assert!(v.has_data);
        assert_eq!(v.direction, Some(Direction::Down));
        assert_eq!(v.pct_change, Some(6.0));
        assert_eq!(v.impact, ImpactTier::VeryLarge);
        assert_eq!(v.summary, "TSLA was down 6.00% on 2025-11-03 (very_large move).");
    }

    #[test]
    fn tiers_compare_the_rounded_percentage() {
        // Raw change is 1.996%, which rounds to 2.00% before tiering.
        let mv = PriceMove::new(date(), 101.996, 100.0).unwrap();
        let v = market_view("AAPL", Some(&mv));
        assert_eq!(v.pct_change, Some(2.0));
        assert_eq!(v.impact, ImpactTier::Notable);
        assert_eq!(v.summary, "AAPL was up 2.00% on 2025-11-03 (notable move).");
    }

    #[tokio::test]
    async fn empty_news_view() {
        let classifier: Arc<dyn HeadlineClassifier> = Arc::new(FallbackClassifier);
        let v = news_view(
            "AAPL",
            date(),
            &[],
            NewsViewStyle::Enriched,
            &classifier,
            Duration::from_secs(1),
        )
        .await;
        assert!(!v.has_news);
        assert_eq!(v.summary, NO_HEADLINES_SUMMARY);
        assert!(v.drivers.is_empty() && v.articles_used.is_empty());
    }

    #[tokio::test]
    async fn plain_view_lists_top_three() {
        let classifier: Arc<dyn HeadlineClassifier> = Arc::new(FallbackClassifier);
        let ranked: Vec<_> = ["a", "b", "c", "d"].iter().map(|t| scored(t, "Reuters")).collect();
        let v = news_view(
            "AAPL",
            date(),
            &ranked,
            NewsViewStyle::Plain,
            &classifier,
            Duration::from_secs(1),
        )
        .await;
        assert!(v.has_news);
        assert_eq!(v.articles_used.len(), 3);
        assert_eq!(
            v.summary,
            "Top headlines for AAPL on 2025-11-03:\n- a (Reuters)\n- b (Reuters)\n- c (Reuters)"
        );
    }

    #[tokio::test]
    async fn enriched_view_attaches_labels_in_rank_order() {
        let classifier: Arc<dyn HeadlineClassifier> = Arc::new(KeywordClassifier);
        let ranked: Vec<_> = (0..6)
            .map(|i| {
                let title = if i % 2 == 0 { format!("{i} results") } else { format!("{i} peers") };
                scored(&title, "MockWire")
            })
            .collect();
        let v = news_view(
            "AAPL",
            date(),
            &ranked,
            NewsViewStyle::Enriched,
            &classifier,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(v.drivers.len(), 5);
        let lines: Vec<&str> = v.summary.lines().collect();
        assert_eq!(lines[1], "- 0 results → earnings/results (0.90)");
        assert_eq!(lines[2], "- 1 peers → sector/industry (0.50)");
        for (driver, article) in v.drivers.iter().zip(&v.articles_used) {
            assert_eq!(driver.title(), article.article.title);
        }
    }

    #[tokio::test]
    async fn enriched_view_with_fallback_classifier_is_other() {
        let classifier: Arc<dyn HeadlineClassifier> = Arc::new(FallbackClassifier);
        let ranked = vec![scored("AAPL posts results", "MockWire")];
        let v = news_view(
            "AAPL",
            date(),
            &ranked,
            NewsViewStyle::Enriched,
            &classifier,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(v.summary.lines().nth(1), Some("- AAPL posts results → other (0.00)"));
    }

    #[tokio::test(start_paused = true)]
    async fn classification_timeout_degrades_to_other() {
        let classifier: Arc<dyn HeadlineClassifier> = Arc::new(StuckClassifier);
        let texts = vec!["x".to_string(), "y".to_string()];
        let out = classify_all(&classifier, texts, Duration::from_millis(50)).await;
        assert_eq!(out, vec![Classification::UNAVAILABLE; 2]);
    }

    #[test]
    fn parses_style() {
        assert_eq!(NewsViewStyle::parse("Plain"), Some(NewsViewStyle::Plain));
        assert_eq!(NewsViewStyle::parse("enriched"), Some(NewsViewStyle::Enriched));
        assert_eq!(NewsViewStyle::parse("fancy"), None);
    }
}
