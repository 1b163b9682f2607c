use crate::domain::news::{ClassifiedHeadline, ScoredArticle};
use crate::domain::price::{Direction, PriceMove, PriceMoveSummary};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Rule-based explanation of one (ticker, date) move. Built once per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredExplanation {
    pub ticker: String,
    pub date: NaiveDate,
    pub price_move: Option<PriceMoveSummary>,
    pub primary_driver: Option<String>,
    pub articles_used: Vec<ScoredArticle>,
    pub confidence: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactTier {
    Unknown,
    Mild,
    Notable,
    VeryLarge,
}

impl ImpactTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ImpactTier::Unknown => "unknown",
            ImpactTier::Mild => "mild",
            ImpactTier::Notable => "notable",
            ImpactTier::VeryLarge => "very_large",
        }
    }
}

impl std::fmt::Display for ImpactTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketView {
    pub has_data: bool,
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Absolute move in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct_change: Option<f64>,
    pub impact: ImpactTier,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NewsDriver {
    Headline {
        title: String,
        source_name: String,
        published_at: String,
    },
    Classified(ClassifiedHeadline),
}

impl NewsDriver {
    pub fn title(&self) -> &str {
        match self {
            NewsDriver::Headline { title, .. } => title,
            NewsDriver::Classified(c) => &c.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsView {
    pub has_news: bool,
    pub summary: String,
    pub drivers: Vec<NewsDriver>,
    pub articles_used: Vec<ScoredArticle>,
}

/// Everything the presentation layer receives for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub ticker: String,
    pub date: NaiveDate,
    #[serde(rename = "move")]
    pub price_move: Option<PriceMove>,
    pub market_view: MarketView,
    pub news_view: NewsView,
    pub structured: StructuredExplanation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_sent: Option<String>,
    pub final_note: String,
}
