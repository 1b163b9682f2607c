use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub source_name: String,
    pub url: String,
    pub published_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: Article,
    pub relevance_score: u32,
}

/// Closed taxonomy a headline can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicLabel {
    #[serde(rename = "earnings/results")]
    EarningsResults,
    #[serde(rename = "analyst/ratings")]
    AnalystRatings,
    #[serde(rename = "product/company-specific")]
    ProductCompanySpecific,
    #[serde(rename = "sector/industry")]
    SectorIndustry,
    #[serde(rename = "macro/market")]
    MacroMarket,
    #[serde(rename = "other")]
    Other,
}

impl TopicLabel {
    pub const ALL: [TopicLabel; 6] = [
        TopicLabel::EarningsResults,
        TopicLabel::AnalystRatings,
        TopicLabel::ProductCompanySpecific,
        TopicLabel::SectorIndustry,
        TopicLabel::MacroMarket,
        TopicLabel::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TopicLabel::EarningsResults => "earnings/results",
            TopicLabel::AnalystRatings => "analyst/ratings",
            TopicLabel::ProductCompanySpecific => "product/company-specific",
            TopicLabel::SectorIndustry => "sector/industry",
            TopicLabel::MacroMarket => "macro/market",
            TopicLabel::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|l| l.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for TopicLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-matching topic for a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: TopicLabel,
    /// In `[0, 1]`.
    pub confidence: f64,
}

impl Classification {
    /// Result reported when no classifier is available.
    pub const UNAVAILABLE: Classification = Classification {
        label: TopicLabel::Other,
        confidence: 0.0,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedHeadline {
    pub title: String,
    pub source_name: String,
    pub published_at: String,
    pub predicted_label: TopicLabel,
    pub label_confidence: f64,
}

impl ClassifiedHeadline {
    pub fn new(article: &Article, classification: Classification) -> Self {
        Self {
            title: article.title.clone(),
            source_name: article.source_name.clone(),
            published_at: article.published_at.clone(),
            predicted_label: classification.label,
            label_confidence: classification.confidence.clamp(0.0, 1.0),
        }
    }
}
