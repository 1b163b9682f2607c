use crate::domain::news::{Article, ScoredArticle};

pub const AUTHORITATIVE_SOURCES: [&str; 5] =
    ["Reuters", "Bloomberg", "WSJ", "Financial Times", "CNBC"];

const TITLE_MATCH_POINTS: u32 = 3;
const DESCRIPTION_MATCH_POINTS: u32 = 1;
const AUTHORITATIVE_SOURCE_POINTS: u32 = 2;

pub fn score_article(article: &Article, ticker: &str) -> u32 {
    let needle = ticker.to_lowercase();
    let mut score = 0;
    if article.title.to_lowercase().contains(&needle) {
        score += TITLE_MATCH_POINTS;
    }
    if article.description.to_lowercase().contains(&needle) {
        score += DESCRIPTION_MATCH_POINTS;
    }
    if AUTHORITATIVE_SOURCES.contains(&article.source_name.as_str()) {
        score += AUTHORITATIVE_SOURCE_POINTS;
    }
    score
}

/// Highest score first; equal scores keep fetch order.
pub fn rank_news(articles: Vec<Article>, ticker: &str) -> Vec<ScoredArticle> {
    let mut scored: Vec<ScoredArticle> = articles
        .into_iter()
        .map(|article| ScoredArticle {
            relevance_score: score_article(&article, ticker),
            article,
        })
        .collect();
    // sort_by is stable.
    scored.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
    scored
}
