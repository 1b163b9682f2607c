use crate::domain::explanation::StructuredExplanation;
use crate::domain::news::ScoredArticle;
use crate::domain::price::PriceMove;
use chrono::NaiveDate;

/// Articles carried into the structured explanation.
pub const MAX_ARTICLES_USED: usize = 3;

// Confidence is accumulated in tenths so the published values are exact (0.4, 0.6, ...).
const BASE_TENTHS: u32 = 4;
const PRICE_PRESENT_TENTHS: u32 = 2;
const HEADLINE_FOUND_TENTHS: u32 = 2;
const TICKER_IN_HEADLINE_TENTHS: u32 = 2;
const MAX_TENTHS: u32 = 10;

fn confidence_from_tenths(tenths: u32) -> f64 {
    f64::from(tenths.min(MAX_TENTHS)) / 10.0
}

/// Lead sentence shared by every narrative that has a price move.
pub fn move_sentence(ticker: &str, mv: &PriceMove) -> String {
    format!(
        "On {}, {} {} {:.2}%.",
        mv.date,
        ticker,
        mv.direction().verb(),
        mv.magnitude()
    )
}

pub fn no_market_data_message(ticker: &str, date: NaiveDate) -> String {
    format!("Could not find market data for {ticker} on {date}.")
}

pub fn synthesize(
    ticker: &str,
    date: NaiveDate,
    price_move: Option<&PriceMove>,
    ranked: &[ScoredArticle],
) -> StructuredExplanation {
    let articles_used: Vec<ScoredArticle> =
        ranked.iter().take(MAX_ARTICLES_USED).cloned().collect();
    let mut tenths = BASE_TENTHS;

    let Some(mv) = price_move else {
        return StructuredExplanation {
            ticker: ticker.to_string(),
            date,
            price_move: None,
            primary_driver: None,
            articles_used,
            confidence: confidence_from_tenths(tenths),
            explanation: no_market_data_message(ticker, date),
        };
    };

    tenths += PRICE_PRESENT_TENTHS;
    let lead = move_sentence(ticker, mv);

    let Some(top) = ranked.first() else {
        return StructuredExplanation {
            ticker: ticker.to_string(),
            date,
            price_move: Some(mv.summary()),
            primary_driver: None,
            articles_used,
            confidence: confidence_from_tenths(tenths),
            explanation: format!(
                "{lead} No major company-specific headlines were found, \
                 so the move may reflect broader market or sector factors."
            ),
        };
    };

    tenths += HEADLINE_FOUND_TENTHS;
    if top
        .article
        .title
        .to_lowercase()
        .contains(&ticker.to_lowercase())
    {
        tenths += TICKER_IN_HEADLINE_TENTHS;
    }

    let mut explanation = format!(
        "{lead} The move appears to be linked to '{}' reported by {}.",
        top.article.title,
        display_source(&top.article.source_name)
    );
    if ranked.len() > 1 {
        explanation.push_str(
            " Additional coverage on the same day may have reinforced investor sentiment.",
        );
    }

    StructuredExplanation {
        ticker: ticker.to_string(),
        date,
        price_move: Some(mv.summary()),
        primary_driver: Some(top.article.title.clone()),
        articles_used,
        confidence: confidence_from_tenths(tenths),
        explanation,
    }
}

fn display_source(source_name: &str) -> &str {
    if source_name.trim().is_empty() {
        "a financial outlet"
    } else {
        source_name
    }
}
