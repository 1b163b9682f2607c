use chrono::NaiveDate;
use std::fmt;

const MAX_TICKER_LEN: usize = 12;

/// A validated `explain` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainQuery {
    pub ticker: String,
    pub date: NaiveDate,
}

/// Malformed input, rejected before any fetch happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryValidationError {
    pub field: &'static str,
    pub detail: String,
}

impl fmt::Display for QueryValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.detail)
    }
}

impl std::error::Error for QueryValidationError {}

impl ExplainQuery {
    pub fn parse(ticker: &str, date: &str) -> Result<Self, QueryValidationError> {
        Ok(Self {
            ticker: normalize_ticker(ticker)?,
            date: parse_date(date)?,
        })
    }

    pub fn new(ticker: &str, date: NaiveDate) -> Result<Self, QueryValidationError> {
        Ok(Self {
            ticker: normalize_ticker(ticker)?,
            date,
        })
    }
}

pub fn normalize_ticker(raw: &str) -> Result<String, QueryValidationError> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(QueryValidationError {
            field: "ticker",
            detail: "must be non-empty".to_string(),
        });
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(QueryValidationError {
            field: "ticker",
            detail: format!("must be at most {MAX_TICKER_LEN} characters (got {})", ticker.len()),
        });
    }
    if let Some(bad) = ticker
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-')))
    {
        return Err(QueryValidationError {
            field: "ticker",
            detail: format!("unsupported character {bad:?}"),
        });
    }
    Ok(ticker)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, QueryValidationError> {
    let raw = raw.trim();
    // chrono accepts signs and unpadded fields; the wire format is strictly YYYY-MM-DD.
    if !is_iso_date_shape(raw) {
        return Err(QueryValidationError {
            field: "date",
            detail: format!("expected YYYY-MM-DD, got {raw:?}"),
        });
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| QueryValidationError {
        field: "date",
        detail: format!("expected YYYY-MM-DD, got {raw:?} ({e})"),
    })
}

fn is_iso_date_shape(raw: &str) -> bool {
    let b = raw.as_bytes();
    b.len() == 10
        && b.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        })
}
