use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading-day observation from a price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

/// Close-to-close change for a single trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMove {
    pub date: NaiveDate,
    pub close: f64,
    pub prev_close: f64,
    /// Rounded to 2 decimal places at construction.
    pub pct_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl PriceMove {
    /// Returns `None` when `prev_close` cannot be diffed against.
    pub fn new(date: NaiveDate, close: f64, prev_close: f64) -> Option<Self> {
        if !close.is_finite() || !prev_close.is_finite() || prev_close == 0.0 {
            return None;
        }
        let raw = (close - prev_close) / prev_close * 100.0;
        Some(Self {
            date,
            close,
            prev_close,
            pct_change: round2(raw),
        })
    }

    /// Sign of `close - prev_close`, not of the rounded percentage.
    pub fn direction(&self) -> Direction {
        if self.close > self.prev_close {
            Direction::Up
        } else if self.close < self.prev_close {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.pct_change.abs()
    }

    pub fn summary(&self) -> PriceMoveSummary {
        PriceMoveSummary {
            pct_change: self.pct_change,
            direction: self.direction(),
        }
    }
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Flat => "flat",
        }
    }

    /// Past-tense verb used in narratives ("AAPL rose 3.50%").
    pub fn verb(self) -> &'static str {
        match self {
            Direction::Up => "rose",
            Direction::Down => "fell",
            Direction::Flat => "was unchanged at",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compact view of a move embedded in the structured explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMoveSummary {
    pub pct_change: f64,
    pub direction: Direction,
}

/// Keeps the sign bit, so a tiny fall rounds to `-0.0`. Narratives format the magnitude.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
