use crate::domain::price::{PriceBar, PriceMove};
use crate::ingest::price::PriceSeriesSource;
use anyhow::Result;
use chrono::{Days, NaiveDate};

pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// `[today - lookback_days, today]`.
pub fn lookback_window(today: NaiveDate, lookback_days: u32) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

/// Exact-date lookup; the first row of the series has nothing to diff against.
pub fn daily_move(series: &[PriceBar], date: NaiveDate) -> Option<PriceMove> {
    let idx = series.iter().position(|b| b.date == date)?;
    if idx == 0 {
        return None;
    }
    PriceMove::new(date, series[idx].close, series[idx - 1].close)
}

pub async fn resolve_price_move(
    source: &dyn PriceSeriesSource,
    ticker: &str,
    date: NaiveDate,
    lookback_days: u32,
    today: NaiveDate,
) -> Result<Option<PriceMove>> {
    let (start, end) = lookback_window(today, lookback_days);
    let series = source.fetch(ticker, start, end).await?;
    let mv = daily_move(&series, date);
    tracing::debug!(
        ticker,
        %date,
        %start,
        %end,
        rows = series.len(),
        found = mv.is_some(),
        "resolved price move"
    );
    Ok(mv)
}
