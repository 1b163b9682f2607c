use finexplain_core::domain::explanation::{NewsDriver, QueryResult};
use std::fmt::Write;

const BAR_WIDTH: usize = 20;

/// Text rendering of a query result: note, price, confidence, driver, headlines.
pub fn render_text(result: &QueryResult) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_text(&mut out, result);
    out
}

fn write_text(out: &mut String, result: &QueryResult) -> std::fmt::Result {
    writeln!(out, "{} on {}", result.ticker, result.date)?;
    writeln!(out)?;
    writeln!(out, "{}", result.final_note.trim())?;
    writeln!(out)?;

    match &result.price_move {
        Some(mv) => writeln!(
            out,
            "Price move:     {:+.2}% ({:.2} -> {:.2}, {} move)",
            mv.pct_change, mv.prev_close, mv.close, result.market_view.impact
        )?,
        None => writeln!(out, "Price move:     no market data")?,
    }

    let confidence = result.structured.confidence.clamp(0.0, 1.0);
    let filled = (confidence * BAR_WIDTH as f64).round() as usize;
    writeln!(
        out,
        "Confidence:     [{}{}] {:.2}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        confidence
    )?;

    writeln!(
        out,
        "Primary driver: {}",
        result
            .structured
            .primary_driver
            .as_deref()
            .unwrap_or("no strong driver detected")
    )?;
    writeln!(out)?;

    writeln!(out, "News considered:")?;
    if !result.news_view.has_news {
        writeln!(out, "  no relevant headlines found")?;
        return Ok(());
    }
    for driver in &result.news_view.drivers {
        match driver {
            NewsDriver::Headline {
                title,
                source_name,
                published_at,
            } => writeln!(out, "  {title}\n    {source_name} - {published_at}")?,
            NewsDriver::Classified(c) => writeln!(
                out,
                "  {}\n    {} - {} [{} {:.2}]",
                c.title, c.source_name, c.published_at, c.predicted_label, c.label_confidence
            )?,
        }
    }
    Ok(())
}
