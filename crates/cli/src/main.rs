use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finexplain_core::domain::query::ExplainQuery;
use finexplain_core::explain::agents::NewsViewStyle;
use finexplain_core::explain::{Explainer, PipelineOptions};

mod render;

#[derive(Debug, Parser)]
#[command(name = "finexplain")]
struct Args {
    /// Ticker symbol, e.g. AAPL.
    ticker: String,

    /// Trading date (YYYY-MM-DD). Defaults to the latest completed US session.
    #[arg(long)]
    date: Option<String>,

    /// List headlines without topic classification.
    #[arg(long)]
    plain: bool,

    /// Rewrite the narrative with the configured LLM (same as REFINE_ENABLED=1).
    #[arg(long)]
    refine: bool,

    /// Print the full result as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = finexplain_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let date = match args.date.as_deref() {
        Some(s) => finexplain_core::domain::query::parse_date(s)?,
        None => finexplain_core::time::us_market::resolve_default_date(chrono::Utc::now())?,
    };
    let query = ExplainQuery::new(&args.ticker, date)?;

    if args.refine {
        settings.refine_enabled = true;
    }
    let mut options = PipelineOptions::from_env();
    if args.plain {
        options.news_style = NewsViewStyle::Plain;
    }

    let explainer = Explainer::from_settings(&settings, options).await?;
    let today = chrono::Utc::now().date_naive();

    let result = match explainer.explain_query(&query, today).await {
        Ok(result) => result,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(
                ticker = %query.ticker,
                %date,
                error = %format!("{err:#}"),
                "explain failed"
            );
            return Err(err);
        }
    };

    if args.json {
        let out = serde_json::to_string_pretty(&result).context("failed to serialize result")?;
        println!("{out}");
    } else {
        print!("{}", render::render_text(&result));
    }

    Ok(())
}

fn init_sentry(
    settings: &finexplain_core::config::Settings,
) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
