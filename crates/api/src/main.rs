use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use finexplain_core::domain::explanation::QueryResult;
use finexplain_core::domain::query::QueryValidationError;
use finexplain_core::explain::{Explainer, PipelineOptions};
use finexplain_core::llm::error::LlmDiagnosticsError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = finexplain_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let explainer = Explainer::from_settings(&settings, PipelineOptions::from_env()).await?;
    tracing::info!(
        classifier = explainer.classifier_name(),
        refine = explainer.refinement_enabled(),
        lookback_days = explainer.options().lookback_days,
        "explainer ready"
    );

    let state = AppState {
        explainer: Arc::new(explainer),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/explain/:ticker/:date", get(explain))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    explainer: Arc<Explainer>,
}

#[derive(Debug, Serialize)]
struct ApiExplanation {
    query_id: Uuid,
    classifier: &'static str,
    refined: bool,
    result: QueryResult,
}

async fn explain(
    State(state): State<AppState>,
    Path((ticker, date)): Path<(String, String)>,
) -> Result<Json<ApiExplanation>, StatusCode> {
    let query_id = Uuid::new_v4();

    let result = state
        .explainer
        .explain(&ticker, &date)
        .await
        .map_err(|e| {
            let status = status_for(&e);
            if status == StatusCode::BAD_REQUEST {
                tracing::debug!(%query_id, error = %e, "rejected explain request");
            } else {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(
                    %query_id,
                    %ticker,
                    %date,
                    error = %format!("{e:#}"),
                    "explain failed"
                );
            }
            status
        })?;

    Ok(Json(ApiExplanation {
        query_id,
        classifier: state.explainer.classifier_name(),
        refined: result.prompt_sent.is_some(),
        result,
    }))
}

fn status_for(err: &anyhow::Error) -> StatusCode {
    if err.downcast_ref::<QueryValidationError>().is_some() {
        StatusCode::BAD_REQUEST
    } else if err.downcast_ref::<LlmDiagnosticsError>().is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
