mod auth;
mod config;
mod db;
mod error;
mod lifecycle;
mod notify;
mod ratings;
mod routes;
mod state;
mod storage;
mod templates;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "septica=info,tower_http=info".into()),
        )
        .init();

    let config = Arc::new(config::Config::from_env()?);

    storage::ensure_root(&config.storage_root)?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(pool.as_ref()).await?;

    let notifier = notify::spawn_worker(config.clone());

    let state = Arc::new(state::AppState {
        pool,
        config: config.clone(),
        notifier,
    });

    let app = Router::new()
        .route(
            "/api/submissions",
            post(routes::create_submission).get(routes::list_my_submissions),
        )
        .route("/api/submissions/claim", post(routes::claim_submissions))
        .route("/api/submissions/:id", get(routes::get_submission))
        .route("/api/submissions/:id/resubmit", post(routes::resubmit))
        .route("/api/submissions/:id/reviews", post(routes::post_review))
        .route("/api/screening", get(routes::screening_queue))
        .route("/api/screening/counts", get(routes::queue_counts))
        .route("/api/screening/:id/decision", post(routes::screening_decision))
        .route("/api/preprints", get(routes::list_preprints))
        .route("/api/preprints/:id", get(routes::get_preprint))
        .route("/api/preprints/:id/rating", put(routes::rate_preprint))
        .route(
            "/api/profile",
            get(routes::get_profile).put(routes::update_profile),
        )
        .route("/files/:submission_id/:file_name", get(routes::download_payload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Septica listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
