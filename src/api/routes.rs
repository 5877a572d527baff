use crate::api::{handlers, AppState};
use crate::metrics::track_metrics;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Web form
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict_form))
        .route("/info", get(handlers::model_info_page))
        // JSON API
        .route("/v1/predict", post(handlers::predict_json))
        .route("/v1/model", get(handlers::model_info))
        // Operations
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::export_metrics))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(middleware::from_fn(track_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
