use super::{handlers, state::AppState};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(app_state.config.max_upload_bytes);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route(
            "/extract/image",
            post(handlers::extract_image_handler).layer(body_limit.clone()),
        )
        .route(
            "/extract/pdf",
            post(handlers::extract_pdf_handler).layer(body_limit.clone()),
        )
        .route(
            "/extract/file",
            post(handlers::extract_file_handler).layer(body_limit),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
