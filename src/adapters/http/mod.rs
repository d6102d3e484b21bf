pub mod dashboard;
pub mod error;
pub mod form;
pub mod routes;
pub mod state;

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::adapters::http::{
    error::{layer_error, ApiError},
    state::HttpState,
};
use crate::domain::errors::DomainResult;

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/predict/image", post(routes::predict_image))
        .route("/predict/video", post(routes::predict_video))
        .route("/dashboard/image", post(dashboard::analyze_image))
        .route("/dashboard/video", post(dashboard::analyze_video))
        .with_state(state)
}

/// Transport settings wrapped around the routes.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub request_timeout: Option<Duration>,
}

/// Routes plus the dashboard page, body limit, CORS, tracing and optional timeout.
pub fn app(state: HttpState, options: &ServeOptions) -> Router {
    let mut app = router(state)
        .fallback_service(ServeDir::new(&options.static_dir))
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(CorsLayer::permissive());

    if let Some(timeout) = options.request_timeout {
        app = app.layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(layer_error))
                .layer(TimeoutLayer::new(timeout)),
        );
    }

    app.layer(TraceLayer::new_for_http())
}

/// Runs blocking work (file I/O, decoding, inference) off the async runtime.
///
/// Anything owned by `f`, uploads and video handles included, is dropped when
/// it returns, even if the awaiting request has already gone away.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> DomainResult<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}
