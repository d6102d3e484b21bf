use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use yolo_upload_dashboard::adapters::{
    self,
    http::{
        app,
        state::{HttpState, UploadPolicies},
        ServeOptions,
    },
    storage::scratch::ScratchDir,
    video,
};
use yolo_upload_dashboard::application::services::{AggregationPipeline, DashboardService};
use yolo_upload_dashboard::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logs (RUST_LOG=info unless set)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = ServerConfig::parse();

    // 2. Model: loaded once, the server never starts without it.
    let detector = adapters::load_detector(&cfg.model, cfg.labels.as_deref())
        .with_context(|| format!("loading model {}", cfg.model))?;
    tracing::info!(
        model = %cfg.model,
        backend = detector.name(),
        classes = detector.class_catalog().len(),
        "model loaded"
    );

    // 3. Infrastructure adapters
    let videos = video::default_opener()?;
    let scratch = ScratchDir::create(&cfg.scratch_dir)
        .with_context(|| format!("creating scratch dir {}", cfg.scratch_dir.display()))?;
    tracing::info!(path = %scratch.root().display(), "scratch directory ready");

    let policies = UploadPolicies {
        image: cfg.image_policy(),
        video: cfg.video_policy(),
        dashboard_image: cfg.dashboard_image_policy(),
    };
    if policies.image.is_strict() != policies.video.is_strict() {
        tracing::warn!(
            image = ?policies.image.allowed(),
            video = ?policies.video.allowed(),
            "image and video uploads use different extension policies"
        );
    }

    // 4. Use cases
    let pipeline = Arc::new(AggregationPipeline::new(detector, videos, cfg.frame_policy()));
    let dashboard = Arc::new(DashboardService::new(pipeline.clone()));

    let state = HttpState {
        pipeline,
        dashboard,
        scratch: Arc::new(scratch),
        policies: Arc::new(policies),
    };

    // 5. Router, static dashboard page and transport layers
    let options = ServeOptions {
        static_dir: cfg.static_dir.clone(),
        max_upload_bytes: cfg.max_upload_bytes,
        request_timeout: cfg.request_timeout(),
    };
    let app = app(state, &options);

    // 6. Serve
    let addr = cfg.listen_addr();
    tracing::info!("🚀 detection server listening on http://{}", addr);
    tracing::info!("📂 dashboard served from '{}'", options.static_dir.display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
