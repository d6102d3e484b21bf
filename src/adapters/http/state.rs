use std::sync::Arc;

use crate::adapters::storage::scratch::ScratchDir;
use crate::application::services::{AggregationPipeline, DashboardService};
use crate::domain::upload::UploadPolicy;

/// Shared state for the axum handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Detection over uploads, shared by the API and the dashboard.
    pub pipeline: Arc<AggregationPipeline>,
    pub dashboard: Arc<DashboardService>,
    /// Where uploads live while a request is being processed.
    pub scratch: Arc<ScratchDir>,
    pub policies: Arc<UploadPolicies>,
}

/// Extension allow-lists per upload route.
#[derive(Debug, Clone)]
pub struct UploadPolicies {
    pub image: UploadPolicy,
    pub video: UploadPolicy,
    pub dashboard_image: UploadPolicy,
}
