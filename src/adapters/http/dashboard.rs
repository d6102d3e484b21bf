use axum::{
    extract::{Multipart, State},
    Json,
};

use super::{error::ApiError, form::UploadForm, run_blocking, state::HttpState};
use crate::application::dto::{ImageAnalysis, VideoAnalysis};

pub async fn analyze_image(
    State(st): State<HttpState>,
    multipart: Multipart,
) -> Result<Json<ImageAnalysis>, ApiError> {
    let upload = UploadForm::read(multipart).await?.take_file()?;

    let analysis = run_blocking(move || {
        let asset = st.scratch.ingest(&upload, &st.policies.dashboard_image)?;
        st.dashboard.analyze_image(asset.path())
    })
    .await?;

    Ok(Json(analysis))
}

pub async fn analyze_video(
    State(st): State<HttpState>,
    multipart: Multipart,
) -> Result<Json<VideoAnalysis>, ApiError> {
    let upload = UploadForm::read(multipart).await?.take_file()?;

    let analysis = run_blocking(move || {
        let asset = st.scratch.ingest(&upload, &st.policies.video)?;
        st.dashboard.analyze_video(asset.path())
    })
    .await?;

    Ok(Json(analysis))
}
