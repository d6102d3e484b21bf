use axum::{
    extract::{Multipart, State},
    Json,
};

use super::{error::ApiError, form::UploadForm, run_blocking, state::HttpState};
use crate::application::dto::{HealthResponse, ImagePredictionResponse, VideoPredictionResponse};

pub async fn health(State(st): State<HttpState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        model_loaded: true,
        classes: st.pipeline.class_catalog().names(),
    })
}

pub async fn predict_image(
    State(st): State<HttpState>,
    multipart: Multipart,
) -> Result<Json<ImagePredictionResponse>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file()?;
    let params = form.inference_params()?;
    let filename = upload.filename.clone();

    let prediction = run_blocking(move || {
        let asset = st.scratch.ingest(&upload, &st.policies.image)?;
        st.pipeline.run_image(asset.path(), &params)
    })
    .await?;

    tracing::info!(%filename, detections = prediction.detections.len(), ms = prediction.inference_time_ms, "image predicted");

    Ok(Json(ImagePredictionResponse {
        filename,
        inference_time_ms: prediction.inference_time_ms,
        detections: prediction.detections,
    }))
}

pub async fn predict_video(
    State(st): State<HttpState>,
    multipart: Multipart,
) -> Result<Json<VideoPredictionResponse>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file()?;
    st.policies.video.check(&upload)?;
    let params = form.inference_params()?;
    let sampling = form.sampling_options()?;

    let prediction = run_blocking(move || {
        let asset = st.scratch.ingest(&upload, &st.policies.video)?;
        st.pipeline.run_video(asset.path(), &params, &sampling)
    })
    .await?;

    tracing::info!(frames = prediction.frames_processed, ms = prediction.inference_time_ms, "video predicted");

    Ok(Json(VideoPredictionResponse {
        frames_processed: prediction.frames_processed,
        inference_time_ms: prediction.inference_time_ms,
        summary: prediction.summary,
    }))
}
