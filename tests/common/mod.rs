#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use image::RgbImage;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use yolo_upload_dashboard::adapters::{
    http::{
        app,
        state::{HttpState, UploadPolicies},
        ServeOptions,
    },
    storage::scratch::ScratchDir,
};
use yolo_upload_dashboard::application::{
    ports::{Detector, VideoInfo, VideoOpener, VideoSource},
    services::{AggregationPipeline, DashboardService},
};
use yolo_upload_dashboard::domain::{
    catalog::ClassCatalog,
    detection::RawDetection,
    errors::{DomainError, DomainResult},
    model::{FramePolicy, InferenceParams},
    upload::{UploadPolicy, DASHBOARD_IMAGE_EXTENSIONS, VIDEO_EXTENSIONS},
};

/// Reports one box per frame; the red channel of pixel (0, 0) drives the
/// confidence and the class id, so results depend only on the image.
pub struct ScriptedDetector {
    catalog: ClassCatalog,
    pub calls: AtomicUsize,
    fail_on_red: Option<u8>,
    silent: bool,
    delay: Option<Duration>,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self {
            catalog: ClassCatalog::from_names(["full bin", "empty bin"]),
            calls: AtomicUsize::new(0),
            fail_on_red: None,
            silent: false,
            delay: None,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::new() }
    }

    pub fn failing_on(red: u8) -> Self {
        Self { fail_on_red: Some(red), ..Self::new() }
    }

    pub fn silent() -> Self {
        Self { silent: true, ..Self::new() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn class_catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    fn infer(&self, image: &RgbImage, _params: &InferenceParams) -> DomainResult<Vec<RawDetection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let red = image.get_pixel(0, 0)[0];
        if self.fail_on_red == Some(red) {
            return Err(DomainError::Inference(format!("detector crashed on red={red}")));
        }
        if self.silent {
            return Ok(Vec::new());
        }
        Ok(vec![RawDetection {
            x1: 1.7,
            y1: 2.2,
            x2: image.width() as f32 - 0.5,
            y2: image.height() as f32 - 0.5,
            confidence: red as f32 / 255.0,
            class_id: (red % 3) as i64,
        }])
    }
}

/// Treats an upload whose content is `frames=N` as an N-frame video; frame i
/// is a solid image with red = i mod 256. `frames=N,corrupt_at=K` fails to
/// read frame K. Anything else cannot be opened.
#[derive(Default)]
pub struct ScriptedVideoOpener {
    pub opened: AtomicUsize,
    pub released: Arc<AtomicUsize>,
}

impl ScriptedVideoOpener {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

struct ScriptedVideo {
    total: u64,
    position: u64,
    corrupt_at: Option<u64>,
    released: Arc<AtomicUsize>,
}

impl VideoSource for ScriptedVideo {
    fn info(&self) -> VideoInfo {
        VideoInfo { frame_count: Some(self.total), fps: Some(30.0) }
    }

    fn next_frame(&mut self) -> DomainResult<Option<RgbImage>> {
        if self.corrupt_at == Some(self.position) {
            return Err(DomainError::Decode(format!("corrupt packet at frame {}", self.position)));
        }
        if self.position >= self.total {
            return Ok(None);
        }
        let red = (self.position % 256) as u8;
        self.position += 1;
        Ok(Some(RgbImage::from_pixel(8, 8, image::Rgb([red, 0, 0]))))
    }
}

impl Drop for ScriptedVideo {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl VideoOpener for ScriptedVideoOpener {
    fn open(&self, path: &Path) -> DomainResult<Box<dyn VideoSource>> {
        let text = std::fs::read_to_string(path).unwrap_or_default();
        let mut parts = text.trim().split(',');
        let total = parts
            .next()
            .and_then(|p| p.strip_prefix("frames="))
            .and_then(|n| n.parse::<u64>().ok())
            .ok_or_else(|| DomainError::SourceUnavailable("not a scripted video".into()))?;
        let corrupt_at = parts
            .next()
            .and_then(|p| p.strip_prefix("corrupt_at="))
            .and_then(|n| n.parse::<u64>().ok());
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedVideo { total, position: 0, corrupt_at, released: self.released.clone() }))
    }
}

pub struct TestApp {
    pub router: Router,
    pub detector: Arc<ScriptedDetector>,
    pub videos: Arc<ScriptedVideoOpener>,
    pub scratch: TempDir,
    pub static_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(ScriptedDetector::new(), FramePolicy::default())
    }

    pub fn with(detector: ScriptedDetector, frame_policy: FramePolicy) -> Self {
        Self::build(detector, frame_policy, None)
    }

    pub fn with_timeout(detector: ScriptedDetector, timeout: Duration) -> Self {
        Self::build(detector, FramePolicy::default(), Some(timeout))
    }

    fn build(detector: ScriptedDetector, frame_policy: FramePolicy, request_timeout: Option<Duration>) -> Self {
        let detector = Arc::new(detector);
        let videos = Arc::new(ScriptedVideoOpener::default());
        let scratch = tempfile::tempdir().expect("scratch dir");
        let static_dir = tempfile::tempdir().expect("static dir");
        std::fs::write(static_dir.path().join("index.html"), "<html>dashboard</html>").unwrap();

        let pipeline = Arc::new(AggregationPipeline::new(detector.clone(), videos.clone(), frame_policy));
        let state = HttpState {
            dashboard: Arc::new(DashboardService::new(pipeline.clone())),
            pipeline,
            scratch: Arc::new(ScratchDir::create(scratch.path()).unwrap()),
            policies: Arc::new(UploadPolicies {
                image: UploadPolicy::any(),
                video: UploadPolicy::only(VIDEO_EXTENSIONS),
                dashboard_image: UploadPolicy::only(DASHBOARD_IMAGE_EXTENSIONS),
            }),
        };
        let options = ServeOptions {
            static_dir: static_dir.path().to_path_buf(),
            max_upload_bytes: 16 * 1024 * 1024,
            request_timeout,
        };

        Self { router: app(state, &options), detector, videos, scratch, static_dir }
    }

    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }

    /// Polls until `done` holds, failing the test after `limit`.
    pub async fn wait_for(&self, limit: Duration, what: &str, done: impl Fn(&Self) -> bool) {
        let deadline = tokio::time::Instant::now() + limit;
        while !done(self) {
            assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(self.router.clone(), req).await
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.get(uri).await;
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    pub async fn post_form(&self, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let (content_type, body) = multipart_body(parts);
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(self.router.clone(), req).await;
        (status, serde_json::from_slice(&body).expect("json body"))
    }
}

async fn send(router: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec();
    (status, body)
}

pub enum Part<'a> {
    File { filename: &'a str, bytes: Vec<u8> },
    Text { name: &'a str, value: &'a str },
}

const BOUNDARY: &str = "X-TEST-BOUNDARY-7MA4YWxkTrZu0gW";

pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File { filename, bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}").as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub fn png_bytes(width: u32, height: u32, red: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([red, 10, 10]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn file(filename: &str, bytes: impl Into<Vec<u8>>) -> Part<'_> {
    Part::File { filename, bytes: bytes.into() }
}

pub fn text<'a>(name: &'a str, value: &'a str) -> Part<'a> {
    Part::Text { name, value }
}
