use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::domain::{
    model::FramePolicy,
    upload::{UploadPolicy, DASHBOARD_IMAGE_EXTENSIONS, VIDEO_EXTENSIONS},
};

const DEFAULT_PORT: u16 = 5000;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct ServerConfig {
    /// Listen address. Defaults to 0.0.0.0 on $PORT (5000 when unset).
    #[arg(long, env = "YOLO_ADDR")]
    pub addr: Option<String>,
    /// Path to the ONNX model, or `stub://` for the built-in test detector.
    #[arg(long, env = "YOLO_MODEL", default_value = "models/best.onnx")]
    pub model: String,
    /// Optional class names file (one per line, or a JSON list/map).
    #[arg(long, env = "YOLO_LABELS")]
    pub labels: Option<PathBuf>,
    /// Directory for uploads while they are processed.
    #[arg(long, env = "YOLO_SCRATCH_DIR", default_value = "uploads")]
    pub scratch_dir: PathBuf,
    /// Directory holding the dashboard page.
    #[arg(long, env = "YOLO_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
    #[arg(long, env = "YOLO_MAX_UPLOAD_BYTES", default_value_t = 512 * 1024 * 1024)]
    pub max_upload_bytes: usize,
    /// Per-request timeout in seconds; 0 disables it.
    #[arg(long, env = "YOLO_REQUEST_TIMEOUT_SECS", default_value_t = 0)]
    pub request_timeout_secs: u64,
    /// Record failed frames and keep going instead of failing the whole video.
    #[arg(long, env = "YOLO_CONTINUE_ON_FRAME_ERROR")]
    pub continue_on_frame_error: bool,
    /// Extensions accepted by /predict/image, comma separated. Empty accepts any.
    #[arg(long, env = "YOLO_IMAGE_EXTENSIONS", value_delimiter = ',')]
    pub image_extensions: Vec<String>,
    /// Extensions accepted by the video routes, comma separated.
    #[arg(long, env = "YOLO_VIDEO_EXTENSIONS", value_delimiter = ',', default_values_t = VIDEO_EXTENSIONS.map(String::from))]
    pub video_extensions: Vec<String>,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        if let Some(addr) = &self.addr {
            return addr.clone();
        }
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        format!("0.0.0.0:{port}")
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn frame_policy(&self) -> FramePolicy {
        FramePolicy { abort_on_frame_error: !self.continue_on_frame_error }
    }

    pub fn image_policy(&self) -> UploadPolicy {
        policy_from(&self.image_extensions)
    }

    pub fn video_policy(&self) -> UploadPolicy {
        policy_from(&self.video_extensions)
    }

    pub fn dashboard_image_policy(&self) -> UploadPolicy {
        UploadPolicy::only(DASHBOARD_IMAGE_EXTENSIONS)
    }
}

fn policy_from(extensions: &[String]) -> UploadPolicy {
    let listed: Vec<&str> = extensions.iter().map(|e| e.trim()).filter(|e| !e.is_empty()).collect();
    if listed.is_empty() {
        UploadPolicy::any()
    } else {
        UploadPolicy::only(listed)
    }
}
