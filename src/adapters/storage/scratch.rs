use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{
    errors::{DomainError, DomainResult},
    upload::{extension_of, Upload, UploadPolicy},
};

const MAX_KEPT_EXTENSION_LEN: usize = 8;

/// Dedicated directory for per-request upload files.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates the upload and writes it under a fresh random name.
    ///
    /// The returned guard deletes the file when dropped.
    pub fn ingest(&self, upload: &Upload, policy: &UploadPolicy) -> DomainResult<UploadedAsset> {
        policy.check(upload)?;

        let ext = stored_extension(&upload.filename);
        let path = self.root.join(format!("{}{}", Uuid::new_v4().simple(), ext));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| DomainError::Storage(format!("cannot create {}: {e}", path.display())))?;

        let asset = UploadedAsset {
            path,
            original_name: upload.filename.clone(),
        };

        file.write_all(&upload.bytes)
            .and_then(|_| file.flush())
            .map_err(|e| DomainError::Storage(format!("cannot write {}: {e}", asset.path.display())))?;

        debug!(path = %asset.path.display(), bytes = upload.bytes.len(), "upload stored");
        Ok(asset)
    }
}

/// Keeps the client's extension only when it is short and alphanumeric,
/// so decoders can still sniff the container type.
fn stored_extension(filename: &str) -> String {
    match extension_of(filename) {
        Some(ext)
            if ext.len() <= MAX_KEPT_EXTENSION_LEN + 1
                && ext[1..].chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => String::new(),
    }
}

/// A persisted upload owned by one request. Removed from disk on drop.
#[derive(Debug)]
pub struct UploadedAsset {
    path: PathBuf,
    original_name: String,
}

impl UploadedAsset {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }
}

impl Drop for UploadedAsset {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), upload = %self.original_name, "upload removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove upload"),
        }
    }
}
