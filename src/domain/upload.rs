use super::errors::{DomainError, DomainResult};

pub const VIDEO_EXTENSIONS: [&str; 4] = [".mp4", ".avi", ".mov", ".mkv"];
pub const DASHBOARD_IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// A file received from a client, not yet persisted.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Accepted extensions for one upload path. `None` accepts any extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed: Option<Vec<String>>,
}

impl UploadPolicy {
    pub fn any() -> Self {
        Self { allowed: None }
    }

    /// Extensions are matched case-insensitively; a missing leading dot is added.
    pub fn only<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = extensions
            .into_iter()
            .map(|e| {
                let e = e.as_ref().trim().to_ascii_lowercase();
                if e.starts_with('.') { e } else { format!(".{e}") }
            })
            .filter(|e| e.len() > 1)
            .collect();
        Self { allowed: Some(allowed) }
    }

    pub fn is_strict(&self) -> bool {
        self.allowed.is_some()
    }

    pub fn allowed(&self) -> Option<&[String]> {
        self.allowed.as_deref()
    }

    pub fn check(&self, upload: &Upload) -> DomainResult<()> {
        if upload.filename.trim().is_empty() {
            return Err(DomainError::Validation("empty filename".into()));
        }
        let Some(allowed) = &self.allowed else {
            return Ok(());
        };
        let ext = extension_of(&upload.filename).unwrap_or_default();
        if allowed.iter().any(|a| *a == ext) {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "unsupported file format '{}' (expected one of: {})",
                if ext.is_empty() { "<none>" } else { ext.as_str() },
                allowed.join(", ")
            )))
        }
    }
}

/// Lowercased, dot-prefixed extension of the last path component.
pub fn extension_of(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let dot = name.rfind('.')?;
    if dot == 0 || dot + 1 == name.len() {
        return None;
    }
    Some(name[dot..].to_ascii_lowercase())
}
