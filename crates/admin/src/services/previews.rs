//! Preview handles for images picked but not yet uploaded.
//!
//! Each new image gets a `blob:` URL while it sits in the form. Handles are
//! released when the image is removed, when the form is submitted, and when
//! the registry owner goes away.

use std::collections::BTreeMap;

use atelier_core::product::UploadKey;
use tracing::debug;

const PREVIEW_SCHEME: &str = "blob:atelier/";

/// Live preview handles, keyed by upload.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    handles: BTreeMap<UploadKey, String>,
}

impl PreviewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or return the existing) preview URL for an upload.
    pub fn create(&mut self, key: UploadKey) -> &str {
        self.handles.entry(key).or_insert_with(|| {
            let url = format!("{PREVIEW_SCHEME}{key}");
            debug!(url = %url, "Preview handle created");
            url
        })
    }

    /// Preview URL for an upload, if one is live.
    #[must_use]
    pub fn get(&self, key: UploadKey) -> Option<&str> {
        self.handles.get(&key).map(String::as_str)
    }

    /// Release one handle. Returns whether it was live.
    pub fn revoke(&mut self, key: UploadKey) -> bool {
        let released = self.handles.remove(&key);
        if let Some(url) = &released {
            debug!(url = %url, "Preview handle released");
        }
        released.is_some()
    }

    /// Release every handle. Returns how many were live.
    pub fn revoke_all(&mut self) -> usize {
        let count = self.handles.len();
        if count > 0 {
            debug!(count, "Preview handles released");
        }
        self.handles.clear();
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
