//! Image acquisition seam.
//!
//! The camera and the gallery picker live outside the core; both hand the
//! pipeline an opaque [`ImageHandle`] through [`ImageSource`].

mod file;

pub use file::FileImageSource;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CaptureSource {
    Camera,
    Gallery,
}

impl CaptureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureSource::Camera => "camera",
            CaptureSource::Gallery => "gallery",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageHandle {
    pub id: Uuid,
    pub source: CaptureSource,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl ImageHandle {
    pub fn new(source: CaptureSource, path: PathBuf, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            path,
            width,
            height,
            captured_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    fn kind(&self) -> CaptureSource;

    /// Produces one image, or `Error::Capture` when the device or picker fails.
    async fn acquire_image(&self) -> Result<ImageHandle>;
}

#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Returns whether the user granted access to the capture device.
    async fn request_capture_permission(&self) -> Result<bool>;
}

/// Fixed answer for hosts without a permission prompt.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission {
    granted: bool,
}

impl StaticPermission {
    pub fn granted() -> Self {
        Self { granted: true }
    }

    pub fn denied() -> Self {
        Self { granted: false }
    }
}

#[async_trait]
impl PermissionGate for StaticPermission {
    async fn request_capture_permission(&self) -> Result<bool> {
        Ok(self.granted)
    }
}
