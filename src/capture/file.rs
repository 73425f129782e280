use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use super::{CaptureSource, ImageHandle, ImageSource};
use crate::{Error, Result};

/// Image source backed by a file on disk: a gallery pick, or the file a
/// camera shutter just wrote.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
    kind: CaptureSource,
}

impl FileImageSource {
    pub fn gallery(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: CaptureSource::Gallery,
        }
    }

    pub fn camera(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: CaptureSource::Camera,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    fn kind(&self) -> CaptureSource {
        self.kind
    }

    async fn acquire_image(&self) -> Result<ImageHandle> {
        let path = self.path.clone();
        let (width, height) = tokio::task::spawn_blocking(move || image::image_dimensions(&path))
            .await
            .map_err(|err| Error::Capture(format!("image read task failed: {err}")))?
            .map_err(|err| {
                Error::Capture(format!("cannot read image {}: {err}", self.path.display()))
            })?;

        debug!(
            "Acquired {}x{} image from {} ({})",
            width,
            height,
            self.path.display(),
            self.kind.as_str()
        );

        Ok(ImageHandle::new(self.kind, self.path.clone(), width, height))
    }
}
