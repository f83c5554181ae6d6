// src/camera.rs

use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Constraints passed to the image source when acquiring it.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: Facing,
    /// JPEG compression quality for the captured still.
    pub jpeg_quality: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Rear,
    Front,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            ideal_width: 1920,
            ideal_height: 1080,
            facing: Facing::Rear,
            jpeg_quality: 0.8,
        }
    }
}

/// A single encoded still frame taken from the source.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("camera access denied: {0}")]
    AccessDenied(String),
    #[error("capture requested before the image source was acquired")]
    NotAcquired,
    #[error("image source error: {0}")]
    Io(#[from] std::io::Error),
}

/// Boundary to whatever produces still frames — a live camera in the real
/// deployment, a file on disk in headless runs and tests. Exclusively owned
/// by the flow session, which releases it on every path that leaves the
/// capture/review flow.
#[async_trait]
pub trait ImageSource: Send {
    /// Acquire the underlying device/resource with the given constraints.
    async fn acquire(&mut self, request: &CaptureRequest) -> Result<(), MediaError>;

    /// Take one encoded still from the live source.
    fn capture(&mut self) -> Result<CapturedImage, MediaError>;

    /// Stop the source. Safe to call when not acquired.
    fn release(&mut self);
}

/// File-backed source: "acquiring" reads the image bytes, every capture
/// hands out the same frame. Lets the full flow run without camera hardware.
pub struct StillImageSource {
    path: PathBuf,
    frame: Option<Vec<u8>>,
}

impl StillImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: None,
        }
    }
}

#[async_trait]
impl ImageSource for StillImageSource {
    async fn acquire(&mut self, request: &CaptureRequest) -> Result<(), MediaError> {
        let bytes = fs::read(&self.path)?;
        info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            ideal = format!("{}x{}", request.ideal_width, request.ideal_height),
            facing = ?request.facing,
            quality = request.jpeg_quality,
            "Image source acquired"
        );
        self.frame = Some(bytes);
        Ok(())
    }

    fn capture(&mut self) -> Result<CapturedImage, MediaError> {
        let bytes = self.frame.clone().ok_or(MediaError::NotAcquired)?;
        Ok(CapturedImage { bytes })
    }

    fn release(&mut self) {
        self.frame = None;
    }
}
