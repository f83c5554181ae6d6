// src/recognizer.rs

use crate::camera::CapturedImage;
use thiserror::Error;
use tokio::sync::mpsc;

/// One update from an in-flight recognition pass.
///
/// The stream is finite: zero or more `Progress` events (completion
/// fraction, non-decreasing) followed by exactly one terminal
/// `Completed` or `Failed`. A new pass is started by calling
/// `recognize` again — there is no restart or cancellation.
#[derive(Debug, Clone)]
pub enum RecognizerUpdate {
    Progress(f64),
    Completed(String),
    Failed(String),
}

#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("recognition failed: {0}")]
    Failed(String),
    #[error("recognizer stream ended without a terminal event")]
    Interrupted,
}

/// Boundary to the external OCR engine: image in, update stream out.
/// The recognition algorithm itself lives entirely behind this trait.
pub trait TextRecognizer: Send {
    fn recognize(&self, image: CapturedImage, language: &str) -> mpsc::Receiver<RecognizerUpdate>;
}

/// Drain an update stream to its terminal event, reporting each progress
/// fraction through `on_progress`. Blocks (cooperatively) until the
/// recognizer resolves — no timeout is applied here.
pub async fn await_text(
    mut updates: mpsc::Receiver<RecognizerUpdate>,
    mut on_progress: impl FnMut(f64),
) -> Result<String, RecognizeError> {
    while let Some(update) = updates.recv().await {
        match update {
            RecognizerUpdate::Progress(fraction) => on_progress(fraction),
            RecognizerUpdate::Completed(text) => return Ok(text),
            RecognizerUpdate::Failed(reason) => return Err(RecognizeError::Failed(reason)),
        }
    }
    Err(RecognizeError::Interrupted)
}
