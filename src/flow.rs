// src/flow.rs

use crate::camera::{CaptureRequest, CapturedImage, ImageSource, MediaError};
use crate::heuristics::{self, InvoiceRecord};
use crate::recognizer::{RecognizeError, TextRecognizer, await_text};
use crate::sheets::{AppendError, LedgerAppend};
use thiserror::Error;
use tracing::{debug, info, warn};

/// The five exclusive screens of the capture flow. `Processing` is
/// transient: `process()` enters it, then settles on `Review` or falls
/// back to `Preview` before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Capture,
    Preview,
    Processing,
    Review,
    Done,
}

/// User-triggered actions, one per button in the original flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartCamera,
    CapturePhoto,
    Retake,
    Process,
    Save,
    Reset,
}

/// Side effect a transition asks the session to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    AcquireSource,
    GrabFrame,
    DiscardFrame,
    RecognizeAndExtract,
    ValidateAndAppend,
    ReleaseAndClear,
}

/// Pure transition table. `None` means the action is not available on
/// that screen and is ignored, mirroring a UI that only shows valid
/// buttons. No rendering surface needed to test this.
pub fn transition(screen: Screen, action: Action) -> Option<(Screen, Effect)> {
    match (screen, action) {
        (Screen::Capture, Action::StartCamera) => Some((Screen::Capture, Effect::AcquireSource)),
        (Screen::Capture, Action::CapturePhoto) => Some((Screen::Preview, Effect::GrabFrame)),
        (Screen::Preview, Action::Retake) => Some((Screen::Capture, Effect::DiscardFrame)),
        (Screen::Preview, Action::Process) => {
            Some((Screen::Processing, Effect::RecognizeAndExtract))
        }
        (Screen::Review, Action::Save) => Some((Screen::Done, Effect::ValidateAndAppend)),
        (_, Action::Reset) => Some((Screen::Capture, Effect::ReleaseAndClear)),
        _ => None,
    }
}

/// Everything that can go wrong inside the flow. All variants are
/// recoverable by repeating the triggering action: the session stays on
/// (or returns to) the nearest sensible screen without losing data.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Recognition(#[from] RecognizeError),
    #[error("missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },
    #[error(transparent)]
    Append(#[from] AppendError),
}

/// Drives one invoice through capture → preview → processing → review →
/// done. Owns the image source exclusively and the in-flight record;
/// collaborators run strictly one at a time, so there is no shared
/// mutable state to coordinate.
pub struct Session<S, R, L> {
    screen: Screen,
    request: CaptureRequest,
    language: String,
    source: S,
    recognizer: R,
    ledger: L,
    acquired: bool,
    image: Option<CapturedImage>,
    record: Option<InvoiceRecord>,
    progress: f64,
}

impl<S, R, L> Session<S, R, L>
where
    S: ImageSource,
    R: TextRecognizer,
    L: LedgerAppend,
{
    pub fn new(source: S, recognizer: R, ledger: L, language: impl Into<String>) -> Self {
        Self {
            screen: Screen::Capture,
            request: CaptureRequest::default(),
            language: language.into(),
            source,
            recognizer,
            ledger,
            acquired: false,
            image: None,
            record: None,
            progress: 0.0,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// The extracted record while on the review screen, for display and
    /// human correction. `None` before extraction and after a save.
    pub fn record(&self) -> Option<&InvoiceRecord> {
        self.record.as_ref()
    }

    pub fn record_mut(&mut self) -> Option<&mut InvoiceRecord> {
        self.record.as_mut()
    }

    /// Last completion fraction reported by the recognizer.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Acquire the image source. On failure the screen is unchanged and
    /// the only recovery is re-granting access and trying again.
    pub async fn start_camera(&mut self) -> Result<(), FlowError> {
        let Some((next, _)) = transition(self.screen, Action::StartCamera) else {
            return self.ignore(Action::StartCamera);
        };
        self.source.acquire(&self.request).await?;
        self.acquired = true;
        self.screen = next;
        Ok(())
    }

    /// Take one still from the live source and move to the preview.
    pub fn capture(&mut self) -> Result<(), FlowError> {
        let Some((next, _)) = transition(self.screen, Action::CapturePhoto) else {
            return self.ignore(Action::CapturePhoto);
        };
        let image = self.source.capture()?;
        debug!(bytes = image.bytes.len(), "Captured still frame");
        self.image = Some(image);
        self.screen = next;
        Ok(())
    }

    /// Discard the captured still and go back to the capture screen.
    /// The source stays live — retake does not release it.
    pub fn retake(&mut self) -> Result<(), FlowError> {
        let Some((next, _)) = transition(self.screen, Action::Retake) else {
            return self.ignore(Action::Retake);
        };
        self.image = None;
        self.screen = next;
        Ok(())
    }

    /// Run recognition on the captured still, then field extraction.
    /// On recognizer failure the flow falls back to the preview with the
    /// image intact so the user can try again.
    pub async fn process(&mut self) -> Result<(), FlowError> {
        let Some((next, _)) = transition(self.screen, Action::Process) else {
            return self.ignore(Action::Process);
        };
        let Some(image) = self.image.clone() else {
            return self.ignore(Action::Process);
        };

        self.screen = next;
        self.progress = 0.0;

        let updates = self.recognizer.recognize(image, &self.language);
        let mut last = 0.0;
        let outcome = await_text(updates, |fraction| {
            last = fraction;
            info!(percent = (fraction * 100.0).round() as u32, "Recognizing text");
        })
        .await;
        self.progress = last;

        match outcome {
            Ok(text) => {
                let record = heuristics::extract(&text);
                let (filled, total) = record.coverage();
                info!(chars = text.len(), filled, total, "Extraction complete");
                self.record = Some(record);
                self.screen = Screen::Review;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Recognition failed — back to preview");
                self.screen = Screen::Preview;
                Err(e.into())
            }
        }
    }

    /// Validate the reviewed record and append it to the ledger.
    ///
    /// Validation or append failure keeps the screen and the record
    /// untouched so the user can fix fields or simply retry. On success
    /// the record is consumed and the source released.
    pub async fn save(&mut self) -> Result<(), FlowError> {
        let Some((next, _)) = transition(self.screen, Action::Save) else {
            return self.ignore(Action::Save);
        };
        let Some(record) = self.record.as_ref() else {
            return self.ignore(Action::Save);
        };

        let missing = record.missing_mandatory();
        if !missing.is_empty() {
            warn!(missing = ?missing, "Record incomplete — staying on review");
            return Err(FlowError::Validation { missing });
        }

        self.ledger.append(record).await?;

        self.screen = next;
        self.record = None;
        self.image = None;
        self.release_source();
        Ok(())
    }

    /// Cancel or "new invoice": release the source and clear all
    /// captured and extracted state, from any screen.
    pub fn reset(&mut self) {
        let (next, _) = transition(self.screen, Action::Reset)
            .unwrap_or((Screen::Capture, Effect::ReleaseAndClear));
        self.release_source();
        self.image = None;
        self.record = None;
        self.progress = 0.0;
        self.screen = next;
    }

    fn release_source(&mut self) {
        if self.acquired {
            self.source.release();
            self.acquired = false;
        }
    }

    fn ignore(&self, action: Action) -> Result<(), FlowError> {
        debug!(screen = ?self.screen, action = ?action, "Action not available — ignored");
        Ok(())
    }
}
