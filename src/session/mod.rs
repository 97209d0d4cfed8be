//! Upload, analysis and thumbnail pipeline
//!
//! `SessionController` owns the single `SessionState` and is the only thing
//! that mutates it. A pipeline run is strictly sequential:
//! - the video is validated against the size limit
//! - the bytes are read and base64-encoded (Uploading)
//! - the analysis gateway is called (Analyzing)
//! - the thumbnail gateway is called with the concept prompt (GeneratingThumbnail)
//!
//! Thumbnail regeneration runs beside a finished run and never changes the
//! phase. The state lives in `Arc<Mutex<SessionState>>`; the lock is only
//! taken between awaits, so every write is serialized.

mod events;
mod state;

pub(crate) use events::{spawn_event_handler, SessionEvent};
pub(crate) use state::{Phase, SessionState, SkipReason};

use crate::error::{PipelineError, ValidationError};
use crate::gateway::{AnalysisGateway, AspectRatio, ThumbnailGateway};
use crate::video::{EncodedVideo, VideoFile, MAX_VIDEO_BYTES, OVERSIZE_MESSAGE};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

/// Buffered events per subscriber
const EVENT_CAPACITY: usize = 64;

/// Result of a regeneration request
#[derive(Debug)]
pub(crate) enum RegenerationOutcome {
    Regenerated,
    Skipped(SkipReason),
    Failed(PipelineError),
}

/// Drives one session through the pipeline
#[derive(Clone)]
pub(crate) struct SessionController {
    state: Arc<Mutex<SessionState>>,
    analysis_gateway: Arc<dyn AnalysisGateway>,
    thumbnail_gateway: Arc<dyn ThumbnailGateway>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub(crate) fn new(
        analysis_gateway: Arc<dyn AnalysisGateway>,
        thumbnail_gateway: Arc<dyn ThumbnailGateway>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            analysis_gateway,
            thumbnail_gateway,
            event_tx,
        }
    }

    /// Subscribe to session events
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Read-only copy of the current state
    pub(crate) fn snapshot(&self) -> SessionState {
        self.with_state(|state| state.clone())
    }

    /// Run `f` under the state lock.
    ///
    /// Recovers the data if the mutex was poisoned.
    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Session mutex was poisoned, recovering data");
                poisoned.into_inner()
            }
        };
        f(&mut guard)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Apply a transition if the run identified by `epoch` still owns the
    /// session, emitting the resulting phase.
    fn transition<R>(
        &self,
        epoch: u64,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Result<R, PipelineError> {
        self.with_state(|state| {
            if state.epoch() != epoch {
                return Err(PipelineError::Superseded);
            }
            let result = f(state);
            self.emit(SessionEvent::PhaseChanged { phase: state.phase });
            Ok(result)
        })
    }

    /// Move the run to `Error` with a display message and hand the error back
    fn fail(&self, epoch: u64, error: PipelineError) -> PipelineError {
        error!("Pipeline failed: {}", error);
        let message = error.to_string();
        match self.transition(epoch, |state| state.fail(message)) {
            Ok(()) => error,
            Err(superseded) => superseded,
        }
    }

    /// Validate, upload, analyze and generate the first thumbnail.
    ///
    /// Oversize files and requests made while a run is in flight are
    /// rejected without touching the phase.
    #[instrument(skip(self, video), fields(name = %video.name, size = video.size, mime_type = %video.mime_type))]
    pub(crate) async fn upload_and_analyze(&self, video: VideoFile) -> Result<(), PipelineError> {
        let epoch = self.with_state(|state| {
            if state.phase.is_busy() {
                return Err(ValidationError::Busy);
            }
            if video.is_oversize() {
                let rejection = ValidationError::FileTooLarge {
                    size: video.size,
                    max_size: MAX_VIDEO_BYTES,
                };
                warn!("{}", rejection);
                state.reject_upload(OVERSIZE_MESSAGE);
                self.emit(SessionEvent::UploadRejected {
                    message: OVERSIZE_MESSAGE.to_string(),
                });
                return Err(rejection);
            }
            let epoch = state.begin_upload();
            self.emit(SessionEvent::PhaseChanged { phase: state.phase });
            Ok(epoch)
        })?;

        info!("Reading video into memory");
        let mime_type = video.mime_type.clone();
        let bytes = match video.read_bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(epoch, PipelineError::Upload(e))),
        };
        let encoded = EncodedVideo::encode(&bytes, &mime_type);
        drop(bytes);

        self.transition(epoch, SessionState::begin_analysis)?;

        let analysis = match self.analysis_gateway.analyze(&encoded).await {
            Ok(analysis) => analysis,
            Err(e) => return Err(self.fail(epoch, PipelineError::Analysis(e))),
        };
        drop(encoded);

        let (prompt, aspect_ratio) = self.transition(epoch, |state| {
            (state.store_analysis(analysis), state.aspect_ratio)
        })?;

        let image = match self
            .thumbnail_gateway
            .generate_thumbnail(&prompt, aspect_ratio)
            .await
        {
            Ok(image) => image,
            Err(e) => return Err(self.fail(epoch, PipelineError::Thumbnail(e))),
        };

        self.transition(epoch, |state| state.complete(image))?;
        info!("Pipeline completed");
        Ok(())
    }

    /// Regenerate the thumbnail in another aspect ratio.
    ///
    /// Skipped when there is no analysis yet, while the pipeline is still
    /// running, or when a regeneration is already in flight. On failure the
    /// previous thumbnail stays and the phase is left alone.
    #[instrument(skip(self))]
    pub(crate) async fn regenerate_thumbnail(
        &self,
        aspect_ratio: AspectRatio,
    ) -> RegenerationOutcome {
        let claimed = self.with_state(|state| state.begin_regeneration(aspect_ratio));
        let (prompt, epoch) = match claimed {
            Ok(claimed) => claimed,
            Err(reason) => {
                info!(?reason, "Skipping thumbnail regeneration");
                self.emit(SessionEvent::RegenerationSkipped { reason });
                return RegenerationOutcome::Skipped(reason);
            }
        };
        self.emit(SessionEvent::RegenerationStarted { aspect_ratio });

        let result = self
            .thumbnail_gateway
            .generate_thumbnail(&prompt, aspect_ratio)
            .await;

        match result {
            Ok(image) => {
                let applied = self.with_state(|state| state.finish_regeneration(epoch, Some(image)));
                if !applied {
                    warn!("Session was reset during regeneration, discarding thumbnail");
                    return RegenerationOutcome::Failed(PipelineError::Superseded);
                }
                self.emit(SessionEvent::ThumbnailRegenerated { aspect_ratio });
                RegenerationOutcome::Regenerated
            }
            Err(e) => {
                self.with_state(|state| state.finish_regeneration(epoch, None));
                let failure = PipelineError::Regeneration(e);
                error!("{}", failure);
                self.emit(SessionEvent::RegenerationFailed {
                    message: failure.to_string(),
                });
                RegenerationOutcome::Failed(failure)
            }
        }
    }

    /// Pick the thumbnail ratio used by the next pipeline run
    pub(crate) fn select_aspect_ratio(&self, aspect_ratio: AspectRatio) -> bool {
        let applied = self.with_state(|state| state.select_aspect_ratio(aspect_ratio));
        if !applied {
            warn!(%aspect_ratio, "Aspect ratio not changed while work is in flight");
        }
        applied
    }

    /// Discard all results and return to `Idle`
    pub(crate) fn reset(&self) {
        self.with_state(SessionState::reset);
        self.emit(SessionEvent::Reset);
        self.emit(SessionEvent::PhaseChanged { phase: Phase::Idle });
        info!("Session reset");
    }
}
