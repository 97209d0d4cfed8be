//! Session event handling
//!
//! The controller broadcasts every state change; the presentation layer
//! subscribes to drive progress output, and regeneration failures are
//! reported here rather than through the session phase.

use super::state::{Phase, SkipReason};
use crate::gateway::AspectRatio;
use crate::render;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Event for subscribers
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SessionEvent {
    /// The pipeline moved to a new phase
    PhaseChanged { phase: Phase },
    /// An upload was refused before the pipeline started
    UploadRejected { message: String },
    /// A thumbnail regeneration request was sent
    RegenerationStarted { aspect_ratio: AspectRatio },
    /// A regenerated thumbnail replaced the previous one
    ThumbnailRegenerated { aspect_ratio: AspectRatio },
    /// A regeneration request was ignored
    RegenerationSkipped { reason: SkipReason },
    /// A regeneration request failed; the previous thumbnail is kept
    RegenerationFailed { message: String },
    /// The session was reset to its initial state
    Reset,
}

/// Event handler loop that reports session events to the terminal
#[tracing::instrument(skip(event_rx))]
async fn run_event_handler(mut event_rx: broadcast::Receiver<SessionEvent>, verbose: bool) {
    loop {
        match event_rx.recv().await {
            Ok(event) => handle_session_event(&event, verbose),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Session event handler lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Spawn the event handler task for processing session events
pub(crate) fn spawn_event_handler(event_rx: broadcast::Receiver<SessionEvent>, verbose: bool) {
    tokio::spawn(run_event_handler(event_rx, verbose));
}

/// Handle a single session event
fn handle_session_event(event: &SessionEvent, verbose: bool) {
    match event {
        SessionEvent::PhaseChanged { phase } => {
            info!(%phase, "Session phase changed");
            if let Some(status) = render::phase_status(*phase) {
                eprintln!("{}", status);
            }
        }
        SessionEvent::UploadRejected { message } => {
            warn!("Upload rejected: {}", message);
        }
        SessionEvent::RegenerationStarted { aspect_ratio } => {
            info!(%aspect_ratio, "Regenerating thumbnail");
            eprintln!("Regenerating thumbnail ({})...", aspect_ratio);
        }
        SessionEvent::ThumbnailRegenerated { aspect_ratio } => {
            info!(%aspect_ratio, "Thumbnail regenerated");
        }
        SessionEvent::RegenerationSkipped { reason } => {
            if verbose {
                info!(?reason, "Thumbnail regeneration skipped");
            }
        }
        SessionEvent::RegenerationFailed { message } => {
            eprintln!("{} (keeping the previous thumbnail)", message);
        }
        SessionEvent::Reset => {
            if verbose {
                info!("Session reset");
            }
        }
    }
}
