//! Session state and its transitions

use crate::analysis::AnalysisResult;
use crate::gateway::AspectRatio;
use std::fmt;

/// Pipeline phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Phase {
    #[default]
    Idle,
    Uploading,
    Analyzing,
    GeneratingThumbnail,
    Completed,
    Error,
}

impl Phase {
    /// A pipeline run is in flight
    pub(crate) fn is_busy(self) -> bool {
        matches!(
            self,
            Phase::Uploading | Phase::Analyzing | Phase::GeneratingThumbnail
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading",
            Phase::Analyzing => "analyzing",
            Phase::GeneratingThumbnail => "generating thumbnail",
            Phase::Completed => "completed",
            Phase::Error => "error",
        };
        f.write_str(label)
    }
}

/// Why a regeneration request did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason {
    NoAnalysis,
    AlreadyRunning,
    /// The pipeline's own thumbnail is still being generated
    PipelineRunning,
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionState {
    pub(crate) phase: Phase,
    pub(crate) error_message: Option<String>,
    pub(crate) analysis: Option<AnalysisResult>,
    /// `data:image/png;base64,...`
    pub(crate) thumbnail_image: Option<String>,
    pub(crate) aspect_ratio: AspectRatio,
    pub(crate) is_regenerating_thumbnail: bool,
    /// Bumped on every reset and new run so late results can be discarded
    epoch: u64,
}

impl SessionState {
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Choose the ratio for the next run's thumbnail.
    ///
    /// Ignored while a run or a regeneration is in flight.
    pub(crate) fn select_aspect_ratio(&mut self, aspect_ratio: AspectRatio) -> bool {
        if self.phase.is_busy() || self.is_regenerating_thumbnail {
            return false;
        }
        self.aspect_ratio = aspect_ratio;
        true
    }

    /// Record an upload rejection; nothing else changes
    pub(crate) fn reject_upload(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    /// Start a new run, discarding the previous one's results.
    ///
    /// Returns the epoch that owns the run.
    pub(crate) fn begin_upload(&mut self) -> u64 {
        self.epoch += 1;
        self.error_message = None;
        self.analysis = None;
        self.thumbnail_image = None;
        self.is_regenerating_thumbnail = false;
        self.phase = Phase::Uploading;
        self.epoch
    }

    pub(crate) fn begin_analysis(&mut self) {
        self.phase = Phase::Analyzing;
    }

    /// Store the analysis and move on to the thumbnail.
    ///
    /// Returns the concept prompt for the thumbnail model.
    pub(crate) fn store_analysis(&mut self, analysis: AnalysisResult) -> String {
        let prompt = analysis.thumbnail_concept.prompt.clone();
        self.analysis = Some(analysis);
        self.phase = Phase::GeneratingThumbnail;
        prompt
    }

    pub(crate) fn complete(&mut self, thumbnail_image: String) {
        self.thumbnail_image = Some(thumbnail_image);
        self.phase = Phase::Completed;
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
        self.phase = Phase::Error;
    }

    /// Back to the initial state; in-flight work is orphaned
    pub(crate) fn reset(&mut self) {
        *self = Self {
            epoch: self.epoch + 1,
            ..Self::default()
        };
    }

    /// Claim the regeneration slot and switch the ratio.
    ///
    /// Returns the concept prompt and the owning epoch.
    pub(crate) fn begin_regeneration(
        &mut self,
        aspect_ratio: AspectRatio,
    ) -> Result<(String, u64), SkipReason> {
        if self.is_regenerating_thumbnail {
            return Err(SkipReason::AlreadyRunning);
        }
        if self.phase.is_busy() {
            return Err(SkipReason::PipelineRunning);
        }
        let prompt = self
            .analysis
            .as_ref()
            .map(|analysis| analysis.thumbnail_concept.prompt.clone())
            .ok_or(SkipReason::NoAnalysis)?;

        self.is_regenerating_thumbnail = true;
        self.aspect_ratio = aspect_ratio;
        Ok((prompt, self.epoch))
    }

    /// Release the regeneration slot, keeping the old image on failure.
    ///
    /// Returns false when the session moved on while the request ran.
    pub(crate) fn finish_regeneration(&mut self, epoch: u64, image: Option<String>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.is_regenerating_thumbnail = false;
        if let Some(image) = image {
            self.thumbnail_image = Some(image);
        }
        true
    }
}
