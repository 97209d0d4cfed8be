//! Seams between the session controller and the generative model.
//!
//! Both gateways are stateless; the Gemini client implements them for real
//! and the tests swap in scripted fakes.

use crate::analysis::AnalysisResult;
use crate::error::GatewayError;
use crate::video::EncodedVideo;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// Output shape for generated thumbnails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum AspectRatio {
    /// Shorts, Reels, TikTok
    #[default]
    Portrait9x16,
    /// Classic YouTube
    Landscape16x9,
}

impl AspectRatio {
    /// Value sent to the image model
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
        }
    }

    /// The other ratio
    pub(crate) fn toggled(self) -> Self {
        match self {
            AspectRatio::Portrait9x16 => AspectRatio::Landscape16x9,
            AspectRatio::Landscape16x9 => AspectRatio::Portrait9x16,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "9:16" | "portrait" => Ok(AspectRatio::Portrait9x16),
            "16:9" | "landscape" => Ok(AspectRatio::Landscape16x9),
            other => Err(format!(
                "unsupported aspect ratio '{}' (expected 9:16 or 16:9)",
                other
            )),
        }
    }
}

/// Turns an encoded video into an analysis record
#[async_trait]
pub(crate) trait AnalysisGateway: Send + Sync {
    async fn analyze(&self, video: &EncodedVideo) -> Result<AnalysisResult, GatewayError>;
}

/// Turns a visual prompt into a `data:image/png;base64,...` URI
#[async_trait]
pub(crate) trait ThumbnailGateway: Send + Sync {
    async fn generate_thumbnail(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, GatewayError>;
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Semaphore;

    pub(crate) const FAKE_IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

    /// Analysis gateway that validates a canned JSON payload or fails
    pub(crate) struct FakeAnalysis {
        json: Option<String>,
        failure: Option<String>,
        pub(crate) calls: AtomicUsize,
    }

    impl FakeAnalysis {
        pub(crate) fn returning_json(json: impl Into<String>) -> Self {
            Self {
                json: Some(json.into()),
                failure: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing(raw_message: impl Into<String>) -> Self {
            Self {
                json: None,
                failure: Some(raw_message.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AnalysisGateway for FakeAnalysis {
        async fn analyze(&self, _video: &EncodedVideo) -> Result<AnalysisResult, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match (&self.json, &self.failure) {
                (Some(json), _) => AnalysisResult::from_json(json),
                (None, Some(message)) => Err(GatewayError::ServerError {
                    status: 500,
                    message: message.clone(),
                }),
                (None, None) => Err(GatewayError::InvalidResponse("no script".into())),
            }
        }
    }

    /// Thumbnail gateway with scripted results and an optional gate that
    /// holds each call until a permit is released.
    pub(crate) struct FakeThumbnails {
        results: Mutex<Vec<Option<String>>>,
        gate: Option<Arc<Semaphore>>,
        pub(crate) calls: AtomicUsize,
        pub(crate) requests: Mutex<Vec<(String, AspectRatio)>>,
    }

    impl FakeThumbnails {
        /// Each call pops the next result; `None` means "no image data"
        pub(crate) fn scripted(results: Vec<Option<&str>>) -> Self {
            Self {
                results: Mutex::new(results.into_iter().rev().map(|r| r.map(String::from)).collect()),
                gate: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn always(image: &str) -> Self {
            Self::scripted(vec![Some(image); 8])
        }

        pub(crate) fn gated(mut self, gate: Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl ThumbnailGateway for FakeThumbnails {
        async fn generate_thumbnail(
            &self,
            prompt: &str,
            aspect_ratio: AspectRatio,
        ) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .unwrap()
                .push((prompt.to_string(), aspect_ratio));

            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }

            let next = self.results.lock().unwrap().pop().flatten();
            next.ok_or(GatewayError::NoImageData)
        }
    }
}
