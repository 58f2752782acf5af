//! Error taxonomy for the capture pipeline.
//!
//! Only configuration and device-lifecycle failures are errors. Per-frame
//! anomalies (classifier failures, driver overflow) are absorbed by the
//! orchestrator and never abort a session.

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Fatal failures surfaced to callers of the orchestrator.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No input device matched the request.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The device cannot deliver the requested rate, frame size, or sample format.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The device disconnected or the capture callback stopped mid-session.
    #[error("audio stream closed: {0}")]
    StreamClosed(String),

    /// The configured classifier cannot score frames at this sample rate.
    #[error("classifier '{classifier}' does not support {sample_rate} Hz")]
    UnsupportedSampleRate {
        classifier: &'static str,
        sample_rate: u32,
    },

    /// Capture configuration values are out of range or inconsistent.
    #[error("invalid capture configuration: {0}")]
    InvalidConfig(String),

    /// The classifier worker thread could not start or has exited.
    #[error("classifier worker unavailable: {0}")]
    Worker(String),
}

/// Per-frame scoring failure reported by a [`crate::audio::FrameClassifier`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("sample rate {0} Hz is not supported")]
    UnsupportedSampleRate(u32),

    #[error("expected {expected} samples per frame, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    #[error("classifier backend failed: {0}")]
    Backend(String),
}
