//! Voice-activity-gated audio capture.
//!
//! Frames are pulled from an input, classified as speech or silence, and
//! folded through a hysteresis state machine into complete utterances with a
//! short pre-onset lookback.

pub mod audio;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod telemetry;
#[cfg(feature = "vad_earshot")]
pub mod vad_earshot;

pub use audio::{CaptureResult, StopReason};
pub use error::{CaptureError, ClassifierError, Result};
pub use orchestrator::{CancelFlag, ClassifierMode, Orchestrator};
