//! Audio capture and voice activity detection (VAD) pipeline.
//!
//! Frames are pulled from an [`AudioInput`], scored by a [`FrameClassifier`],
//! and folded by the [`HysteresisStateMachine`] into utterances. Microphone
//! audio is captured via CPAL and normalized to mono i16 at the configured
//! rate before any of that happens.

mod capture;
mod dispatch;
mod frame;
mod lookback;
mod recorder;
mod resample;
mod source;
mod vad;
mod worker;

pub use capture::{
    CaptureMetrics, CaptureResult, CaptureSession, CaptureState, HysteresisStateMachine,
    StopReason,
};
pub use frame::{Frame, FrameDuration, SampleRate};
pub use lookback::LookbackRingBuffer;
pub use recorder::{MicrophoneInput, MicrophoneStream};
pub use source::{select_device, AudioInput, DeviceInfo, FrameRead, FrameStream, PcmSource, PcmStream};
pub use vad::{
    build_classifier, ensure_supported, ClassificationResult, ClassifierSettings,
    EnergyClassifier, FrameClassifier,
};
pub use worker::{ClassifierWorker, WorkerVerdict};
