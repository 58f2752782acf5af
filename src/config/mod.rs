//! Command-line parsing, validation, and the immutable capture configuration.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use crate::audio::{FrameDuration, SampleRate};
use crate::error::{CaptureError, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

pub use defaults::{
    default_classifier, DEFAULT_CHANNEL_CAPACITY, DEFAULT_CLASSIFIER_QUEUE,
    DEFAULT_ENERGY_THRESHOLD_DB, DEFAULT_FRAME_MS, DEFAULT_LOOKBACK_FRAMES,
    DEFAULT_MAX_DURATION_FRAMES, DEFAULT_MIN_SILENCE_FRAMES, DEFAULT_MIN_SPEECH_FRAMES,
    DEFAULT_SAMPLE_RATE,
};

/// CLI options for the voicegate capture tool.
#[derive(Debug, Parser, Clone)]
#[command(
    about = "Voicegate: voice-activity-gated utterance capture",
    author,
    version
)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long, env = "VOICEGATE_INPUT_DEVICE")]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Keep capturing utterances until interrupted
    #[arg(long, default_value_t = false)]
    pub monitor: bool,

    /// Stop monitoring after this many utterances
    #[arg(long = "max-utterances")]
    pub max_utterances: Option<u32>,

    /// Capture sample rate (Hz): 8000, 16000, 32000 or 48000
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Frame duration (milliseconds): 10, 20 or 30
    #[arg(long = "frame-ms", default_value_t = DEFAULT_FRAME_MS)]
    pub frame_ms: u64,

    /// Consecutive speech frames required to confirm onset
    #[arg(long = "min-speech-frames", default_value_t = DEFAULT_MIN_SPEECH_FRAMES)]
    pub min_speech_frames: u32,

    /// Consecutive silence frames required to confirm the end of an utterance
    #[arg(long = "min-silence-frames", default_value_t = DEFAULT_MIN_SILENCE_FRAMES)]
    pub min_silence_frames: u32,

    /// Hard cap on frames per utterance
    #[arg(long = "max-duration-frames", default_value_t = DEFAULT_MAX_DURATION_FRAMES)]
    pub max_duration_frames: u32,

    /// Frames retained from before confirmed onset
    #[arg(long = "lookback-frames", default_value_t = DEFAULT_LOOKBACK_FRAMES)]
    pub lookback_frames: usize,

    /// Frame classifier implementation
    #[arg(long, value_enum, default_value_t = default_classifier())]
    pub classifier: ClassifierKind,

    /// Energy threshold (dBFS); also picks the earshot aggressiveness profile
    #[arg(long = "energy-threshold-db", default_value_t = DEFAULT_ENERGY_THRESHOLD_DB)]
    pub energy_threshold_db: f32,

    /// Run the classifier on a worker thread behind a bounded queue
    #[arg(long = "classifier-worker", default_value_t = false)]
    pub classifier_worker: bool,

    /// Classifier worker queue depth (frames)
    #[arg(long = "classifier-queue", default_value_t = DEFAULT_CLASSIFIER_QUEUE)]
    pub classifier_queue: usize,

    /// Frame channel capacity between the capture callback and the control loop
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Directory where each captured utterance is written as a WAV file
    #[arg(long = "save-dir")]
    pub save_dir: Option<PathBuf>,

    /// Print results as JSON lines
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable the JSON trace log file
    #[arg(long = "logs", env = "VOICEGATE_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable the trace log file (overrides --logs)
    #[arg(long = "no-logs", env = "VOICEGATE_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Maximum level for stderr and file logging
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl AppConfig {
    /// Build the immutable capture configuration from validated CLI values.
    pub fn capture_config(&self) -> Result<CaptureConfig> {
        let config = CaptureConfig {
            sample_rate: SampleRate::try_from(self.sample_rate)?,
            frame_duration: FrameDuration::try_from(self.frame_ms)?,
            min_speech_frames: self.min_speech_frames,
            min_silence_frames: self.min_silence_frames,
            max_duration_frames: self.max_duration_frames,
            lookback_capacity: self.lookback_frames,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Available runtime-selectable frame classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum ClassifierKind {
    Earshot,
    Energy,
}

impl ClassifierKind {
    pub fn label(self) -> &'static str {
        match self {
            ClassifierKind::Earshot => "earshot",
            ClassifierKind::Energy => "energy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Tunable parameters for one capture pipeline. Read-only once an
/// [`crate::Orchestrator`] owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureConfig {
    pub sample_rate: SampleRate,
    pub frame_duration: FrameDuration,
    pub min_speech_frames: u32,
    pub min_silence_frames: u32,
    pub max_duration_frames: u32,
    pub lookback_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::Hz16000,
            frame_duration: FrameDuration::Ms30,
            min_speech_frames: DEFAULT_MIN_SPEECH_FRAMES,
            min_silence_frames: DEFAULT_MIN_SILENCE_FRAMES,
            max_duration_frames: DEFAULT_MAX_DURATION_FRAMES,
            lookback_capacity: DEFAULT_LOOKBACK_FRAMES,
        }
    }
}

impl CaptureConfig {
    pub fn samples_per_frame(&self) -> usize {
        self.frame_duration.samples_per_frame(self.sample_rate)
    }

    pub fn frame_ms(&self) -> u64 {
        self.frame_duration.millis()
    }

    /// Check the hysteresis counts against each other.
    pub fn validate(&self) -> Result<()> {
        if self.min_speech_frames == 0 {
            return Err(CaptureError::InvalidConfig(
                "min_speech_frames must be at least 1".to_string(),
            ));
        }
        if self.min_silence_frames == 0 {
            return Err(CaptureError::InvalidConfig(
                "min_silence_frames must be at least 1".to_string(),
            ));
        }
        if self.max_duration_frames == 0 {
            return Err(CaptureError::InvalidConfig(
                "max_duration_frames must be at least 1".to_string(),
            ));
        }
        if self.min_speech_frames > self.max_duration_frames {
            return Err(CaptureError::InvalidConfig(format!(
                "min_speech_frames ({}) cannot exceed max_duration_frames ({})",
                self.min_speech_frames, self.max_duration_frames
            )));
        }
        if self.min_silence_frames > self.max_duration_frames {
            return Err(CaptureError::InvalidConfig(format!(
                "min_silence_frames ({}) cannot exceed max_duration_frames ({})",
                self.min_silence_frames, self.max_duration_frames
            )));
        }
        Ok(())
    }
}
