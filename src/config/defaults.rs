use super::ClassifierKind;

pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
pub const DEFAULT_FRAME_MS: u64 = 30;
pub const DEFAULT_MIN_SPEECH_FRAMES: u32 = 8;
pub const DEFAULT_MIN_SILENCE_FRAMES: u32 = 23;
pub const DEFAULT_MAX_DURATION_FRAMES: u32 = 333;
pub const DEFAULT_LOOKBACK_FRAMES: usize = 10;
pub const DEFAULT_ENERGY_THRESHOLD_DB: f32 = -55.0;
pub const DEFAULT_CLASSIFIER_QUEUE: usize = 8;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

// Ten minutes of 10 ms frames.
pub(super) const MAX_DURATION_FRAMES_HARD_LIMIT: u32 = 60_000;
pub(super) const MAX_LOOKBACK_FRAMES: usize = 1_000;
pub(super) const FORBIDDEN_PATH_CHARS: &[char] = &['\0', '\n', '\r'];

pub const fn default_classifier() -> ClassifierKind {
    #[cfg(feature = "vad_earshot")]
    {
        ClassifierKind::Earshot
    }
    #[cfg(not(feature = "vad_earshot"))]
    {
        ClassifierKind::Energy
    }
}
