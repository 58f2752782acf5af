use super::defaults::{
    FORBIDDEN_PATH_CHARS, MAX_DURATION_FRAMES_HARD_LIMIT, MAX_LOOKBACK_FRAMES,
};
use super::{AppConfig, ClassifierKind};
use crate::audio::{FrameDuration, SampleRate};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::{fs, path::Path};

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize paths.
    pub fn validate(&mut self) -> Result<()> {
        SampleRate::try_from(self.sample_rate)
            .map_err(|_| anyhow!("--sample-rate must be 8000, 16000, 32000 or 48000 Hz, got {}", self.sample_rate))?;
        FrameDuration::try_from(self.frame_ms)
            .map_err(|_| anyhow!("--frame-ms must be 10, 20 or 30, got {}", self.frame_ms))?;

        if self.max_duration_frames == 0 || self.max_duration_frames > MAX_DURATION_FRAMES_HARD_LIMIT
        {
            bail!(
                "--max-duration-frames must be between 1 and {MAX_DURATION_FRAMES_HARD_LIMIT}, got {}",
                self.max_duration_frames
            );
        }
        if self.min_speech_frames == 0 || self.min_speech_frames > self.max_duration_frames {
            bail!(
                "--min-speech-frames must be between 1 and --max-duration-frames ({})",
                self.max_duration_frames
            );
        }
        if self.min_silence_frames == 0 || self.min_silence_frames > self.max_duration_frames {
            bail!(
                "--min-silence-frames must be between 1 and --max-duration-frames ({})",
                self.max_duration_frames
            );
        }
        if self.lookback_frames > MAX_LOOKBACK_FRAMES {
            bail!(
                "--lookback-frames must be at most {MAX_LOOKBACK_FRAMES}, got {}",
                self.lookback_frames
            );
        }
        if !(-120.0..=0.0).contains(&self.energy_threshold_db) {
            bail!(
                "--energy-threshold-db must be between -120.0 and 0.0 dB, got {}",
                self.energy_threshold_db
            );
        }
        if !(1..=256).contains(&self.classifier_queue) {
            bail!(
                "--classifier-queue must be between 1 and 256, got {}",
                self.classifier_queue
            );
        }
        if !(8..=1024).contains(&self.channel_capacity) {
            bail!(
                "--channel-capacity must be between 8 and 1024, got {}",
                self.channel_capacity
            );
        }
        if self.max_utterances == Some(0) {
            bail!("--max-utterances must be at least 1");
        }

        #[cfg(not(feature = "vad_earshot"))]
        if matches!(self.classifier, ClassifierKind::Earshot) {
            bail!("--classifier earshot requires building with the 'vad_earshot' feature");
        }
        // Earshot only scores 16 kHz audio; fail here instead of at the first frame.
        if matches!(self.classifier, ClassifierKind::Earshot) && self.sample_rate != 16_000 {
            bail!(
                "--classifier earshot requires --sample-rate 16000, got {}",
                self.sample_rate
            );
        }

        if let Some(device) = &self.input_device {
            let trimmed = device.trim();
            if trimmed.is_empty() {
                self.input_device = None;
            } else if trimmed.len() > 256 || trimmed.chars().any(|ch| ch.is_control()) {
                bail!("--input-device must be <=256 characters with no control characters");
            } else {
                self.input_device = Some(trimmed.to_string());
            }
        }

        if let Some(dir) = &self.save_dir {
            self.save_dir = Some(prepare_save_dir(dir)?);
        }

        Ok(())
    }
}

/// Create the WAV output directory if needed and store it canonically.
pub(super) fn prepare_save_dir(dir: &Path) -> Result<std::path::PathBuf> {
    let raw = dir.to_string_lossy();
    if raw.trim().is_empty() || raw.chars().any(|ch| FORBIDDEN_PATH_CHARS.contains(&ch)) {
        bail!("--save-dir must be a non-empty path without control characters");
    }
    if dir.exists() && !dir.is_dir() {
        bail!("--save-dir '{}' exists but is not a directory", dir.display());
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create --save-dir '{}'", dir.display()))?;
    dir.canonicalize()
        .with_context(|| format!("failed to canonicalize --save-dir '{}'", dir.display()))
}
