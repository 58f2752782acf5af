use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use voicegate::audio::{CaptureMetrics, CaptureResult};

#[derive(Debug, Serialize)]
struct UtteranceSummary<'a> {
    index: u32,
    stop_reason: &'static str,
    frames: usize,
    samples: usize,
    duration_ms: u64,
    sample_rate: u32,
    wav_path: Option<&'a Path>,
    metrics: &'a CaptureMetrics,
}

/// Prints each finalized result and optionally saves it as WAV.
pub(crate) struct ResultSink {
    save_dir: Option<PathBuf>,
    json: bool,
    emitted: u32,
    run_id: u64,
}

impl ResultSink {
    pub(crate) fn new(save_dir: Option<PathBuf>, json: bool) -> Self {
        let run_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            save_dir,
            json,
            emitted: 0,
            run_id,
        }
    }

    pub(crate) fn emitted(&self) -> u32 {
        self.emitted
    }

    pub(crate) fn emit(&mut self, result: &CaptureResult) -> Result<()> {
        self.emitted += 1;
        let index = self.emitted;

        let wav_path = match &self.save_dir {
            Some(dir) if !result.is_empty() => {
                let path = dir.join(format!("utterance-{}-{index:03}.wav", self.run_id));
                write_wav(&path, &result.audio, result.sample_rate.hz())?;
                info!(path = %path.display(), "saved utterance");
                Some(path)
            }
            _ => None,
        };

        if self.json {
            let summary = UtteranceSummary {
                index,
                stop_reason: result.stop_reason.label(),
                frames: result.frame_count,
                samples: result.audio.len(),
                duration_ms: result.duration_ms(),
                sample_rate: result.sample_rate.hz(),
                wav_path: wav_path.as_deref(),
                metrics: &result.metrics,
            };
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            println!("{}", format_summary(index, result, wav_path.as_deref()));
        }
        Ok(())
    }
}

pub(crate) fn format_summary(index: u32, result: &CaptureResult, wav_path: Option<&Path>) -> String {
    let mut line = format!(
        "utterance {index}: {} | {} frames | {} ms | lookback {} | dropped {} | classifier errors {}",
        result.stop_reason.label(),
        result.frame_count,
        result.duration_ms(),
        result.metrics.lookback_frames,
        result.metrics.frames_dropped + result.metrics.classifier_drops,
        result.metrics.classifier_errors,
    );
    if let Some(path) = wav_path {
        line.push_str(&format!(" | {}", path.display()));
    }
    line
}

/// 16-bit mono PCM at the capture rate.
pub(crate) fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create '{}'", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("failed to finalize '{}'", path.display()))?;
    Ok(())
}
