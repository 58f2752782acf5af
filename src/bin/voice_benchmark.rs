use std::f32::consts::PI;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use voicegate::audio::{
    build_classifier, ClassifierSettings, Frame, FrameDuration, PcmSource, SampleRate,
};
use voicegate::config::{
    CaptureConfig, ClassifierKind, DEFAULT_CLASSIFIER_QUEUE, DEFAULT_ENERGY_THRESHOLD_DB,
    DEFAULT_FRAME_MS, DEFAULT_LOOKBACK_FRAMES, DEFAULT_MAX_DURATION_FRAMES,
    DEFAULT_MIN_SILENCE_FRAMES, DEFAULT_MIN_SPEECH_FRAMES, DEFAULT_SAMPLE_RATE,
};
use voicegate::{CancelFlag, ClassifierMode, Orchestrator};

/// Synthetic benchmark harness for the gated capture loop.
#[derive(Debug, Parser)]
#[command(about = "Benchmark the voice-gated capture loop with synthetic clips")]
struct Args {
    /// Human-friendly label recorded in the output metrics
    #[arg(long, default_value = "clip")]
    label: String,

    /// Silence before the synthetic speech segment (milliseconds)
    #[arg(long, default_value_t = 300)]
    lead_ms: u64,

    /// Duration of the synthetic speech segment (milliseconds)
    #[arg(long, default_value_t = 1_000)]
    speech_ms: u64,

    /// Duration of trailing silence appended after speech (milliseconds)
    #[arg(long, default_value_t = 900)]
    silence_ms: u64,

    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    #[arg(long = "frame-ms", default_value_t = DEFAULT_FRAME_MS)]
    frame_ms: u64,

    #[arg(long = "min-speech-frames", default_value_t = DEFAULT_MIN_SPEECH_FRAMES)]
    min_speech_frames: u32,

    #[arg(long = "min-silence-frames", default_value_t = DEFAULT_MIN_SILENCE_FRAMES)]
    min_silence_frames: u32,

    #[arg(long = "max-duration-frames", default_value_t = DEFAULT_MAX_DURATION_FRAMES)]
    max_duration_frames: u32,

    #[arg(long = "lookback-frames", default_value_t = DEFAULT_LOOKBACK_FRAMES)]
    lookback_frames: usize,

    /// Frame classifier; energy by default since the synthetic clip is a pure tone
    #[arg(long, value_enum, default_value_t = ClassifierKind::Energy)]
    classifier: ClassifierKind,

    #[arg(long = "energy-threshold-db", default_value_t = DEFAULT_ENERGY_THRESHOLD_DB)]
    energy_threshold_db: f32,

    /// Score frames on the classifier worker thread
    #[arg(long = "classifier-worker", default_value_t = false)]
    classifier_worker: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_capture_config(&args)?;
    let classifier = build_classifier(&ClassifierSettings {
        kind: args.classifier,
        threshold_db: args.energy_threshold_db,
        frame_samples: config.samples_per_frame(),
    })?;
    let mode = if args.classifier_worker {
        ClassifierMode::Worker {
            queue_capacity: DEFAULT_CLASSIFIER_QUEUE,
        }
    } else {
        ClassifierMode::Inline
    };
    let mut orchestrator = Orchestrator::new(config.clone(), classifier, mode)?;

    let clip = synthesize_clip(&args, config.sample_rate.hz());
    // Extra silence so the stream never closes before the stop is confirmed.
    let tail_frames = config.min_silence_frames as usize + 1;
    let source = PcmSource::from_samples(clip)
        .frames((0..tail_frames).map(|_| Frame::silent(config.samples_per_frame())));

    let started = Instant::now();
    let result = orchestrator.capture_one_utterance(&source, &CancelFlag::new())?;
    let elapsed_us = started.elapsed().as_micros();

    println!(
        "voice_metrics|label={}|classifier={}|stop_reason={}|frames={}|capture_ms={}|lookback_frames={}|speech_frames={}|frames_processed={}|classifier_errors={}|elapsed_us={}",
        args.label,
        orchestrator.classifier_name(),
        result.stop_reason.label(),
        result.frame_count,
        result.duration_ms(),
        result.metrics.lookback_frames,
        result.metrics.speech_frames,
        result.metrics.frames_processed,
        result.metrics.classifier_errors,
        elapsed_us,
    );

    Ok(())
}

fn build_capture_config(args: &Args) -> Result<CaptureConfig> {
    let sample_rate = SampleRate::try_from(args.sample_rate)?;
    let frame_duration = FrameDuration::try_from(args.frame_ms)?;
    Ok(CaptureConfig {
        sample_rate,
        frame_duration,
        min_speech_frames: args.min_speech_frames,
        min_silence_frames: args.min_silence_frames,
        max_duration_frames: args.max_duration_frames,
        lookback_capacity: args.lookback_frames,
    })
}

fn synthesize_clip(args: &Args, sample_rate: u32) -> Vec<i16> {
    let to_samples = |ms: u64| (ms * u64::from(sample_rate) / 1000) as usize;
    let mut samples = vec![0i16; to_samples(args.lead_ms)];
    for n in 0..to_samples(args.speech_ms) {
        let t = n as f32 / sample_rate as f32;
        let sample = (2.0 * PI * 440.0 * t).sin() * 0.4;
        samples.push((sample * 32_767.0).round() as i16);
    }
    samples.extend(std::iter::repeat_n(0, to_samples(args.silence_ms)));
    samples
}
