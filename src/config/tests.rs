use super::validation::prepare_save_dir;
use super::{default_classifier, AppConfig, CaptureConfig, ClassifierKind, LogLevel};
use crate::audio::{FrameDuration, SampleRate};
use crate::error::CaptureError;
use clap::Parser;
use std::env;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

fn energy_config(args: &[&str]) -> AppConfig {
    let mut argv = vec!["test-app", "--classifier", "energy"];
    argv.extend_from_slice(args);
    AppConfig::parse_from(argv)
}

fn unique_temp_path(label: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    env::temp_dir().join(format!("voicegate-{label}-{}-{nanos}", std::process::id()))
}

#[test]
fn accepts_valid_defaults() {
    let mut cfg = energy_config(&[]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn defaults_match_reference_configuration() {
    let cfg = energy_config(&[]);
    let capture = cfg.capture_config().expect("defaults are valid");
    assert_eq!(capture, CaptureConfig::default());
    assert_eq!(capture.samples_per_frame(), 480);
    assert_eq!(capture.frame_ms(), 30);
    assert_eq!(capture.min_speech_frames, 8);
    assert_eq!(capture.min_silence_frames, 23);
    assert_eq!(capture.max_duration_frames, 333);
    assert_eq!(capture.lookback_capacity, 10);
}

#[test]
fn rejects_unsupported_sample_rate() {
    let mut cfg = energy_config(&["--sample-rate", "44100"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_every_supported_sample_rate() {
    for rate in ["8000", "16000", "32000", "48000"] {
        let mut cfg = energy_config(&["--sample-rate", rate]);
        assert!(cfg.validate().is_ok(), "rate {rate} should be accepted");
    }
}

#[test]
fn rejects_unsupported_frame_duration() {
    let mut cfg = energy_config(&["--frame-ms", "25"]);
    assert!(cfg.validate().is_err());
    let mut cfg = energy_config(&["--frame-ms", "10"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_zero_hysteresis_counts() {
    let mut cfg = energy_config(&["--min-speech-frames", "0"]);
    assert!(cfg.validate().is_err());
    let mut cfg = energy_config(&["--min-silence-frames", "0"]);
    assert!(cfg.validate().is_err());
    let mut cfg = energy_config(&["--max-duration-frames", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_hysteresis_longer_than_max_duration() {
    let mut cfg = energy_config(&["--max-duration-frames", "10", "--min-silence-frames", "11"]);
    assert!(cfg.validate().is_err());
    let mut cfg = energy_config(&[
        "--max-duration-frames",
        "10",
        "--min-silence-frames",
        "10",
        "--min-speech-frames",
        "10",
    ]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_max_duration_above_hard_limit() {
    let mut cfg = energy_config(&["--max-duration-frames", "60001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_lookback_above_limit() {
    let mut cfg = energy_config(&["--lookback-frames", "1001"]);
    assert!(cfg.validate().is_err());
    let mut cfg = energy_config(&["--lookback-frames", "0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_energy_threshold_out_of_bounds() {
    let mut cfg = energy_config(&["--energy-threshold-db", "5"]);
    assert!(cfg.validate().is_err());
    let mut cfg = energy_config(&["--energy-threshold-db=-121"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_queue_sizes_out_of_bounds() {
    let mut cfg = energy_config(&["--classifier-queue", "0"]);
    assert!(cfg.validate().is_err());
    let mut cfg = energy_config(&["--channel-capacity", "4"]);
    assert!(cfg.validate().is_err());
    let mut cfg = energy_config(&["--channel-capacity", "1025"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_zero_max_utterances() {
    let mut cfg = energy_config(&["--max-utterances", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn blank_input_device_falls_back_to_default() {
    let mut cfg = energy_config(&["--input-device", "   "]);
    cfg.validate().expect("blank device is allowed");
    assert!(cfg.input_device.is_none());
}

#[test]
fn input_device_is_trimmed() {
    let mut cfg = energy_config(&["--input-device", "  USB Mic "]);
    cfg.validate().expect("device name is valid");
    assert_eq!(cfg.input_device.as_deref(), Some("USB Mic"));
}

#[test]
fn classifier_labels_are_stable() {
    assert_eq!(ClassifierKind::Earshot.label(), "earshot");
    assert_eq!(ClassifierKind::Energy.label(), "energy");
}

#[cfg(feature = "vad_earshot")]
#[test]
fn default_classifier_prefers_earshot_when_feature_enabled() {
    assert_eq!(default_classifier(), ClassifierKind::Earshot);
}

#[cfg(not(feature = "vad_earshot"))]
#[test]
fn default_classifier_prefers_energy_when_feature_disabled() {
    assert_eq!(default_classifier(), ClassifierKind::Energy);
}

#[cfg(not(feature = "vad_earshot"))]
#[test]
fn rejects_earshot_without_feature() {
    let mut cfg = AppConfig::parse_from(["test-app", "--classifier", "earshot"]);
    assert!(cfg.validate().is_err());
}

#[cfg(feature = "vad_earshot")]
#[test]
fn earshot_requires_16khz() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--classifier",
        "earshot",
        "--sample-rate",
        "48000",
    ]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("requires --sample-rate 16000"));
}

#[test]
fn capture_config_maps_fields() {
    let cfg = energy_config(&[
        "--sample-rate",
        "8000",
        "--frame-ms",
        "20",
        "--min-speech-frames",
        "3",
        "--min-silence-frames",
        "5",
        "--max-duration-frames",
        "100",
        "--lookback-frames",
        "4",
    ]);
    let capture = cfg.capture_config().expect("valid capture config");
    assert_eq!(capture.sample_rate, SampleRate::Hz8000);
    assert_eq!(capture.frame_duration, FrameDuration::Ms20);
    assert_eq!(capture.samples_per_frame(), 160);
    assert_eq!(capture.min_speech_frames, 3);
    assert_eq!(capture.min_silence_frames, 5);
    assert_eq!(capture.max_duration_frames, 100);
    assert_eq!(capture.lookback_capacity, 4);
}

#[test]
fn capture_config_validate_rejects_inconsistent_counts() {
    let cfg = CaptureConfig {
        min_speech_frames: 20,
        max_duration_frames: 10,
        ..CaptureConfig::default()
    };
    assert!(matches!(cfg.validate(), Err(CaptureError::InvalidConfig(_))));

    let cfg = CaptureConfig {
        min_silence_frames: 0,
        ..CaptureConfig::default()
    };
    assert!(matches!(cfg.validate(), Err(CaptureError::InvalidConfig(_))));
}

#[test]
fn log_level_maps_to_tracing_level() {
    assert_eq!(tracing::Level::from(LogLevel::Debug), tracing::Level::DEBUG);
    assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
}

#[test]
fn save_dir_is_created_and_canonicalized() {
    let dir = unique_temp_path("save-dir");
    let prepared = prepare_save_dir(&dir).expect("directory should be created");
    assert!(prepared.is_dir());
    assert!(prepared.is_absolute());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn save_dir_rejects_existing_file() {
    let file = unique_temp_path("save-file");
    fs::write(&file, b"not a directory").expect("write temp file");
    let err = prepare_save_dir(&file).unwrap_err();
    assert!(err.to_string().contains("is not a directory"));
    let _ = fs::remove_file(&file);
}
