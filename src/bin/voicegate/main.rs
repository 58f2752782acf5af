//! Voicegate CLI: capture one utterance (or keep monitoring) from the
//! microphone and report each finalized clip.

mod cli_utils;
mod output;

use anyhow::Result;
use std::ops::ControlFlow;
use tracing::{info, warn};
use voicegate::audio::{build_classifier, ClassifierSettings, MicrophoneInput};
use voicegate::config::AppConfig;
use voicegate::telemetry::init_tracing;
use voicegate::{CancelFlag, ClassifierMode, Orchestrator};

use crate::cli_utils::list_input_devices;
use crate::output::ResultSink;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_tracing(&config);

    if config.list_input_devices {
        return list_input_devices(config.json);
    }

    let capture = config.capture_config()?;
    let classifier = build_classifier(&ClassifierSettings {
        kind: config.classifier,
        threshold_db: config.energy_threshold_db,
        frame_samples: capture.samples_per_frame(),
    })?;
    let mode = if config.classifier_worker {
        ClassifierMode::Worker {
            queue_capacity: config.classifier_queue,
        }
    } else {
        ClassifierMode::Inline
    };
    let mut orchestrator = Orchestrator::new(capture, classifier, mode)?;
    info!(
        classifier = orchestrator.classifier_name(),
        sample_rate = orchestrator.config().sample_rate.hz(),
        frame_ms = orchestrator.config().frame_ms(),
        monitor = config.monitor,
        "voicegate starting"
    );

    let cancel = CancelFlag::new();
    install_interrupt_handler(&cancel);
    let input = MicrophoneInput::new(config.input_device.clone(), config.channel_capacity);
    let mut sink = ResultSink::new(config.save_dir.clone(), config.json);

    if config.monitor {
        let limit = config.max_utterances;
        let mut failure = None;
        orchestrator.monitor_continuous(&input, &cancel, |result| {
            if let Err(err) = sink.emit(&result) {
                failure = Some(err);
                return ControlFlow::Break(());
            }
            match limit {
                Some(max) if sink.emitted() >= max => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            }
        })?;
        if let Some(err) = failure {
            return Err(err);
        }
    } else {
        let result = orchestrator.capture_one_utterance(&input, &cancel)?;
        sink.emit(&result)?;
    }
    Ok(())
}

/// Ctrl-C raises the cancel flag instead of killing the process, so the
/// current session finalizes as cancelled and the device is released.
fn install_interrupt_handler(cancel: &CancelFlag) {
    #[cfg(unix)]
    {
        if let Err(err) = signal_hook::flag::register(signal_hook::consts::SIGINT, cancel.as_arc())
        {
            warn!(%err, "failed to install SIGINT handler");
        }
        if let Err(err) =
            signal_hook::flag::register(signal_hook::consts::SIGTERM, cancel.as_arc())
        {
            warn!(%err, "failed to install SIGTERM handler");
        }
    }
    #[cfg(not(unix))]
    {
        let _ = cancel;
        warn!("interrupt handling is unavailable on this platform; Ctrl-C exits immediately");
    }
}
