//! System microphone input via CPAL.
//!
//! Handles device enumeration, format conversion, and sample rate
//! normalization. Every frame leaving this module is mono i16 at the
//! configured capture rate.

use super::dispatch::{i16_to_f32, u16_to_f32, FrameDispatcher};
use super::resample::{device_rate_supported, FrameConverter};
use super::source::{select_device, AudioInput, DeviceInfo, FrameRead, FrameStream};
use super::Frame;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Opens the host microphone, optionally preferring a named device.
#[derive(Debug, Clone)]
pub struct MicrophoneInput {
    preferred: Option<String>,
    channel_capacity: usize,
}

impl MicrophoneInput {
    pub fn new(preferred: Option<String>, channel_capacity: usize) -> Self {
        Self {
            preferred,
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// List input devices so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<DeviceInfo>> {
        Ok(discover()?.into_iter().map(|(_, info)| info).collect())
    }
}

fn discover() -> Result<Vec<(cpal::Device, DeviceInfo)>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    let devices = host.input_devices().map_err(|err| {
        CaptureError::DeviceUnavailable(format!("cannot enumerate input devices: {err}"))
    })?;

    let mut found = Vec::new();
    for device in devices {
        let Ok(name) = device.name() else {
            continue;
        };
        let Ok(config) = device.default_input_config() else {
            debug!(device = %name, "skipping input device without a default config");
            continue;
        };
        let info = DeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            channels: config.channels(),
            native_sample_rate: config.sample_rate().0,
        };
        found.push((device, info));
    }
    Ok(found)
}

impl AudioInput for MicrophoneInput {
    type Stream = MicrophoneStream;

    fn open(&self, cfg: &CaptureConfig) -> Result<MicrophoneStream> {
        let mut devices = discover()?;
        let chosen = select_device(
            &devices.iter().map(|(_, info)| info.clone()).collect::<Vec<_>>(),
            self.preferred.as_deref(),
        )
        .map(|info| info.name.clone());
        let Some(chosen) = chosen else {
            return Err(CaptureError::DeviceUnavailable(match &self.preferred {
                Some(name) => format!("input device '{name}' not found"),
                None => format!("no input device available. {}", mic_permission_hint()),
            }));
        };
        let index = devices
            .iter()
            .position(|(_, info)| info.name == chosen)
            .ok_or_else(|| CaptureError::DeviceUnavailable(chosen.clone()))?;
        let (device, info) = devices.swap_remove(index);
        open_stream(device, info, cfg, self.channel_capacity)
    }

    fn describe(&self) -> String {
        match &self.preferred {
            Some(name) => format!("microphone '{name}'"),
            None => "default microphone".to_string(),
        }
    }
}

fn open_stream(
    device: cpal::Device,
    info: DeviceInfo,
    cfg: &CaptureConfig,
    channel_capacity: usize,
) -> Result<MicrophoneStream> {
    let default_config = device.default_input_config().map_err(|err| {
        CaptureError::DeviceUnavailable(format!("{}: {err}", info.name))
    })?;
    let format = default_config.sample_format();
    let device_config: StreamConfig = default_config.into();
    let device_rate = device_config.sample_rate.0;
    if !device_rate_supported(device_rate) {
        return Err(CaptureError::UnsupportedFormat(format!(
            "device sample rate {device_rate}Hz is outside the convertible range"
        )));
    }
    let channels = usize::from(device_config.channels.max(1));
    let frame_ms = cfg.frame_ms();
    let target_frame_samples = cfg.samples_per_frame();

    info!(
        device = %info.name,
        ?format,
        device_rate,
        channels,
        target_rate = cfg.sample_rate.hz(),
        frame_ms,
        "opening input stream"
    );

    let (sender, receiver) = bounded::<Vec<f32>>(channel_capacity);
    let dropped = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicBool::new(false));
    let dispatcher =
        FrameDispatcher::for_device(device_rate, channels, cfg, sender, dropped.clone());
    let device_frame_samples = dispatcher.frame_samples();
    let dispatcher = Arc::new(Mutex::new(dispatcher));

    let err_failed = failed.clone();
    let err_fn = move |err: cpal::StreamError| {
        warn!(%err, "audio stream error");
        err_failed.store(true, Ordering::Relaxed);
    };

    // Convert every supported sample type to f32 on the callback thread so the
    // rest of the pipeline stays format-agnostic.
    let stream = match format {
        SampleFormat::F32 => {
            let dispatcher = dispatcher.clone();
            let dropped = dropped.clone();
            device.build_input_stream(
                &device_config,
                move |data: &[f32], _| {
                    if let Ok(mut pump) = dispatcher.try_lock() {
                        pump.push(data, |sample| sample);
                    } else {
                        FrameDispatcher::record_lost_callback(&dropped);
                    }
                },
                err_fn,
                None,
            )
        }
        SampleFormat::I16 => {
            let dispatcher = dispatcher.clone();
            let dropped = dropped.clone();
            device.build_input_stream(
                &device_config,
                move |data: &[i16], _| {
                    if let Ok(mut pump) = dispatcher.try_lock() {
                        pump.push(data, i16_to_f32);
                    } else {
                        FrameDispatcher::record_lost_callback(&dropped);
                    }
                },
                err_fn,
                None,
            )
        }
        SampleFormat::U16 => {
            let dispatcher = dispatcher.clone();
            let dropped = dropped.clone();
            device.build_input_stream(
                &device_config,
                move |data: &[u16], _| {
                    if let Ok(mut pump) = dispatcher.try_lock() {
                        pump.push(data, u16_to_f32);
                    } else {
                        FrameDispatcher::record_lost_callback(&dropped);
                    }
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(CaptureError::UnsupportedFormat(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    }
    .map_err(|err| CaptureError::DeviceUnavailable(format!("{}: {err}", info.name)))?;

    stream.play().map_err(|err| {
        CaptureError::DeviceUnavailable(format!(
            "{}: {err}. {}",
            info.name,
            mic_permission_hint()
        ))
    })?;

    Ok(MicrophoneStream {
        stream,
        receiver,
        converter: FrameConverter::new(
            device_rate,
            cfg.sample_rate.hz(),
            device_frame_samples,
            target_frame_samples,
        ),
        ready: VecDeque::new(),
        scratch: Vec::new(),
        dropped,
        failed,
        wait: Duration::from_millis(frame_ms),
        device_name: info.name,
    })
}

/// Live microphone stream. Dropping it stops the device.
pub struct MicrophoneStream {
    stream: cpal::Stream,
    receiver: Receiver<Vec<f32>>,
    converter: FrameConverter,
    ready: VecDeque<Frame>,
    scratch: Vec<Frame>,
    dropped: Arc<AtomicUsize>,
    failed: Arc<AtomicBool>,
    wait: Duration,
    device_name: String,
}

impl MicrophoneStream {
    fn closed(&self, detail: &str) -> CaptureError {
        CaptureError::StreamClosed(format!("{}: {detail}", self.device_name))
    }
}

impl FrameStream for MicrophoneStream {
    fn read_frame(&mut self) -> Result<FrameRead> {
        if let Some(frame) = self.ready.pop_front() {
            return Ok(FrameRead::Frame(frame));
        }
        // Resampling can turn one device chunk into zero frames, so keep
        // pulling until a full frame exists or the period elapses.
        let deadline = Instant::now() + self.wait;
        loop {
            if self.failed.load(Ordering::Relaxed) {
                return Err(self.closed("stream reported an error"));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(chunk) => {
                    self.converter.push(&chunk, &mut self.scratch);
                    self.ready.extend(self.scratch.drain(..));
                    if let Some(frame) = self.ready.pop_front() {
                        return Ok(FrameRead::Frame(frame));
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(FrameRead::Pending),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(self.closed("audio stream disconnected"))
                }
            }
        }
    }

    fn take_overflow(&mut self) -> usize {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        if let Err(err) = self.stream.pause() {
            debug!(%err, "failed to pause audio stream");
        }
        debug!(device = %self.device_name, "input stream released");
    }
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}
