//! Pull-based frame sources.
//!
//! An [`AudioInput`] opens a [`FrameStream`]; the stream is the scoped handle
//! and releases the underlying device when dropped, so every exit path of the
//! capture loop (finish, error, cancellation) gives the device back.

use super::Frame;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use serde::Serialize;
use std::collections::VecDeque;

/// One step of a blocking frame read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRead {
    Frame(Frame),
    /// No frame arrived within one frame duration.
    Pending,
}

/// An open capture stream owned exclusively by one capture loop.
pub trait FrameStream {
    /// Block for at most one frame duration. `StreamClosed` is fatal.
    fn read_frame(&mut self) -> Result<FrameRead>;

    /// Frames the driver side dropped since the last call. Non-fatal.
    fn take_overflow(&mut self) -> usize {
        0
    }
}

/// Something that can open a [`FrameStream`] for a capture configuration.
pub trait AudioInput {
    type Stream: FrameStream;

    /// Fails with `DeviceUnavailable` or `UnsupportedFormat`.
    fn open(&self, cfg: &CaptureConfig) -> Result<Self::Stream>;

    fn describe(&self) -> String;
}

/// Capabilities of one input device as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub channels: u16,
    pub native_sample_rate: u32,
    pub is_default: bool,
}

/// Pick a device from a discovered list: an exact name match first, then a
/// case-insensitive substring match, otherwise the host default.
pub fn select_device<'a>(
    devices: &'a [DeviceInfo],
    preferred: Option<&str>,
) -> Option<&'a DeviceInfo> {
    match preferred {
        Some(wanted) => {
            let needle = wanted.to_ascii_lowercase();
            devices.iter().find(|d| d.name == wanted).or_else(|| {
                devices
                    .iter()
                    .find(|d| d.name.to_ascii_lowercase().contains(&needle))
            })
        }
        None => devices
            .iter()
            .find(|d| d.is_default)
            .or_else(|| devices.first()),
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Frame(Frame),
    Stall,
    Overflow(usize),
}

/// In-memory source for tests, benchmarks, and replaying recorded clips.
///
/// The script plays once per `open`; after the last item the stream reports
/// `StreamClosed`, like a device that went away.
#[derive(Debug, Clone, Default)]
pub struct PcmSource {
    samples: Vec<i16>,
    script: Vec<Scripted>,
}

impl PcmSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw mono samples; chunked at open time, padding the last partial frame
    /// with silence. They play before any frames, stalls, or overflow added
    /// through the builder methods.
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self {
            samples,
            script: Vec::new(),
        }
    }

    pub fn frames<I: IntoIterator<Item = Frame>>(mut self, frames: I) -> Self {
        self.script.extend(frames.into_iter().map(Scripted::Frame));
        self
    }

    pub fn stalls(mut self, periods: usize) -> Self {
        self.script.extend(std::iter::repeat_n(Scripted::Stall, periods));
        self
    }

    pub fn overflow(mut self, dropped: usize) -> Self {
        self.script.push(Scripted::Overflow(dropped));
        self
    }
}

impl AudioInput for PcmSource {
    type Stream = PcmStream;

    fn open(&self, cfg: &CaptureConfig) -> Result<PcmStream> {
        let frame_samples = cfg.samples_per_frame();
        let mut queue = VecDeque::new();
        for chunk in self.samples.chunks(frame_samples) {
            let mut frame = chunk.to_vec();
            frame.resize(frame_samples, 0);
            queue.push_back(Scripted::Frame(Frame::new(frame)));
        }
        for item in &self.script {
            if let Scripted::Frame(frame) = item {
                if frame.len() != frame_samples {
                    return Err(CaptureError::UnsupportedFormat(format!(
                        "scripted frame has {} samples, expected {frame_samples}",
                        frame.len()
                    )));
                }
            }
            queue.push_back(item.clone());
        }
        Ok(PcmStream {
            queue,
            overflow: 0,
        })
    }

    fn describe(&self) -> String {
        "in-memory pcm".to_string()
    }
}

/// Stream over a [`PcmSource`] script.
#[derive(Debug)]
pub struct PcmStream {
    queue: VecDeque<Scripted>,
    overflow: usize,
}

impl FrameStream for PcmStream {
    fn read_frame(&mut self) -> Result<FrameRead> {
        loop {
            match self.queue.pop_front() {
                Some(Scripted::Frame(frame)) => return Ok(FrameRead::Frame(frame)),
                Some(Scripted::Stall) => return Ok(FrameRead::Pending),
                Some(Scripted::Overflow(dropped)) => {
                    self.overflow = self.overflow.saturating_add(dropped);
                }
                None => {
                    return Err(CaptureError::StreamClosed(
                        "end of in-memory input".to_string(),
                    ))
                }
            }
        }
    }

    fn take_overflow(&mut self) -> usize {
        std::mem::take(&mut self.overflow)
    }
}
