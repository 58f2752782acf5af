use crate::config::CaptureConfig;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Downmix interleaved multi-channel input to mono, converting each sample
/// with `convert`, so the pipeline sees one channel whatever the microphone
/// layout.
pub(super) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    for group in data.chunks(channels) {
        let sum: f32 = group.iter().copied().map(&mut convert).sum();
        buf.push(sum / group.len() as f32);
    }
}

pub(super) fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32_768.0
}

pub(super) fn u16_to_f32(sample: u16) -> f32 {
    (f32::from(sample) - 32_768.0) / 32_768.0
}

/// Samples covering one capture frame at the device's native rate.
pub(super) fn device_frame_samples(device_rate: u32, cfg: &CaptureConfig) -> usize {
    ((u64::from(device_rate) * cfg.frame_ms()) / 1000).max(1) as usize
}

/// Runs on the cpal callback thread: cuts mono samples into device-rate
/// frames, one capture frame period each, and hands them to the capture loop
/// without ever blocking.
pub(super) struct FrameDispatcher {
    frame_samples: usize,
    channels: usize,
    pending: Vec<f32>,
    scratch: Vec<f32>,
    sender: Sender<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
}

impl FrameDispatcher {
    pub(super) fn for_device(
        device_rate: u32,
        channels: usize,
        cfg: &CaptureConfig,
        sender: Sender<Vec<f32>>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        let frame_samples = device_frame_samples(device_rate, cfg);
        Self {
            frame_samples,
            channels: channels.max(1),
            pending: Vec::with_capacity(frame_samples),
            scratch: Vec::new(),
            sender,
            dropped,
        }
    }

    pub(super) fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    /// A callback that could not take the dispatcher lost its buffer.
    pub(super) fn record_lost_callback(dropped: &AtomicUsize) {
        dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.scratch.clear();
        append_downmixed_samples(&mut self.scratch, data, self.channels, convert);
        self.pending.extend_from_slice(&self.scratch);

        while self.pending.len() >= self.frame_samples {
            let frame: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            match self.sender.try_send(frame) {
                Ok(()) => {}
                // The capture loop fell behind; the frame is lost.
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.pending.clear();
                    break;
                }
            }
        }
    }
}
