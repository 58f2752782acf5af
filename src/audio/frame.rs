//! PCM frame value types shared by every pipeline stage.

use crate::error::CaptureError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Sample rates the pipeline accepts. Classifier backends may support a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SampleRate {
    Hz8000,
    Hz16000,
    Hz32000,
    Hz48000,
}

impl SampleRate {
    pub const ALL: [SampleRate; 4] = [
        SampleRate::Hz8000,
        SampleRate::Hz16000,
        SampleRate::Hz32000,
        SampleRate::Hz48000,
    ];

    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8_000,
            SampleRate::Hz16000 => 16_000,
            SampleRate::Hz32000 => 32_000,
            SampleRate::Hz48000 => 48_000,
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = CaptureError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        SampleRate::ALL
            .into_iter()
            .find(|rate| rate.hz() == hz)
            .ok_or_else(|| {
                CaptureError::InvalidConfig(format!(
                    "sample rate must be one of 8000/16000/32000/48000 Hz, got {hz}"
                ))
            })
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

/// Frame durations accepted by WebRTC-style detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FrameDuration {
    Ms10,
    Ms20,
    Ms30,
}

impl FrameDuration {
    pub fn millis(self) -> u64 {
        match self {
            FrameDuration::Ms10 => 10,
            FrameDuration::Ms20 => 20,
            FrameDuration::Ms30 => 30,
        }
    }

    /// Frame size in samples = (sample_rate * frame_duration_ms) / 1000.
    pub fn samples_per_frame(self, rate: SampleRate) -> usize {
        (rate.hz() as u64 * self.millis() / 1000) as usize
    }
}

impl TryFrom<u64> for FrameDuration {
    type Error = CaptureError;

    fn try_from(ms: u64) -> Result<Self, Self::Error> {
        match ms {
            10 => Ok(FrameDuration::Ms10),
            20 => Ok(FrameDuration::Ms20),
            30 => Ok(FrameDuration::Ms30),
            other => Err(CaptureError::InvalidConfig(format!(
                "frame duration must be 10, 20, or 30 ms, got {other}"
            ))),
        }
    }
}

/// One fixed-length block of mono i16 samples.
///
/// Frames are cheap to clone: the samples sit behind an `Arc` so the same
/// frame can be held by the lookback buffer, the classifier worker, and the
/// session without copying.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    samples: Arc<[i16]>,
}

impl Frame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    /// A frame of digital silence.
    pub fn silent(len: usize) -> Self {
        Self::new(vec![0; len])
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples scaled to [-1.0, 1.0) for energy math.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&sample| sample as f32 / 32_768.0)
            .collect()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("len", &self.len()).finish()
    }
}

/// Quantize a normalized f32 sample to i16 with clipping.
pub(crate) fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32_767.0).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_per_frame_matches_rate_and_duration() {
        assert_eq!(FrameDuration::Ms30.samples_per_frame(SampleRate::Hz16000), 480);
        assert_eq!(FrameDuration::Ms20.samples_per_frame(SampleRate::Hz16000), 320);
        assert_eq!(FrameDuration::Ms10.samples_per_frame(SampleRate::Hz8000), 80);
        assert_eq!(FrameDuration::Ms30.samples_per_frame(SampleRate::Hz48000), 1440);
    }

    #[test]
    fn sample_rate_rejects_unknown_values() {
        assert_eq!(SampleRate::try_from(32_000).unwrap(), SampleRate::Hz32000);
        assert!(SampleRate::try_from(44_100).is_err());
    }

    #[test]
    fn frame_duration_rejects_unknown_values() {
        assert_eq!(FrameDuration::try_from(20).unwrap(), FrameDuration::Ms20);
        assert!(FrameDuration::try_from(25).is_err());
    }

    #[test]
    fn quantize_clips_out_of_range() {
        assert_eq!(quantize(2.0), 32_767);
        assert_eq!(quantize(-2.0), -32_767);
        assert_eq!(quantize(0.0), 0);
    }

    #[test]
    fn to_f32_scales_into_unit_range() {
        let frame = Frame::new(vec![i16::MIN, 0, 16_384]);
        assert_eq!(frame.to_f32(), vec![-1.0, 0.0, 0.5]);
    }
}
