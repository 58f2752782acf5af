//! Device-rate to capture-rate conversion.
//!
//! The cpal callback hands over mono f32 chunks at the device's native rate;
//! [`FrameConverter`] turns them into fixed-length i16 frames at the
//! configured capture rate.

use super::frame::quantize;
use super::Frame;
use anyhow::{anyhow, Result};
#[cfg(feature = "high-quality-audio")]
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};
use std::f32::consts::PI;
use tracing::warn;

// Practical bounds for consumer microphones and virtual devices.
pub(super) const MIN_DEVICE_RATE: u32 = 2_000;
pub(super) const MAX_DEVICE_RATE: u32 = 1_600_000;
const MAX_DOWNSAMPLING_TAPS: usize = 129;

pub(super) fn device_rate_supported(device_rate: u32) -> bool {
    (MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&device_rate)
}

/// Streaming converter from device-rate chunks to capture-rate frames.
pub(super) struct FrameConverter {
    device_rate: u32,
    target_rate: u32,
    target_len: usize,
    pending: Vec<f32>,
    #[cfg(feature = "high-quality-audio")]
    sinc: Option<SincStage>,
}

impl FrameConverter {
    pub(super) fn new(
        device_rate: u32,
        target_rate: u32,
        device_chunk: usize,
        target_len: usize,
    ) -> Self {
        #[cfg(feature = "high-quality-audio")]
        let sinc = if device_rate == target_rate {
            None
        } else {
            match SincStage::new(device_rate, target_rate, device_chunk) {
                Ok(stage) => Some(stage),
                Err(err) => {
                    warn!(%err, "high-quality resampler unavailable; using basic path");
                    None
                }
            }
        };
        #[cfg(not(feature = "high-quality-audio"))]
        let _ = device_chunk;

        Self {
            device_rate,
            target_rate,
            target_len: target_len.max(1),
            pending: Vec::with_capacity(target_len * 2),
            #[cfg(feature = "high-quality-audio")]
            sinc,
        }
    }

    /// Feed one device-rate chunk and append every completed frame to `out`.
    pub(super) fn push(&mut self, chunk: &[f32], out: &mut Vec<Frame>) {
        if self.device_rate == self.target_rate {
            self.pending.extend_from_slice(chunk);
        } else {
            let converted = self.resample_chunk(chunk);
            self.pending.extend_from_slice(&converted);
        }
        while self.pending.len() >= self.target_len {
            let samples = self
                .pending
                .drain(..self.target_len)
                .map(quantize)
                .collect();
            out.push(Frame::new(samples));
        }
    }

    fn resample_chunk(&mut self, chunk: &[f32]) -> Vec<f32> {
        #[cfg(feature = "high-quality-audio")]
        if let Some(stage) = self.sinc.as_mut() {
            match stage.process(chunk) {
                Ok(output) => return output,
                Err(err) => {
                    warn!(%err, "high-quality resampler failed; falling back to basic path");
                    self.sinc = None;
                }
            }
        }
        basic_resample(chunk, self.device_rate, self.target_rate)
    }
}

#[cfg(feature = "high-quality-audio")]
struct SincStage {
    resampler: SincFixedIn<f32>,
    chunk: usize,
    scratch: Vec<f32>,
}

#[cfg(feature = "high-quality-audio")]
impl SincStage {
    fn new(device_rate: u32, target_rate: u32, chunk: usize) -> Result<Self> {
        if !device_rate_supported(device_rate) {
            return Err(anyhow!(
                "unsupported device sample rate {device_rate}Hz for resampling"
            ));
        }
        let ratio = target_rate as f64 / device_rate as f64;
        let params = InterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.90,
            interpolation: InterpolationType::Cubic,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let chunk = chunk.max(1);
        let resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk, 1)
            .map_err(|e| anyhow!("failed to construct sinc resampler: {e:?}"))?;
        Ok(Self {
            resampler,
            chunk,
            scratch: vec![0.0; chunk],
        })
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        // The resampler keeps filter state between calls, so each chunk must be
        // exactly `chunk` long; pad short tails with the last sample.
        let len = input.len().min(self.chunk);
        let pad = input.get(len.wrapping_sub(1)).copied().unwrap_or(0.0);
        self.scratch.fill(pad);
        self.scratch[..len].copy_from_slice(&input[..len]);
        let produced = self
            .resampler
            .process(std::slice::from_ref(&self.scratch), None)
            .map_err(|e| anyhow!("resampler process failed: {e:?}"))?;
        produced
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("resampler produced no channels"))
    }
}

pub(super) fn basic_resample(input: &[f32], device_rate: u32, target_rate: u32) -> Vec<f32> {
    if device_rate == 0 || target_rate == 0 || input.is_empty() {
        return input.to_vec();
    }
    if device_rate == target_rate || !device_rate_supported(device_rate) {
        return input.to_vec();
    }

    // Ratio > 1 means upsampling, < 1 means downsampling.
    let ratio = target_rate as f32 / device_rate as f32;
    let filtered = if device_rate > target_rate {
        // Low-pass before decimating so content above the new Nyquist does not alias.
        let taps = downsampling_tap_count(device_rate, target_rate);
        low_pass_fir(input, device_rate, target_rate, taps)
    } else {
        input.to_vec()
    };
    resample_linear(&filtered, ratio)
}

pub(super) fn resample_linear(input: &[f32], ratio: f32) -> Vec<f32> {
    let input_len = input.len();
    let output_len = (input_len as f32 * ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f32 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = src_idx - idx as f32;

        if idx + 1 < input_len {
            output.push(input[idx] * (1.0 - frac) + input[idx + 1] * frac);
        } else {
            output.push(input.last().copied().unwrap_or(0.0));
        }
    }

    output
}

/// Short FIR for near-equal rates, longer when collapsing 48 kHz into 8 kHz.
pub(super) fn downsampling_tap_count(device_rate: u32, target_rate: u32) -> usize {
    let decimation_ratio = device_rate as f32 / target_rate.max(1) as f32;
    let mut taps = (decimation_ratio * 4.0).ceil().max(11.0) as usize;
    if taps % 2 == 0 {
        taps += 1;
    }
    taps.min(MAX_DOWNSAMPLING_TAPS)
}

pub(super) fn low_pass_fir(
    input: &[f32],
    device_rate: u32,
    target_rate: u32,
    taps: usize,
) -> Vec<f32> {
    if input.is_empty() || taps <= 1 {
        return input.to_vec();
    }

    let normalized_cutoff = (target_rate as f32 * 0.5 / device_rate as f32).min(0.499);
    let coeffs = design_low_pass(normalized_cutoff, taps);
    let half = taps / 2;
    let mut output = Vec::with_capacity(input.len());

    for n in 0..input.len() {
        let mut acc = 0.0;
        for (k, coeff) in coeffs.iter().enumerate() {
            if let Some(idx) = n.checked_add(k).and_then(|sum| sum.checked_sub(half)) {
                if let Some(sample) = input.get(idx) {
                    acc += *sample * coeff;
                }
            }
        }
        output.push(acc);
    }

    output
}

/// Normalized Hamming-windowed sinc taps.
pub(super) fn design_low_pass(normalized_cutoff: f32, taps: usize) -> Vec<f32> {
    let mut coeffs = Vec::with_capacity(taps);
    let m = (taps.max(2) - 1) as f32;

    for n in 0..taps {
        let centered = n as f32 - m / 2.0;
        let x = 2.0 * PI * normalized_cutoff * centered;
        let sinc = if centered == 0.0 {
            2.0 * normalized_cutoff
        } else {
            (2.0 * normalized_cutoff * x.sin()) / x
        };
        let window = 0.54 - 0.46 * ((2.0 * PI * n as f32) / m).cos();
        coeffs.push(sinc * window);
    }

    let sum: f32 = coeffs.iter().sum();
    if sum != 0.0 {
        for coeff in coeffs.iter_mut() {
            *coeff /= sum;
        }
    }

    coeffs
}
