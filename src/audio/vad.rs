//! Voice Activity Detection (VAD) for speech/silence classification.
//!
//! Every backend sits behind [`FrameClassifier`] so the capture loop never
//! knows which detector scored a frame.

use super::{Frame, SampleRate};
use crate::config::ClassifierKind;
use crate::error::{CaptureError, ClassifierError};

/// Outcome of scoring exactly one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationResult {
    pub is_speech: bool,
    /// Optional confidence in [0, 1]; backends that only emit a boolean leave it unset.
    pub confidence: Option<f32>,
}

impl ClassificationResult {
    pub fn speech() -> Self {
        Self {
            is_speech: true,
            confidence: None,
        }
    }

    pub fn silence() -> Self {
        Self {
            is_speech: false,
            confidence: None,
        }
    }

    pub fn with_confidence(is_speech: bool, confidence: f32) -> Self {
        Self {
            is_speech,
            confidence: Some(confidence.clamp(0.0, 1.0)),
        }
    }
}

/// Per-frame speech/non-speech decision function.
///
/// # Frame Size Contract
/// Frames arrive at the configured rate with a fixed duration of 10, 20 or
/// 30 ms. Frame size in samples = (sample_rate * frame_duration_ms) / 1000,
/// e.g. 30 ms @ 16 kHz = 480 samples.
///
/// `classify` must finish well inside one frame duration; slower backends
/// belong behind a [`super::ClassifierWorker`].
pub trait FrameClassifier {
    fn classify(
        &mut self,
        frame: &Frame,
        sample_rate: SampleRate,
    ) -> Result<ClassificationResult, ClassifierError>;

    /// Whether this backend can score frames at `sample_rate`.
    fn supports(&self, sample_rate: SampleRate) -> bool;

    /// Drop any state carried between frames of the previous utterance.
    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "unknown_classifier"
    }
}

impl<C: FrameClassifier + ?Sized> FrameClassifier for Box<C> {
    fn classify(
        &mut self,
        frame: &Frame,
        sample_rate: SampleRate,
    ) -> Result<ClassificationResult, ClassifierError> {
        (**self).classify(frame, sample_rate)
    }

    fn supports(&self, sample_rate: SampleRate) -> bool {
        (**self).supports(sample_rate)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Fail with `UnsupportedSampleRate` before any frame is read.
pub fn ensure_supported(
    classifier: &dyn FrameClassifier,
    sample_rate: SampleRate,
) -> crate::error::Result<()> {
    if classifier.supports(sample_rate) {
        Ok(())
    } else {
        Err(CaptureError::UnsupportedSampleRate {
            classifier: classifier.name(),
            sample_rate: sample_rate.hz(),
        })
    }
}

pub(crate) fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return SILENCE_FLOOR_DB;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = energy.sqrt().max(1e-6);
    20.0 * rms.log10()
}

const SILENCE_FLOOR_DB: f32 = -120.0;
// Width of the band around the threshold mapped onto [0, 1] confidence.
const CONFIDENCE_SPAN_DB: f32 = 20.0;

/// Lightweight classifier that compares RMS energy against a dBFS threshold.
/// Used when Earshot is disabled or the sample rate is not 16 kHz.
#[derive(Debug, Clone)]
pub struct EnergyClassifier {
    threshold_db: f32,
}

impl EnergyClassifier {
    pub fn new(threshold_db: f32) -> Self {
        Self { threshold_db }
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }
}

impl FrameClassifier for EnergyClassifier {
    fn classify(
        &mut self,
        frame: &Frame,
        _sample_rate: SampleRate,
    ) -> Result<ClassificationResult, ClassifierError> {
        if frame.is_empty() {
            return Err(ClassifierError::FrameLength {
                expected: 1,
                actual: 0,
            });
        }
        let db = rms_db(&frame.to_f32());
        let low = self.threshold_db - CONFIDENCE_SPAN_DB;
        let confidence = (db - low) / (2.0 * CONFIDENCE_SPAN_DB);
        Ok(ClassificationResult::with_confidence(
            db >= self.threshold_db,
            confidence,
        ))
    }

    fn supports(&self, _sample_rate: SampleRate) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "energy"
    }
}

/// Backend selection knobs gathered from the CLI.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierSettings {
    pub kind: ClassifierKind,
    pub threshold_db: f32,
    pub frame_samples: usize,
}

/// Build the configured backend.
pub fn build_classifier(
    settings: &ClassifierSettings,
) -> crate::error::Result<Box<dyn FrameClassifier + Send>> {
    match settings.kind {
        ClassifierKind::Energy => Ok(Box::new(EnergyClassifier::new(settings.threshold_db))),
        ClassifierKind::Earshot => {
            #[cfg(feature = "vad_earshot")]
            {
                Ok(Box::new(crate::vad_earshot::EarshotClassifier::new(
                    settings.threshold_db,
                    settings.frame_samples,
                )))
            }
            #[cfg(not(feature = "vad_earshot"))]
            {
                Err(CaptureError::InvalidConfig(
                    "earshot classifier requires the 'vad_earshot' feature".to_string(),
                ))
            }
        }
    }
}
