//! Earshot-powered frame classifier implementing `FrameClassifier`.

use crate::audio::{ClassificationResult, Frame, FrameClassifier, SampleRate};
use crate::error::ClassifierError;
use earshot::{VoiceActivityDetector, VoiceActivityProfile};

/// Thin wrapper that adapts `earshot` to the crate's `FrameClassifier` trait.
/// Earshot only scores 16 kHz frames of 10, 20 or 30 ms.
pub struct EarshotClassifier {
    detector: VoiceActivityDetector,
    frame_samples: usize,
}

impl EarshotClassifier {
    /// Pick an aggressiveness profile from the energy threshold: quieter
    /// thresholds mean noisier rooms are expected, so reject more.
    pub fn new(threshold_db: f32, frame_samples: usize) -> Self {
        let profile = match threshold_db {
            t if t <= -50.0 => VoiceActivityProfile::VERY_AGGRESSIVE,
            t if t <= -40.0 => VoiceActivityProfile::AGGRESSIVE,
            t if t <= -30.0 => VoiceActivityProfile::LBR,
            _ => VoiceActivityProfile::QUALITY,
        };
        Self {
            detector: VoiceActivityDetector::new(profile),
            frame_samples,
        }
    }
}

impl FrameClassifier for EarshotClassifier {
    fn classify(
        &mut self,
        frame: &Frame,
        sample_rate: SampleRate,
    ) -> Result<ClassificationResult, ClassifierError> {
        if !self.supports(sample_rate) {
            return Err(ClassifierError::UnsupportedSampleRate(sample_rate.hz()));
        }
        if frame.len() != self.frame_samples {
            return Err(ClassifierError::FrameLength {
                expected: self.frame_samples,
                actual: frame.len(),
            });
        }
        match self.detector.predict_16khz(frame.samples()) {
            Ok(true) => Ok(ClassificationResult::speech()),
            Ok(false) => Ok(ClassificationResult::silence()),
            Err(err) => Err(ClassifierError::Backend(format!("{err:?}"))),
        }
    }

    fn supports(&self, sample_rate: SampleRate) -> bool {
        sample_rate == SampleRate::Hz16000
    }

    fn reset(&mut self) {
        self.detector.reset();
    }

    fn name(&self) -> &'static str {
        "earshot"
    }
}
