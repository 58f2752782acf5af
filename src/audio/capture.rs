//! Hysteresis state machine that turns classified frames into utterances.
//!
//! Onset needs `min_speech_frames` consecutive speech frames; the frames seen
//! while waiting (lookback plus the confirmation run) are folded into the
//! session once onset is confirmed. Stop needs `min_silence_frames`
//! consecutive silence frames. `max_duration_frames` is checked on every
//! frame regardless of state.

use super::lookback::LookbackRingBuffer;
use super::{Frame, SampleRate};
use crate::config::CaptureConfig;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureState {
    /// Waiting for speech onset.
    Idle,
    /// Provisional speech; counting consecutive speech frames.
    Confirming,
    /// Confirmed utterance in progress.
    Recording,
    /// Terminal; see the session's stop reason.
    Finalized,
}

/// Explains why a session finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// `min_silence_frames` of consecutive silence after confirmed speech.
    Normal,
    /// `max_duration_frames` reached.
    Timeout,
    /// Cooperative cancellation.
    Cancelled,
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::Normal => "normal",
            StopReason::Timeout => "timeout",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// Counters collected during one session for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureMetrics {
    pub frames_processed: usize,
    pub speech_frames: usize,
    pub lookback_frames: usize,
    pub frames_dropped: usize,
    pub classifier_errors: usize,
    pub classifier_drops: usize,
    pub stall_ticks: usize,
}

/// Caller-facing result: one contiguous mono clip plus why it ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureResult {
    pub audio: Vec<i16>,
    pub stop_reason: StopReason,
    pub frame_count: usize,
    pub sample_rate: SampleRate,
    pub metrics: CaptureMetrics,
}

impl CaptureResult {
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        self.audio.len() as u64 * 1000 / u64::from(self.sample_rate.hz())
    }
}

/// Accumulating audio and counters for one utterance attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    frames: Vec<Frame>,
    state: CaptureState,
    speech_run: u32,
    silence_run: u32,
    total_frames: u32,
}

impl CaptureSession {
    fn new() -> Self {
        Self {
            frames: Vec::new(),
            state: CaptureState::Idle,
            speech_run: 0,
            silence_run: 0,
            total_frames: 0,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn speech_run(&self) -> u32 {
        self.speech_run
    }

    pub fn silence_run(&self) -> u32 {
        self.silence_run
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    fn audio(&self) -> Vec<i16> {
        let len = self.frames.iter().map(Frame::len).sum();
        let mut audio = Vec::with_capacity(len);
        for frame in &self.frames {
            audio.extend_from_slice(frame.samples());
        }
        audio
    }

    fn record_classification(&mut self, is_speech: bool) {
        if is_speech {
            self.speech_run = self.speech_run.saturating_add(1);
            self.silence_run = 0;
        } else {
            self.silence_run = self.silence_run.saturating_add(1);
            self.speech_run = 0;
        }
    }
}

/// Frame-by-frame onset/stop controller owning the lookback buffer and the
/// in-progress session.
#[derive(Debug, Clone, PartialEq)]
pub struct HysteresisStateMachine {
    cfg: CaptureConfig,
    lookback: LookbackRingBuffer,
    // Consecutive speech frames seen while Confirming; kept out of the
    // lookback so the run never evicts pre-onset context.
    onset_run: Vec<Frame>,
    session: CaptureSession,
    stop_reason: Option<StopReason>,
    metrics: CaptureMetrics,
}

impl HysteresisStateMachine {
    pub fn new(cfg: CaptureConfig) -> Self {
        let lookback = LookbackRingBuffer::new(cfg.lookback_capacity);
        Self {
            cfg,
            lookback,
            onset_run: Vec::new(),
            session: CaptureSession::new(),
            stop_reason: None,
            metrics: CaptureMetrics::default(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.session.state
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn lookback(&self) -> &LookbackRingBuffer {
        &self.lookback
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn is_finalized(&self) -> bool {
        self.session.state == CaptureState::Finalized
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut CaptureMetrics {
        &mut self.metrics
    }

    /// Fold one classified frame. Returns the stop reason once the session
    /// finalizes; frames offered after that are ignored.
    pub fn on_frame(&mut self, frame: Frame, is_speech: bool) -> Option<StopReason> {
        if self.is_finalized() {
            return self.stop_reason;
        }

        self.session.total_frames = self.session.total_frames.saturating_add(1);
        self.metrics.frames_processed += 1;
        if is_speech {
            self.metrics.speech_frames += 1;
        }

        let mut silence_confirmed = false;
        match self.session.state {
            CaptureState::Idle => {
                self.session.record_classification(is_speech);
                if is_speech {
                    self.onset_run.push(frame);
                    self.session.state = CaptureState::Confirming;
                    self.confirm_onset_if_ready();
                } else {
                    self.lookback.push(frame);
                }
            }
            CaptureState::Confirming => {
                self.session.record_classification(is_speech);
                if is_speech {
                    self.onset_run.push(frame);
                    self.confirm_onset_if_ready();
                } else {
                    // The run was noise: it becomes ordinary lookback context.
                    for run_frame in self.onset_run.drain(..) {
                        self.lookback.push(run_frame);
                    }
                    self.lookback.push(frame);
                    self.session.state = CaptureState::Idle;
                }
            }
            CaptureState::Recording => {
                self.session.frames.push(frame);
                self.session.record_classification(is_speech);
                silence_confirmed =
                    !is_speech && self.session.silence_run >= self.cfg.min_silence_frames;
            }
            CaptureState::Finalized => unreachable!("finalized sessions return early"),
        }

        // The safety cutoff wins over a simultaneous silence stop.
        if self.session.total_frames >= self.cfg.max_duration_frames {
            self.fold_pending_into_session();
            return Some(self.finalize(StopReason::Timeout));
        }
        if silence_confirmed {
            return Some(self.finalize(StopReason::Normal));
        }
        None
    }

    /// Account for a frame period in which the source produced nothing.
    /// Only the safety cutoff advances; no audio is appended.
    pub fn on_stall(&mut self) -> Option<StopReason> {
        if self.is_finalized() {
            return self.stop_reason;
        }
        self.session.total_frames = self.session.total_frames.saturating_add(1);
        self.metrics.stall_ticks += 1;
        if self.session.total_frames >= self.cfg.max_duration_frames {
            self.fold_pending_into_session();
            return Some(self.finalize(StopReason::Timeout));
        }
        None
    }

    /// Finalize with `Cancelled`, keeping whatever the session already holds.
    pub fn cancel(&mut self) -> StopReason {
        if let Some(reason) = self.stop_reason {
            return reason;
        }
        self.finalize(StopReason::Cancelled)
    }

    /// Hand back the finalized session and return to a fresh `Idle` state.
    pub fn take_result(&mut self) -> Option<CaptureResult> {
        let stop_reason = self.stop_reason?;
        let result = CaptureResult {
            audio: self.session.audio(),
            stop_reason,
            frame_count: self.session.frames.len(),
            sample_rate: self.cfg.sample_rate,
            metrics: self.metrics.clone(),
        };
        self.reset();
        Some(result)
    }

    /// Discard all state, as if newly constructed.
    pub fn reset(&mut self) {
        self.lookback.clear();
        self.onset_run.clear();
        self.session = CaptureSession::new();
        self.stop_reason = None;
        self.metrics = CaptureMetrics::default();
    }

    fn confirm_onset_if_ready(&mut self) {
        if self.session.speech_run < self.cfg.min_speech_frames {
            return;
        }
        self.fold_pending_into_session();
        self.session.speech_run = 0;
        self.session.silence_run = 0;
        self.session.state = CaptureState::Recording;
    }

    fn fold_pending_into_session(&mut self) {
        let lookback = self.lookback.drain();
        self.metrics.lookback_frames += lookback.len();
        self.session.frames.extend(lookback);
        self.session.frames.append(&mut self.onset_run);
    }

    fn finalize(&mut self, reason: StopReason) -> StopReason {
        self.session.state = CaptureState::Finalized;
        self.stop_reason = Some(reason);
        reason
    }
}
