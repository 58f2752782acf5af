//! Frame loop driving source, classifier, and state machine.
//!
//! One control thread pulls a frame, scores it, and folds the verdict into
//! the [`HysteresisStateMachine`]. With [`ClassifierMode::Worker`] scoring
//! moves to a [`ClassifierWorker`], but verdicts are still folded strictly in
//! arrival order.

use crate::audio::{
    ensure_supported, AudioInput, CaptureResult, ClassificationResult, ClassifierWorker, Frame,
    FrameClassifier, FrameRead, FrameStream, HysteresisStateMachine, StopReason,
};
use crate::config::CaptureConfig;
use crate::error::{ClassifierError, Result};
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cooperative cancellation shared between the capture loop and whoever
/// wants it to stop (a signal handler, another thread, a test).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Shared flag for APIs that set an `Arc<AtomicBool>` directly, such as
    /// `signal_hook::flag::register`.
    pub fn as_arc(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Where classification runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifierMode {
    /// On the control thread, inside the frame loop.
    #[default]
    Inline,
    /// On a worker thread behind a bounded queue; overflow counts as silence.
    Worker { queue_capacity: usize },
}

enum Scorer {
    Inline(Box<dyn FrameClassifier + Send>),
    Worker(ClassifierWorker),
}

enum Tick {
    Frame(Frame),
    Stall,
}

/// A read waiting to be folded. Stall ticks queue behind earlier frames so
/// the machine sees everything in arrival order.
struct InFlight {
    seq: Option<u64>,
    tick: Tick,
    is_speech: Option<bool>,
    /// Past this instant an unanswered frame counts as silence.
    deadline: Instant,
}

impl InFlight {
    fn resolved(tick: Tick, is_speech: bool) -> Self {
        Self {
            seq: None,
            tick,
            is_speech: Some(is_speech),
            deadline: Instant::now(),
        }
    }
}

/// Runs capture sessions against any [`AudioInput`].
pub struct Orchestrator {
    config: CaptureConfig,
    machine: HysteresisStateMachine,
    scorer: Scorer,
    classifier_name: &'static str,
    in_flight: VecDeque<InFlight>,
}

impl Orchestrator {
    /// Validate the configuration and the classifier's rate support before any
    /// device is touched.
    pub fn new(
        config: CaptureConfig,
        classifier: Box<dyn FrameClassifier + Send>,
        mode: ClassifierMode,
    ) -> Result<Self> {
        config.validate()?;
        ensure_supported(classifier.as_ref(), config.sample_rate)?;
        let classifier_name = classifier.name();
        let scorer = match mode {
            ClassifierMode::Inline => Scorer::Inline(classifier),
            ClassifierMode::Worker { queue_capacity } => {
                Scorer::Worker(ClassifierWorker::spawn(classifier, queue_capacity)?)
            }
        };
        Ok(Self {
            machine: HysteresisStateMachine::new(config.clone()),
            config,
            scorer,
            classifier_name,
            in_flight: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier_name
    }

    /// Block until one session finalizes. The stream is opened here and
    /// released before returning, on every path.
    pub fn capture_one_utterance<I: AudioInput>(
        &mut self,
        input: &I,
        cancel: &CancelFlag,
    ) -> Result<CaptureResult> {
        let mut stream = input.open(&self.config)?;
        info!(
            source = %input.describe(),
            classifier = self.classifier_name,
            "capture started"
        );
        let result = self.run_session(&mut stream, cancel);
        self.in_flight.clear();
        result
    }

    /// Run sessions back to back over one stream, handing each finalized
    /// result to `on_result`. Returns once cancelled, or when `on_result`
    /// breaks.
    pub fn monitor_continuous<I, F>(
        &mut self,
        input: &I,
        cancel: &CancelFlag,
        mut on_result: F,
    ) -> Result<()>
    where
        I: AudioInput,
        F: FnMut(CaptureResult) -> ControlFlow<()>,
    {
        let mut stream = input.open(&self.config)?;
        info!(
            source = %input.describe(),
            classifier = self.classifier_name,
            "monitoring started"
        );
        let outcome = loop {
            let result = match self.run_session(&mut stream, cancel) {
                Ok(result) => result,
                Err(err) => break Err(err),
            };
            if result.stop_reason == StopReason::Cancelled {
                // Partial audio is still handed over; an idle cancel has none.
                if !result.is_empty() {
                    let _ = on_result(result);
                }
                break Ok(());
            }
            if on_result(result).is_break() {
                break Ok(());
            }
        };
        self.in_flight.clear();
        outcome
    }

    fn run_session<S: FrameStream>(
        &mut self,
        stream: &mut S,
        cancel: &CancelFlag,
    ) -> Result<CaptureResult> {
        self.machine.reset();
        self.reset_classifier();

        let result = loop {
            if cancel.is_cancelled() {
                self.in_flight.clear();
                self.machine.cancel();
            } else {
                // The read and the verdict wait share one frame period.
                let iteration_end = Instant::now() + self.frame_period();
                let overflow = stream.take_overflow();
                if overflow > 0 {
                    warn!(dropped = overflow, "input overflow; frames lost");
                    self.machine.metrics_mut().frames_dropped += overflow;
                }

                match stream.read_frame() {
                    Ok(FrameRead::Frame(frame)) => self.accept(frame)?,
                    Ok(FrameRead::Pending) => {
                        self.in_flight.push_back(InFlight::resolved(Tick::Stall, false));
                    }
                    Err(err) => {
                        warn!(%err, "capture stream failed; discarding session");
                        self.machine.reset();
                        return Err(err);
                    }
                }
                self.collect_verdicts(iteration_end)?;
                self.fold_resolved();
            }

            if let Some(result) = self.machine.take_result() {
                break result;
            }
        };
        info!(
            stop_reason = result.stop_reason.label(),
            frames = result.frame_count,
            samples = result.audio.len(),
            classifier_errors = result.metrics.classifier_errors,
            classifier_drops = result.metrics.classifier_drops,
            frames_dropped = result.metrics.frames_dropped,
            "capture finished"
        );
        Ok(result)
    }

    fn frame_period(&self) -> Duration {
        Duration::from_millis(self.config.frame_ms())
    }

    fn reset_classifier(&mut self) {
        match &mut self.scorer {
            Scorer::Inline(classifier) => classifier.reset(),
            Scorer::Worker(worker) => worker.reset(),
        }
    }

    fn accept(&mut self, frame: Frame) -> Result<()> {
        let sample_rate = self.config.sample_rate;
        let deadline = Instant::now() + self.frame_period();
        match &mut self.scorer {
            Scorer::Inline(classifier) => {
                let outcome = classifier.classify(&frame, sample_rate);
                let is_speech = self.resolve(outcome);
                self.in_flight
                    .push_back(InFlight::resolved(Tick::Frame(frame), is_speech));
            }
            Scorer::Worker(worker) => match worker.submit(frame.clone(), sample_rate)? {
                Some(seq) => {
                    self.in_flight.push_back(InFlight {
                        seq: Some(seq),
                        tick: Tick::Frame(frame),
                        is_speech: None,
                        deadline,
                    });
                }
                None => {
                    debug!("classifier queue full; frame treated as silence");
                    self.machine.metrics_mut().classifier_drops += 1;
                    self.in_flight
                        .push_back(InFlight::resolved(Tick::Frame(frame), false));
                }
            },
        }
        Ok(())
    }

    /// Pick up finished verdicts, waiting for the oldest outstanding one no
    /// later than `iteration_end`. Frames whose verdict is overdue resolve as
    /// silence so the safety cutoff keeps counting under a stuck classifier.
    fn collect_verdicts(&mut self, iteration_end: Instant) -> Result<()> {
        let Scorer::Worker(worker) = &self.scorer else {
            return Ok(());
        };
        let mut ready = Vec::new();
        while let Some(verdict) = worker.try_recv() {
            ready.push(verdict);
        }
        loop {
            let oldest_pending = self
                .in_flight
                .iter()
                .find(|f| f.is_speech.is_none())
                .and_then(|f| f.seq);
            let Some(oldest) = oldest_pending else {
                break;
            };
            if ready.iter().any(|v| v.seq == oldest) {
                break;
            }
            let remaining = iteration_end.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match worker.recv_timeout(remaining)? {
                Some(verdict) => ready.push(verdict),
                None => break,
            }
        }

        for verdict in ready {
            // Late verdicts, or ones for an abandoned session, have no slot.
            let Some(index) = self
                .in_flight
                .iter()
                .position(|f| f.seq == Some(verdict.seq) && f.is_speech.is_none())
            else {
                continue;
            };
            let is_speech = self.resolve(verdict.outcome);
            self.in_flight[index].is_speech = Some(is_speech);
        }
        self.expire_overdue();
        Ok(())
    }

    fn expire_overdue(&mut self) {
        let now = Instant::now();
        let mut expired = 0;
        for slot in self
            .in_flight
            .iter_mut()
            .filter(|f| f.is_speech.is_none() && f.deadline <= now)
        {
            slot.is_speech = Some(false);
            expired += 1;
        }
        if expired > 0 {
            debug!(expired, "classifier verdicts overdue; frames treated as silence");
            self.machine.metrics_mut().classifier_drops += expired;
        }
    }

    /// Per-frame classifier failures never abort a session: they count as silence.
    fn resolve(
        &mut self,
        outcome: std::result::Result<ClassificationResult, ClassifierError>,
    ) -> bool {
        match outcome {
            Ok(result) => result.is_speech,
            Err(err) => {
                warn!(%err, classifier = self.classifier_name, "classification failed; treating frame as silence");
                self.machine.metrics_mut().classifier_errors += 1;
                false
            }
        }
    }

    /// Fold resolved reads from the front of the queue, stopping at the one
    /// that finalizes the session. Anything left over opens the next session.
    fn fold_resolved(&mut self) {
        while let Some(is_speech) = self.in_flight.front().and_then(|f| f.is_speech) {
            let Some(entry) = self.in_flight.pop_front() else {
                break;
            };
            let stop = match entry.tick {
                Tick::Frame(frame) => self.machine.on_frame(frame, is_speech),
                Tick::Stall => self.machine.on_stall(),
            };
            if stop.is_some() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{EnergyClassifier, PcmSource, SampleRate};
    use crate::error::CaptureError;

    const FRAME_SAMPLES: usize = 480;

    fn speech() -> Frame {
        Frame::new(vec![8_000; FRAME_SAMPLES])
    }

    fn silence() -> Frame {
        Frame::silent(FRAME_SAMPLES)
    }

    fn frames(count: usize, frame: fn() -> Frame) -> Vec<Frame> {
        (0..count).map(|_| frame()).collect()
    }

    fn utterance() -> Vec<Frame> {
        let mut script = frames(10, silence);
        script.extend(frames(8, speech));
        script.extend(frames(23, silence));
        script
    }

    fn energy() -> Box<dyn FrameClassifier + Send> {
        Box::new(EnergyClassifier::new(-40.0))
    }

    fn orchestrator(config: CaptureConfig) -> Orchestrator {
        Orchestrator::new(config, energy(), ClassifierMode::Inline).unwrap()
    }

    struct FailingClassifier;

    impl FrameClassifier for FailingClassifier {
        fn classify(
            &mut self,
            _frame: &Frame,
            _sample_rate: SampleRate,
        ) -> std::result::Result<ClassificationResult, ClassifierError> {
            Err(ClassifierError::Backend("model not loaded".to_string()))
        }

        fn supports(&self, _sample_rate: SampleRate) -> bool {
            true
        }
    }

    struct WidebandOnly;

    impl FrameClassifier for WidebandOnly {
        fn classify(
            &mut self,
            _frame: &Frame,
            _sample_rate: SampleRate,
        ) -> std::result::Result<ClassificationResult, ClassifierError> {
            Ok(ClassificationResult::silence())
        }

        fn supports(&self, sample_rate: SampleRate) -> bool {
            sample_rate == SampleRate::Hz16000
        }

        fn name(&self) -> &'static str {
            "wideband_only"
        }
    }

    /// Scores like the energy classifier but raises the cancel flag once it
    /// has seen `remaining` frames.
    struct CancelAfter {
        inner: EnergyClassifier,
        flag: CancelFlag,
        remaining: usize,
    }

    impl FrameClassifier for CancelAfter {
        fn classify(
            &mut self,
            frame: &Frame,
            sample_rate: SampleRate,
        ) -> std::result::Result<ClassificationResult, ClassifierError> {
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.flag.cancel();
            }
            self.inner.classify(frame, sample_rate)
        }

        fn supports(&self, _sample_rate: SampleRate) -> bool {
            true
        }
    }

    /// Answers every frame with silence, but only after `delay`.
    struct SlowClassifier {
        delay: Duration,
    }

    impl FrameClassifier for SlowClassifier {
        fn classify(
            &mut self,
            _frame: &Frame,
            _sample_rate: SampleRate,
        ) -> std::result::Result<ClassificationResult, ClassifierError> {
            std::thread::sleep(self.delay);
            Ok(ClassificationResult::silence())
        }

        fn supports(&self, _sample_rate: SampleRate) -> bool {
            true
        }
    }

    fn slow_worker(config: CaptureConfig, queue_capacity: usize) -> Orchestrator {
        Orchestrator::new(
            config,
            Box::new(SlowClassifier {
                delay: Duration::from_secs(1),
            }),
            ClassifierMode::Worker { queue_capacity },
        )
        .unwrap()
    }

    /// Delivers silence at device pace: each read takes one frame period.
    struct PacedSilence;

    struct PacedStream {
        period: Duration,
        samples: usize,
    }

    impl AudioInput for PacedSilence {
        type Stream = PacedStream;

        fn open(&self, cfg: &CaptureConfig) -> Result<PacedStream> {
            Ok(PacedStream {
                period: Duration::from_millis(cfg.frame_ms()),
                samples: cfg.samples_per_frame(),
            })
        }

        fn describe(&self) -> String {
            "paced silence".to_string()
        }
    }

    impl FrameStream for PacedStream {
        fn read_frame(&mut self) -> Result<FrameRead> {
            std::thread::sleep(self.period);
            Ok(FrameRead::Frame(Frame::silent(self.samples)))
        }
    }

    #[test]
    fn captures_reference_utterance() {
        let mut orchestrator = orchestrator(CaptureConfig::default());
        let source = PcmSource::new().frames(utterance());
        let result = orchestrator
            .capture_one_utterance(&source, &CancelFlag::new())
            .unwrap();
        assert_eq!(result.stop_reason, StopReason::Normal);
        assert_eq!(result.frame_count, 41);
        assert_eq!(result.audio.len(), 41 * FRAME_SAMPLES);
        assert_eq!(result.sample_rate, SampleRate::Hz16000);
        assert_eq!(result.metrics.frames_processed, 41);
    }

    #[test]
    fn worker_mode_matches_inline_result() {
        let mut orchestrator = Orchestrator::new(
            CaptureConfig::default(),
            energy(),
            ClassifierMode::Worker { queue_capacity: 64 },
        )
        .unwrap();
        let mut script = utterance();
        // Slack so late verdicts never race the end of the script.
        script.extend(frames(40, silence));
        let source = PcmSource::new().frames(script);
        let result = orchestrator
            .capture_one_utterance(&source, &CancelFlag::new())
            .unwrap();
        assert_eq!(result.stop_reason, StopReason::Normal);
        assert_eq!(result.frame_count, 41);
        assert_eq!(result.metrics.classifier_drops, 0);
    }

    #[test]
    fn rejects_unsupported_rate_before_capture() {
        let config = CaptureConfig {
            sample_rate: SampleRate::Hz8000,
            ..CaptureConfig::default()
        };
        let err = Orchestrator::new(config, Box::new(WidebandOnly), ClassifierMode::Inline)
            .err()
            .expect("construction must fail");
        assert!(matches!(
            err,
            CaptureError::UnsupportedSampleRate {
                classifier: "wideband_only",
                sample_rate: 8_000
            }
        ));
    }

    #[test]
    fn rejects_inconsistent_config() {
        let config = CaptureConfig {
            min_silence_frames: 400,
            ..CaptureConfig::default()
        };
        let err = Orchestrator::new(config, energy(), ClassifierMode::Inline)
            .err()
            .expect("construction must fail");
        assert!(matches!(err, CaptureError::InvalidConfig(_)));
    }

    #[test]
    fn classifier_errors_count_as_silence() {
        let config = CaptureConfig {
            max_duration_frames: 20,
            min_silence_frames: 10,
            ..CaptureConfig::default()
        };
        let mut orchestrator =
            Orchestrator::new(config, Box::new(FailingClassifier), ClassifierMode::Inline).unwrap();
        let source = PcmSource::new().frames(frames(20, speech));
        let result = orchestrator
            .capture_one_utterance(&source, &CancelFlag::new())
            .unwrap();
        assert_eq!(result.stop_reason, StopReason::Timeout);
        assert_eq!(result.metrics.classifier_errors, 20);
        assert_eq!(result.metrics.speech_frames, 0);
    }

    #[test]
    fn stream_closed_discards_session() {
        let mut orchestrator = orchestrator(CaptureConfig::default());
        let mut script = frames(10, silence);
        script.extend(frames(12, speech));
        let source = PcmSource::new().frames(script);
        let err = orchestrator
            .capture_one_utterance(&source, &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, CaptureError::StreamClosed(_)));

        // The next capture starts clean.
        let source = PcmSource::new().frames(utterance());
        let result = orchestrator
            .capture_one_utterance(&source, &CancelFlag::new())
            .unwrap();
        assert_eq!(result.frame_count, 41);
    }

    #[test]
    fn stalled_source_still_times_out() {
        let config = CaptureConfig {
            max_duration_frames: 5,
            min_speech_frames: 2,
            min_silence_frames: 5,
            ..CaptureConfig::default()
        };
        let mut orchestrator = orchestrator(config);
        let source = PcmSource::new().stalls(5);
        let result = orchestrator
            .capture_one_utterance(&source, &CancelFlag::new())
            .unwrap();
        assert_eq!(result.stop_reason, StopReason::Timeout);
        assert!(result.is_empty());
        assert_eq!(result.metrics.stall_ticks, 5);
    }

    #[test]
    fn overflow_is_counted_not_fatal() {
        let mut orchestrator = orchestrator(CaptureConfig::default());
        let source = PcmSource::new().overflow(3).frames(utterance());
        let result = orchestrator
            .capture_one_utterance(&source, &CancelFlag::new())
            .unwrap();
        assert_eq!(result.stop_reason, StopReason::Normal);
        assert_eq!(result.metrics.frames_dropped, 3);
    }

    #[test]
    fn cancel_before_start_yields_empty_result() {
        let mut orchestrator = orchestrator(CaptureConfig::default());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let source = PcmSource::new().frames(utterance());
        let result = orchestrator.capture_one_utterance(&source, &cancel).unwrap();
        assert_eq!(result.stop_reason, StopReason::Cancelled);
        assert!(result.is_empty());
    }

    #[test]
    fn cancel_mid_utterance_keeps_partial_audio() {
        let cancel = CancelFlag::new();
        let classifier = CancelAfter {
            inner: EnergyClassifier::new(-40.0),
            flag: cancel.clone(),
            remaining: 12,
        };
        let mut orchestrator = Orchestrator::new(
            CaptureConfig::default(),
            Box::new(classifier),
            ClassifierMode::Inline,
        )
        .unwrap();
        let source = PcmSource::new().frames(frames(30, speech));
        let result = orchestrator.capture_one_utterance(&source, &cancel).unwrap();
        assert_eq!(result.stop_reason, StopReason::Cancelled);
        assert_eq!(result.frame_count, 12);
    }

    #[test]
    fn monitor_delivers_each_utterance_until_break() {
        let mut orchestrator = orchestrator(CaptureConfig::default());
        let mut script = utterance();
        script.extend(utterance());
        script.extend(utterance());
        let source = PcmSource::new().frames(script);

        let mut results = Vec::new();
        orchestrator
            .monitor_continuous(&source, &CancelFlag::new(), |result| {
                results.push(result);
                if results.len() == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();

        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.stop_reason, StopReason::Normal);
            assert_eq!(result.frame_count, 41);
            assert_eq!(result.metrics.lookback_frames, 10);
        }
    }

    #[test]
    fn monitor_returns_when_cancelled() {
        let mut orchestrator = orchestrator(CaptureConfig::default());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let source = PcmSource::new().frames(utterance());
        let mut calls = 0;
        orchestrator
            .monitor_continuous(&source, &cancel, |_| {
                calls += 1;
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn monitor_propagates_stream_loss() {
        let mut orchestrator = orchestrator(CaptureConfig::default());
        let source = PcmSource::new().frames(utterance());
        let mut calls = 0;
        let err = orchestrator
            .monitor_continuous(&source, &CancelFlag::new(), |_| {
                calls += 1;
                ControlFlow::Continue(())
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, CaptureError::StreamClosed(_)));
    }

    #[test]
    fn stuck_worker_still_reaches_safety_cutoff() {
        let config = CaptureConfig {
            max_duration_frames: 5,
            min_speech_frames: 2,
            min_silence_frames: 5,
            ..CaptureConfig::default()
        };
        let mut orchestrator = slow_worker(config, 2);
        let source = PcmSource::new().frames(frames(40, silence));
        let result = orchestrator
            .capture_one_utterance(&source, &CancelFlag::new())
            .unwrap();
        assert_eq!(result.stop_reason, StopReason::Timeout);
        assert_eq!(result.metrics.frames_processed, 5);
        assert_eq!(result.metrics.classifier_drops, 5);
        assert_eq!(result.metrics.speech_frames, 0);
    }

    #[test]
    fn worker_wait_fits_inside_the_read_period() {
        let config = CaptureConfig {
            max_duration_frames: 10,
            min_speech_frames: 2,
            min_silence_frames: 5,
            ..CaptureConfig::default()
        };
        let mut orchestrator = slow_worker(config, 2);
        let started = Instant::now();
        let result = orchestrator
            .capture_one_utterance(&PacedSilence, &CancelFlag::new())
            .unwrap();
        let elapsed = started.elapsed();
        assert_eq!(result.stop_reason, StopReason::Timeout);
        assert_eq!(result.metrics.frames_processed, 10);
        // Ten 30 ms reads plus one to expire the last verdict; a second
        // blocking wait per frame would double this.
        assert!(elapsed < Duration::from_millis(480), "took {elapsed:?}");
    }

    #[test]
    fn monitor_session_boundary_does_not_wait_on_slow_worker() {
        let config = CaptureConfig {
            max_duration_frames: 3,
            min_speech_frames: 2,
            min_silence_frames: 3,
            ..CaptureConfig::default()
        };
        let mut orchestrator = slow_worker(config, 1);
        let source = PcmSource::new().frames(frames(40, silence));
        let mut finished = Vec::new();
        orchestrator
            .monitor_continuous(&source, &CancelFlag::new(), |result| {
                assert_eq!(result.stop_reason, StopReason::Timeout);
                finished.push(Instant::now());
                if finished.len() == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        for pair in finished.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap < Duration::from_millis(500), "boundary took {gap:?}");
        }
    }

    #[test]
    fn worker_stall_ticks_fold_after_earlier_frames() {
        let config = CaptureConfig {
            max_duration_frames: 2,
            min_speech_frames: 2,
            min_silence_frames: 2,
            ..CaptureConfig::default()
        };
        let mut orchestrator = Orchestrator::new(
            config,
            Box::new(SlowClassifier {
                delay: Duration::from_millis(100),
            }),
            ClassifierMode::Worker { queue_capacity: 4 },
        )
        .unwrap();
        let source = PcmSource::new().frames(frames(2, silence)).stalls(10);
        let result = orchestrator
            .capture_one_utterance(&source, &CancelFlag::new())
            .unwrap();
        assert_eq!(result.stop_reason, StopReason::Timeout);
        assert_eq!(result.frame_count, 2);
        assert_eq!(result.metrics.frames_processed, 2);
        assert_eq!(result.metrics.stall_ticks, 0);
    }
}
