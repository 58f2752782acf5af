//! Off-thread classification for backends too slow to run inline.
//!
//! Frames go out over a bounded queue with `try_send`; when the queue is full
//! the caller is told immediately and nothing blocks. Verdicts come back
//! tagged with the sequence number assigned at submission.

use super::vad::{ClassificationResult, FrameClassifier};
use super::{Frame, SampleRate};
use crate::error::{CaptureError, ClassifierError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

struct Job {
    seq: u64,
    frame: Frame,
    sample_rate: SampleRate,
}

/// Signals the worker reads before each job. Neither ever waits on the queue.
#[derive(Default)]
struct WorkerControl {
    /// Reset the classifier before the first job with `seq >= reset_from`.
    reset_from: AtomicU64,
    shutdown: AtomicBool,
}

/// One classified frame coming back from the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerVerdict {
    pub seq: u64,
    pub outcome: std::result::Result<ClassificationResult, ClassifierError>,
}

/// Owns a classifier on a dedicated thread.
pub struct ClassifierWorker {
    jobs: Option<Sender<Job>>,
    verdicts: Receiver<WorkerVerdict>,
    control: Arc<WorkerControl>,
    handle: Option<JoinHandle<()>>,
    next_seq: u64,
    name: &'static str,
}

impl ClassifierWorker {
    pub fn spawn(
        mut classifier: Box<dyn FrameClassifier + Send>,
        queue_capacity: usize,
    ) -> Result<Self> {
        let name = classifier.name();
        let (job_tx, job_rx) = bounded::<Job>(queue_capacity.max(1));
        let (verdict_tx, verdict_rx) = unbounded::<WorkerVerdict>();
        let control = Arc::new(WorkerControl::default());
        let worker_control = Arc::clone(&control);
        let handle = thread::Builder::new()
            .name("voicegate-classifier".to_string())
            .spawn(move || {
                let mut applied_reset = 0;
                for job in job_rx.iter() {
                    if worker_control.shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    let reset_from = worker_control.reset_from.load(Ordering::Acquire);
                    if reset_from > applied_reset && job.seq >= reset_from {
                        classifier.reset();
                        applied_reset = reset_from;
                    }
                    let outcome = classifier.classify(&job.frame, job.sample_rate);
                    let verdict = WorkerVerdict {
                        seq: job.seq,
                        outcome,
                    };
                    if verdict_tx.send(verdict).is_err() {
                        break;
                    }
                }
                debug!("classifier worker exiting");
            })
            .map_err(|err| CaptureError::Worker(format!("failed to spawn thread: {err}")))?;

        Ok(Self {
            jobs: Some(job_tx),
            verdicts: verdict_rx,
            control,
            handle: Some(handle),
            next_seq: 0,
            name,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queue a frame. `Ok(None)` means the queue was full and the frame was
    /// not submitted.
    pub fn submit(&mut self, frame: Frame, sample_rate: SampleRate) -> Result<Option<u64>> {
        let seq = self.next_seq;
        let jobs = self.jobs.as_ref().ok_or_else(worker_gone)?;
        match jobs.try_send(Job {
            seq,
            frame,
            sample_rate,
        }) {
            Ok(()) => {
                self.next_seq += 1;
                Ok(Some(seq))
            }
            Err(TrySendError::Full(_)) => Ok(None),
            Err(TrySendError::Disconnected(_)) => Err(worker_gone()),
        }
    }

    /// Reset the classifier once the frames already queued are scored.
    /// Returns immediately, even with a full queue.
    pub fn reset(&self) {
        self.control
            .reset_from
            .store(self.next_seq, Ordering::Release);
    }

    pub fn try_recv(&self) -> Option<WorkerVerdict> {
        self.verdicts.try_recv().ok()
    }

    /// Wait up to `timeout` for the next verdict. `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerVerdict>> {
        match self.verdicts.recv_timeout(timeout) {
            Ok(verdict) => Ok(Some(verdict)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(worker_gone()),
        }
    }
}

fn worker_gone() -> CaptureError {
    CaptureError::Worker("classifier worker has exited".to_string())
}

impl Drop for ClassifierWorker {
    fn drop(&mut self) {
        // Queued jobs are abandoned; only a frame already being scored finishes.
        self.control.shutdown.store(true, Ordering::Release);
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(classifier = self.name, "classifier worker panicked");
            }
        }
    }
}
