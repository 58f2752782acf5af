use super::Frame;
use std::collections::VecDeque;

/// Most recent frames observed before onset was confirmed.
///
/// Lookback is best-effort: once full, each push silently evicts the oldest
/// frame. Owned by a single state machine, so no locking.
#[derive(Debug, Clone, PartialEq)]
pub struct LookbackRingBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl LookbackRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, frame: Frame) {
        if self.capacity == 0 {
            return;
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Remove and return every retained frame, oldest first.
    pub fn drain(&mut self) -> Vec<Frame> {
        self.frames.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
