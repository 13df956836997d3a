//! Deferred release of GPU resources.
//!
//! Submissions are fire-and-forget, so a resource may still be referenced by
//! work the GPU has not finished. Items are parked here tagged with the frame
//! that retired them and dropped only once that frame is known complete.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct RetirementQueue<T> {
    // Frame indices are non-decreasing from front to back.
    pending: VecDeque<(u64, T)>,
}

impl<T> Default for RetirementQueue<T> {
    fn default() -> Self {
        RetirementQueue {
            pending: VecDeque::new(),
        }
    }
}

impl<T> RetirementQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retire(&mut self, frame: u64, item: T) {
        debug_assert!(self.pending.back().map_or(true, |(last, _)| *last <= frame));
        self.pending.push_back((frame, item));
    }

    /// Drops every item retired at or before `completed_frame`. Returns how
    /// many were released.
    pub fn release_through(&mut self, completed_frame: u64) -> usize {
        let mut released = 0;
        while let Some((frame, _)) = self.pending.front() {
            if *frame > completed_frame {
                break;
            }
            self.pending.pop_front();
            released += 1;
        }
        released
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Tracks the newest frame whose submission the GPU has finished. Frame
/// indices start at 1; 0 means nothing has completed yet.
#[derive(Clone, Default)]
pub struct FrameFence {
    completed: Arc<AtomicU64>,
}

impl FrameFence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn signal(&self, frame: u64) {
        self.completed.fetch_max(frame, Ordering::AcqRel);
    }

    /// Arranges for `frame` to be signalled once everything submitted to
    /// `queue` so far has executed. Callbacks run from `Device::poll`.
    pub fn signal_on_completion(&self, queue: &wgpu::Queue, frame: u64) {
        let fence = self.clone();
        queue.on_submitted_work_done(move || fence.signal(frame));
    }
}
