//! Burst accumulation.

use std::collections::VecDeque;
use tracing::{debug, trace};

use crate::ensemble::Ensemble;

/// Buffered frames and burst counters, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingStatus {
    pub buffered: usize,
    pub total_ensembles: usize,
    pub vertical_ensembles: usize,
}

/// FIFO of frames waiting to form a burst.
///
/// Vertical frames count toward both counters, four-beam frames only toward
/// the total. A burst of `N` frames is released when either
///
/// - no vertical frame has been seen and the total has reached `N`, or
/// - the vertical count has reached `N`,
///
/// and at least `N` frames are buffered.
#[derive(Debug)]
pub struct BurstBuffer {
    frames: VecDeque<Ensemble>,
    burst_size: usize,
    total_ensembles: usize,
    vertical_ensembles: usize,
}

impl BurstBuffer {
    pub fn new(burst_size: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(burst_size.min(4096)),
            burst_size,
            total_ensembles: 0,
            vertical_ensembles: 0,
        }
    }

    /// Append a frame, returning the released burst if this frame completed one.
    pub fn push(&mut self, frame: Ensemble) -> Option<Vec<Ensemble>> {
        if frame.is_vertical() {
            self.vertical_ensembles += 1;
        }
        self.total_ensembles += 1;
        self.frames.push_back(frame);
        trace!(
            "Buffered {} frames (total {}, vertical {})",
            self.frames.len(),
            self.total_ensembles,
            self.vertical_ensembles
        );

        let n = self.burst_size;
        let four_beam_ready = self.vertical_ensembles == 0 && self.total_ensembles >= n;
        let vertical_ready = self.vertical_ensembles >= n;
        if n == 0 || self.frames.len() < n || !(four_beam_ready || vertical_ready) {
            return None;
        }

        let batch: Vec<Ensemble> = self.frames.drain(..n).collect();
        if self.total_ensembles >= n {
            self.total_ensembles -= n;
        }
        if self.vertical_ensembles >= n {
            self.vertical_ensembles -= n;
        }
        debug!(
            "Released burst of {} frames via {} path, {} still buffered",
            batch.len(),
            if vertical_ready { "vertical" } else { "four-beam" },
            self.frames.len()
        );
        Some(batch)
    }

    /// Change the burst size. Buffered frames and counters are kept and the new
    /// size applies from the next push.
    pub fn set_burst_size(&mut self, burst_size: usize) {
        self.burst_size = burst_size;
    }

    pub fn burst_size(&self) -> usize {
        self.burst_size
    }

    pub fn pending(&self) -> PendingStatus {
        PendingStatus {
            buffered: self.frames.len(),
            total_ensembles: self.total_ensembles,
            vertical_ensembles: self.vertical_ensembles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{four_beam_frame, vertical_frame};
    use proptest::prelude::*;

    #[test]
    fn exactly_n_four_beam_frames_flush_once() {
        let mut buffer = BurstBuffer::new(8);
        for i in 0..7 {
            assert!(buffer.push(four_beam_frame(i, 4)).is_none());
        }
        let batch = buffer.push(four_beam_frame(7, 4)).unwrap();
        assert_eq!(batch.len(), 8);
        assert_eq!(batch[0].ensemble_data.as_ref().unwrap().ensemble_number, 0);
        assert_eq!(buffer.pending(), PendingStatus::default());
    }

    #[test]
    fn interleaved_burst_flushes_on_vertical_count() {
        // V F V F V F V: the vertical count reaches 4 on the seventh frame
        let mut buffer = BurstBuffer::new(4);
        let mut released = None;
        for i in 0..7 {
            let frame = if i % 2 == 0 { vertical_frame(i, 4) } else { four_beam_frame(i, 4) };
            let out = buffer.push(frame);
            if i < 6 {
                assert!(out.is_none(), "flushed early at frame {}", i);
            } else {
                released = out;
            }
        }
        let batch = released.unwrap();
        assert_eq!(batch.len(), 4);
        assert!(batch[0].is_vertical());
        assert!(!batch[1].is_vertical());
        assert_eq!(
            buffer.pending(),
            PendingStatus { buffered: 3, total_ensembles: 3, vertical_ensembles: 0 }
        );
    }

    #[test]
    fn resize_keeps_buffered_frames() {
        let mut buffer = BurstBuffer::new(10);
        for i in 0..3 {
            assert!(buffer.push(four_beam_frame(i, 4)).is_none());
        }
        buffer.set_burst_size(4);
        assert_eq!(buffer.pending().buffered, 3);
        assert_eq!(buffer.push(four_beam_frame(3, 4)).map(|b| b.len()), Some(4));
    }

    proptest! {
        #[test]
        fn four_beam_stream_flushes_every_n(n in 1usize..12, frames in 0usize..60) {
            let mut buffer = BurstBuffer::new(n);
            let mut flushes = 0;
            for i in 0..frames {
                if let Some(batch) = buffer.push(four_beam_frame(i as i32, 2)) {
                    prop_assert_eq!(batch.len(), n);
                    flushes += 1;
                }
            }
            prop_assert_eq!(flushes, frames / n);
            prop_assert_eq!(buffer.pending().buffered, frames % n);
            prop_assert_eq!(buffer.pending().total_ensembles, frames % n);
        }
    }
}
