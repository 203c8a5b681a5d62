//! Fixed-capacity frame ring buffer with a movable read cursor.
//!
//! The store is insertion-ordered FIFO: when full, the oldest frame is
//! evicted first. A read cursor lets consumers step backwards through
//! recent history independently of the write position; every insertion
//! snaps the cursor back to the newest frame (live-tail-follow).
//!
//! Single-writer / multiple-reader: only the connection manager
//! mutates the store, consumers read through a shared handle.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::frame::BufferedFrame;

/// Bounded, insertion-ordered buffer of decoded frames.
#[derive(Debug)]
pub struct FrameStore {
    frames: VecDeque<Arc<BufferedFrame>>,
    capacity: usize,
    /// Read cursor. Invariant: `cursor < frames.len()` whenever the
    /// store is non-empty; meaningless (0) when empty.
    cursor: usize,
}

impl FrameStore {
    /// Create a store holding at most `capacity` frames.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "frame store capacity must be non-zero");
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// Append a frame, evicting the oldest when over capacity.
    ///
    /// The cursor is reset to the newest frame after every insertion.
    pub fn add_frame(&mut self, frame: Arc<BufferedFrame>) {
        self.frames.push_back(frame);
        if self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
        self.cursor = self.frames.len() - 1;
    }

    /// The most recently inserted frame.
    pub fn latest_frame(&self) -> Option<Arc<BufferedFrame>> {
        self.frames.back().cloned()
    }

    /// Random access by position; out-of-range returns `None`.
    pub fn frame_at(&self, index: usize) -> Option<Arc<BufferedFrame>> {
        self.frames.get(index).cloned()
    }

    /// The frame at the read cursor.
    pub fn current_frame(&self) -> Option<Arc<BufferedFrame>> {
        self.frames.get(self.cursor).cloned()
    }

    /// Advance the cursor by one, clamped to the newest frame, and
    /// return the frame now at the cursor.
    pub fn next_frame(&mut self) -> Option<Arc<BufferedFrame>> {
        if !self.frames.is_empty() && self.cursor + 1 < self.frames.len() {
            self.cursor += 1;
        }
        self.current_frame()
    }

    /// Step the cursor back by one, clamped to the oldest frame, and
    /// return the frame now at the cursor.
    pub fn previous_frame(&mut self) -> Option<Arc<BufferedFrame>> {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
        self.current_frame()
    }

    /// Snap the cursor to the newest frame.
    pub fn seek_to_latest(&mut self) {
        if !self.frames.is_empty() {
            self.cursor = self.frames.len() - 1;
        }
    }

    /// Evict frames older than `max_age_ms` from the head.
    ///
    /// Returns the number of frames evicted. The cursor shifts left by
    /// the same count, floored at zero, so it keeps pointing at the
    /// same frame when that frame survives.
    pub fn drop_old_frames(&mut self, max_age_ms: i64, now_ms: i64) -> usize {
        let mut dropped = 0;
        while let Some(frame) = self.frames.front() {
            if now_ms - frame.received_at > max_age_ms {
                self.frames.pop_front();
                dropped += 1;
            } else {
                break;
            }
        }
        self.cursor = self.cursor.saturating_sub(dropped);
        if self.frames.is_empty() {
            self.cursor = 0;
        }
        dropped
    }

    /// Buffer fill level in `[0, 1]`.
    pub fn buffer_health(&self) -> f64 {
        self.frames.len() as f64 / self.capacity as f64
    }

    /// Drop every frame and reset the cursor.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.cursor = 0;
    }

    /// Number of buffered frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the store holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Configured maximum number of frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameMetadata;
    use bytes::Bytes;

    fn frame(frame_id: u32, received_at: i64) -> Arc<BufferedFrame> {
        let metadata = FrameMetadata {
            width: 10,
            height: 10,
            compressed: false,
            timestamp: received_at,
            frame_id,
            latency: Some(0),
        };
        Arc::new(BufferedFrame::new(Bytes::from(vec![0u8; 400]), metadata, received_at).unwrap())
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut store = FrameStore::new(3);
        for i in 0..20 {
            store.add_frame(frame(i, i as i64));
            assert!(store.len() <= 3);
        }
    }

    #[test]
    fn keeps_last_n_in_arrival_order() {
        // Five 10x10 frames into capacity 3: frames 3..=5 survive.
        let mut store = FrameStore::new(3);
        for i in 1..=5 {
            store.add_frame(frame(i, 0));
        }
        assert_eq!(store.len(), 3);
        assert_eq!(store.frame_at(0).unwrap().metadata.frame_id, 3);
        assert_eq!(store.frame_at(1).unwrap().metadata.frame_id, 4);
        assert_eq!(store.latest_frame().unwrap().metadata.frame_id, 5);
    }

    #[test]
    fn cursor_follows_tail_on_insert() {
        let mut store = FrameStore::new(4);
        store.add_frame(frame(1, 0));
        store.add_frame(frame(2, 0));
        store.previous_frame();
        assert_eq!(store.current_frame().unwrap().metadata.frame_id, 1);

        // Insertion snaps the cursor back to the newest frame.
        store.add_frame(frame(3, 0));
        assert_eq!(store.current_frame().unwrap().metadata.frame_id, 3);
    }

    #[test]
    fn seek_to_latest_matches_latest() {
        let mut store = FrameStore::new(5);
        for i in 0..4 {
            store.add_frame(frame(i, 0));
        }
        store.previous_frame();
        store.previous_frame();
        store.seek_to_latest();
        let current = store.current_frame().unwrap();
        let latest = store.latest_frame().unwrap();
        assert!(Arc::ptr_eq(&current, &latest));
    }

    #[test]
    fn navigation_clamps_at_bounds() {
        let mut store = FrameStore::new(3);
        store.add_frame(frame(1, 0));
        store.add_frame(frame(2, 0));

        // Already at the tail: next stays put.
        assert_eq!(store.next_frame().unwrap().metadata.frame_id, 2);

        assert_eq!(store.previous_frame().unwrap().metadata.frame_id, 1);
        // At the head: previous stays put.
        assert_eq!(store.previous_frame().unwrap().metadata.frame_id, 1);
    }

    #[test]
    fn empty_store_returns_none() {
        let mut store = FrameStore::new(3);
        assert!(store.latest_frame().is_none());
        assert!(store.current_frame().is_none());
        assert!(store.next_frame().is_none());
        assert!(store.previous_frame().is_none());
        assert!(store.frame_at(0).is_none());
    }

    #[test]
    fn frame_at_out_of_range_is_none() {
        let mut store = FrameStore::new(3);
        store.add_frame(frame(1, 0));
        assert!(store.frame_at(1).is_none());
        assert!(store.frame_at(99).is_none());
    }

    #[test]
    fn drop_old_frames_evicts_from_head() {
        let mut store = FrameStore::new(10);
        store.add_frame(frame(1, 100));
        store.add_frame(frame(2, 200));
        store.add_frame(frame(3, 900));

        // At t=1000 with max age 500, frames received at 100 and 200 go.
        let dropped = store.drop_old_frames(500, 1000);
        assert_eq!(dropped, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.frame_at(0).unwrap().metadata.frame_id, 3);
    }

    #[test]
    fn drop_old_frames_is_idempotent() {
        let mut store = FrameStore::new(10);
        store.add_frame(frame(1, 100));
        store.add_frame(frame(2, 900));

        assert_eq!(store.drop_old_frames(500, 1000), 1);
        assert_eq!(store.drop_old_frames(500, 1000), 0);
    }

    #[test]
    fn drop_old_frames_shifts_cursor() {
        let mut store = FrameStore::new(10);
        for i in 0..4 {
            store.add_frame(frame(i, i as i64 * 100));
        }
        // Cursor at index 3 (newest). Drop the two oldest.
        assert_eq!(store.drop_old_frames(150, 400), 2);
        assert_eq!(store.cursor(), 1);
        assert_eq!(store.current_frame().unwrap().metadata.frame_id, 3);

        // Cursor floors at zero when more frames are dropped than
        // remain to its left.
        store.previous_frame();
        assert_eq!(store.drop_old_frames(50, 400), 1);
        assert_eq!(store.cursor(), 0);
    }

    #[test]
    fn buffer_health_in_unit_range() {
        let mut store = FrameStore::new(4);
        assert_eq!(store.buffer_health(), 0.0);
        store.add_frame(frame(1, 0));
        assert_eq!(store.buffer_health(), 0.25);
        for i in 2..=6 {
            store.add_frame(frame(i, 0));
        }
        assert_eq!(store.buffer_health(), 1.0);
    }

    #[test]
    fn clear_empties_and_resets() {
        let mut store = FrameStore::new(3);
        store.add_frame(frame(1, 0));
        store.add_frame(frame(2, 0));
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.cursor(), 0);
        assert!(store.current_frame().is_none());
    }
}
