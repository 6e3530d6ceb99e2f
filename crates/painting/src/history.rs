//! Snapshot history for undo
//!
//! Each entry is a full, independent copy of the canvas taken right before a
//! stroke or a clear. There is no redo: popped snapshots are gone.

use std::collections::VecDeque;

use tracing::debug;

use crate::types::Rgba;

/// Immutable full copy of the canvas pixels
#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot {
    width: u32,
    height: u32,
    pixels: Box<[Rgba]>,
    /// Background at capture time, restored along with the pixels
    background: Option<Rgba>,
}

impl Snapshot {
    /// Copy `pixels` into a new snapshot
    pub fn capture(width: u32, height: u32, pixels: &[Rgba]) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels: pixels.into(),
            background: None,
        }
    }

    /// Remember the background so undoing a recolored clear restores it
    pub fn with_background(mut self, background: Rgba) -> Self {
        self.background = Some(background);
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn background(&self) -> Option<Rgba> {
        self.background
    }

    /// Approximate memory held by this snapshot
    pub fn byte_size(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<Rgba>()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// LIFO stack of snapshots with optional FIFO eviction of the oldest entry
#[derive(Debug, Default)]
pub struct HistoryStack {
    snapshots: VecDeque<Snapshot>,
    /// Maximum entries kept, `None` for unbounded
    capacity: Option<usize>,
}

impl HistoryStack {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            snapshots: VecDeque::new(),
            // A zero bound would make every push a no-op; treat it as unbounded
            capacity: capacity.filter(|&c| c > 0),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Copy `pixels` and push the copy. Evicts the oldest entry when full.
    pub fn push_snapshot(&mut self, width: u32, height: u32, pixels: &[Rgba]) {
        self.push(Snapshot::capture(width, height, pixels));
    }

    /// Push an already captured snapshot
    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push_back(snapshot);
        if let Some(capacity) = self.capacity {
            while self.snapshots.len() > capacity {
                self.snapshots.pop_front();
                debug!("History full ({}), evicted oldest snapshot", capacity);
            }
        }
    }

    /// Pop the most recent snapshot, or None when there is nothing to undo
    pub fn undo(&mut self) -> Option<Snapshot> {
        self.snapshots.pop_back()
    }

    /// Most recent snapshot without removing it
    pub fn peek(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Drop every snapshot (canvas re-initialized or resized)
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Memory held by all snapshots
    pub fn byte_size(&self) -> usize {
        self.snapshots.iter().map(Snapshot::byte_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(value: u8) -> Vec<Rgba> {
        vec![[value, value, value, 255]; 4]
    }

    #[test]
    fn test_undo_empty_returns_none() {
        let mut history = HistoryStack::unbounded();
        assert!(history.undo().is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn test_lifo_order() {
        let mut history = HistoryStack::unbounded();
        history.push_snapshot(2, 2, &filled(1));
        history.push_snapshot(2, 2, &filled(2));
        history.push_snapshot(2, 2, &filled(3));

        assert_eq!(history.undo().unwrap().pixels(), filled(3).as_slice());
        assert_eq!(history.undo().unwrap().pixels(), filled(2).as_slice());
        assert_eq!(history.undo().unwrap().pixels(), filled(1).as_slice());
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut history = HistoryStack::unbounded();
        let mut live = filled(10);
        history.push_snapshot(2, 2, &live);
        live[0] = [0, 0, 0, 0];

        assert_eq!(history.peek().unwrap().pixels()[0], [10, 10, 10, 255]);
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let mut history = HistoryStack::new(Some(2));
        for value in 1..=4 {
            history.push_snapshot(2, 2, &filled(value));
        }

        assert_eq!(history.len(), 2);
        assert_eq!(history.undo().unwrap().pixels(), filled(4).as_slice());
        assert_eq!(history.undo().unwrap().pixels(), filled(3).as_slice());
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let history = HistoryStack::new(Some(0));
        assert_eq!(history.capacity(), None);
    }

    #[test]
    fn test_byte_size() {
        let mut history = HistoryStack::unbounded();
        history.push_snapshot(2, 2, &filled(1));
        history.push_snapshot(2, 2, &filled(2));
        assert_eq!(history.byte_size(), 2 * 4 * 4);
        history.clear();
        assert_eq!(history.byte_size(), 0);
    }
}
