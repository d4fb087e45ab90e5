//! Rolling window of recent frames for movement classification.

use std::collections::VecDeque;

use crate::hand::FrameSample;

/// Window length for the stable pipeline.
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Window length for the video-capable variant.
pub const VIDEO_WINDOW_SIZE: usize = 30;

/// Bounded FIFO of the last `capacity` frames, oldest first.
#[derive(Debug, Clone)]
pub struct ClassificationWindow {
    frames: VecDeque<FrameSample>,
    capacity: usize,
}

impl ClassificationWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest on overflow.
    pub fn push(&mut self, frame: FrameSample) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
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

    /// Whether the window holds `capacity` frames.
    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    /// Most recent frame.
    pub fn latest(&self) -> Option<&FrameSample> {
        self.frames.back()
    }

    /// Frames in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = &FrameSample> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Default for ClassificationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}
