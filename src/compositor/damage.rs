//! Damage accumulation
//!
//! Each output accumulates the layout-space rectangles that changed since
//! its last composited frame. Because presentation is double buffered, a
//! frame repaints the union of the current damage and the previous frame's
//! damage; when both are empty the frame is skipped outright.

use crate::compositor::geometry::{Rect, Region};

/// Per-output damage accumulator
#[derive(Debug, Default)]
pub struct DamageTracker {
    /// Output box in layout coordinates
    bounds: Rect,
    /// Damage accumulated since the last frame
    current: Region,
    /// Damage painted by the last frame (still missing from the back buffer)
    previous: Vec<Rect>,
}

impl DamageTracker {
    /// Create a tracker for an output box
    pub fn new(bounds: Rect) -> Self {
        let mut tracker = Self {
            bounds,
            current: Region::new(),
            previous: Vec::new(),
        };
        // Everything needs painting at least once.
        tracker.damage_whole();
        tracker
    }

    /// Update the output box (mode or position change); damages everything
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.damage_whole();
    }

    /// The tracked output box
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Damage a layout-space rectangle, clipped to the output
    pub fn damage(&mut self, rect: Rect) {
        let clipped = rect.intersection(&self.bounds);
        if !clipped.is_empty() {
            self.current.add(clipped);
        }
    }

    /// Damage the entire output
    pub fn damage_whole(&mut self) {
        self.current.clear();
        self.current.add(self.bounds);
    }

    /// True if the next frame can be skipped entirely
    pub fn idle(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }

    /// Pending damage (for inspection; does not consume)
    pub fn pending(&self) -> &Region {
        &self.current
    }

    /// Snapshot the repaint set for one frame and rotate the history.
    /// Returns `None` when the frame should be skipped.
    pub fn frame(&mut self) -> Option<Vec<Rect>> {
        if self.idle() {
            return None;
        }
        let current = self.current.take();
        let mut repaint = Region::new();
        for rect in current.iter().chain(self.previous.iter()) {
            repaint.add(*rect);
        }
        self.previous = current;
        Some(repaint.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_frame_paints_everything() {
        let mut tracker = DamageTracker::new(Rect::new(0, 0, 800, 600));
        let repaint = tracker.frame().unwrap();
        assert_eq!(repaint, vec![Rect::new(0, 0, 800, 600)]);
    }

    #[test]
    fn test_idle_skips_frames() {
        let mut tracker = DamageTracker::new(Rect::new(0, 0, 800, 600));
        tracker.frame(); // initial full paint
        tracker.frame(); // swap catch-up for the second buffer
        assert!(tracker.idle());
        assert!(tracker.frame().is_none());
    }

    #[test]
    fn test_damage_clipped_to_output() {
        let mut tracker = DamageTracker::new(Rect::new(0, 0, 100, 100));
        tracker.frame();
        tracker.frame();

        tracker.damage(Rect::new(90, 90, 50, 50));
        let repaint = tracker.frame().unwrap();
        assert_eq!(repaint, vec![Rect::new(90, 90, 10, 10)]);
        tracker.frame(); // swap catch-up

        // Entirely off-output damage is dropped.
        tracker.damage(Rect::new(500, 500, 10, 10));
        assert!(tracker.idle());
    }

    #[test]
    fn test_double_buffer_history() {
        let mut tracker = DamageTracker::new(Rect::new(0, 0, 100, 100));
        tracker.frame();
        tracker.frame();

        tracker.damage(Rect::new(0, 0, 10, 10));
        assert_eq!(tracker.frame().unwrap(), vec![Rect::new(0, 0, 10, 10)]);

        // The next frame still repaints the rect for the other buffer.
        tracker.damage(Rect::new(20, 20, 5, 5));
        let repaint = tracker.frame().unwrap();
        assert!(repaint.contains(&Rect::new(0, 0, 10, 10)));
        assert!(repaint.contains(&Rect::new(20, 20, 5, 5)));
    }
}
