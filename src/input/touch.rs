//! Touch device wrapper

use std::collections::HashMap;

/// One touch device; tracks active touch points by protocol id
#[derive(Debug)]
pub struct Touch {
    /// Device name from the adapter
    pub name: String,
    /// Active touch points in layout coordinates
    points: HashMap<i32, (f64, f64)>,
}

impl Touch {
    /// Create a touch wrapper
    pub fn new(name: String) -> Self {
        Self {
            name,
            points: HashMap::new(),
        }
    }

    /// Record a touch-down
    pub fn down(&mut self, id: i32, x: f64, y: f64) {
        self.points.insert(id, (x, y));
    }

    /// Update a touch point; ignored for unknown ids
    pub fn motion(&mut self, id: i32, x: f64, y: f64) {
        if let Some(point) = self.points.get_mut(&id) {
            *point = (x, y);
        }
    }

    /// Record a touch-up. Erase-if-present.
    pub fn up(&mut self, id: i32) -> bool {
        self.points.remove(&id).is_some()
    }

    /// Position of an active touch point
    pub fn point(&self, id: i32) -> Option<(f64, f64)> {
        self.points.get(&id).copied()
    }

    /// Number of active touch points
    pub fn active_points(&self) -> usize {
        self.points.len()
    }
}
