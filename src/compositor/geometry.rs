//! Geometry primitives
//!
//! Layout-space rectangles and damage regions. All coordinates are in
//! layout pixels; view positions are floating point but damage and
//! arrangement work on integer boxes.

/// A rectangle in layout coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a rectangle from position and size
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A zero-sized rectangle at the origin
    pub fn zero() -> Self {
        Self::default()
    }

    /// True if the rectangle has no area
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Area in square pixels (0 for degenerate rectangles)
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    /// True if the point lies inside the rectangle
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x as f64
            && py >= self.y as f64
            && px < (self.x + self.width) as f64
            && py < (self.y + self.height) as f64
    }

    /// True if the two rectangles overlap
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Intersection of two rectangles (empty rect if disjoint)
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);
        if x2 <= x1 || y2 <= y1 {
            Rect::zero()
        } else {
            Rect::new(x1, y1, x2 - x1, y2 - y1)
        }
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = (self.x + self.width).max(other.x + other.width);
        let y2 = (self.y + self.height).max(other.y + other.height);
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// True if `other` lies entirely inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        !other.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }

    /// Grow the rectangle by `by` pixels on every side
    pub fn expand(&self, by: i32) -> Rect {
        Rect::new(
            self.x - by,
            self.y - by,
            self.width + 2 * by,
            self.height + 2 * by,
        )
    }

    /// Center point of the rectangle
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// Bounding box of `rect` rotated by `rotation` radians about its center.
///
/// Damage and hit tests for rotated views work on this box rather than the
/// exact rotated quad.
pub fn rotated_bounds(rect: &Rect, rotation: f32) -> Rect {
    if rotation == 0.0 || rect.is_empty() {
        return *rect;
    }
    let (cx, cy) = rect.center();
    let (sin, cos) = (rotation as f64).sin_cos();
    let hw = rect.width as f64 / 2.0;
    let hh = rect.height as f64 / 2.0;
    let ext_w = hw * cos.abs() + hh * sin.abs();
    let ext_h = hw * sin.abs() + hh * cos.abs();
    Rect::new(
        (cx - ext_w).floor() as i32,
        (cy - ext_h).floor() as i32,
        (ext_w * 2.0).ceil() as i32,
        (ext_h * 2.0).ceil() as i32,
    )
}

/// Map a layout-space point into the local space of a box rotated by
/// `rotation` radians about its center. Returns coordinates relative to the
/// box origin.
pub fn rotate_point_into(rect: &Rect, rotation: f32, lx: f64, ly: f64) -> (f64, f64) {
    let (cx, cy) = rect.center();
    if rotation == 0.0 {
        return (lx - rect.x as f64, ly - rect.y as f64);
    }
    let (sin, cos) = (-rotation as f64).sin_cos();
    let dx = lx - cx;
    let dy = ly - cy;
    let rx = dx * cos - dy * sin;
    let ry = dx * sin + dy * cos;
    (
        rx + rect.width as f64 / 2.0,
        ry + rect.height as f64 / 2.0,
    )
}

/// An accumulated set of damage rectangles.
///
/// Rects are kept coarse: a new rect already covered by an existing one is
/// dropped, and existing rects covered by a new one are removed. This keeps
/// the per-frame scissor list short without full region arithmetic.
#[derive(Debug, Default, Clone)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// Create an empty region
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rectangle to the region
    pub fn add(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        if self.rects.iter().any(|r| r.contains_rect(&rect)) {
            return;
        }
        self.rects.retain(|r| !rect.contains_rect(r));
        self.rects.push(rect);
    }

    /// True if nothing is damaged
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of rectangles currently held
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// The held rectangles
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Snapshot the region and leave it empty
    pub fn take(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.rects)
    }

    /// Bounding box of the whole region
    pub fn bounds(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::zero(), |acc, r| acc.union(r))
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        let i = a.intersection(&b);
        assert_eq!(i, Rect::new(50, 50, 50, 50));
        assert!(a.intersects(&b));

        let c = Rect::new(200, 200, 10, 10);
        assert!(!a.intersects(&c));
        assert!(a.intersection(&c).is_empty());
    }

    #[test]
    fn test_rect_union() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 10, 10);
        assert_eq!(a.union(&b), Rect::new(0, 0, 30, 30));
        assert_eq!(a.union(&Rect::zero()), a);
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(10, 10, 20, 20);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(29.9, 29.9));
        assert!(!r.contains(30.0, 30.0));
        assert!(!r.contains(9.9, 15.0));
    }

    #[test]
    fn test_rotated_bounds_quarter_turn() {
        let r = Rect::new(0, 0, 100, 50);
        let b = rotated_bounds(&r, std::f32::consts::FRAC_PI_2);
        // A 90 degree turn swaps the extents about the same center.
        assert!(b.width >= 50 && b.width <= 52);
        assert!(b.height >= 100 && b.height <= 102);
        assert_eq!(rotated_bounds(&r, 0.0), r);
    }

    #[test]
    fn test_rotate_point_identity() {
        let r = Rect::new(10, 10, 20, 20);
        let (sx, sy) = rotate_point_into(&r, 0.0, 15.0, 25.0);
        assert_eq!((sx, sy), (5.0, 15.0));
    }

    #[test]
    fn test_region_coalesce() {
        let mut region = Region::new();
        region.add(Rect::new(0, 0, 100, 100));
        region.add(Rect::new(10, 10, 10, 10)); // covered, dropped
        assert_eq!(region.len(), 1);

        region.add(Rect::new(-10, -10, 200, 200)); // covers the first
        assert_eq!(region.len(), 1);
        assert_eq!(region.bounds(), Rect::new(-10, -10, 200, 200));

        let taken = region.take();
        assert_eq!(taken.len(), 1);
        assert!(region.is_empty());
    }
}
