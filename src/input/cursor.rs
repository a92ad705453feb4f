//! Cursor state machine
//!
//! The cursor is either passing events through to clients or driving one
//! interactive operation on a view: move, resize or rotate. Grabs capture
//! the press origin and the view geometry at press time; motion produces a
//! geometry update relative to that origin, never to the previous event.

use std::f64::consts::PI;

use crate::compositor::geometry::Rect;
use crate::compositor::view::{ResizeEdges, ViewId};

/// Rotation snaps to twelfths of a full circle
const ROTATE_SNAP: f64 = PI / 6.0;

/// An interactive move in progress
#[derive(Debug, Clone, Copy)]
pub struct MoveGrab {
    pub view: ViewId,
    /// Pointer position at press
    pub grab_x: f64,
    pub grab_y: f64,
    /// View origin at press
    pub view_x: f64,
    pub view_y: f64,
}

/// An interactive resize in progress
#[derive(Debug, Clone, Copy)]
pub struct ResizeGrab {
    pub view: ViewId,
    pub edges: ResizeEdges,
    pub grab_x: f64,
    pub grab_y: f64,
    /// View geometry at press
    pub start_x: f64,
    pub start_y: f64,
    pub start_width: i32,
    pub start_height: i32,
}

/// An interactive rotate in progress
#[derive(Debug, Clone, Copy)]
pub struct RotateGrab {
    pub view: ViewId,
    /// View center at press
    pub center_x: f64,
    pub center_y: f64,
    /// Rotation at press
    pub start_rotation: f32,
    /// Angle of the press-to-center vector
    pub start_angle: f64,
}

/// What the cursor is doing
#[derive(Debug, Clone, Copy, Default)]
pub enum CursorMode {
    /// Events go to clients
    #[default]
    Passthrough,
    Move(MoveGrab),
    Resize(ResizeGrab),
    Rotate(RotateGrab),
}

/// Geometry update produced by cursor motion during a grab
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrabUpdate {
    Move {
        view: ViewId,
        x: f64,
        y: f64,
    },
    Resize {
        view: ViewId,
        x: f64,
        y: f64,
        width: i32,
        height: i32,
    },
    Rotate {
        view: ViewId,
        rotation: f32,
    },
}

/// The seat's cursor
#[derive(Debug, Default)]
pub struct Cursor {
    /// Position in layout coordinates
    pub x: f64,
    pub y: f64,
    /// Current mode
    pub mode: CursorMode,
}

impl Cursor {
    /// Create a cursor at the origin in passthrough mode
    pub fn new() -> Self {
        Self::default()
    }

    /// True while no grab is active
    pub fn is_passthrough(&self) -> bool {
        matches!(self.mode, CursorMode::Passthrough)
    }

    /// Begin an interactive move of `view`
    pub fn begin_move(&mut self, view: ViewId, view_x: f64, view_y: f64) {
        self.mode = CursorMode::Move(MoveGrab {
            view,
            grab_x: self.x,
            grab_y: self.y,
            view_x,
            view_y,
        });
    }

    /// Begin an interactive resize from the given edges
    pub fn begin_resize(&mut self, view: ViewId, edges: ResizeEdges, geometry: Rect, x: f64, y: f64) {
        self.mode = CursorMode::Resize(ResizeGrab {
            view,
            edges,
            grab_x: self.x,
            grab_y: self.y,
            start_x: x,
            start_y: y,
            start_width: geometry.width,
            start_height: geometry.height,
        });
    }

    /// Begin an interactive rotate about the view center
    pub fn begin_rotate(&mut self, view: ViewId, geometry: Rect, rotation: f32) {
        let (cx, cy) = geometry.center();
        self.mode = CursorMode::Rotate(RotateGrab {
            view,
            center_x: cx,
            center_y: cy,
            start_rotation: rotation,
            start_angle: (self.y - cy).atan2(self.x - cx),
        });
    }

    /// Drop any grab and return to passthrough
    pub fn end_grab(&mut self) {
        self.mode = CursorMode::Passthrough;
    }

    /// If the grab targets `view`, cancel it (the view went away)
    pub fn cancel_grab_on(&mut self, view: ViewId) {
        let grabbed = match self.mode {
            CursorMode::Move(g) => Some(g.view),
            CursorMode::Resize(g) => Some(g.view),
            CursorMode::Rotate(g) => Some(g.view),
            CursorMode::Passthrough => None,
        };
        if grabbed == Some(view) {
            self.mode = CursorMode::Passthrough;
        }
    }

    /// Move the cursor; while a grab is active this yields the geometry
    /// update the desktop applies to the grabbed view.
    pub fn motion(&mut self, x: f64, y: f64) -> Option<GrabUpdate> {
        self.x = x;
        self.y = y;
        match self.mode {
            CursorMode::Passthrough => None,
            CursorMode::Move(grab) => Some(GrabUpdate::Move {
                view: grab.view,
                x: grab.view_x + (x - grab.grab_x),
                y: grab.view_y + (y - grab.grab_y),
            }),
            CursorMode::Resize(grab) => Some(resize_update(&grab, x, y)),
            CursorMode::Rotate(grab) => Some(rotate_update(&grab, x, y)),
        }
    }
}

/// Resize relative to the press origin. The edge under the pointer moves
/// with it; the opposite edge stays pinned, which for left/top edges means
/// the origin shifts by the width/height delta. Sizes clamp at 1 and the
/// pinned coordinate absorbs the overshoot.
fn resize_update(grab: &ResizeGrab, x: f64, y: f64) -> GrabUpdate {
    let dx = x - grab.grab_x;
    let dy = y - grab.grab_y;

    let mut width = grab.start_width;
    let mut new_x = grab.start_x;
    if grab.edges.contains(ResizeEdges::RIGHT) {
        width = grab.start_width + dx.round() as i32;
    } else if grab.edges.contains(ResizeEdges::LEFT) {
        width = grab.start_width - dx.round() as i32;
    }
    width = width.max(1);
    if grab.edges.contains(ResizeEdges::LEFT) {
        new_x = grab.start_x + (grab.start_width - width) as f64;
    }

    let mut height = grab.start_height;
    let mut new_y = grab.start_y;
    if grab.edges.contains(ResizeEdges::BOTTOM) {
        height = grab.start_height + dy.round() as i32;
    } else if grab.edges.contains(ResizeEdges::TOP) {
        height = grab.start_height - dy.round() as i32;
    }
    height = height.max(1);
    if grab.edges.contains(ResizeEdges::TOP) {
        new_y = grab.start_y + (grab.start_height - height) as f64;
    }

    GrabUpdate::Resize {
        view: grab.view,
        x: new_x,
        y: new_y,
        width,
        height,
    }
}

/// Signed angle between press-to-center and now-to-center, snapped to
/// twelfth-circle steps
fn rotate_update(grab: &RotateGrab, x: f64, y: f64) -> GrabUpdate {
    let angle = (y - grab.center_y).atan2(x - grab.center_x);
    let mut delta = angle - grab.start_angle;
    // Normalize into (-pi, pi] so crossing the seam does not spin the view.
    while delta > PI {
        delta -= 2.0 * PI;
    }
    while delta <= -PI {
        delta += 2.0 * PI;
    }
    let snapped = (delta / ROTATE_SNAP).round() * ROTATE_SNAP;
    GrabUpdate::Rotate {
        view: grab.view,
        rotation: grab.start_rotation + snapped as f32,
    }
}

/// The resize edges implied by which quadrant of the view was pressed
pub fn edges_from_quadrant(sx: f64, sy: f64, width: i32, height: i32) -> ResizeEdges {
    let mut edges = ResizeEdges::empty();
    if sx < width as f64 / 2.0 {
        edges |= ResizeEdges::LEFT;
    } else {
        edges |= ResizeEdges::RIGHT;
    }
    if sy < height as f64 / 2.0 {
        edges |= ResizeEdges::TOP;
    } else {
        edges |= ResizeEdges::BOTTOM;
    }
    edges
}
