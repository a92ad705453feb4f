//! View management
//!
//! A view is one client toplevel, whatever shell protocol backs it. It
//! carries the compositor-side geometry (position, size, rotation, alpha),
//! the decoration, the maximize/fullscreen state with its saved geometry,
//! and the tree of child surfaces (subsurfaces and protocol popups).
//!
//! Geometry changes that involve a size are two-phase: the shell backend
//! asks the client to adopt the size, and the stored geometry only changes
//! on a commit that satisfies the configure handshake.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::compositor::geometry::{rotate_point_into, rotated_bounds, Rect};
use crate::compositor::output::OutputId;
use crate::compositor::surface::{SurfaceId, SurfaceManager};
use crate::protocol::adapter::AdapterQueue;
use crate::protocol::shell::{ConfigureHandshake, ShellBackend, ShellKind};

/// Unique identifier for views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(pub u64);

impl ViewId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        ViewId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

bitflags::bitflags! {
    /// Edges involved in a resize or a border hit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ResizeEdges: u32 {
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
    }
}

/// Which of the mutually exclusive placement states a view is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Normal,
    Maximized,
    Fullscreen,
}

/// Server-side decoration metrics
#[derive(Debug, Clone, Copy)]
pub struct Decoration {
    pub visible: bool,
    /// Border thickness in pixels
    pub border: i32,
    /// Titlebar height in pixels, stacked above the top border
    pub titlebar: i32,
}

impl Default for Decoration {
    fn default() -> Self {
        Self {
            visible: true,
            border: 4,
            titlebar: 12,
        }
    }
}

/// Part of the decoration a point landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationPart {
    Titlebar,
    Border(ResizeEdges),
}

/// What a view hit test resolved to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewTarget {
    /// A client surface, with surface-local coordinates
    Surface {
        surface: SurfaceId,
        sx: f64,
        sy: f64,
    },
    /// A decoration part; only reported when no client surface claims the
    /// point
    Decoration(DecorationPart),
}

/// Kind of child surface attached to a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Subsurface,
    Popup,
}

/// A child record: a subsurface or a popup, owned by the view
#[derive(Debug, Clone)]
pub struct ViewChild {
    pub surface: SurfaceId,
    pub kind: ChildKind,
    /// Slot index of the parent child for nested popups
    pub parent: Option<usize>,
    /// Position relative to the parent (view origin, or parent child)
    pub x: i32,
    pub y: i32,
}

/// Geometry saved across a maximize/fullscreen transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedGeometry {
    pub x: f64,
    pub y: f64,
    pub width: i32,
    pub height: i32,
    pub rotation: f32,
}

/// Geometry waiting on the configure handshake
#[derive(Debug, Clone, Copy)]
struct PendingGeometry {
    handshake: ConfigureHandshake,
    x: f64,
    y: f64,
    width: i32,
    height: i32,
}

/// One mapped or unmapped client toplevel
#[derive(Debug)]
pub struct View {
    /// Unique identifier
    pub id: ViewId,
    /// The toplevel's main surface
    pub surface: SurfaceId,
    /// Protocol-specific backend
    pub backend: ShellBackend,
    /// Window title, fed to the window-manager extension
    pub title: String,
    /// Application identifier
    pub app_id: String,
    /// True between the first buffer commit and unmap
    pub mapped: bool,
    /// Position in layout coordinates
    pub x: f64,
    pub y: f64,
    /// Size in layout pixels
    pub width: i32,
    pub height: i32,
    /// Rotation in radians about the view center
    pub rotation: f32,
    /// Opacity in [0, 1]
    pub alpha: f32,
    /// Server-side decoration
    pub decoration: Decoration,
    /// Maximized flag; saved geometry holds the pre-maximize box
    pub maximized: bool,
    /// Output currently showing this view fullscreen
    pub fullscreen_output: Option<OutputId>,
    /// Workspace index owning the view
    pub workspace: usize,
    /// Valid only while maximized or fullscreen
    saved: Option<SavedGeometry>,
    pending: Option<PendingGeometry>,
    /// Child slots; freed slots stay as `None` so indices remain stable
    children: Vec<Option<ViewChild>>,
}

impl View {
    fn new(surface: SurfaceId, kind: ShellKind, workspace: usize) -> Self {
        Self {
            id: ViewId::next(),
            surface,
            backend: ShellBackend::new(kind),
            title: String::new(),
            app_id: String::new(),
            mapped: false,
            x: 0.0,
            y: 0.0,
            width: 0,
            height: 0,
            rotation: 0.0,
            alpha: 1.0,
            decoration: Decoration::default(),
            maximized: false,
            fullscreen_output: None,
            workspace,
            saved: None,
            pending: None,
            children: Vec::new(),
        }
    }

    /// The view's box in layout coordinates (ignoring rotation)
    pub fn geometry_box(&self) -> Rect {
        Rect::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.width,
            self.height,
        )
    }

    /// The box including decorations, if visible
    pub fn decorated_box(&self) -> Rect {
        let geo = self.geometry_box();
        if !self.decoration.visible {
            return geo;
        }
        let b = self.decoration.border;
        Rect::new(
            geo.x - b,
            geo.y - b - self.decoration.titlebar,
            geo.width + 2 * b,
            geo.height + 2 * b + self.decoration.titlebar,
        )
    }

    /// Layout-space box that must be damaged to repaint the view, taking
    /// rotation into account
    pub fn damage_box(&self) -> Rect {
        rotated_bounds(&self.decorated_box(), self.rotation)
    }

    /// Which placement state the view is in; exactly one holds at a time
    pub fn mode(&self) -> ViewMode {
        if self.fullscreen_output.is_some() {
            ViewMode::Fullscreen
        } else if self.maximized {
            ViewMode::Maximized
        } else {
            ViewMode::Normal
        }
    }

    /// The saved pre-transition geometry, if any
    pub fn saved_geometry(&self) -> Option<SavedGeometry> {
        self.saved
    }

    /// Mark the view mapped. Placement is the desktop's job.
    pub fn map(&mut self) {
        self.mapped = true;
    }

    /// Unmap: finalize children, drop fullscreen linkage, zero the size.
    /// The view object survives until protocol destroy.
    pub fn unmap(&mut self) {
        self.children.clear();
        self.fullscreen_output = None;
        self.maximized = false;
        self.saved = None;
        self.pending = None;
        self.width = 0;
        self.height = 0;
        self.mapped = false;
    }

    /// Move without resizing; position is compositor-side state and needs
    /// no client round trip
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Phase one of a resize/move-resize: ask the client to adopt the size.
    /// The geometry is applied by [`View::commit_geometry`] once the
    /// handshake is satisfied.
    pub fn request_geometry(
        &mut self,
        x: f64,
        y: f64,
        width: i32,
        height: i32,
        serial: u32,
        queue: &mut AdapterQueue,
    ) {
        let width = width.max(1);
        let height = height.max(1);
        let handshake = self
            .backend
            .request_resize(self.surface, width, height, serial, queue);
        if handshake == ConfigureHandshake::Immediate {
            self.x = x;
            self.y = y;
            self.width = width;
            self.height = height;
            self.pending = None;
        } else {
            self.pending = Some(PendingGeometry {
                handshake,
                x,
                y,
                width,
                height,
            });
        }
    }

    /// Phase two: called on surface commit. Applies pending geometry when
    /// the commit satisfies the handshake and returns the before/after
    /// damage boxes.
    pub fn commit_geometry(&mut self, acked_serial: Option<u32>) -> Option<(Rect, Rect)> {
        let pending = self.pending?;
        if !ShellBackend::serial_satisfied(pending.handshake, acked_serial) {
            return None;
        }
        let before = self.damage_box();
        self.x = pending.x;
        self.y = pending.y;
        self.width = pending.width;
        self.height = pending.height;
        self.pending = None;
        Some((before, self.damage_box()))
    }

    /// True if a geometry change is still waiting on the client
    pub fn has_pending_geometry(&self) -> bool {
        self.pending.is_some()
    }

    /// Enter or leave the maximized state. `area` is the output's usable
    /// area. Idempotent; geometry is saved exactly once per transition.
    pub fn set_maximized(
        &mut self,
        maximized: bool,
        area: Rect,
        serial: u32,
        queue: &mut AdapterQueue,
    ) -> bool {
        if maximized == self.maximized {
            return false;
        }
        if maximized {
            if self.saved.is_none() {
                self.save_geometry();
            }
            self.maximized = true;
            self.fullscreen_output = None;
            self.backend.request_maximize(
                self.surface,
                true,
                area.width,
                area.height,
                serial,
                queue,
            );
            self.pending = Some(PendingGeometry {
                handshake: self.last_handshake(serial),
                x: area.x as f64,
                y: area.y as f64,
                width: area.width,
                height: area.height,
            });
            self.apply_immediate_if_needed();
        } else {
            self.maximized = false;
            self.restore_geometry(serial, queue, false);
        }
        true
    }

    /// Enter or leave fullscreen. `output` names the owning output when
    /// entering; `area` is that output's full box. Idempotent.
    pub fn set_fullscreen(
        &mut self,
        output: Option<OutputId>,
        area: Rect,
        serial: u32,
        queue: &mut AdapterQueue,
    ) -> bool {
        if output == self.fullscreen_output {
            return false;
        }
        if let Some(output) = output {
            if self.saved.is_none() {
                self.save_geometry();
            }
            self.maximized = false;
            self.fullscreen_output = Some(output);
            self.rotation = 0.0;
            self.backend.request_fullscreen(
                self.surface,
                true,
                area.width,
                area.height,
                serial,
                queue,
            );
            self.pending = Some(PendingGeometry {
                handshake: self.last_handshake(serial),
                x: area.x as f64,
                y: area.y as f64,
                width: area.width,
                height: area.height,
            });
            self.apply_immediate_if_needed();
        } else {
            self.fullscreen_output = None;
            self.restore_geometry(serial, queue, true);
        }
        true
    }

    /// Rotate to an absolute angle (radians)
    pub fn rotate(&mut self, rotation: f32) {
        self.rotation = rotation;
    }

    /// Step the opacity down one notch, wrapping back to opaque
    pub fn cycle_alpha(&mut self) {
        self.alpha -= 0.25;
        if self.alpha < 0.25 {
            self.alpha = 1.0;
        }
    }

    fn save_geometry(&mut self) {
        self.saved = Some(SavedGeometry {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            rotation: self.rotation,
        });
    }

    fn restore_geometry(&mut self, serial: u32, queue: &mut AdapterQueue, restore_rotation: bool) {
        // Still maximized or fullscreen through the other flag: the saved
        // geometry stays parked for the final transition back to normal.
        if self.mode() != ViewMode::Normal {
            let _ = self
                .backend
                .request_resize(self.surface, self.width, self.height, serial, queue);
            return;
        }
        let Some(saved) = self.saved.take() else {
            return;
        };
        if restore_rotation {
            self.rotation = saved.rotation;
        }
        self.request_geometry(saved.x, saved.y, saved.width, saved.height, serial, queue);
    }

    fn last_handshake(&self, serial: u32) -> ConfigureHandshake {
        match self.backend.kind() {
            ShellKind::Xdg | ShellKind::XdgV6 => ConfigureHandshake::Acked(serial),
            ShellKind::WlShell => ConfigureHandshake::NextCommit,
            ShellKind::Xwayland => ConfigureHandshake::Immediate,
        }
    }

    fn apply_immediate_if_needed(&mut self) {
        if let Some(p) = self.pending {
            if p.handshake == ConfigureHandshake::Immediate {
                self.x = p.x;
                self.y = p.y;
                self.width = p.width;
                self.height = p.height;
                self.pending = None;
            }
        }
    }

    /// Attach a child surface; returns its stable slot index
    pub fn add_child(
        &mut self,
        surface: SurfaceId,
        kind: ChildKind,
        parent: Option<usize>,
    ) -> usize {
        let child = ViewChild {
            surface,
            kind,
            parent,
            x: 0,
            y: 0,
        };
        if let Some(slot) = self.children.iter().position(Option::is_none) {
            self.children[slot] = Some(child);
            slot
        } else {
            self.children.push(Some(child));
            self.children.len() - 1
        }
    }

    /// Position a child relative to its parent
    pub fn place_child(&mut self, slot: usize, x: i32, y: i32) {
        if let Some(Some(child)) = self.children.get_mut(slot) {
            child.x = x;
            child.y = y;
        }
    }

    /// Remove a child and all its descendants. Erase-if-present.
    pub fn remove_child(&mut self, slot: usize) {
        if slot >= self.children.len() || self.children[slot].is_none() {
            return;
        }
        // Descendants go first. Parent links always point at records that
        // existed beforehand, so the walk terminates.
        let descendants: Vec<usize> = self
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                Some(c) if c.parent == Some(slot) => Some(i),
                _ => None,
            })
            .collect();
        for d in descendants {
            self.remove_child(d);
        }
        self.children[slot] = None;
    }

    /// Remove the child owning `surface`, if any. Erase-if-present.
    pub fn remove_child_by_surface(&mut self, surface: SurfaceId) {
        if let Some(slot) = self
            .children
            .iter()
            .position(|c| matches!(c, Some(c) if c.surface == surface))
        {
            self.remove_child(slot);
        }
    }

    /// Live child records, bottom to top
    pub fn children(&self) -> impl Iterator<Item = &ViewChild> {
        self.children.iter().filter_map(Option::as_ref)
    }

    /// True if the view has any live child surface. Fullscreen views with
    /// no children can bypass composition.
    pub fn has_children(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }

    /// Absolute layout position of a child, following nested parents
    fn child_origin(&self, child: &ViewChild) -> (f64, f64) {
        let mut cx = child.x as f64;
        let mut cy = child.y as f64;
        let mut parent = child.parent;
        while let Some(slot) = parent {
            match self.children.get(slot).and_then(Option::as_ref) {
                Some(p) => {
                    cx += p.x as f64;
                    cy += p.y as f64;
                    parent = p.parent;
                }
                None => break,
            }
        }
        (self.x + cx, self.y + cy)
    }

    /// Hit test in layout coordinates. Children are consulted before the
    /// main surface, the decoration only when no client surface claims the
    /// point. Returns `None` while unmapped.
    pub fn at(&self, lx: f64, ly: f64, surfaces: &SurfaceManager) -> Option<ViewTarget> {
        if !self.mapped {
            return None;
        }

        let geo = self.geometry_box();
        // Work in unrotated view-local coordinates.
        let (vx, vy) = rotate_point_into(&geo, self.rotation, lx, ly);
        let abs_x = geo.x as f64 + vx;
        let abs_y = geo.y as f64 + vy;

        // Topmost child first.
        let children: Vec<&ViewChild> = self.children().collect();
        for child in children.into_iter().rev() {
            let Some(surface) = surfaces.get(child.surface) else {
                continue;
            };
            if !surface.is_mapped() {
                continue;
            }
            let (cx, cy) = self.child_origin(child);
            let (w, h) = surface.size();
            let sx = abs_x - cx;
            let sy = abs_y - cy;
            if sx >= 0.0 && sy >= 0.0 && sx < w as f64 && sy < h as f64 {
                return Some(ViewTarget::Surface {
                    surface: child.surface,
                    sx,
                    sy,
                });
            }
        }

        let sx = abs_x - self.x;
        let sy = abs_y - self.y;
        if sx >= 0.0 && sy >= 0.0 && sx < self.width as f64 && sy < self.height as f64 {
            return Some(ViewTarget::Surface {
                surface: self.surface,
                sx,
                sy,
            });
        }

        if self.decoration.visible {
            let deco = self.decorated_box();
            if deco.contains(abs_x, abs_y) {
                if sy < 0.0 && sy >= -(self.decoration.titlebar as f64) && sx >= 0.0 && sx < self.width as f64
                {
                    return Some(ViewTarget::Decoration(DecorationPart::Titlebar));
                }
                let mut edges = ResizeEdges::empty();
                if sx < 0.0 {
                    edges |= ResizeEdges::LEFT;
                } else if sx >= self.width as f64 {
                    edges |= ResizeEdges::RIGHT;
                }
                if sy < 0.0 {
                    edges |= ResizeEdges::TOP;
                } else if sy >= self.height as f64 {
                    edges |= ResizeEdges::BOTTOM;
                }
                return Some(ViewTarget::Decoration(DecorationPart::Border(edges)));
            }
        }

        None
    }

    /// All surfaces in the view's tree: the main surface and live children
    pub fn surfaces(&self) -> Vec<SurfaceId> {
        let mut out = vec![self.surface];
        out.extend(self.children().map(|c| c.surface));
        out
    }
}

/// Arena of all views, keyed by stable IDs
#[derive(Debug, Default)]
pub struct ViewManager {
    views: HashMap<ViewId, View>,
    by_surface: HashMap<SurfaceId, ViewId>,
}

impl ViewManager {
    /// Create an empty view arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a view for a toplevel surface
    pub fn create(&mut self, surface: SurfaceId, kind: ShellKind, workspace: usize) -> ViewId {
        let view = View::new(surface, kind, workspace);
        let id = view.id;
        debug!("created view {:?} ({:?}) on workspace {}", id, kind, workspace);
        self.by_surface.insert(surface, id);
        self.views.insert(id, view);
        id
    }

    /// Get a view by ID
    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    /// Get a mutable view by ID
    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&id)
    }

    /// Resolve the view owning a toplevel surface
    pub fn by_surface(&self, surface: SurfaceId) -> Option<ViewId> {
        self.by_surface.get(&surface).copied()
    }

    /// Remove a view. Erase-if-present: a second remove is a no-op.
    pub fn remove(&mut self, id: ViewId) -> Option<View> {
        let view = self.views.remove(&id)?;
        self.by_surface.remove(&view.surface);
        Some(view)
    }

    /// All views
    pub fn iter(&self) -> impl Iterator<Item = (&ViewId, &View)> {
        self.views.iter()
    }

    /// Number of live views
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// True if no views exist
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::surface::{BufferInfo, ClientId};

    fn test_view() -> View {
        let mut view = View::new(SurfaceId(1), ShellKind::Xdg, 0);
        view.map();
        view.x = 100.0;
        view.y = 100.0;
        view.width = 50;
        view.height = 50;
        view
    }

    #[test]
    fn test_two_phase_geometry() {
        let mut queue = AdapterQueue::new();
        let mut view = test_view();

        view.request_geometry(90.0, 90.0, 60, 60, 5, &mut queue);
        // Nothing applied before the ack.
        assert_eq!((view.x, view.y, view.width, view.height), (100.0, 100.0, 50, 50));
        assert!(view.has_pending_geometry());
        assert!(view.commit_geometry(None).is_none());
        assert!(view.commit_geometry(Some(4)).is_none());

        let (before, after) = view.commit_geometry(Some(5)).unwrap();
        assert_eq!((view.x, view.y, view.width, view.height), (90.0, 90.0, 60, 60));
        assert!(before.intersects(&Rect::new(100, 100, 50, 50)));
        assert!(after.intersects(&Rect::new(90, 90, 60, 60)));
        assert!(!view.has_pending_geometry());
    }

    #[test]
    fn test_xwayland_geometry_is_immediate() {
        let mut queue = AdapterQueue::new();
        let mut view = View::new(SurfaceId(2), ShellKind::Xwayland, 0);
        view.map();
        view.request_geometry(10.0, 20.0, 300, 200, 1, &mut queue);
        assert_eq!((view.x, view.y, view.width, view.height), (10.0, 20.0, 300, 200));
        assert!(!view.has_pending_geometry());
    }

    #[test]
    fn test_fullscreen_round_trip_restores_geometry_and_rotation() {
        let mut queue = AdapterQueue::new();
        let mut view = test_view();
        view.rotation = 0.5;
        let area = Rect::new(0, 0, 1920, 1080);

        assert!(view.set_fullscreen(Some(OutputId(1)), area, 1, &mut queue));
        assert_eq!(view.mode(), ViewMode::Fullscreen);
        assert_eq!(view.rotation, 0.0);
        // Re-entering is a no-op.
        assert!(!view.set_fullscreen(Some(OutputId(1)), area, 2, &mut queue));

        // Client adopts the fullscreen size.
        view.commit_geometry(Some(1));
        assert_eq!((view.width, view.height), (1920, 1080));

        assert!(view.set_fullscreen(None, area, 3, &mut queue));
        assert_eq!(view.mode(), ViewMode::Normal);
        assert_eq!(view.rotation, 0.5);
        view.commit_geometry(Some(3));
        assert_eq!((view.x, view.y, view.width, view.height), (100.0, 100.0, 50, 50));
        assert!(view.saved_geometry().is_none());
    }

    #[test]
    fn test_maximize_saves_once() {
        let mut queue = AdapterQueue::new();
        let mut view = test_view();
        let area = Rect::new(0, 32, 1920, 1048);

        assert!(view.set_maximized(true, area, 1, &mut queue));
        let saved = view.saved_geometry().unwrap();
        view.commit_geometry(Some(1));

        // Transition to fullscreen keeps the original saved geometry.
        view.set_fullscreen(Some(OutputId(1)), Rect::new(0, 0, 1920, 1080), 2, &mut queue);
        assert_eq!(view.saved_geometry().unwrap(), saved);
        assert!(!view.maximized);

        view.set_fullscreen(None, Rect::new(0, 0, 1920, 1080), 3, &mut queue);
        view.commit_geometry(Some(3));
        assert_eq!((view.x, view.y), (100.0, 100.0));
        assert_eq!(view.mode(), ViewMode::Normal);
    }

    #[test]
    fn test_unmap_clears_transient_state() {
        let mut queue = AdapterQueue::new();
        let mut view = test_view();
        view.add_child(SurfaceId(5), ChildKind::Popup, None);
        view.set_fullscreen(Some(OutputId(1)), Rect::new(0, 0, 800, 600), 1, &mut queue);

        view.unmap();
        assert!(!view.mapped);
        assert!(view.fullscreen_output.is_none());
        assert_eq!((view.width, view.height), (0, 0));
        assert!(!view.has_children());
    }

    #[test]
    fn test_child_arena_recursive_removal() {
        let mut view = test_view();
        let popup = view.add_child(SurfaceId(10), ChildKind::Popup, None);
        let nested = view.add_child(SurfaceId(11), ChildKind::Popup, Some(popup));
        let sub = view.add_child(SurfaceId(12), ChildKind::Subsurface, None);
        assert_eq!(view.children().count(), 3);

        view.remove_child(popup);
        let left: Vec<SurfaceId> = view.children().map(|c| c.surface).collect();
        assert_eq!(left, vec![SurfaceId(12)]);
        // Slots are reused.
        let again = view.add_child(SurfaceId(13), ChildKind::Popup, None);
        assert!(again == popup || again == nested);
        let _ = sub;
    }

    #[test]
    fn test_cycle_alpha_wraps() {
        let mut view = test_view();
        assert_eq!(view.alpha, 1.0);
        view.cycle_alpha();
        assert_eq!(view.alpha, 0.75);
        view.cycle_alpha();
        view.cycle_alpha();
        assert_eq!(view.alpha, 0.25);
        view.cycle_alpha();
        assert_eq!(view.alpha, 1.0);
    }

    #[test]
    fn test_hit_test_prefers_children() {
        let mut surfaces = SurfaceManager::new();
        let main = surfaces.create(ClientId(1));
        let popup = surfaces.create(ClientId(1));
        for id in [main, popup] {
            let s = surfaces.get_mut(id).unwrap();
            s.attach(Some(BufferInfo {
                width: 40,
                height: 40,
                scale: 1,
            }));
            s.commit();
        }

        let mut view = View::new(main, ShellKind::Xdg, 0);
        view.map();
        view.x = 0.0;
        view.y = 0.0;
        view.width = 100;
        view.height = 100;
        let slot = view.add_child(popup, ChildKind::Popup, None);
        view.place_child(slot, 10, 10);

        // Point inside both popup and main surface resolves to the popup.
        match view.at(20.0, 20.0, &surfaces).unwrap() {
            ViewTarget::Surface { surface, sx, sy } => {
                assert_eq!(surface, popup);
                assert_eq!((sx, sy), (10.0, 10.0));
            }
            other => panic!("unexpected target {:?}", other),
        }

        // Point outside the popup lands on the main surface.
        match view.at(80.0, 80.0, &surfaces).unwrap() {
            ViewTarget::Surface { surface, .. } => assert_eq!(surface, main),
            other => panic!("unexpected target {:?}", other),
        }

        // Titlebar above the content.
        match view.at(50.0, -6.0, &surfaces).unwrap() {
            ViewTarget::Decoration(DecorationPart::Titlebar) => {}
            other => panic!("unexpected target {:?}", other),
        }

        // Left border.
        match view.at(-2.0, 50.0, &surfaces).unwrap() {
            ViewTarget::Decoration(DecorationPart::Border(edges)) => {
                assert_eq!(edges, ResizeEdges::LEFT);
            }
            other => panic!("unexpected target {:?}", other),
        }

        // Unmapped views never hit.
        view.unmap();
        assert!(view.at(20.0, 20.0, &surfaces).is_none());
    }

    #[test]
    fn test_view_manager_erase_if_present() {
        let mut manager = ViewManager::new();
        let id = manager.create(SurfaceId(1), ShellKind::Xdg, 0);
        assert_eq!(manager.by_surface(SurfaceId(1)), Some(id));
        assert!(manager.remove(id).is_some());
        assert!(manager.remove(id).is_none());
        assert_eq!(manager.by_surface(SurfaceId(1)), None);
    }
}
