//! Surface management
//!
//! Tracks every client surface the adapter reports: double-buffered
//! pending/current state, buffer-level damage, frame callbacks and the
//! subsurface tree. Mapping follows commits: the first commit carrying a
//! buffer maps a surface, a commit carrying a null buffer unmaps it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::compositor::geometry::Rect;

/// Unique identifier for surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl SurfaceId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        SurfaceId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Opaque client identifier, assigned by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Buffer information attached to a surface
///
/// The engine never touches pixels; this is just the metadata the renderer
/// and the damage tracker need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    /// Width in buffer pixels
    pub width: i32,
    /// Height in buffer pixels
    pub height: i32,
    /// Buffer scale factor
    pub scale: i32,
}

/// Surface role determines how the surface is composited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceRole {
    /// No role assigned yet
    #[default]
    None,
    /// Toplevel window backing a view
    Toplevel,
    /// Protocol popup
    Popup,
    /// Subsurface
    Subsurface,
    /// Shell-layer surface
    Layer,
    /// Cursor image
    Cursor,
    /// Drag-and-drop icon
    DragIcon,
}

/// Pending state for a surface (not yet committed)
#[derive(Debug, Default)]
pub struct SurfacePendingState {
    /// Buffer attachment; outer `Option` is "was attach called", inner is
    /// the buffer itself (a null attach unmaps on commit)
    pub buffer: Option<Option<BufferInfo>>,
    /// Accumulated buffer-local damage
    pub damage: Vec<Rect>,
    /// Frame callbacks registered since the last commit
    pub frame_callbacks: Vec<u32>,
    /// Configure serial acknowledged by the client, if any
    pub acked_serial: Option<u32>,
}

/// What a commit changed, for the caller to act on
#[derive(Debug, Default, Clone)]
pub struct CommitOutcome {
    /// Surface went from no buffer to a live buffer
    pub mapped: bool,
    /// Surface dropped its buffer
    pub unmapped: bool,
    /// Configure serial the client acknowledged with this commit
    pub acked_serial: Option<u32>,
    /// Buffer-local damage carried by this commit
    pub damage: Vec<Rect>,
}

/// One client surface
#[derive(Debug)]
pub struct Surface {
    /// Unique identifier
    pub id: SurfaceId,
    /// Owning client
    pub client: ClientId,
    /// Current buffer, if mapped
    pub buffer: Option<BufferInfo>,
    /// Pending state, promoted by `commit`
    pub pending: SurfacePendingState,
    /// Role-specific tag
    pub role: SurfaceRole,
    /// Parent surface (for subsurfaces)
    pub parent: Option<SurfaceId>,
    /// Child subsurfaces, bottom to top
    pub children: Vec<SurfaceId>,
    /// Frame callbacks waiting for the surface to be presented
    frame_callbacks: Vec<u32>,
}

impl Surface {
    fn new(client: ClientId) -> Self {
        Self {
            id: SurfaceId::next(),
            client,
            buffer: None,
            pending: SurfacePendingState::default(),
            role: SurfaceRole::None,
            parent: None,
            children: Vec::new(),
            frame_callbacks: Vec::new(),
        }
    }

    /// True if the surface currently has a buffer
    pub fn is_mapped(&self) -> bool {
        self.buffer.is_some()
    }

    /// Size of the current buffer in layout pixels
    pub fn size(&self) -> (i32, i32) {
        match &self.buffer {
            Some(b) => (b.width / b.scale.max(1), b.height / b.scale.max(1)),
            None => (0, 0),
        }
    }

    /// Attach a buffer to the pending state
    pub fn attach(&mut self, buffer: Option<BufferInfo>) {
        self.pending.buffer = Some(buffer);
    }

    /// Add buffer-local damage to the pending state
    pub fn damage(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.pending.damage.push(Rect::new(x, y, width, height));
    }

    /// Register a frame callback
    pub fn frame(&mut self, callback_id: u32) {
        self.pending.frame_callbacks.push(callback_id);
    }

    /// Record a configure acknowledgment for the next commit
    pub fn ack_configure(&mut self, serial: u32) {
        self.pending.acked_serial = Some(serial);
    }

    /// Promote pending state to current state
    pub fn commit(&mut self) -> CommitOutcome {
        let was_mapped = self.is_mapped();

        if let Some(attach) = self.pending.buffer.take() {
            self.buffer = attach;
        }

        self.frame_callbacks
            .append(&mut self.pending.frame_callbacks);

        CommitOutcome {
            mapped: !was_mapped && self.is_mapped(),
            unmapped: was_mapped && !self.is_mapped(),
            acked_serial: self.pending.acked_serial.take(),
            damage: std::mem::take(&mut self.pending.damage),
        }
    }

    /// Assign the surface role; a second, different role is a protocol error
    pub fn set_role(&mut self, role: SurfaceRole) -> Result<(), SurfaceRoleError> {
        if self.role != SurfaceRole::None && self.role != role {
            return Err(SurfaceRoleError {
                have: self.role,
                want: role,
            });
        }
        self.role = role;
        Ok(())
    }

    /// Drain the callbacks waiting on presentation
    pub fn take_frame_callbacks(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.frame_callbacks)
    }

    /// True if callbacks are waiting on presentation
    pub fn has_frame_callbacks(&self) -> bool {
        !self.frame_callbacks.is_empty()
    }
}

/// Attempt to give a surface a second role
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("surface already has role {have:?}, cannot become {want:?}")]
pub struct SurfaceRoleError {
    pub have: SurfaceRole,
    pub want: SurfaceRole,
}

/// Manager for all surfaces
#[derive(Debug, Default)]
pub struct SurfaceManager {
    surfaces: HashMap<SurfaceId, Surface>,
}

impl SurfaceManager {
    /// Create a new surface manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new surface and return its ID
    pub fn create(&mut self, client: ClientId) -> SurfaceId {
        let surface = Surface::new(client);
        let id = surface.id;
        self.surfaces.insert(id, surface);
        id
    }

    /// Get a surface by ID
    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    /// Get a mutable surface by ID
    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(&id)
    }

    /// Remove a surface; detaches it from its parent and orphans children.
    /// Erase-if-present: removing twice is a no-op.
    pub fn remove(&mut self, id: SurfaceId) -> Option<Surface> {
        let surface = self.surfaces.remove(&id)?;
        if let Some(parent) = surface.parent.and_then(|p| self.surfaces.get_mut(&p)) {
            parent.children.retain(|&c| c != id);
        }
        for child in &surface.children {
            if let Some(c) = self.surfaces.get_mut(child) {
                c.parent = None;
            }
        }
        Some(surface)
    }

    /// Link `child` under `parent` as a subsurface
    pub fn link_subsurface(&mut self, parent: SurfaceId, child: SurfaceId) {
        if !self.surfaces.contains_key(&parent) {
            return;
        }
        match self.surfaces.get_mut(&child) {
            Some(c) => c.parent = Some(parent),
            None => return,
        }
        if let Some(p) = self.surfaces.get_mut(&parent) {
            if !p.children.contains(&child) {
                p.children.push(child);
            }
        }
    }

    /// All surfaces
    pub fn iter(&self) -> impl Iterator<Item = (&SurfaceId, &Surface)> {
        self.surfaces.iter()
    }

    /// Number of live surfaces
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// True if no surfaces exist
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}
