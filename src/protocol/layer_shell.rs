//! Layer-shell surface state
//!
//! Shell-layer clients (backgrounds, panels, overlays) describe where they
//! want to live with a layer, anchor flags, margins and an exclusive-zone
//! request; the arranger in [`crate::compositor::layer`] turns that into
//! boxes. This module holds the protocol-facing state.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::compositor::geometry::Rect;
use crate::compositor::surface::SurfaceId;

/// Unique identifier for layer surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerSurfaceId(pub u64);

impl LayerSurfaceId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        LayerSurfaceId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Shell layer, bottom to top
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layer {
    /// Below everything
    Background,
    /// Below views
    #[default]
    Bottom,
    /// Above views
    Top,
    /// Above everything
    Overlay,
}

impl Layer {
    /// All layers, bottom to top
    pub const ALL: [Layer; 4] = [Layer::Background, Layer::Bottom, Layer::Top, Layer::Overlay];

    /// Index into per-output layer lists
    pub fn index(&self) -> usize {
        match self {
            Layer::Background => 0,
            Layer::Bottom => 1,
            Layer::Top => 2,
            Layer::Overlay => 3,
        }
    }

    /// Create from the protocol value
    pub fn from_protocol(value: u32) -> Option<Self> {
        match value {
            0 => Some(Layer::Background),
            1 => Some(Layer::Bottom),
            2 => Some(Layer::Top),
            3 => Some(Layer::Overlay),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    /// Edge anchoring for layer surfaces
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Anchor: u32 {
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
    }
}

impl Anchor {
    /// Anchored to both horizontal edges
    pub fn spans_horizontally(&self) -> bool {
        self.contains(Anchor::LEFT | Anchor::RIGHT)
    }

    /// Anchored to both vertical edges
    pub fn spans_vertically(&self) -> bool {
        self.contains(Anchor::TOP | Anchor::BOTTOM)
    }
}

/// Keyboard interactivity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyboardInteractivity {
    /// Never receives keyboard focus
    #[default]
    None,
    /// Grabs keyboard focus while mapped
    Exclusive,
    /// Receives focus like a view
    OnDemand,
}

impl KeyboardInteractivity {
    /// Create from the protocol value
    pub fn from_protocol(value: u32) -> Option<Self> {
        match value {
            0 => Some(KeyboardInteractivity::None),
            1 => Some(KeyboardInteractivity::Exclusive),
            2 => Some(KeyboardInteractivity::OnDemand),
            _ => None,
        }
    }
}

/// Margins between the surface and its anchored edges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Margins {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// One shell-layer client surface
#[derive(Debug)]
pub struct LayerSurface {
    /// Unique identifier
    pub id: LayerSurfaceId,
    /// Associated surface
    pub surface: SurfaceId,
    /// Which layer the surface lives in
    pub layer: Layer,
    /// Namespace (application identifier)
    pub namespace: String,
    /// Requested size; 0 on an axis means "derive from anchors"
    pub desired: (i32, i32),
    /// Anchor edges
    pub anchor: Anchor,
    /// Exclusive zone: -1 ignores other reservations, 0 reserves nothing,
    /// n > 0 reserves n pixels on the anchored edge
    pub exclusive_zone: i32,
    /// Margins applied on the anchored sides
    pub margins: Margins,
    /// Keyboard interactivity
    pub keyboard_interactivity: KeyboardInteractivity,
    /// Box computed by the last arrange
    pub geometry: Rect,
    /// True once the first configure was sent
    pub configured: bool,
    /// True once the client mapped a buffer
    pub mapped: bool,
}

impl LayerSurface {
    /// Create a layer surface with default placement state
    pub fn new(surface: SurfaceId, layer: Layer, namespace: String) -> Self {
        Self {
            id: LayerSurfaceId::next(),
            surface,
            layer,
            namespace,
            desired: (0, 0),
            anchor: Anchor::empty(),
            exclusive_zone: 0,
            margins: Margins::default(),
            keyboard_interactivity: KeyboardInteractivity::None,
            geometry: Rect::zero(),
            configured: false,
            mapped: false,
        }
    }

    /// True if the exclusive zone actually reserves space: it must be
    /// positive and the anchors must pin the surface to one edge spanning
    /// the perpendicular axis.
    pub fn reserves_zone(&self) -> bool {
        self.exclusive_zone > 0 && self.zone_edge().is_some()
    }

    /// The edge an exclusive zone is carved from, derived from the anchor
    /// combination
    pub fn zone_edge(&self) -> Option<Anchor> {
        let a = self.anchor;
        if a.spans_horizontally() && a.contains(Anchor::TOP) && !a.contains(Anchor::BOTTOM) {
            Some(Anchor::TOP)
        } else if a.spans_horizontally() && a.contains(Anchor::BOTTOM) && !a.contains(Anchor::TOP) {
            Some(Anchor::BOTTOM)
        } else if a.spans_vertically() && a.contains(Anchor::LEFT) && !a.contains(Anchor::RIGHT) {
            Some(Anchor::LEFT)
        } else if a.spans_vertically() && a.contains(Anchor::RIGHT) && !a.contains(Anchor::LEFT) {
            Some(Anchor::RIGHT)
        } else {
            None
        }
    }
}

/// Layer-shell protocol errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayerShellError {
    #[error("no output available for the layer surface")]
    NoOutput,
    #[error("computed size is negative")]
    NegativeSize,
    #[error("surface does not exist")]
    InvalidSurface,
}
