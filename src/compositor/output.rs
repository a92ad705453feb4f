//! Output management
//!
//! One output per display sink. Outputs reference (never own) the
//! workspace they show, own their layer-surface lists, a damage
//! accumulator and a render context. An output that cannot allocate its
//! render primitives is not admitted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::compositor::damage::DamageTracker;
use crate::compositor::geometry::Rect;
use crate::compositor::render::RenderContext;
use crate::protocol::layer_shell::LayerSurface;

/// Unique identifier for outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId(pub u64);

impl OutputId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        OutputId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Output transform (rotation/flip)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputTransform {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
    Flipped,
    Flipped90,
    Flipped180,
    Flipped270,
}

impl OutputTransform {
    /// True if the transform swaps width and height
    pub fn swaps_axes(&self) -> bool {
        matches!(
            self,
            OutputTransform::Rotate90
                | OutputTransform::Rotate270
                | OutputTransform::Flipped90
                | OutputTransform::Flipped270
        )
    }
}

/// An output mode (resolution + refresh rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputMode {
    /// Width in physical pixels
    pub width: i32,
    /// Height in physical pixels
    pub height: i32,
    /// Refresh rate in mHz (60000 for 60 Hz)
    pub refresh: i32,
    /// Preferred mode flag
    pub preferred: bool,
}

/// Errors admitting or configuring an output
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutputError {
    #[error("output `{0}` has no usable mode")]
    NoMode(String),
    #[error("cannot allocate render primitives for `{0}`")]
    RenderInit(String),
    #[error("output `{0}` is disabled by configuration")]
    Disabled(String),
}

/// A display sink
#[derive(Debug)]
pub struct Output {
    /// Unique identifier
    pub id: OutputId,
    /// Connector name ("DP-1")
    pub name: String,
    pub make: String,
    pub model: String,
    /// Position in layout coordinates
    pub x: i32,
    pub y: i32,
    /// Scale factor
    pub scale: f64,
    /// Transform applied to the output
    pub transform: OutputTransform,
    /// Available modes
    pub modes: Vec<OutputMode>,
    /// Index of the active mode
    pub current_mode: Option<usize>,
    /// Index of the workspace this output currently shows
    pub workspace: usize,
    /// Layer surfaces per layer, bottom to top within each list
    pub layers: [Vec<LayerSurface>; 4],
    /// Area left for maximized views after the last arrange
    pub usable_area: Rect,
    /// Accumulated damage
    pub damage: DamageTracker,
    /// Composition state
    pub render: RenderContext,
}

impl Output {
    /// Admit a new output. Fails when no mode is usable or the render
    /// primitives cannot be created; a failed output must not be used.
    pub fn new(
        name: String,
        make: String,
        model: String,
        modes: Vec<OutputMode>,
    ) -> Result<Self, OutputError> {
        let current_mode = if modes.is_empty() {
            return Err(OutputError::NoMode(name));
        } else {
            Some(
                modes
                    .iter()
                    .position(|m| m.preferred)
                    .unwrap_or(0),
            )
        };

        let mut output = Self {
            id: OutputId::next(),
            name,
            make,
            model,
            x: 0,
            y: 0,
            scale: 1.0,
            transform: OutputTransform::Normal,
            modes,
            current_mode,
            workspace: 0,
            layers: Default::default(),
            usable_area: Rect::zero(),
            damage: DamageTracker::new(Rect::zero()),
            render: RenderContext::new(),
        };

        let bounds = output.layout_box();
        if bounds.is_empty() {
            return Err(OutputError::RenderInit(output.name));
        }
        output.damage = DamageTracker::new(bounds);
        output.usable_area = bounds;
        Ok(output)
    }

    /// The active mode
    pub fn mode(&self) -> Option<&OutputMode> {
        self.current_mode.and_then(|i| self.modes.get(i))
    }

    /// Effective resolution: mode size adjusted for transform and scale
    pub fn logical_size(&self) -> (i32, i32) {
        let Some(mode) = self.mode() else {
            return (0, 0);
        };
        let (w, h) = if self.transform.swaps_axes() {
            (mode.height, mode.width)
        } else {
            (mode.width, mode.height)
        };
        (
            (w as f64 / self.scale).round() as i32,
            (h as f64 / self.scale).round() as i32,
        )
    }

    /// The output's box in layout coordinates
    pub fn layout_box(&self) -> Rect {
        let (w, h) = self.logical_size();
        Rect::new(self.x, self.y, w, h)
    }

    /// Re-sync the damage bounds after a move/mode/scale/transform change
    pub fn update_geometry(&mut self) {
        self.damage.set_bounds(self.layout_box());
    }

    /// Switch the active mode to the one matching `width`x`height` at
    /// `refresh` (0 matches any refresh). Returns false if absent.
    pub fn set_mode(&mut self, width: i32, height: i32, refresh: i32) -> bool {
        let found = self.modes.iter().position(|m| {
            m.width == width && m.height == height && (refresh == 0 || m.refresh == refresh)
        });
        match found {
            Some(index) => {
                self.current_mode = Some(index);
                self.update_geometry();
                true
            }
            None => false,
        }
    }

    /// All layer surfaces of the output
    pub fn layer_surfaces(&self) -> impl Iterator<Item = &LayerSurface> {
        self.layers.iter().flatten()
    }

    /// Find a layer surface by its backing surface
    pub fn layer_surface_mut(
        &mut self,
        surface: crate::compositor::surface::SurfaceId,
    ) -> Option<&mut LayerSurface> {
        self.layers
            .iter_mut()
            .flatten()
            .find(|l| l.surface == surface)
    }

    /// Remove a layer surface by its backing surface. Erase-if-present.
    pub fn remove_layer_surface(
        &mut self,
        surface: crate::compositor::surface::SurfaceId,
    ) -> bool {
        let mut removed = false;
        for list in &mut self.layers {
            let before = list.len();
            list.retain(|l| l.surface != surface);
            removed |= list.len() != before;
        }
        removed
    }
}

/// Manager for all outputs
#[derive(Debug, Default)]
pub struct OutputManager {
    outputs: HashMap<OutputId, Output>,
    /// Primary output, used as the fallback home for new things
    primary: Option<OutputId>,
}

impl OutputManager {
    /// Create a new output manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an admitted output
    pub fn add(&mut self, output: Output) -> OutputId {
        let id = output.id;
        let is_first = self.outputs.is_empty();
        self.outputs.insert(id, output);
        if is_first {
            self.primary = Some(id);
        }
        id
    }

    /// Get an output by ID
    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(&id)
    }

    /// Get a mutable output by ID
    pub fn get_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.get_mut(&id)
    }

    /// Remove an output; the caller tears down its layer surfaces
    pub fn remove(&mut self, id: OutputId) -> Option<Output> {
        let output = self.outputs.remove(&id);
        if self.primary == Some(id) {
            self.primary = self.outputs.keys().next().copied();
        }
        output
    }

    /// The primary output
    pub fn primary(&self) -> Option<&Output> {
        self.primary.and_then(|id| self.outputs.get(&id))
    }

    /// The output whose box contains the point
    pub fn at(&self, x: f64, y: f64) -> Option<&Output> {
        self.outputs
            .values()
            .find(|o| o.layout_box().contains(x, y))
    }

    /// The output nearest to a point (the containing one, else smallest
    /// center distance)
    pub fn nearest(&self, x: f64, y: f64) -> Option<&Output> {
        if let Some(output) = self.at(x, y) {
            return Some(output);
        }
        self.outputs.values().min_by(|a, b| {
            let da = center_distance(a.layout_box(), x, y);
            let db = center_distance(b.layout_box(), x, y);
            da.total_cmp(&db)
        })
    }

    /// The output closest to the center of the whole layout
    pub fn layout_center(&self) -> Option<&Output> {
        let bounds = self
            .outputs
            .values()
            .fold(Rect::zero(), |acc, o| acc.union(&o.layout_box()));
        let (cx, cy) = bounds.center();
        self.nearest(cx, cy)
    }

    /// All outputs
    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.outputs.values()
    }

    /// All outputs, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Output> {
        self.outputs.values_mut()
    }

    /// Number of outputs
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// True if no outputs exist
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

fn center_distance(rect: Rect, x: f64, y: f64) -> f64 {
    let (cx, cy) = rect.center();
    let dx = cx - x;
    let dy = cy - y;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(width: i32, height: i32) -> OutputMode {
        OutputMode {
            width,
            height,
            refresh: 60000,
            preferred: true,
        }
    }

    fn output(name: &str, w: i32, h: i32) -> Output {
        Output::new(name.into(), "test".into(), "test".into(), vec![mode(w, h)]).unwrap()
    }

    #[test]
    fn test_output_without_mode_is_rejected() {
        assert!(matches!(
            Output::new("bad".into(), String::new(), String::new(), vec![]),
            Err(OutputError::NoMode(name)) if name == "bad"
        ));
        assert!(matches!(
            Output::new("bad".into(), String::new(), String::new(), vec![mode(0, 0)]),
            Err(OutputError::RenderInit(_))
        ));
    }

    #[test]
    fn test_logical_size_transform_and_scale() {
        let mut output = output("DP-1", 1920, 1080);
        assert_eq!(output.logical_size(), (1920, 1080));

        output.transform = OutputTransform::Rotate90;
        assert_eq!(output.logical_size(), (1080, 1920));

        output.transform = OutputTransform::Normal;
        output.scale = 2.0;
        assert_eq!(output.logical_size(), (960, 540));
    }

    #[test]
    fn test_set_mode() {
        let mut out = Output::new(
            "DP-1".into(),
            String::new(),
            String::new(),
            vec![mode(1920, 1080), mode(1280, 720)],
        )
        .unwrap();
        assert!(out.set_mode(1280, 720, 0));
        assert_eq!(out.logical_size(), (1280, 720));
        assert!(!out.set_mode(640, 480, 0));
    }

    #[test]
    fn test_manager_primary_and_lookup() {
        let mut manager = OutputManager::new();
        let a = manager.add(output("DP-1", 1920, 1080));
        let mut second = output("DP-2", 1280, 720);
        second.x = 1920;
        let b = manager.add(second);

        assert_eq!(manager.primary().unwrap().id, a);
        assert_eq!(manager.at(2000.0, 100.0).unwrap().id, b);
        assert_eq!(manager.at(100.0, 100.0).unwrap().id, a);
        assert!(manager.at(-5.0, -5.0).is_none());
        assert_eq!(manager.nearest(-5.0, -5.0).unwrap().id, a);

        manager.remove(a);
        assert_eq!(manager.primary().unwrap().id, b);
        assert!(manager.remove(a).is_none());
    }

    #[test]
    fn test_eq_impl_for_errors() {
        // PartialEq on Output itself is intentionally absent; errors compare.
        assert_eq!(
            OutputError::NoMode("x".into()),
            OutputError::NoMode("x".into())
        );
    }
}
