//! Frame composition
//!
//! Turns accumulated damage into renderer commands. Compositing order,
//! back to front: background layer, bottom layer, then either the single
//! fullscreen view or the current workspace's views followed by the top
//! layer, then drag icons, then the overlay layer. Every surface included
//! in a frame gets a frame-done acknowledgment afterwards; a skipped frame
//! acknowledges nothing.

use log::debug;

use crate::compositor::geometry::Rect;
use crate::compositor::output::Output;
use crate::compositor::surface::{SurfaceId, SurfaceManager};
use crate::compositor::view::{View, ViewManager};
use crate::compositor::workspace::WorkspaceSet;
use crate::protocol::adapter::{AdapterQueue, AdapterRequest};
use crate::protocol::layer_shell::Layer;
use crate::renderer::{Color, Renderer};

/// Per-frame alpha advance of the workspace cross-fade (about seven frames)
pub const FADE_STEP: f32 = 0.15;

/// Horizontal slide distance of the cross-fade, as a fraction of the output
const FADE_SLIDE: f64 = 0.125;

/// An in-flight workspace switch animation
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceFade {
    /// The workspace being faded out
    pub from: usize,
    /// Ramp position in [0, 1]
    pub alpha: f32,
    /// +1 when switching to a higher index, -1 otherwise
    pub direction: i32,
}

impl WorkspaceFade {
    /// Start a fade away from `from`
    pub fn new(from: usize, direction: i32) -> Self {
        Self {
            from,
            alpha: 0.0,
            direction,
        }
    }
}

/// A drag icon to draw above the scene
#[derive(Debug, Clone, Copy)]
pub struct DragIconFrame {
    pub surface: SurfaceId,
    pub x: f64,
    pub y: f64,
}

/// Composition state owned by one output
#[derive(Debug)]
pub struct RenderContext {
    /// Background clear color
    pub clear_color: Color,
    /// Decoration border color
    pub border_color: Color,
    /// Decoration titlebar color
    pub titlebar_color: Color,
    /// Active workspace switch animation
    pub fade: Option<WorkspaceFade>,
    /// Surface currently on the direct scanout path
    scanout: Option<SurfaceId>,
    /// Composited frames so far
    pub frames: u64,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            clear_color: [0.15, 0.15, 0.15, 1.0],
            border_color: [0.28, 0.28, 0.33, 1.0],
            titlebar_color: [0.20, 0.20, 0.24, 1.0],
            fade: None,
            scanout: None,
            frames: 0,
        }
    }
}

impl RenderContext {
    /// Create the per-output composition state
    pub fn new() -> Self {
        Self::default()
    }

    /// The surface on the direct scanout path, if any
    pub fn scanout(&self) -> Option<SurfaceId> {
        self.scanout
    }
}

/// Outcome of one frame for tests and stats
#[derive(Debug, Default)]
pub struct FrameStats {
    /// True when the frame was skipped (no damage, no pending swap)
    pub skipped: bool,
    /// Surfaces included in the frame, in no particular order
    pub presented: Vec<SurfaceId>,
    /// Number of repaint rectangles
    pub damage_rects: usize,
}

/// Compose one frame for `output`.
pub fn render_output<R: Renderer>(
    output: &mut Output,
    workspaces: &WorkspaceSet,
    views: &ViewManager,
    surfaces: &mut SurfaceManager,
    drag_icons: &[DragIconFrame],
    renderer: &mut R,
    queue: &mut AdapterQueue,
    time_ms: u32,
) -> FrameStats {
    // While a workspace switch animates, everything repaints every frame.
    if output.render.fade.is_some() {
        output.damage.damage_whole();
    }

    let Some(repaint) = output.damage.frame() else {
        return FrameStats {
            skipped: true,
            ..Default::default()
        };
    };

    let obox = output.layout_box();
    let (width, height) = output.logical_size();
    let workspace = workspaces.get(output.workspace);

    let fullscreen: Option<&View> = workspace
        .and_then(|ws| ws.fullscreen)
        .and_then(|id| views.get(id))
        .filter(|v| v.mapped && v.fullscreen_output == Some(output.id));

    // Direct scanout: a fullscreen view whose surface tree has no children
    // can bypass composition entirely.
    let scanout_wanted = fullscreen
        .filter(|v| !v.has_children())
        .map(|v| v.surface);
    if scanout_wanted != output.render.scanout {
        output.render.scanout = scanout_wanted;
        queue.push(AdapterRequest::SetFullscreenSurface {
            output: output.id,
            surface: scanout_wanted,
        });
    }

    let mut presented: Vec<SurfaceId> = Vec::new();

    renderer.begin(width, height);
    for rect in &repaint {
        renderer.scissor(Some(to_local(*rect, obox)));
        renderer.clear(output.render.clear_color);

        draw_layer(output, Layer::Background, obox, surfaces, renderer, &mut presented);
        draw_layer(output, Layer::Bottom, obox, surfaces, renderer, &mut presented);

        if let Some(view) = fullscreen {
            if output.render.scanout.is_none() {
                draw_view(view, obox, 0.0, 1.0, false, output, surfaces, renderer, &mut presented);
            } else {
                // Not composited, but still presented this frame.
                collect_tree(view.surface, surfaces, &mut presented);
            }
        } else {
            if let (Some(fade), Some(prev)) = (
                output.render.fade,
                output
                    .render
                    .fade
                    .and_then(|f| workspaces.get(f.from)),
            ) {
                let t = fade.alpha;
                let slide = obox.width as f64 * FADE_SLIDE;
                let prev_dx = -(fade.direction as f64) * t as f64 * slide;
                let new_dx = fade.direction as f64 * (1.0 - t as f64) * slide;
                for id in prev.views() {
                    if let Some(view) = views.get(*id) {
                        draw_view(view, obox, prev_dx, 1.0 - t, true, output, surfaces, renderer, &mut presented);
                    }
                }
                if let Some(ws) = workspace {
                    for id in ws.views() {
                        if let Some(view) = views.get(*id) {
                            draw_view(view, obox, new_dx, t, true, output, surfaces, renderer, &mut presented);
                        }
                    }
                }
            } else if let Some(ws) = workspace {
                for id in ws.views() {
                    if let Some(view) = views.get(*id) {
                        draw_view(view, obox, 0.0, 1.0, true, output, surfaces, renderer, &mut presented);
                    }
                }
            }
            draw_layer(output, Layer::Top, obox, surfaces, renderer, &mut presented);
        }

        for icon in drag_icons {
            if let Some(surface) = surfaces.get(icon.surface).filter(|s| s.is_mapped()) {
                let (w, h) = surface.size();
                renderer.draw_surface(
                    icon.surface,
                    Rect::new(
                        icon.x as i32 - obox.x,
                        icon.y as i32 - obox.y,
                        w,
                        h,
                    ),
                    1.0,
                    0.0,
                );
                collect_tree(icon.surface, surfaces, &mut presented);
            }
        }

        draw_layer(output, Layer::Overlay, obox, surfaces, renderer, &mut presented);
    }
    renderer.scissor(None);
    renderer.end();

    // Advance the cross-fade; the previous workspace reference clears once
    // the ramp reaches 1.
    if let Some(fade) = &mut output.render.fade {
        fade.alpha += FADE_STEP;
        if fade.alpha >= 1.0 {
            debug!("workspace fade finished on {:?}", output.id);
            output.render.fade = None;
        }
    }
    output.render.frames += 1;

    presented.sort_by_key(|s| s.0);
    presented.dedup();
    for surface in &presented {
        if let Some(s) = surfaces.get_mut(*surface) {
            s.take_frame_callbacks();
        }
        queue.push(AdapterRequest::FrameDone {
            surface: *surface,
            time_ms,
        });
    }

    FrameStats {
        skipped: false,
        presented,
        damage_rects: repaint.len(),
    }
}

fn to_local(rect: Rect, obox: Rect) -> Rect {
    Rect::new(rect.x - obox.x, rect.y - obox.y, rect.width, rect.height)
}

fn draw_layer<R: Renderer>(
    output: &Output,
    layer: Layer,
    obox: Rect,
    surfaces: &SurfaceManager,
    renderer: &mut R,
    presented: &mut Vec<SurfaceId>,
) {
    for ls in &output.layers[layer.index()] {
        if !ls.mapped {
            continue;
        }
        if surfaces.get(ls.surface).map(|s| s.is_mapped()) != Some(true) {
            continue;
        }
        renderer.draw_surface(ls.surface, to_local(ls.geometry, obox), 1.0, 0.0);
        collect_tree(ls.surface, surfaces, presented);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_view<R: Renderer>(
    view: &View,
    obox: Rect,
    dx: f64,
    alpha: f32,
    decorations: bool,
    output: &Output,
    surfaces: &SurfaceManager,
    renderer: &mut R,
    presented: &mut Vec<SurfaceId>,
) {
    if !view.mapped {
        return;
    }
    let alpha = (view.alpha * alpha).clamp(0.0, 1.0);

    if decorations && view.decoration.visible {
        let deco = view.decorated_box();
        renderer.draw_quad(
            to_local(shift(deco, dx), obox),
            output.render.border_color,
            view.rotation,
        );
        let titlebar = Rect::new(
            deco.x + view.decoration.border,
            deco.y + view.decoration.border,
            view.width,
            view.decoration.titlebar,
        );
        renderer.draw_quad(
            to_local(shift(titlebar, dx), obox),
            output.render.titlebar_color,
            view.rotation,
        );
    }

    renderer.draw_surface(
        view.surface,
        to_local(shift(view.geometry_box(), dx), obox),
        alpha,
        view.rotation,
    );
    collect_tree(view.surface, surfaces, presented);

    for child in view.children() {
        let Some(surface) = surfaces.get(child.surface).filter(|s| s.is_mapped()) else {
            continue;
        };
        let (w, h) = surface.size();
        let dest = Rect::new(
            (view.x + child.x as f64 + dx) as i32,
            (view.y + child.y as f64) as i32,
            w,
            h,
        );
        renderer.draw_surface(child.surface, to_local(dest, obox), alpha, view.rotation);
        collect_tree(child.surface, surfaces, presented);
    }
}

fn shift(rect: Rect, dx: f64) -> Rect {
    Rect::new(rect.x + dx as i32, rect.y, rect.width, rect.height)
}

/// Record a surface and all its subsurface descendants as presented
fn collect_tree(surface: SurfaceId, surfaces: &SurfaceManager, presented: &mut Vec<SurfaceId>) {
    let Some(s) = surfaces.get(surface) else {
        return;
    };
    presented.push(surface);
    for child in &s.children {
        collect_tree(*child, surfaces, presented);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::output::OutputMode;
    use crate::compositor::surface::{BufferInfo, ClientId};
    use crate::compositor::view::ChildKind;
    use crate::protocol::layer_shell::{Anchor, Layer as ShellLayer, LayerSurface};
    use crate::protocol::shell::ShellKind;
    use crate::renderer::{DrawCommand, TraceRenderer};

    struct Harness {
        output: Output,
        workspaces: WorkspaceSet,
        views: ViewManager,
        surfaces: SurfaceManager,
        queue: AdapterQueue,
        renderer: TraceRenderer,
    }

    impl Harness {
        fn new() -> Self {
            let output = Output::new(
                "TEST-1".into(),
                String::new(),
                String::new(),
                vec![OutputMode {
                    width: 800,
                    height: 600,
                    refresh: 60000,
                    preferred: true,
                }],
            )
            .unwrap();
            Self {
                output,
                workspaces: WorkspaceSet::new(),
                views: ViewManager::new(),
                surfaces: SurfaceManager::new(),
                queue: AdapterQueue::new(),
                renderer: TraceRenderer::new(),
            }
        }

        fn mapped_surface(&mut self, w: i32, h: i32) -> SurfaceId {
            let id = self.surfaces.create(ClientId(1));
            let s = self.surfaces.get_mut(id).unwrap();
            s.attach(Some(BufferInfo {
                width: w,
                height: h,
                scale: 1,
            }));
            s.commit();
            id
        }

        fn mapped_view(&mut self) -> crate::compositor::view::ViewId {
            let surface = self.mapped_surface(100, 100);
            let id = self.views.create(surface, ShellKind::Xdg, 0);
            let view = self.views.get_mut(id).unwrap();
            view.map();
            view.width = 100;
            view.height = 100;
            self.workspaces.get_mut(0).unwrap().push(id);
            id
        }

        fn frame(&mut self) -> FrameStats {
            render_output(
                &mut self.output,
                &self.workspaces,
                &self.views,
                &mut self.surfaces,
                &[],
                &mut self.renderer,
                &mut self.queue,
                16,
            )
        }
    }

    #[test]
    fn test_idle_frame_is_skipped_and_acknowledges_nothing() {
        let mut h = Harness::new();
        h.frame();
        h.frame();
        h.queue.drain();

        let stats = h.frame();
        assert!(stats.skipped);
        assert!(stats.presented.is_empty());
        assert!(h.queue.is_empty());
    }

    #[test]
    fn test_composition_order() {
        let mut h = Harness::new();
        let view = h.mapped_view();
        let view_surface = h.views.get(view).unwrap().surface;

        let bg_surface = h.mapped_surface(800, 600);
        let mut bg = LayerSurface::new(bg_surface, ShellLayer::Background, "bg".into());
        bg.anchor = Anchor::all();
        bg.geometry = Rect::new(0, 0, 800, 600);
        bg.mapped = true;
        h.output.layers[ShellLayer::Background.index()].push(bg);

        let overlay_surface = h.mapped_surface(800, 32);
        let mut overlay = LayerSurface::new(overlay_surface, ShellLayer::Overlay, "osd".into());
        overlay.geometry = Rect::new(0, 0, 800, 32);
        overlay.mapped = true;
        h.output.layers[ShellLayer::Overlay.index()].push(overlay);

        let stats = h.frame();
        assert!(!stats.skipped);

        let drawn = h.renderer.drawn_surfaces();
        let pos = |s: SurfaceId| drawn.iter().position(|&d| d == s).unwrap();
        assert!(pos(bg_surface) < pos(view_surface));
        assert!(pos(view_surface) < pos(overlay_surface));

        for s in [bg_surface, view_surface, overlay_surface] {
            assert!(stats.presented.contains(&s));
        }
    }

    #[test]
    fn test_frame_done_covers_children_and_drag_icons() {
        let mut h = Harness::new();
        let view = h.mapped_view();
        let popup_surface = h.mapped_surface(50, 50);
        let icon_surface = h.mapped_surface(24, 24);
        {
            let v = h.views.get_mut(view).unwrap();
            let slot = v.add_child(popup_surface, ChildKind::Popup, None);
            v.place_child(slot, 10, 10);
        }

        let stats = render_output(
            &mut h.output,
            &h.workspaces,
            &h.views,
            &mut h.surfaces,
            &[DragIconFrame {
                surface: icon_surface,
                x: 5.0,
                y: 5.0,
            }],
            &mut h.renderer,
            &mut h.queue,
            16,
        );

        assert!(stats.presented.contains(&popup_surface));
        assert!(stats.presented.contains(&icon_surface));

        let done: Vec<SurfaceId> = h
            .queue
            .drain()
            .into_iter()
            .filter_map(|r| match r {
                AdapterRequest::FrameDone { surface, .. } => Some(surface),
                _ => None,
            })
            .collect();
        assert!(done.contains(&popup_surface));
        assert!(done.contains(&icon_surface));
    }

    #[test]
    fn test_cross_fade_runs_and_clears() {
        let mut h = Harness::new();
        h.mapped_view();
        h.output.render.fade = Some(WorkspaceFade::new(0, 1));
        h.output.workspace = 1;

        let mut frames = 0;
        while h.output.render.fade.is_some() {
            let stats = h.frame();
            assert!(!stats.skipped);
            frames += 1;
            assert!(frames < 20, "fade never finished");
        }
        assert!(frames >= 5);
    }

    #[test]
    fn test_fullscreen_direct_scanout() {
        let mut h = Harness::new();
        let view = h.mapped_view();
        let surface = h.views.get(view).unwrap().surface;
        h.views.get_mut(view).unwrap().fullscreen_output = Some(h.output.id);
        h.workspaces.get_mut(0).unwrap().fullscreen = Some(view);

        let stats = h.frame();
        assert_eq!(h.output.render.scanout(), Some(surface));
        // Not drawn, but presented and acknowledged.
        assert!(!h.renderer.drawn_surfaces().contains(&surface));
        assert!(stats.presented.contains(&surface));
        let requests = h.queue.drain();
        assert!(requests.contains(&AdapterRequest::SetFullscreenSurface {
            output: h.output.id,
            surface: Some(surface),
        }));

        // A popup forces composition again.
        let popup = h.mapped_surface(10, 10);
        h.views.get_mut(view).unwrap().add_child(popup, ChildKind::Popup, None);
        h.output.damage.damage_whole();
        h.renderer.reset();
        h.frame();
        assert_eq!(h.output.render.scanout(), None);
        assert!(h.renderer.drawn_surfaces().contains(&surface));
        assert!(h.queue.drain().contains(&AdapterRequest::SetFullscreenSurface {
            output: h.output.id,
            surface: None,
        }));
    }

    #[test]
    fn test_decorations_drawn_as_quads() {
        let mut h = Harness::new();
        h.mapped_view();
        h.frame();
        let quads = h
            .renderer
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Quad { .. }))
            .count();
        assert!(quads >= 2, "border and titlebar quads expected");
    }
}
