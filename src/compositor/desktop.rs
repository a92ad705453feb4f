//! Desktop aggregation
//!
//! The desktop owns all outputs, the fixed workspace deck, the surface and
//! view arenas, and every seat. All adapter traffic lands here: surface
//! lifecycle on one side, input events on the other. There is no hidden
//! global state; anything that needs to enumerate seats or outputs takes
//! the desktop.

use log::{debug, info, warn};

use crate::compositor::geometry::{rotated_bounds, Rect};
use crate::compositor::layer::arrange_layers;
use crate::compositor::output::{Output, OutputError, OutputId, OutputManager, OutputMode};
use crate::compositor::render::{self, DragIconFrame, FrameStats, WorkspaceFade};
use crate::compositor::surface::{ClientId, SurfaceId, SurfaceManager, SurfaceRole};
use crate::compositor::view::{ChildKind, DecorationPart, ViewId, ViewManager, ViewTarget};
use crate::compositor::workspace::{WorkspaceSet, WORKSPACE_COUNT};
use crate::config::ConfigSet;
use crate::input::cursor::{edges_from_quadrant, GrabUpdate};
use crate::input::pointer::{BTN_LEFT, BTN_MIDDLE, BTN_RIGHT};
use crate::input::seat::{DeviceKind, DragIcon, Seat};
use crate::protocol::adapter::{AdapterQueue, AdapterRequest, SerialCounter};
use crate::protocol::layer_shell::{Layer, LayerShellError, LayerSurface, LayerSurfaceId};
use crate::protocol::shell::{ShellError, ShellKind};
use crate::protocol::window_manager::{self, WindowManager};
use crate::protocol::workspace_manager::{self, WorkspaceManager};
use crate::renderer::Renderer;

/// What a desktop-level hit test resolved to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    /// A layer surface, with surface-local coordinates
    Layer {
        layer_surface: LayerSurfaceId,
        surface: SurfaceId,
        sx: f64,
        sy: f64,
    },
    /// A surface belonging to a view
    ViewSurface {
        view: ViewId,
        surface: SurfaceId,
        sx: f64,
        sy: f64,
    },
    /// A decoration part of a view
    ViewDecoration { view: ViewId, part: DecorationPart },
}

impl HitTarget {
    /// The view involved, if any
    pub fn view(&self) -> Option<ViewId> {
        match self {
            HitTarget::ViewSurface { view, .. } | HitTarget::ViewDecoration { view, .. } => {
                Some(*view)
            }
            HitTarget::Layer { .. } => None,
        }
    }
}

/// The top-level aggregator
pub struct Desktop {
    pub outputs: OutputManager,
    pub workspaces: WorkspaceSet,
    pub surfaces: SurfaceManager,
    pub views: ViewManager,
    pub seats: Vec<Seat>,
    /// Outbound requests for the protocol adapter
    pub queue: AdapterQueue,
    pub serials: SerialCounter,
    pub workspace_manager: WorkspaceManager,
    pub window_manager: WindowManager,
    pub config: ConfigSet,
}

impl Desktop {
    /// Create a desktop with one default seat
    pub fn new(config: ConfigSet) -> Self {
        Self {
            outputs: OutputManager::new(),
            workspaces: WorkspaceSet::new(),
            surfaces: SurfaceManager::new(),
            views: ViewManager::new(),
            seats: vec![Seat::new("seat0".into())],
            queue: AdapterQueue::new(),
            serials: SerialCounter::new(),
            workspace_manager: WorkspaceManager::new(),
            window_manager: WindowManager::new(),
            config,
        }
    }

    // ---- outputs -------------------------------------------------------

    /// Admit a new output, applying any configuration override. Disabled
    /// outputs and outputs that cannot allocate render primitives are not
    /// admitted.
    pub fn new_output(
        &mut self,
        name: &str,
        make: &str,
        model: &str,
        modes: Vec<OutputMode>,
    ) -> Result<OutputId, OutputError> {
        if let Some(cfg) = self.config.output(name) {
            if !cfg.enabled {
                info!("output {} disabled by configuration", name);
                return Err(OutputError::Disabled(name.into()));
            }
        }

        let mut output = Output::new(name.into(), make.into(), model.into(), modes)?;

        if let Some(cfg) = self.config.output(name) {
            if let Some((x, y)) = cfg.position {
                output.x = x;
                output.y = y;
            }
            if let Some(scale) = cfg.scale {
                output.scale = scale;
            }
            if let Some(transform) = cfg.transform {
                output.transform = transform;
            }
            if let Some((w, h, refresh)) = cfg.mode {
                if !output.set_mode(w, h, refresh) {
                    warn!("output {}: configured mode {}x{} not available", name, w, h);
                }
            }
            output.update_geometry();
        }

        // Show the first workspace not already current on another output.
        output.workspace = (0..WORKSPACE_COUNT)
            .find(|&i| !self.outputs.iter().any(|o| o.workspace == i))
            .unwrap_or(0);

        let id = self.outputs.add(output);
        info!("admitted output {} ({:?})", name, id);
        self.arrange_output(id);
        Ok(id)
    }

    /// An output went away: its layer surfaces close, fullscreen views fall
    /// back to normal. Erase-if-present.
    pub fn output_destroyed(&mut self, id: OutputId) {
        let Some(output) = self.outputs.remove(id) else {
            return;
        };
        for ls in output.layers.iter().flatten() {
            self.queue.push(AdapterRequest::Close {
                surface: ls.surface,
            });
        }
        let affected: Vec<ViewId> = self
            .views
            .iter()
            .filter(|(_, v)| v.fullscreen_output == Some(id))
            .map(|(v, _)| *v)
            .collect();
        for view in affected {
            self.set_view_fullscreen(view, false, None);
        }
        for seat in &mut self.seats {
            if let Some(layer) = seat.focused_layer() {
                if output.layer_surfaces().any(|l| l.id == layer) {
                    seat.set_focused_layer(None);
                }
            }
        }
        info!("output {:?} removed", id);
    }

    /// Re-run the layer arrangement for an output and everything that hangs
    /// off it: usable area, maximized views, the seats' focused layer.
    pub fn arrange_output(&mut self, id: OutputId) {
        let Some(output) = self.outputs.get_mut(id) else {
            return;
        };
        let area = output.layout_box();
        let outcome = arrange_layers(area, &mut output.layers, &mut self.serials, &mut self.queue);
        output.usable_area = outcome.usable_area;
        output.damage.damage_whole();
        let workspace = output.workspace;
        let usable = outcome.usable_area;

        for surface in outcome.rejected {
            self.close_surface(surface);
        }

        let maximized: Vec<ViewId> = self
            .workspaces
            .get(workspace)
            .map(|ws| ws.views().to_vec())
            .unwrap_or_default();
        for view_id in maximized {
            if let Some(view) = self.views.get_mut(view_id) {
                if view.maximized {
                    let serial = self.serials.next();
                    view.request_geometry(
                        usable.x as f64,
                        usable.y as f64,
                        usable.width,
                        usable.height,
                        serial,
                        &mut self.queue,
                    );
                }
            }
        }

        let owned: Vec<LayerSurfaceId> = self
            .outputs
            .get(id)
            .map(|o| o.layer_surfaces().map(|l| l.id).collect())
            .unwrap_or_default();
        for seat in &mut self.seats {
            match outcome.focus {
                Some(focus) => seat.set_focused_layer(Some(focus)),
                None => {
                    if seat
                        .focused_layer()
                        .is_some_and(|l| owned.contains(&l))
                    {
                        seat.set_focused_layer(None);
                    }
                }
            }
        }
    }

    /// Compose one frame for an output
    pub fn render<R: Renderer>(
        &mut self,
        id: OutputId,
        renderer: &mut R,
        time_ms: u32,
    ) -> FrameStats {
        let drag_icons: Vec<DragIconFrame> = self
            .seats
            .iter()
            .filter_map(|s| {
                s.drag_icon.map(|d| DragIconFrame {
                    surface: d.surface,
                    x: s.cursor.x + d.dx,
                    y: s.cursor.y + d.dy,
                })
            })
            .collect();
        let Some(output) = self.outputs.get_mut(id) else {
            return FrameStats {
                skipped: true,
                ..Default::default()
            };
        };
        render::render_output(
            output,
            &self.workspaces,
            &self.views,
            &mut self.surfaces,
            &drag_icons,
            renderer,
            &mut self.queue,
            time_ms,
        )
    }

    // ---- surfaces and views --------------------------------------------

    /// The adapter reports a new surface
    pub fn new_surface(&mut self, client: ClientId) -> SurfaceId {
        self.surfaces.create(client)
    }

    /// A surface became a toplevel of one of the shell variants
    pub fn new_toplevel(
        &mut self,
        surface: SurfaceId,
        kind: ShellKind,
    ) -> Result<ViewId, ShellError> {
        let s = self
            .surfaces
            .get_mut(surface)
            .ok_or(ShellError::InvalidSurface)?;
        s.set_role(SurfaceRole::Toplevel)
            .map_err(|_| ShellError::RoleAlreadySet)?;
        let workspace = self.active_workspace();
        Ok(self.views.create(surface, kind, workspace))
    }

    /// A popup for a toplevel surface or for another popup
    pub fn new_popup(
        &mut self,
        parent: SurfaceId,
        surface: SurfaceId,
        x: i32,
        y: i32,
    ) -> Result<(), ShellError> {
        let s = self
            .surfaces
            .get_mut(surface)
            .ok_or(ShellError::InvalidSurface)?;
        s.set_role(SurfaceRole::Popup)
            .map_err(|_| ShellError::RoleAlreadySet)?;

        let (view_id, parent_slot) = self
            .owning_view(parent)
            .ok_or(ShellError::MissingParent)?;
        let view = self
            .views
            .get_mut(view_id)
            .ok_or(ShellError::MissingParent)?;
        let slot = view.add_child(surface, ChildKind::Popup, parent_slot);
        view.place_child(slot, x, y);
        self.damage_view(view_id);
        Ok(())
    }

    /// A subsurface under a parent surface
    pub fn new_subsurface(&mut self, parent: SurfaceId, surface: SurfaceId) -> Result<(), ShellError> {
        let s = self
            .surfaces
            .get_mut(surface)
            .ok_or(ShellError::InvalidSurface)?;
        s.set_role(SurfaceRole::Subsurface)
            .map_err(|_| ShellError::RoleAlreadySet)?;
        self.surfaces.link_subsurface(parent, surface);
        if let Some((view_id, parent_slot)) = self.owning_view(parent) {
            if let Some(view) = self.views.get_mut(view_id) {
                view.add_child(surface, ChildKind::Subsurface, parent_slot);
            }
        }
        Ok(())
    }

    /// A new layer surface. With no output given the fallback chain is
    /// seat-default output, then the layout center output, then close.
    pub fn new_layer_surface(
        &mut self,
        surface: SurfaceId,
        output: Option<OutputId>,
        layer: Layer,
        namespace: String,
    ) -> Result<LayerSurfaceId, LayerShellError> {
        let s = self
            .surfaces
            .get_mut(surface)
            .ok_or(LayerShellError::InvalidSurface)?;
        if s.set_role(SurfaceRole::Layer).is_err() {
            return Err(LayerShellError::InvalidSurface);
        }

        let output_id = output
            .filter(|id| self.outputs.get(*id).is_some())
            .or_else(|| self.seat_default_output())
            .or_else(|| self.outputs.layout_center().map(|o| o.id));
        let Some(output_id) = output_id else {
            warn!("layer surface {} has no output, closing", namespace);
            self.close_surface(surface);
            return Err(LayerShellError::NoOutput);
        };

        let ls = LayerSurface::new(surface, layer, namespace);
        let id = ls.id;
        if let Some(out) = self.outputs.get_mut(output_id) {
            out.layers[layer.index()].push(ls);
        }
        // Placement waits for the first commit, once the client has set its
        // anchors and size.
        Ok(id)
    }

    /// A surface committed; route the outcome by role.
    pub fn surface_commit(&mut self, surface: SurfaceId) {
        let Some(s) = self.surfaces.get_mut(surface) else {
            return;
        };
        let role = s.role;
        let outcome = s.commit();
        let size = s.size();

        match role {
            SurfaceRole::Toplevel => {
                let Some(view_id) = self.views.by_surface(surface) else {
                    return;
                };
                if outcome.mapped {
                    self.map_view(view_id, size);
                } else if outcome.unmapped {
                    self.unmap_view(view_id);
                }
                // Apply geometry that was waiting on this commit.
                if let Some(view) = self.views.get_mut(view_id) {
                    if let Some((before, after)) = view.commit_geometry(outcome.acked_serial) {
                        let workspace = view.workspace;
                        self.damage_workspace_rect(workspace, before);
                        self.damage_workspace_rect(workspace, after);
                    }
                }
                self.damage_commit(view_id, &outcome.damage);
            }
            SurfaceRole::Popup | SurfaceRole::Subsurface => {
                if let Some((view_id, _)) = self.owning_view(surface) {
                    self.damage_view(view_id);
                }
            }
            SurfaceRole::Layer => {
                let owner = self.outputs.iter_mut().find_map(|o| {
                    let id = o.id;
                    o.layer_surface_mut(surface).map(|ls| {
                        if outcome.mapped {
                            ls.mapped = true;
                        }
                        if outcome.unmapped {
                            ls.mapped = false;
                        }
                        id
                    })
                });
                // Anchors, margins or the zone may have changed with this
                // commit; re-run the arrangement either way.
                if let Some(output_id) = owner {
                    self.arrange_output(output_id);
                }
            }
            SurfaceRole::DragIcon | SurfaceRole::Cursor => {
                self.damage_drag_icons();
            }
            SurfaceRole::None => {}
        }
    }

    /// A surface's protocol object was destroyed. Erase-if-present on every
    /// collection that may reference it.
    pub fn surface_destroyed(&mut self, surface: SurfaceId) {
        let role = self
            .surfaces
            .get(surface)
            .map(|s| s.role)
            .unwrap_or_default();

        match role {
            SurfaceRole::Toplevel => {
                if let Some(view_id) = self.views.by_surface(surface) {
                    self.destroy_view(view_id);
                }
            }
            SurfaceRole::Popup | SurfaceRole::Subsurface => {
                if let Some((view_id, _)) = self.owning_view(surface) {
                    if let Some(view) = self.views.get_mut(view_id) {
                        view.remove_child_by_surface(surface);
                    }
                    self.damage_view(view_id);
                }
            }
            SurfaceRole::Layer => {
                let owner: Option<(OutputId, LayerSurfaceId)> = self
                    .outputs
                    .iter()
                    .find_map(|o| {
                        o.layer_surfaces()
                            .find(|l| l.surface == surface)
                            .map(|l| (o.id, l.id))
                    });
                if let Some((output_id, layer_id)) = owner {
                    if let Some(out) = self.outputs.get_mut(output_id) {
                        out.remove_layer_surface(surface);
                    }
                    for seat in &mut self.seats {
                        if seat.focused_layer() == Some(layer_id) {
                            seat.set_focused_layer(None);
                        }
                    }
                    self.arrange_output(output_id);
                }
            }
            SurfaceRole::DragIcon => {
                for seat in &mut self.seats {
                    if seat.drag_icon.map(|d| d.surface) == Some(surface) {
                        seat.drag_icon = None;
                    }
                }
            }
            SurfaceRole::Cursor | SurfaceRole::None => {}
        }

        self.surfaces.remove(surface);
    }

    /// A client disconnected: drop everything it owned
    pub fn client_destroyed(&mut self, client: ClientId) {
        self.workspace_manager.unbind(client);
        self.window_manager.unbind(client);
        let owned: Vec<SurfaceId> = self
            .surfaces
            .iter()
            .filter(|(_, s)| s.client == client)
            .map(|(id, _)| *id)
            .collect();
        for surface in owned {
            self.surface_destroyed(surface);
        }
    }

    fn map_view(&mut self, view_id: ViewId, surface_size: (i32, i32)) {
        let cursor = self.last_input_position();
        let Some(view) = self.views.get_mut(view_id) else {
            return;
        };
        view.map();
        if view.width == 0 && view.height == 0 {
            view.width = surface_size.0.max(1);
            view.height = surface_size.1.max(1);
        }
        let workspace = view.workspace;
        let normal = view.mode() == crate::compositor::view::ViewMode::Normal;
        let (w, h) = (view.width, view.height);

        if normal {
            if let Some(output) = self.outputs.nearest(cursor.0, cursor.1) {
                let obox = output.layout_box();
                let x = obox.x as f64 + (obox.width - w) as f64 / 2.0;
                let y = obox.y as f64 + (obox.height - h) as f64 / 2.0;
                if let Some(view) = self.views.get_mut(view_id) {
                    view.move_to(x, y);
                }
            }
        }

        if let Some(ws) = self.workspaces.get_mut(workspace) {
            ws.push(view_id);
        }
        debug!("mapped view {:?} on workspace {}", view_id, workspace);
        self.focus_view(0, Some(view_id));
        self.damage_view(view_id);
    }

    fn unmap_view(&mut self, view_id: ViewId) {
        let Some(view) = self.views.get(view_id) else {
            return;
        };
        let rect = view.damage_box();
        let workspace = view.workspace;
        self.damage_workspace_rect(workspace, rect);

        if let Some(ws) = self.workspaces.get_mut(workspace) {
            ws.remove(view_id);
        }
        for seat in &mut self.seats {
            seat.view_destroyed(view_id);
        }
        if let Some(view) = self.views.get_mut(view_id) {
            view.unmap();
        }
        // Focus falls back to the new top of the workspace.
        let next = self.workspaces.get(workspace).and_then(|ws| ws.top());
        self.focus_view(0, next);
    }

    fn destroy_view(&mut self, view_id: ViewId) {
        if self.views.get(view_id).is_some_and(|v| v.mapped) {
            self.unmap_view(view_id);
        }
        if let Some(view) = self.views.remove(view_id) {
            if let Some(ws) = self.workspaces.get_mut(view.workspace) {
                ws.remove(view_id);
            }
        }
        for seat in &mut self.seats {
            seat.view_destroyed(view_id);
        }
        debug!("destroyed view {:?}", view_id);
    }

    /// The view owning a surface: its main surface or one of its children
    fn owning_view(&self, surface: SurfaceId) -> Option<(ViewId, Option<usize>)> {
        if let Some(view) = self.views.by_surface(surface) {
            return Some((view, None));
        }
        for (id, view) in self.views.iter() {
            if let Some((slot, _)) = view
                .children()
                .enumerate()
                .find(|(_, c)| c.surface == surface)
            {
                return Some((*id, Some(slot)));
            }
        }
        None
    }

    /// Queue a close for a surface (protocol violation or user action)
    pub fn close_surface(&mut self, surface: SurfaceId) {
        self.queue.push(AdapterRequest::Close { surface });
    }

    // ---- view operations -----------------------------------------------

    /// Move a view; damage covers the before and after boxes
    pub fn move_view(&mut self, view_id: ViewId, x: f64, y: f64) {
        let Some(view) = self.views.get_mut(view_id) else {
            return;
        };
        let before = view.damage_box();
        view.move_to(x, y);
        let after = view.damage_box();
        let workspace = view.workspace;
        self.damage_workspace_rect(workspace, before);
        self.damage_workspace_rect(workspace, after);
    }

    /// Resize a view in place (phase one; damage follows the commit)
    pub fn resize_view(&mut self, view_id: ViewId, width: i32, height: i32) {
        let Some(view) = self.views.get_mut(view_id) else {
            return;
        };
        let (x, y) = (view.x, view.y);
        let serial = self.serials.next();
        view.request_geometry(x, y, width, height, serial, &mut self.queue);
        self.damage_if_applied(view_id);
    }

    /// Move and resize together (interactive resize from a left/top edge)
    pub fn move_resize_view(&mut self, view_id: ViewId, x: f64, y: f64, width: i32, height: i32) {
        let Some(view) = self.views.get_mut(view_id) else {
            return;
        };
        let serial = self.serials.next();
        view.request_geometry(x, y, width, height, serial, &mut self.queue);
        self.damage_if_applied(view_id);
    }

    /// Immediate-variant backends apply geometry synchronously; damage now.
    fn damage_if_applied(&mut self, view_id: ViewId) {
        let applied = self
            .views
            .get(view_id)
            .is_some_and(|v| !v.has_pending_geometry());
        if applied {
            self.damage_view(view_id);
        }
    }

    /// Rotate a view to an absolute angle
    pub fn rotate_view(&mut self, view_id: ViewId, rotation: f32) {
        let Some(view) = self.views.get_mut(view_id) else {
            return;
        };
        let before = view.damage_box();
        view.rotate(rotation);
        let after = view.damage_box();
        let workspace = view.workspace;
        self.damage_workspace_rect(workspace, before);
        self.damage_workspace_rect(workspace, after);
    }

    /// Step a view's opacity
    pub fn cycle_view_alpha(&mut self, view_id: ViewId) {
        if let Some(view) = self.views.get_mut(view_id) {
            view.cycle_alpha();
        }
        self.damage_view(view_id);
    }

    /// Maximize or restore a view against its output's usable area
    pub fn set_view_maximized(&mut self, view_id: ViewId, maximized: bool) {
        let Some(area) = self.view_output_id(view_id).and_then(|o| {
            self.outputs.get(o).map(|out| out.usable_area)
        }) else {
            return;
        };
        let Some(view) = self.views.get_mut(view_id) else {
            return;
        };
        let before = view.damage_box();
        let was_fullscreen = view.fullscreen_output.is_some();
        let serial = self.serials.next();
        if view.set_maximized(maximized, area, serial, &mut self.queue) {
            let workspace = view.workspace;
            if was_fullscreen {
                if let Some(ws) = self.workspaces.get_mut(workspace) {
                    if ws.fullscreen == Some(view_id) {
                        ws.fullscreen = None;
                    }
                }
            }
            self.damage_workspace_rect(workspace, before);
            self.damage_if_applied(view_id);
        }
    }

    /// Enter or leave fullscreen on an output (the view's own output when
    /// none is given)
    pub fn set_view_fullscreen(
        &mut self,
        view_id: ViewId,
        fullscreen: bool,
        output: Option<OutputId>,
    ) {
        let target = if fullscreen {
            let Some(output_id) = output.or_else(|| self.view_output_id(view_id)) else {
                return;
            };
            Some(output_id)
        } else {
            None
        };
        let area = target
            .and_then(|o| self.outputs.get(o))
            .map(|o| o.layout_box())
            .unwrap_or_default();

        let Some(view) = self.views.get_mut(view_id) else {
            return;
        };
        let workspace = view.workspace;
        let serial = self.serials.next();
        if !view.set_fullscreen(target, area, serial, &mut self.queue) {
            return;
        }

        if let Some(ws) = self.workspaces.get_mut(workspace) {
            ws.fullscreen = if fullscreen { Some(view_id) } else { None };
        }
        // The whole output changes appearance either way.
        for out in self.outputs.iter_mut() {
            if out.workspace == workspace {
                out.damage.damage_whole();
            }
        }
    }

    /// Ask the client to close the view's toplevel
    pub fn close_view(&mut self, view_id: ViewId) {
        if let Some(view) = self.views.get(view_id) {
            view.backend.request_close(view.surface, &mut self.queue);
        }
    }

    /// Give keyboard focus to a view (or clear it), raising it and telling
    /// the window-manager extension
    pub fn focus_view(&mut self, seat_index: usize, target: Option<ViewId>) {
        let Some(seat) = self.seats.get_mut(seat_index) else {
            return;
        };
        let previous = seat.stashed_view_focus();
        seat.focus_view(target);

        if let Some(prev) = previous.filter(|p| Some(*p) != target) {
            if let Some(view) = self.views.get_mut(prev) {
                let surface = view.surface;
                view.backend.request_activate(surface, false, &mut self.queue);
            }
        }

        match target {
            Some(id) => {
                let Some(view) = self.views.get_mut(id) else {
                    return;
                };
                let surface = view.surface;
                let title = view.title.clone();
                let workspace = view.workspace;
                view.backend.request_activate(surface, true, &mut self.queue);
                if let Some(ws) = self.workspaces.get_mut(workspace) {
                    ws.raise(id);
                }
                self.window_manager.broadcast_focus(&title, workspace as u32);
                self.damage_view(id);
            }
            None => {
                let workspace = self.active_workspace();
                self.window_manager.broadcast_focus("", workspace as u32);
            }
        }
    }

    /// Record a title change and re-broadcast if the view is focused
    pub fn set_view_title(&mut self, surface: SurfaceId, title: &str) {
        let Some(view_id) = self.views.by_surface(surface) else {
            return;
        };
        let Some(view) = self.views.get_mut(view_id) else {
            return;
        };
        view.title = title.to_string();
        let workspace = view.workspace;
        let focused = self
            .seats
            .first()
            .and_then(|s| s.focused_view())
            == Some(view_id);
        if focused {
            self.window_manager.broadcast_focus(title, workspace as u32);
        }
    }

    // ---- workspaces ----------------------------------------------------

    /// The workspace the user is looking at (active output's current)
    pub fn active_workspace(&self) -> usize {
        self.active_output()
            .and_then(|id| self.outputs.get(id))
            .map(|o| o.workspace)
            .unwrap_or(0)
    }

    /// The output under the first seat's cursor, else the primary
    pub fn active_output(&self) -> Option<OutputId> {
        let cursor = self.last_input_position();
        self.outputs
            .at(cursor.0, cursor.1)
            .or_else(|| self.outputs.primary())
            .map(|o| o.id)
    }

    fn seat_default_output(&self) -> Option<OutputId> {
        self.active_output()
    }

    fn last_input_position(&self) -> (f64, f64) {
        self.seats
            .first()
            .map(|s| (s.cursor.x, s.cursor.y))
            .unwrap_or((0.0, 0.0))
    }

    /// Switch an output (the active one if `output` is `None`) to another
    /// workspace, starting the cross-fade
    pub fn switch_workspace(&mut self, output: Option<OutputId>, index: usize) {
        if index >= WORKSPACE_COUNT {
            warn!("workspace index {} out of range, ignoring", index);
            return;
        }
        let Some(output_id) = output.or_else(|| self.active_output()) else {
            return;
        };
        let Some(out) = self.outputs.get_mut(output_id) else {
            return;
        };
        if out.workspace == index {
            return;
        }
        let from = out.workspace;
        let direction = if index > from { 1 } else { -1 };
        out.workspace = index;
        out.render.fade = Some(WorkspaceFade::new(from, direction));
        out.damage.damage_whole();
        info!("output {:?}: workspace {} -> {}", output_id, from, index);

        let next = self.workspaces.get(index).and_then(|ws| ws.top());
        self.focus_view(0, next);
        self.workspace_manager
            .broadcast_state(index as u32, WORKSPACE_COUNT as u32);
    }

    /// Move a view to another workspace; it arrives on top
    pub fn move_view_to_workspace(&mut self, view_id: ViewId, index: usize) {
        if index >= WORKSPACE_COUNT {
            warn!("workspace index {} out of range, ignoring", index);
            return;
        }
        let Some(view) = self.views.get(view_id) else {
            return;
        };
        let from = view.workspace;
        let rect = view.damage_box();
        if !self.workspaces.transfer(view_id, from, index) {
            return;
        }
        if let Some(view) = self.views.get_mut(view_id) {
            view.workspace = index;
            // Fullscreen does not follow across workspaces.
            view.fullscreen_output = None;
        }
        self.damage_workspace_rect(from, rect);
        self.damage_workspace_rect(index, rect);
        debug!("moved view {:?} from workspace {} to {}", view_id, from, index);
    }

    /// Focus the least recently used view of the active workspace
    pub fn cycle_focus(&mut self, seat_index: usize) {
        let workspace = self.active_workspace();
        let next = self.workspaces.get(workspace).and_then(|ws| ws.bottom());
        if next.is_some() {
            self.focus_view(seat_index, next);
        }
    }

    // ---- custom protocol entry points ----------------------------------

    /// A client bound the workspace-manager global
    pub fn workspace_manager_bound(&mut self, client: ClientId) {
        let current = self.active_workspace() as u32;
        self.workspace_manager
            .bind(client, current, WORKSPACE_COUNT as u32);
    }

    /// Dispatch a workspace-manager request
    pub fn handle_workspace_request(&mut self, request: workspace_manager::Request) {
        match request {
            workspace_manager::Request::SwitchTo { index } => {
                self.switch_workspace(None, index as usize);
            }
            workspace_manager::Request::MoveSurface { surface, index } => {
                match self.views.by_surface(surface) {
                    Some(view) => self.move_view_to_workspace(view, index as usize),
                    None => warn!("move_surface: {:?} is not a toplevel", surface),
                }
            }
        }
    }

    /// A client bound the window-manager global
    pub fn window_manager_bound(&mut self, client: ClientId) {
        self.window_manager.bind(client);
    }

    /// Dispatch a window-manager request
    pub fn handle_window_request(&mut self, request: window_manager::Request) {
        match request {
            window_manager::Request::CycleFocus => self.cycle_focus(0),
            window_manager::Request::RunCommand { command } => {
                window_manager::run_command(&command)
            }
        }
    }

    // ---- hit testing ---------------------------------------------------

    /// Resolve the surface at a layout point: overlay, top, views in focus
    /// order, bottom, background. The first non-empty hit wins.
    pub fn surface_at(&self, x: f64, y: f64) -> Option<HitTarget> {
        let output = self.outputs.at(x, y)?;

        for layer in [Layer::Overlay, Layer::Top] {
            if let Some(hit) = layer_hit(output, layer, x, y) {
                return Some(hit);
            }
        }

        if let Some(ws) = self.workspaces.get(output.workspace) {
            for view_id in ws.views_top_down() {
                if let Some(view) = self.views.get(view_id) {
                    if let Some(target) = view.at(x, y, &self.surfaces) {
                        return Some(match target {
                            ViewTarget::Surface { surface, sx, sy } => HitTarget::ViewSurface {
                                view: view_id,
                                surface,
                                sx,
                                sy,
                            },
                            ViewTarget::Decoration(part) => HitTarget::ViewDecoration {
                                view: view_id,
                                part,
                            },
                        });
                    }
                }
            }
        }

        for layer in [Layer::Bottom, Layer::Background] {
            if let Some(hit) = layer_hit(output, layer, x, y) {
                return Some(hit);
            }
        }
        None
    }

    // ---- input ---------------------------------------------------------

    /// Attach a device to a named seat. Unknown seats are logged and the
    /// event is dropped; no partial state is created.
    pub fn new_input_device(&mut self, seat_name: &str, kind: DeviceKind, device: &str) {
        match self.seats.iter_mut().find(|s| s.name == seat_name) {
            Some(seat) => seat.add_device(kind, device.to_string()),
            None => warn!(
                "device `{}` for unknown seat `{}`, ignoring",
                device, seat_name
            ),
        }
    }

    /// Absolute pointer motion on a seat
    pub fn pointer_motion(&mut self, seat_index: usize, x: f64, y: f64) {
        self.damage_drag_icons();
        let Some(seat) = self.seats.get_mut(seat_index) else {
            return;
        };
        let update = seat.cursor.motion(x, y);
        match update {
            Some(GrabUpdate::Move { view, x, y }) => self.move_view(view, x, y),
            Some(GrabUpdate::Resize {
                view,
                x,
                y,
                width,
                height,
            }) => self.move_resize_view(view, x, y, width, height),
            Some(GrabUpdate::Rotate { view, rotation }) => self.rotate_view(view, rotation),
            None => self.update_pointer_focus(seat_index),
        }
        self.damage_drag_icons();
    }

    fn update_pointer_focus(&mut self, seat_index: usize) {
        let Some(seat) = self.seats.get(seat_index) else {
            return;
        };
        let (x, y) = (seat.cursor.x, seat.cursor.y);
        let hit = self.surface_at(x, y);
        let focus = match hit {
            Some(HitTarget::ViewSurface {
                surface, sx, sy, ..
            })
            | Some(HitTarget::Layer {
                surface, sx, sy, ..
            }) => {
                let allowed = self
                    .surfaces
                    .get(surface)
                    .map(|s| s.client)
                    .is_some_and(|c| seat.accepts_input_from(c));
                allowed.then_some((surface, sx, sy))
            }
            _ => None,
        };
        if let Some(seat) = self.seats.get_mut(seat_index) {
            seat.set_pointer_focus(focus);
        }
    }

    /// Pointer button on a seat. Meta-modified presses start interactive
    /// move/resize/rotate; any release ends a grab; everything else is
    /// click-to-focus and passthrough.
    pub fn pointer_button(&mut self, seat_index: usize, button: u32, pressed: bool) {
        if !pressed {
            let Some(seat) = self.seats.get_mut(seat_index) else {
                return;
            };
            if let Some(pointer) = seat.first_pointer() {
                pointer.button_release(button);
            }
            if !seat.cursor.is_passthrough() {
                seat.cursor.end_grab();
            }
            seat.release_pressed();
            return;
        }

        let (x, y, meta) = {
            let Some(seat) = self.seats.get_mut(seat_index) else {
                return;
            };
            if let Some(pointer) = seat.first_pointer() {
                pointer.button_press(button);
            }
            (seat.cursor.x, seat.cursor.y, seat.meta_held())
        };

        let Some(hit) = self.surface_at(x, y) else {
            return;
        };

        // Input inhibition: only the exclusive client's surfaces get input.
        let client = match hit {
            HitTarget::ViewSurface { surface, .. } | HitTarget::Layer { surface, .. } => {
                self.surfaces.get(surface).map(|s| s.client)
            }
            HitTarget::ViewDecoration { view, .. } => self
                .views
                .get(view)
                .and_then(|v| self.surfaces.get(v.surface))
                .map(|s| s.client),
        };
        if let Some(client) = client {
            let allowed = self
                .seats
                .get(seat_index)
                .map(|s| s.accepts_input_from(client))
                .unwrap_or(false);
            if !allowed {
                return;
            }
        }

        let Some(view_id) = hit.view() else {
            return;
        };

        if meta {
            match button {
                BTN_LEFT => self.begin_interactive_move(seat_index, view_id),
                BTN_RIGHT => self.begin_interactive_resize(seat_index, view_id, x, y),
                BTN_MIDDLE => self.begin_interactive_rotate(seat_index, view_id),
                _ => {}
            }
            self.focus_view(seat_index, Some(view_id));
            return;
        }

        // Decoration interactions without meta.
        if let HitTarget::ViewDecoration { part, .. } = hit {
            if let Some(seat) = self.seats.get_mut(seat_index) {
                seat.seat_view(view_id).pressed = Some(part);
            }
            match part {
                DecorationPart::Titlebar => self.begin_interactive_move(seat_index, view_id),
                DecorationPart::Border(edges) => {
                    let Some(view) = self.views.get(view_id) else {
                        return;
                    };
                    let geometry = view.geometry_box();
                    let (vx, vy) = (view.x, view.y);
                    if let Some(seat) = self.seats.get_mut(seat_index) {
                        seat.cursor.begin_resize(view_id, edges, geometry, vx, vy);
                    }
                }
            }
        }

        self.focus_view(seat_index, Some(view_id));
    }

    fn begin_interactive_move(&mut self, seat_index: usize, view_id: ViewId) {
        let Some(view) = self.views.get(view_id) else {
            return;
        };
        let (vx, vy) = (view.x, view.y);
        if let Some(seat) = self.seats.get_mut(seat_index) {
            seat.cursor.begin_move(view_id, vx, vy);
        }
    }

    fn begin_interactive_resize(&mut self, seat_index: usize, view_id: ViewId, x: f64, y: f64) {
        let Some(view) = self.views.get(view_id) else {
            return;
        };
        let geometry = view.geometry_box();
        let edges = edges_from_quadrant(
            x - view.x,
            y - view.y,
            view.width,
            view.height,
        );
        let (vx, vy) = (view.x, view.y);
        if let Some(seat) = self.seats.get_mut(seat_index) {
            seat.cursor.begin_resize(view_id, edges, geometry, vx, vy);
        }
    }

    fn begin_interactive_rotate(&mut self, seat_index: usize, view_id: ViewId) {
        let Some(view) = self.views.get(view_id) else {
            return;
        };
        let geometry = view.geometry_box();
        let rotation = view.rotation;
        if let Some(seat) = self.seats.get_mut(seat_index) {
            seat.cursor.begin_rotate(view_id, geometry, rotation);
        }
    }

    /// Key event: updates the seat's keyboard state and resolves where the
    /// key should be delivered (the focused layer surface preempts views)
    pub fn keyboard_key(
        &mut self,
        seat_index: usize,
        keycode: u32,
        pressed: bool,
    ) -> Option<SurfaceId> {
        let seat = self.seats.get_mut(seat_index)?;
        if let Some(keyboard) = seat.keyboard() {
            if pressed {
                keyboard.key_press(keycode);
            } else {
                keyboard.key_release(keycode);
            }
        }
        let focused_layer = seat.focused_layer();
        let focused_view = seat.focused_view();

        if let Some(layer) = focused_layer {
            return self
                .outputs
                .iter()
                .flat_map(|o| o.layer_surfaces())
                .find(|l| l.id == layer)
                .map(|l| l.surface);
        }
        focused_view
            .and_then(|v| self.views.get(v))
            .map(|v| v.surface)
    }

    /// Modifier update from the adapter (post-XKB); feeds the meta check
    pub fn keyboard_modifiers(
        &mut self,
        seat_index: usize,
        modifiers: crate::input::keyboard::ModifierState,
    ) {
        if let Some(keyboard) = self
            .seats
            .get_mut(seat_index)
            .and_then(|s| s.keyboard())
        {
            keyboard.set_modifiers(modifiers);
        }
    }

    /// Axis (scroll) events go to the surface under the pointer
    pub fn pointer_axis(&mut self, seat_index: usize) -> Option<SurfaceId> {
        self.seats
            .get(seat_index)
            .and_then(|s| s.pointer_focus())
            .map(|(surface, _, _)| surface)
    }

    /// Touch down focuses like a click and routes to the touched surface
    pub fn touch_down(&mut self, seat_index: usize, id: i32, x: f64, y: f64) {
        if let Some(seat) = self.seats.get_mut(seat_index) {
            if let Some(touch) = seat.first_touch() {
                touch.down(id, x, y);
            }
        }
        if let Some(view_id) = self.surface_at(x, y).and_then(|h| h.view()) {
            self.focus_view(seat_index, Some(view_id));
        }
    }

    /// Touch point motion
    pub fn touch_motion(&mut self, seat_index: usize, id: i32, x: f64, y: f64) {
        if let Some(seat) = self.seats.get_mut(seat_index) {
            if let Some(touch) = seat.first_touch() {
                touch.motion(id, x, y);
            }
        }
    }

    /// Touch point lifted. Erase-if-present.
    pub fn touch_up(&mut self, seat_index: usize, id: i32) {
        if let Some(seat) = self.seats.get_mut(seat_index) {
            if let Some(touch) = seat.first_touch() {
                touch.up(id);
            }
        }
    }

    /// Start a drag with an icon surface
    pub fn start_drag(&mut self, seat_index: usize, icon: SurfaceId, dx: f64, dy: f64) {
        let Some(s) = self.surfaces.get_mut(icon) else {
            return;
        };
        if s.set_role(SurfaceRole::DragIcon).is_err() {
            return;
        }
        if let Some(seat) = self.seats.get_mut(seat_index) {
            seat.drag_icon = Some(DragIcon {
                surface: icon,
                dx,
                dy,
            });
        }
        self.damage_drag_icons();
    }

    /// End a drag. Erase-if-present.
    pub fn end_drag(&mut self, seat_index: usize) {
        self.damage_drag_icons();
        if let Some(seat) = self.seats.get_mut(seat_index) {
            seat.drag_icon = None;
        }
    }

    // ---- damage --------------------------------------------------------

    /// Damage a view's whole box on every output showing its workspace
    pub fn damage_view(&mut self, view_id: ViewId) {
        let Some(view) = self.views.get(view_id) else {
            return;
        };
        let rect = view.damage_box();
        let workspace = view.workspace;
        self.damage_workspace_rect(workspace, rect);
    }

    /// Buffer-level damage from a commit, offset into layout space
    fn damage_commit(&mut self, view_id: ViewId, damage: &[Rect]) {
        let Some(view) = self.views.get(view_id) else {
            return;
        };
        let workspace = view.workspace;
        if view.rotation != 0.0 {
            // Rotated buffer damage is approximated by the whole view box.
            let rect = view.damage_box();
            self.damage_workspace_rect(workspace, rect);
            return;
        }
        let (vx, vy) = (view.x as i32, view.y as i32);
        let rects: Vec<Rect> = damage
            .iter()
            .map(|r| Rect::new(vx + r.x, vy + r.y, r.width, r.height))
            .collect();
        for rect in rects {
            self.damage_workspace_rect(workspace, rect);
        }
    }

    fn damage_workspace_rect(&mut self, workspace: usize, rect: Rect) {
        for output in self.outputs.iter_mut() {
            if output.workspace == workspace {
                output.damage.damage(rect);
            }
        }
    }

    fn damage_drag_icons(&mut self) {
        let icons: Vec<Rect> = self
            .seats
            .iter()
            .filter_map(|s| {
                let icon = s.drag_icon?;
                let surface = self.surfaces.get(icon.surface)?;
                let (w, h) = surface.size();
                Some(Rect::new(
                    (s.cursor.x + icon.dx) as i32,
                    (s.cursor.y + icon.dy) as i32,
                    w.max(1),
                    h.max(1),
                ))
            })
            .collect();
        for rect in icons {
            for output in self.outputs.iter_mut() {
                output.damage.damage(rect);
            }
        }
    }

    /// The output showing a view: its fullscreen output, else the output
    /// whose current workspace holds it, else the output under it
    fn view_output_id(&self, view_id: ViewId) -> Option<OutputId> {
        let view = self.views.get(view_id)?;
        if let Some(output) = view.fullscreen_output {
            return Some(output);
        }
        if let Some(output) = self
            .outputs
            .iter()
            .find(|o| o.workspace == view.workspace)
        {
            return Some(output.id);
        }
        let rect = rotated_bounds(&view.geometry_box(), view.rotation);
        let (cx, cy) = rect.center();
        self.outputs.nearest(cx, cy).map(|o| o.id)
    }
}

fn layer_hit(output: &Output, layer: Layer, x: f64, y: f64) -> Option<HitTarget> {
    for ls in output.layers[layer.index()].iter().rev() {
        if ls.mapped && ls.geometry.contains(x, y) {
            return Some(HitTarget::Layer {
                layer_surface: ls.id,
                surface: ls.surface,
                sx: x - ls.geometry.x as f64,
                sy: y - ls.geometry.y as f64,
            });
        }
    }
    None
}
