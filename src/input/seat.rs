//! Input seat
//!
//! One named group of input devices with its own cursor, keyboard focus
//! and interaction state. Seats reference views and outputs but never own
//! them; per-view interaction records are created lazily and dropped when
//! the view unmaps.

use std::collections::HashMap;

use log::debug;

use crate::compositor::surface::{ClientId, SurfaceId};
use crate::compositor::view::{DecorationPart, ViewId};
use crate::input::cursor::Cursor;
use crate::input::keyboard::Keyboard;
use crate::input::pointer::Pointer;
use crate::input::tablet::{Tablet, TabletPad};
use crate::input::touch::Touch;
use crate::protocol::layer_shell::LayerSurfaceId;

/// Default meta modifier: the logo/super key bit in the modifier mask
pub const DEFAULT_META_MASK: u32 = 1 << 6;

/// Kind of input device reported by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Keyboard,
    Pointer,
    Touch,
    Tablet,
    TabletPad,
}

/// Seat capabilities advertised to clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeatCapabilities {
    pub pointer: bool,
    pub keyboard: bool,
    pub touch: bool,
}

impl SeatCapabilities {
    /// Convert to the wl_seat capability bitmask
    pub fn to_wire(&self) -> u32 {
        let mut caps = 0u32;
        if self.pointer {
            caps |= 1;
        }
        if self.keyboard {
            caps |= 2;
        }
        if self.touch {
            caps |= 4;
        }
        caps
    }
}

/// Per-view decoration interaction record, created lazily
#[derive(Debug, Default)]
pub struct SeatView {
    /// Decoration part held down by this seat, if any
    pub pressed: Option<DecorationPart>,
}

/// Drag-and-drop icon state
#[derive(Debug, Clone, Copy)]
pub struct DragIcon {
    pub surface: SurfaceId,
    /// Offset from the cursor to the icon origin
    pub dx: f64,
    pub dy: f64,
}

/// One input seat
#[derive(Debug)]
pub struct Seat {
    /// Seat name ("seat0")
    pub name: String,
    keyboards: Vec<Keyboard>,
    pointers: Vec<Pointer>,
    touch_devices: Vec<Touch>,
    tablets: Vec<Tablet>,
    tablet_pads: Vec<TabletPad>,
    /// The seat's cursor and grab state
    pub cursor: Cursor,
    /// View with keyboard focus
    focused_view: Option<ViewId>,
    /// Keyboard-interactive layer surface; preempts view focus while set
    focused_layer: Option<LayerSurfaceId>,
    /// Surface under the pointer, with surface-local coordinates
    pointer_focus: Option<(SurfaceId, f64, f64)>,
    /// Lazily created per-view interaction records
    seat_views: HashMap<ViewId, SeatView>,
    /// Active drag icon
    pub drag_icon: Option<DragIcon>,
    /// While set, only this client's surfaces receive input
    pub exclusive_client: Option<ClientId>,
    /// Modifier mask that triggers interactive move/resize/rotate
    pub meta_mask: u32,
}

impl Seat {
    /// Create a seat with the given name
    pub fn new(name: String) -> Self {
        Self {
            name,
            keyboards: Vec::new(),
            pointers: Vec::new(),
            touch_devices: Vec::new(),
            tablets: Vec::new(),
            tablet_pads: Vec::new(),
            cursor: Cursor::new(),
            focused_view: None,
            focused_layer: None,
            pointer_focus: None,
            seat_views: HashMap::new(),
            drag_icon: None,
            exclusive_client: None,
            meta_mask: DEFAULT_META_MASK,
        }
    }

    /// Add a device wrapper for an adapter device
    pub fn add_device(&mut self, kind: DeviceKind, name: String) {
        debug!("seat {}: new {:?} device `{}`", self.name, kind, name);
        match kind {
            DeviceKind::Keyboard => self.keyboards.push(Keyboard::new(name)),
            DeviceKind::Pointer => self.pointers.push(Pointer::new(name)),
            DeviceKind::Touch => self.touch_devices.push(Touch::new(name)),
            DeviceKind::Tablet => self.tablets.push(Tablet::new(name)),
            DeviceKind::TabletPad => self.tablet_pads.push(TabletPad::new(name)),
        }
    }

    /// Remove a device by name. Erase-if-present.
    pub fn remove_device(&mut self, kind: DeviceKind, name: &str) {
        match kind {
            DeviceKind::Keyboard => self.keyboards.retain(|d| d.name != name),
            DeviceKind::Pointer => self.pointers.retain(|d| d.name != name),
            DeviceKind::Touch => self.touch_devices.retain(|d| d.name != name),
            DeviceKind::Tablet => self.tablets.retain(|d| d.name != name),
            DeviceKind::TabletPad => self.tablet_pads.retain(|d| d.name != name),
        }
    }

    /// Capabilities derived from the attached devices
    pub fn capabilities(&self) -> SeatCapabilities {
        SeatCapabilities {
            pointer: !self.pointers.is_empty() || !self.tablets.is_empty(),
            keyboard: !self.keyboards.is_empty(),
            touch: !self.touch_devices.is_empty(),
        }
    }

    /// First keyboard, where most key events land
    pub fn keyboard(&mut self) -> Option<&mut Keyboard> {
        self.keyboards.first_mut()
    }

    /// Pointer device by name
    pub fn pointer(&mut self, name: &str) -> Option<&mut Pointer> {
        self.pointers.iter_mut().find(|p| p.name == name)
    }

    /// First pointer device
    pub fn first_pointer(&mut self) -> Option<&mut Pointer> {
        self.pointers.first_mut()
    }

    /// Touch device by name
    pub fn touch(&mut self, name: &str) -> Option<&mut Touch> {
        self.touch_devices.iter_mut().find(|t| t.name == name)
    }

    /// First touch device
    pub fn first_touch(&mut self) -> Option<&mut Touch> {
        self.touch_devices.first_mut()
    }

    /// Release every pressed decoration part (button release)
    pub fn release_pressed(&mut self) {
        for sv in self.seat_views.values_mut() {
            sv.pressed = None;
        }
    }

    /// True if the meta modifier is held on any keyboard
    pub fn meta_held(&self) -> bool {
        self.keyboards
            .iter()
            .any(|k| k.modifiers().held(self.meta_mask))
    }

    /// The view with keyboard focus. A focused layer preempts it.
    pub fn focused_view(&self) -> Option<ViewId> {
        if self.focused_layer.is_some() {
            None
        } else {
            self.focused_view
        }
    }

    /// The view that will regain focus when the layer focus clears
    pub fn stashed_view_focus(&self) -> Option<ViewId> {
        self.focused_view
    }

    /// Give keyboard focus to a view (ignored while a layer holds focus,
    /// but remembered for when it clears)
    pub fn focus_view(&mut self, view: Option<ViewId>) {
        self.focused_view = view;
    }

    /// The keyboard-interactive layer surface holding focus
    pub fn focused_layer(&self) -> Option<LayerSurfaceId> {
        self.focused_layer
    }

    /// Set or clear the focused layer
    pub fn set_focused_layer(&mut self, layer: Option<LayerSurfaceId>) {
        self.focused_layer = layer;
    }

    /// Surface currently under the pointer
    pub fn pointer_focus(&self) -> Option<(SurfaceId, f64, f64)> {
        self.pointer_focus
    }

    /// Update the surface under the pointer
    pub fn set_pointer_focus(&mut self, focus: Option<(SurfaceId, f64, f64)>) {
        self.pointer_focus = focus;
    }

    /// Per-view interaction record, created on first use
    pub fn seat_view(&mut self, view: ViewId) -> &mut SeatView {
        self.seat_views.entry(view).or_default()
    }

    /// True if a record exists for the view
    pub fn has_seat_view(&self, view: ViewId) -> bool {
        self.seat_views.contains_key(&view)
    }

    /// The view went away: drop its record, cancel grabs and focus on it.
    /// Erase-if-present; safe to call for views this seat never touched.
    pub fn view_destroyed(&mut self, view: ViewId) {
        self.seat_views.remove(&view);
        self.cursor.cancel_grab_on(view);
        if self.focused_view == Some(view) {
            self.focused_view = None;
        }
    }

    /// True if input may reach the client (input inhibition)
    pub fn accepts_input_from(&self, client: ClientId) -> bool {
        match self.exclusive_client {
            Some(exclusive) => exclusive == client,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keyboard::ModifierState;

    #[test]
    fn test_capabilities_follow_devices() {
        let mut seat = Seat::new("seat0".into());
        assert_eq!(seat.capabilities().to_wire(), 0);

        seat.add_device(DeviceKind::Keyboard, "kbd".into());
        seat.add_device(DeviceKind::Pointer, "mouse".into());
        assert_eq!(seat.capabilities().to_wire(), 3);

        seat.add_device(DeviceKind::Touch, "touch".into());
        assert_eq!(seat.capabilities().to_wire(), 7);

        seat.remove_device(DeviceKind::Pointer, "mouse");
        assert!(!seat.capabilities().pointer);
        // Removing twice is a no-op.
        seat.remove_device(DeviceKind::Pointer, "mouse");
    }

    #[test]
    fn test_meta_held() {
        let mut seat = Seat::new("seat0".into());
        seat.add_device(DeviceKind::Keyboard, "kbd".into());
        assert!(!seat.meta_held());

        seat.keyboard().unwrap().set_modifiers(ModifierState {
            depressed: DEFAULT_META_MASK,
            ..Default::default()
        });
        assert!(seat.meta_held());
    }

    #[test]
    fn test_layer_focus_preempts_view_focus() {
        let mut seat = Seat::new("seat0".into());
        seat.focus_view(Some(ViewId(1)));
        assert_eq!(seat.focused_view(), Some(ViewId(1)));

        seat.set_focused_layer(Some(LayerSurfaceId(9)));
        assert_eq!(seat.focused_view(), None);
        assert_eq!(seat.stashed_view_focus(), Some(ViewId(1)));

        seat.set_focused_layer(None);
        assert_eq!(seat.focused_view(), Some(ViewId(1)));
    }

    #[test]
    fn test_view_destroyed_cleans_up() {
        let mut seat = Seat::new("seat0".into());
        seat.focus_view(Some(ViewId(1)));
        seat.seat_view(ViewId(1)).pressed = None;
        assert!(seat.has_seat_view(ViewId(1)));
        seat.cursor.begin_move(ViewId(1), 0.0, 0.0);

        seat.view_destroyed(ViewId(1));
        assert!(!seat.has_seat_view(ViewId(1)));
        assert!(seat.cursor.is_passthrough());
        assert_eq!(seat.focused_view(), None);

        // Unknown views are fine.
        seat.view_destroyed(ViewId(77));
    }

    #[test]
    fn test_exclusive_client_gates_input() {
        let mut seat = Seat::new("seat0".into());
        assert!(seat.accepts_input_from(ClientId(1)));
        seat.exclusive_client = Some(ClientId(2));
        assert!(!seat.accepts_input_from(ClientId(1)));
        assert!(seat.accepts_input_from(ClientId(2)));
    }
}
