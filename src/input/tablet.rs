//! Tablet and tablet-pad device wrappers
//!
//! Tablets report absolute tool positions that are routed like pointer
//! motion; pads only contribute buttons. Both are thin: the interesting
//! state lives on the seat.

/// One tablet (tool) device
#[derive(Debug)]
pub struct Tablet {
    /// Device name from the adapter
    pub name: String,
    /// Last reported tool position in layout coordinates
    position: Option<(f64, f64)>,
    /// Tool is touching the surface
    pub tip_down: bool,
}

impl Tablet {
    /// Create a tablet wrapper
    pub fn new(name: String) -> Self {
        Self {
            name,
            position: None,
            tip_down: false,
        }
    }

    /// Record an absolute tool position
    pub fn motion(&mut self, x: f64, y: f64) {
        self.position = Some((x, y));
    }

    /// Last known tool position
    pub fn position(&self) -> Option<(f64, f64)> {
        self.position
    }
}

/// One tablet pad device
#[derive(Debug)]
pub struct TabletPad {
    /// Device name from the adapter
    pub name: String,
    /// Pressed pad buttons
    pressed: Vec<u32>,
}

impl TabletPad {
    /// Create a pad wrapper
    pub fn new(name: String) -> Self {
        Self {
            name,
            pressed: Vec::new(),
        }
    }

    /// Record a pad button press
    pub fn button_press(&mut self, button: u32) {
        if !self.pressed.contains(&button) {
            self.pressed.push(button);
        }
    }

    /// Record a pad button release. Erase-if-present.
    pub fn button_release(&mut self, button: u32) {
        self.pressed.retain(|&b| b != button);
    }

    /// Pressed pad buttons
    pub fn pressed_buttons(&self) -> &[u32] {
        &self.pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tablet_motion() {
        let mut tablet = Tablet::new("stylus".into());
        assert!(tablet.position().is_none());
        tablet.motion(100.0, 200.0);
        assert_eq!(tablet.position(), Some((100.0, 200.0)));
    }

    #[test]
    fn test_pad_buttons() {
        let mut pad = TabletPad::new("pad".into());
        pad.button_press(1);
        pad.button_press(1);
        assert_eq!(pad.pressed_buttons(), &[1]);
        pad.button_release(1);
        pad.button_release(1);
        assert!(pad.pressed_buttons().is_empty());
    }
}
