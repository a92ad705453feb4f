//! Keyboard device wrapper
//!
//! Normalizes key and modifier state per physical keyboard. Keymap
//! compilation happens outside the engine; the wrapper only tracks what is
//! pressed and which modifiers are active.

/// Keyboard modifier state as reported by the adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Currently held modifiers
    pub depressed: u32,
    /// Sticky modifiers, cleared on the next key
    pub latched: u32,
    /// Toggled modifiers (caps lock)
    pub locked: u32,
    /// Active layout group
    pub group: u32,
}

impl ModifierState {
    /// True if any of the bits in `mask` is held
    pub fn held(&self, mask: u32) -> bool {
        self.depressed & mask != 0
    }
}

/// One keyboard device
#[derive(Debug)]
pub struct Keyboard {
    /// Device name from the adapter
    pub name: String,
    /// Currently pressed keycodes
    pressed: Vec<u32>,
    /// Modifier state
    modifiers: ModifierState,
    /// Repeat rate in characters per second
    pub repeat_rate: u32,
    /// Repeat delay in milliseconds
    pub repeat_delay: u32,
}

impl Keyboard {
    /// Create a keyboard wrapper
    pub fn new(name: String) -> Self {
        Self {
            name,
            pressed: Vec::new(),
            modifiers: ModifierState::default(),
            repeat_rate: 25,
            repeat_delay: 600,
        }
    }

    /// Record a key press; false if it was already down
    pub fn key_press(&mut self, keycode: u32) -> bool {
        if self.pressed.contains(&keycode) {
            return false;
        }
        self.pressed.push(keycode);
        true
    }

    /// Record a key release; false if it was not down
    pub fn key_release(&mut self, keycode: u32) -> bool {
        match self.pressed.iter().position(|&k| k == keycode) {
            Some(index) => {
                self.pressed.remove(index);
                true
            }
            None => false,
        }
    }

    /// Currently pressed keycodes
    pub fn pressed_keys(&self) -> &[u32] {
        &self.pressed
    }

    /// Update the modifier state
    pub fn set_modifiers(&mut self, modifiers: ModifierState) {
        self.modifiers = modifiers;
    }

    /// Current modifier state
    pub fn modifiers(&self) -> ModifierState {
        self.modifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_press_release() {
        let mut kb = Keyboard::new("kbd0".into());
        assert!(kb.key_press(30));
        assert!(!kb.key_press(30));
        assert_eq!(kb.pressed_keys(), &[30]);
        assert!(kb.key_release(30));
        assert!(!kb.key_release(30));
        assert!(kb.pressed_keys().is_empty());
    }

    #[test]
    fn test_modifier_mask() {
        let mut kb = Keyboard::new("kbd0".into());
        kb.set_modifiers(ModifierState {
            depressed: 0x40,
            ..Default::default()
        });
        assert!(kb.modifiers().held(0x40));
        assert!(!kb.modifiers().held(0x1));
    }
}
