//! Input handling module
//!
//! Device wrappers, the cursor state machine and per-seat state.

pub mod cursor;
pub mod keyboard;
pub mod pointer;
pub mod seat;
pub mod tablet;
pub mod touch;

pub use cursor::{Cursor, CursorMode, GrabUpdate};
pub use keyboard::Keyboard;
pub use pointer::Pointer;
pub use seat::{DeviceKind, Seat, SeatCapabilities};
pub use tablet::{Tablet, TabletPad};
pub use touch::Touch;
