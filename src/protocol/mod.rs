//! Protocol-facing state and the adapter boundary
//!
//! The engine-side halves of the client protocols:
//! - shell variants (wl_shell, two xdg-shell generations, X11 compat)
//! - layer-shell surface state
//! - the custom workspace-manager and window-manager extensions
//! - the typed request queue to the external protocol adapter
//!
//! Request decoding and serialization live outside the engine.

pub mod adapter;
pub mod layer_shell;
pub mod shell;
pub mod window_manager;
pub mod workspace_manager;

pub use adapter::{AdapterQueue, AdapterRequest, SerialCounter};
pub use layer_shell::{Anchor, KeyboardInteractivity, Layer, LayerSurface, LayerSurfaceId};
pub use shell::{ShellBackend, ShellError, ShellKind};
pub use window_manager::WindowManager;
pub use workspace_manager::WorkspaceManager;
