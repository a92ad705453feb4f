//! Compositor core module
//!
//! The scene and render engine:
//! - geometry and damage primitives
//! - surface tracking and the view abstraction over shell protocols
//! - the fixed deck of ten workspaces
//! - layer-surface arrangement
//! - per-output damage-tracked composition
//! - the desktop aggregator and hit testing

pub mod damage;
pub mod desktop;
pub mod geometry;
pub mod layer;
pub mod output;
pub mod render;
pub mod surface;
pub mod view;
pub mod workspace;

pub use desktop::{Desktop, HitTarget};
pub use geometry::{Rect, Region};
pub use output::{Output, OutputId, OutputManager, OutputMode, OutputTransform};
pub use surface::{BufferInfo, ClientId, Surface, SurfaceId, SurfaceManager, SurfaceRole};
pub use view::{View, ViewId, ViewManager, ViewMode};
pub use workspace::{Workspace, WorkspaceSet, WORKSPACE_COUNT};
