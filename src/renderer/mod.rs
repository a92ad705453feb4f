//! Rendering abstraction
//!
//! The engine does not own a GPU backend. It drives an opaque renderer that
//! can clear, scissor, draw a textured quad for a surface buffer and draw a
//! flat-color quad for decorations. [`TraceRenderer`] records the command
//! stream and backs both tests and headless runs.

use crate::compositor::geometry::Rect;
use crate::compositor::surface::SurfaceId;

/// RGBA color, straight alpha
pub type Color = [f32; 4];

/// The operations the composition pipeline needs from a backend
pub trait Renderer {
    /// Begin a frame for an output of the given size
    fn begin(&mut self, width: i32, height: i32);

    /// Restrict subsequent draws to a rectangle; `None` lifts the scissor
    fn scissor(&mut self, rect: Option<Rect>);

    /// Fill the scissored area with a color
    fn clear(&mut self, color: Color);

    /// Draw a surface's buffer into `dest`, rotated about the box center
    fn draw_surface(&mut self, surface: SurfaceId, dest: Rect, alpha: f32, rotation: f32);

    /// Draw a flat quad (decorations, drag outlines)
    fn draw_quad(&mut self, dest: Rect, color: Color, rotation: f32);

    /// Finish and present the frame
    fn end(&mut self);
}

/// One recorded drawing command
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Begin { width: i32, height: i32 },
    Scissor(Option<Rect>),
    Clear(Color),
    Surface {
        surface: SurfaceId,
        dest: Rect,
        alpha: f32,
        rotation: f32,
    },
    Quad {
        dest: Rect,
        color: Color,
        rotation: f32,
    },
    End,
}

/// A renderer that records its command stream instead of drawing
#[derive(Debug, Default)]
pub struct TraceRenderer {
    commands: Vec<DrawCommand>,
}

impl TraceRenderer {
    /// Create an empty trace renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands recorded so far
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Surfaces drawn so far, in draw order
    pub fn drawn_surfaces(&self) -> Vec<SurfaceId> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Surface { surface, .. } => Some(*surface),
                _ => None,
            })
            .collect()
    }

    /// Drop the recorded commands
    pub fn reset(&mut self) {
        self.commands.clear();
    }
}

impl Renderer for TraceRenderer {
    fn begin(&mut self, width: i32, height: i32) {
        self.commands.push(DrawCommand::Begin { width, height });
    }

    fn scissor(&mut self, rect: Option<Rect>) {
        self.commands.push(DrawCommand::Scissor(rect));
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn draw_surface(&mut self, surface: SurfaceId, dest: Rect, alpha: f32, rotation: f32) {
        self.commands.push(DrawCommand::Surface {
            surface,
            dest,
            alpha,
            rotation,
        });
    }

    fn draw_quad(&mut self, dest: Rect, color: Color, rotation: f32) {
        self.commands.push(DrawCommand::Quad {
            dest,
            color,
            rotation,
        });
    }

    fn end(&mut self) {
        self.commands.push(DrawCommand::End);
    }
}
