//! Seam to the 2D drawing surface.
//!
//! The diagram only ever creates, mutates and destroys primitives through
//! [`Renderer`] and asks for a redraw once per frame. [`Scene`] is an
//! in-memory retained scene graph used by the headless host and the tests.

pub mod scene;

pub use scene::{Node, NodeKind, Scene, SceneSnapshot};

use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color(pub &'static str);

impl Color {
    pub const BLUE: Color = Color("#61dafb");
    pub const GREEN: Color = Color("#24C1B0");
    pub const RED: Color = Color("#FF5F7F");
    pub const WHITE: Color = Color("#fff");
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Style {
    pub fill: Color,
    pub opacity: f64,
}

impl Style {
    pub fn solid(fill: Color) -> Self {
        Self { fill, opacity: 1.0 }
    }

    pub fn translucent(fill: Color, opacity: f64) -> Self {
        Self { fill, opacity }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSpec {
    pub text: String,
    pub font_size: f64,
    pub fill: Color,
    /// Degrees, clockwise.
    pub rotation: f64,
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    CubicTo { c1: Point, c2: Point, to: Point },
    Close,
}

/// SVG path data (`M`, `L`, `C`, `Z`) for a command list.
pub fn svg_path_data(commands: &[PathCommand]) -> String {
    let mut out = String::new();
    for (idx, cmd) in commands.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        // writing into a String cannot fail
        let _ = match cmd {
            PathCommand::MoveTo(p) => write!(out, "M{},{}", p.x, p.y),
            PathCommand::LineTo(p) => write!(out, "L{},{}", p.x, p.y),
            PathCommand::CubicTo { c1, c2, to } => {
                write!(out, "C{},{} {},{} {},{}", c1.x, c1.y, c2.x, c2.y, to.x, to.y)
            }
            PathCommand::Close => write!(out, "Z"),
        };
    }
    out
}

/// Drawing operations the diagram needs from its surface. All of them are
/// assumed to succeed.
pub trait Renderer: Send {
    fn create_rect(&mut self, rect: Rect, style: Style) -> NodeId;
    fn create_path(&mut self, commands: &[PathCommand], style: Style) -> NodeId;
    fn create_text(&mut self, spec: TextSpec) -> NodeId;

    fn set_position(&mut self, id: NodeId, at: Point);
    fn set_size(&mut self, id: NodeId, width: f64, height: f64);
    fn set_text(&mut self, id: NodeId, text: &str);
    fn set_path(&mut self, id: NodeId, commands: &[PathCommand]);
    fn set_visible(&mut self, id: NodeId, visible: bool);
    fn destroy(&mut self, id: NodeId);

    /// Rendered width of `text` before rotation.
    fn measure_text(&self, text: &str, font_size: f64) -> f64;

    fn draw(&mut self);
}
