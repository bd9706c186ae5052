use serde::Serialize;
use std::collections::BTreeMap;
use tracing::trace;

use crate::render::{NodeId, PathCommand, Point, Rect, Renderer, Style, TextSpec};

/// Average glyph advance relative to the font size.
const CHAR_WIDTH_FACTOR: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Rect { width: f64, height: f64, style: Style },
    Path { commands: Vec<PathCommand>, style: Style },
    Text { spec: TextSpec },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub position: Point,
    pub visible: bool,
}

#[derive(Debug, Serialize)]
pub struct SceneSnapshot<'a> {
    pub frame: u64,
    pub nodes: Vec<(NodeId, &'a Node)>,
}

/// Retained scene graph kept in memory.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u64,
    frames: u64,
    width: f64,
    height: f64,
}

impl Scene {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        match self.nodes.get(&id) {
            Some(Node {
                kind: NodeKind::Rect { width, height, .. },
                position,
                ..
            }) => Some(Rect {
                x: position.x,
                y: position.y,
                width: *width,
                height: *height,
            }),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(&id) {
            Some(Node {
                kind: NodeKind::Text { spec },
                ..
            }) => Some(spec.text.as_str()),
            _ => None,
        }
    }

    pub fn path(&self, id: NodeId) -> Option<&[PathCommand]> {
        match self.nodes.get(&id) {
            Some(Node {
                kind: NodeKind::Path { commands, .. },
                ..
            }) => Some(commands.as_slice()),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SceneSnapshot<'_> {
        SceneSnapshot {
            frame: self.frames,
            nodes: self.nodes.iter().map(|(id, node)| (*id, node)).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }

    fn insert(&mut self, kind: NodeKind, position: Point) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                kind,
                position,
                visible: true,
            },
        );
        id
    }
}

impl Renderer for Scene {
    fn create_rect(&mut self, rect: Rect, style: Style) -> NodeId {
        self.insert(
            NodeKind::Rect {
                width: rect.width,
                height: rect.height,
                style,
            },
            Point::new(rect.x, rect.y),
        )
    }

    fn create_path(&mut self, commands: &[PathCommand], style: Style) -> NodeId {
        self.insert(
            NodeKind::Path {
                commands: commands.to_vec(),
                style,
            },
            Point::default(),
        )
    }

    fn create_text(&mut self, spec: TextSpec) -> NodeId {
        let position = spec.position;
        self.insert(NodeKind::Text { spec }, position)
    }

    fn set_position(&mut self, id: NodeId, at: Point) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.position = at;
            if let NodeKind::Text { spec } = &mut node.kind {
                spec.position = at;
            }
        }
    }

    fn set_size(&mut self, id: NodeId, new_width: f64, new_height: f64) {
        if let Some(Node {
            kind: NodeKind::Rect { width, height, .. },
            ..
        }) = self.nodes.get_mut(&id)
        {
            *width = new_width;
            *height = new_height;
        }
    }

    fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(Node {
            kind: NodeKind::Text { spec },
            ..
        }) = self.nodes.get_mut(&id)
        {
            spec.text = text.to_string();
        }
    }

    fn set_path(&mut self, id: NodeId, new_commands: &[PathCommand]) {
        if let Some(Node {
            kind: NodeKind::Path { commands, .. },
            ..
        }) = self.nodes.get_mut(&id)
        {
            commands.clear();
            commands.extend_from_slice(new_commands);
        }
    }

    fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.visible = visible;
        }
    }

    fn destroy(&mut self, id: NodeId) {
        self.nodes.remove(&id);
    }

    fn measure_text(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * CHAR_WIDTH_FACTOR
    }

    fn draw(&mut self) {
        self.frames += 1;
        trace!(frame = self.frames, nodes = self.nodes.len(), "scene drawn");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Color;

    #[test]
    fn test_node_lifecycle() {
        let mut scene = Scene::new(600.0, 300.0);
        let id = scene.create_rect(
            Rect {
                x: 1.0,
                y: 2.0,
                width: 3.0,
                height: 4.0,
            },
            Style::solid(Color::BLUE),
        );
        assert!(scene.contains(id));

        scene.set_position(id, Point::new(10.0, 20.0));
        scene.set_size(id, 5.0, 6.0);
        assert_eq!(
            scene.rect(id),
            Some(Rect {
                x: 10.0,
                y: 20.0,
                width: 5.0,
                height: 6.0
            })
        );

        scene.destroy(id);
        assert!(!scene.contains(id));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_text_and_snapshot() {
        let mut scene = Scene::new(600.0, 300.0);
        let id = scene.create_text(TextSpec {
            text: "Buys".to_string(),
            font_size: 14.0,
            fill: Color::WHITE,
            rotation: 90.0,
            position: Point::default(),
        });
        scene.set_text(id, "Buys 120");
        assert_eq!(scene.text(id), Some("Buys 120"));
        assert!((scene.measure_text("Buys", 10.0) - 24.0).abs() < 1e-9);

        scene.draw();
        let json = scene.to_json().unwrap();
        assert!(json.contains("\"frame\":1"));
        assert!(json.contains("Buys 120"));
    }
}
