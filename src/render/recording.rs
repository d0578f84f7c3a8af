//! Headless adapter that records every call instead of drawing.

use std::collections::HashMap;

use egui::{Pos2, pos2};

use super::adapter::{AdapterFactory, HighlightTag, RenderAdapter, RenderElement, Surface};
use super::layout::LayoutSpec;
use super::style::StyleSheet;
use crate::error::Result;

const CELL: f32 = 100.0;

#[derive(Clone, Debug, PartialEq)]
pub enum RenderCall {
    Load { elements: usize, layout: &'static str },
    SetClass { id: String, tag: HighlightTag },
    Fit { ids: Vec<String>, padding: f32 },
    Overlay { ids: Vec<String> },
    Destroy,
}

#[derive(Debug, Default)]
pub struct RecordingAdapter {
    calls: Vec<RenderCall>,
    elements: Vec<RenderElement>,
    classes: HashMap<String, HighlightTag>,
    positions: HashMap<String, Pos2>,
    destroyed: bool,
    settled: bool,
    hold_layout: bool,
}

impl RecordingAdapter {
    pub fn new() -> Self { Self::default() }

    /// Layouts stay unsettled until [`RecordingAdapter::settle`] is called.
    pub fn with_pending_layout() -> Self {
        RecordingAdapter { hold_layout: true, ..Default::default() }
    }

    pub fn settle(&mut self) {
        self.settled = true;
    }

    pub fn calls(&self) -> &[RenderCall] { &self.calls }
    pub fn elements(&self) -> &[RenderElement] { &self.elements }

    pub fn class_of(&self, id: &str) -> HighlightTag {
        self.classes.get(id).copied().unwrap_or_default()
    }

    /// Ids carrying `tag`, sorted.
    pub fn tagged(&self, tag: HighlightTag) -> Vec<String> {
        let mut ids: Vec<String> = self.classes.iter().filter(|(_, t)| **t == tag).map(|(id, _)| id.clone()).collect();
        ids.sort();
        ids
    }

    pub fn last_fit(&self) -> Option<&[String]> {
        self.calls.iter().rev().find_map(|c| match c {
            RenderCall::Fit { ids, .. } => Some(ids.as_slice()),
            _ => None,
        })
    }

    pub fn element(&self, id: &str) -> Option<&RenderElement> {
        self.elements.iter().find(|e| e.id == id)
    }
}

impl RenderAdapter for RecordingAdapter {
    fn load(&mut self, elements: Vec<RenderElement>, _style: &StyleSheet, layout: &LayoutSpec) -> Result<()> {
        self.calls.push(RenderCall::Load { elements: elements.len(), layout: layout.name() });
        self.classes.clear();
        self.positions.clear();
        let nodes = elements.iter().filter(|e| e.is_node_like()).count();
        let cols = (nodes as f32).sqrt().ceil().max(1.0) as usize;
        for (i, el) in elements.iter().filter(|e| e.is_node_like()).enumerate() {
            let pos = el.position.unwrap_or_else(|| pos2((i % cols) as f32 * CELL, (i / cols) as f32 * CELL));
            self.positions.insert(el.id.clone(), pos);
        }
        self.elements = elements;
        self.settled = !self.hold_layout;
        Ok(())
    }

    fn set_class(&mut self, element_id: &str, tag: HighlightTag) {
        self.calls.push(RenderCall::SetClass { id: element_id.to_string(), tag });
        if tag == HighlightTag::None {
            self.classes.remove(element_id);
        } else {
            self.classes.insert(element_id.to_string(), tag);
        }
    }

    fn fit(&mut self, element_ids: &[String], padding: f32) {
        self.calls.push(RenderCall::Fit { ids: element_ids.to_vec(), padding });
    }

    fn destroy(&mut self) {
        self.calls.push(RenderCall::Destroy);
        self.destroyed = true;
    }

    fn is_destroyed(&self) -> bool { self.destroyed }
    fn layout_settled(&self) -> bool { self.settled }

    fn position(&self, element_id: &str) -> Option<Pos2> {
        self.positions.get(element_id).copied()
    }

    fn contains(&self, element_id: &str) -> bool {
        self.elements.iter().any(|e| e.id == element_id)
    }

    fn add_overlay(&mut self, elements: Vec<RenderElement>) {
        self.calls.push(RenderCall::Overlay { ids: elements.iter().map(|e| e.id.clone()).collect() });
        for el in elements {
            if let Some(p) = el.position {
                self.positions.insert(el.id.clone(), p);
            }
            self.elements.push(el);
        }
    }
}

/// Hands out recording adapters and remembers which surfaces asked for one.
#[derive(Debug, Default)]
pub struct RecordingFactory {
    pub created: Vec<Surface>,
    pub pending_layout: bool,
}

impl RecordingFactory {
    pub fn new() -> Self { Self::default() }
}

impl AdapterFactory for RecordingFactory {
    type Adapter = RecordingAdapter;

    fn create(&mut self, surface: Surface) -> RecordingAdapter {
        self.created.push(surface);
        if self.pending_layout { RecordingAdapter::with_pending_layout() } else { RecordingAdapter::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::graph::{Edge, Graph, Node, NodeType};
    use crate::render::adapter::graph_elements;
    use crate::render::layout::select_layout;
    use crate::render::style::PRIMARY_STYLE;

    #[test]
    fn load_places_nodes_and_clears_classes() {
        let g = Graph::new(
            vec![Node::new("A", "a", NodeType::Especie), Node::new("B", "b", NodeType::Titular)],
            vec![Edge::new("e1", "A", "B")],
        );
        let mut rec = RecordingAdapter::new();
        rec.set_class("A", HighlightTag::Start);
        rec.load(graph_elements(&g), &PRIMARY_STYLE, &select_layout(g.element_count())).unwrap();
        assert_eq!(rec.class_of("A"), HighlightTag::None);
        assert!(rec.position("A").is_some());
        assert!(rec.position("e1").is_none());
        assert!(rec.contains("e1"));
        assert!(rec.layout_settled());
    }

    #[test]
    fn pending_layout_waits_for_settle() {
        let mut rec = RecordingAdapter::with_pending_layout();
        rec.load(Vec::new(), &PRIMARY_STYLE, &LayoutSpec::Grid).unwrap();
        assert!(!rec.layout_settled());
        rec.settle();
        assert!(rec.layout_settled());
    }
}
