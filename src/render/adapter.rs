//! Narrow seam between the engine and whatever turns elements into pixels.
//!
//! The engine only ever talks to a [`RenderAdapter`]: it loads an element list
//! with a style sheet and a layout, sets one highlight class per element, asks
//! for a viewport fit, and destroys the instance. The egui canvas and the
//! recording test double both implement it.

use egui::Pos2;
use log::debug;
use uuid::Uuid;

use super::layout::LayoutSpec;
use super::style::StyleSheet;
use crate::error::Result;
use crate::graph_utils::graph::{Edge, Graph, Node, NodeType};

/// Exactly one of these per element at any time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum HighlightTag {
    #[default]
    None,
    Highlighted,
    Start,
    End,
}

impl HighlightTag {
    pub fn class(&self) -> Option<&'static str> {
        match self {
            HighlightTag::None => None,
            HighlightTag::Highlighted => Some("highlighted"),
            HighlightTag::Start => Some("start"),
            HighlightTag::End => Some("end"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementKind {
    Node { node_type: NodeType },
    Edge { source: String, target: String },
    // Render-only overlay pieces
    LabelSatellite { anchor: String },
    Connector { source: String, target: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderElement {
    pub id: String,
    pub kind: ElementKind,
    pub display_label: String,
    pub full_label: String,
    pub position: Option<Pos2>,
}

impl RenderElement {
    pub fn node(node: &Node) -> Self {
        RenderElement {
            id: node.id.clone(),
            kind: ElementKind::Node { node_type: node.node_type.clone() },
            display_label: node.label.clone(),
            full_label: node.label.clone(),
            position: None,
        }
    }

    pub fn edge(edge: &Edge) -> Self {
        RenderElement {
            id: edge.id.clone(),
            kind: ElementKind::Edge { source: edge.source.clone(), target: edge.target.clone() },
            display_label: String::new(),
            full_label: String::new(),
            position: None,
        }
    }

    pub fn is_node_like(&self) -> bool {
        matches!(self.kind, ElementKind::Node { .. } | ElementKind::LabelSatellite { .. })
    }

    pub fn endpoints(&self) -> Option<(&str, &str)> {
        match &self.kind {
            ElementKind::Edge { source, target } | ElementKind::Connector { source, target } => {
                Some((source.as_str(), target.as_str()))
            }
            _ => None,
        }
    }

    pub fn node_type(&self) -> Option<&NodeType> {
        match &self.kind {
            ElementKind::Node { node_type } => Some(node_type),
            _ => None,
        }
    }
}

/// Flat element list for a whole snapshot: nodes first, then edges.
pub fn graph_elements(graph: &Graph) -> Vec<RenderElement> {
    graph
        .nodes()
        .iter()
        .map(RenderElement::node)
        .chain(graph.edges().iter().map(RenderElement::edge))
        .collect()
}

pub trait RenderAdapter {
    fn load(&mut self, elements: Vec<RenderElement>, style: &StyleSheet, layout: &LayoutSpec) -> Result<()>;
    fn set_class(&mut self, element_id: &str, tag: HighlightTag);
    fn fit(&mut self, element_ids: &[String], padding: f32);
    fn destroy(&mut self);
    fn is_destroyed(&self) -> bool;

    /// True once the layout has stopped moving elements around.
    fn layout_settled(&self) -> bool;
    fn position(&self, element_id: &str) -> Option<Pos2>;
    fn contains(&self, element_id: &str) -> bool;

    /// Append render-only elements on top of what `load` received.
    fn add_overlay(&mut self, elements: Vec<RenderElement>);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Surface {
    Primary,
    Subgraph,
}

/// Creates a fresh adapter for one of the two render surfaces.
pub trait AdapterFactory {
    type Adapter: RenderAdapter;
    fn create(&mut self, surface: Surface) -> Self::Adapter;
}

pub struct RenderInstance<A: RenderAdapter> {
    id: Uuid,
    surface: Surface,
    adapter: A,
}

impl<A: RenderAdapter> RenderInstance<A> {
    pub fn new(surface: Surface, adapter: A) -> Self {
        RenderInstance { id: Uuid::now_v7(), surface, adapter }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn surface(&self) -> Surface { self.surface }
    pub fn adapter(&self) -> &A { &self.adapter }
    pub fn adapter_mut(&mut self) -> &mut A { &mut self.adapter }

    pub fn is_live(&self) -> bool {
        !self.adapter.is_destroyed()
    }
}

/// Holds at most one instance for a surface. Installing a new one always
/// releases the previous one first.
pub struct RenderSlot<A: RenderAdapter> {
    current: Option<RenderInstance<A>>,
}

impl<A: RenderAdapter> Default for RenderSlot<A> {
    fn default() -> Self {
        RenderSlot { current: None }
    }
}

impl<A: RenderAdapter> RenderSlot<A> {
    pub fn new() -> Self { Self::default() }

    pub fn install(&mut self, instance: RenderInstance<A>) -> &mut RenderInstance<A> {
        self.release();
        self.current.insert(instance)
    }

    pub fn release(&mut self) {
        if let Some(mut old) = self.current.take() {
            if !old.adapter.is_destroyed() {
                old.adapter.destroy();
            }
            debug!("released {:?} instance {}", old.surface, old.id);
        }
    }

    pub fn live(&self) -> Option<&RenderInstance<A>> {
        self.current.as_ref().filter(|i| i.is_live())
    }

    pub fn live_mut(&mut self) -> Option<&mut RenderInstance<A>> {
        self.current.as_mut().filter(|i| i.is_live())
    }

    pub fn live_id(&self) -> Option<Uuid> {
        self.live().map(|i| i.id)
    }
}
