use std::collections::HashSet;

use log::{debug, info};

use super::overlay::LabelOverlay;
use crate::error::Result;
use crate::graph_utils::graph::{Edge, ElementId, Graph, Node, NodeType};
use crate::render::adapter::{AdapterFactory, RenderAdapter, RenderElement, RenderInstance, RenderSlot, Surface};
use crate::render::layout::{ForceParams, LayoutSpec};
use crate::render::style::SUBGRAPH_STYLE;

/// Only this many focus ids are rendered; the full count is still reported.
pub const SUBGRAPH_NODE_CAP: usize = 200;

/// Ordered node ids behind the current result. Replaced wholesale per query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FocusSelection {
    ids: Vec<ElementId>,
}

impl FocusSelection {
    pub fn new(ids: Vec<ElementId>) -> Self {
        FocusSelection { ids }
    }

    pub fn ids(&self) -> &[ElementId] { &self.ids }
    pub fn total(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    pub fn capped(&self, cap: usize) -> &[ElementId] {
        &self.ids[..self.ids.len().min(cap)]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Subgraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Focus ids handed in.
    pub requested: usize,
    /// Focus ids actually considered after the cap.
    pub considered: usize,
}

impl Subgraph {
    pub fn element_count(&self) -> usize {
        self.nodes.len() + self.edges.len()
    }

    pub fn is_capped(&self) -> bool {
        self.considered < self.requested
    }

    pub fn caption(&self) -> String {
        format!("Subgraph: {} elements (nodes + edges)", self.element_count())
    }

    pub fn showing(&self) -> Option<String> {
        self.is_capped().then(|| format!("showing {} of {}", self.considered, self.requested))
    }

    // Plantations show their id; the satellite carries the full label
    pub fn elements(&self) -> Vec<RenderElement> {
        self.nodes
            .iter()
            .map(|n| {
                let mut el = RenderElement::node(n);
                if n.node_type == NodeType::Plantacion {
                    el.display_label = n.id.clone();
                }
                el
            })
            .chain(self.edges.iter().map(RenderElement::edge))
            .collect()
    }
}

/// Induced subgraph over `focus`: each id resolved by id, then by label, and
/// every edge whose two endpoints are both among the resolved nodes.
pub fn induced_subgraph(graph: &Graph, focus: &[ElementId]) -> (Vec<Node>, Vec<Edge>) {
    let mut nodes: Vec<Node> = Vec::new();
    let mut kept: HashSet<&str> = HashSet::new();
    for id in focus {
        match graph.resolve(id) {
            Some(n) if kept.insert(n.id.as_str()) => nodes.push(n.clone()),
            Some(_) => {}
            None => debug!("focus id {} not in the loaded graph", id),
        }
    }
    let edges = graph
        .edges()
        .iter()
        .filter(|e| kept.contains(e.source.as_str()) && kept.contains(e.target.as_str()))
        .cloned()
        .collect();
    (nodes, edges)
}

/// Drives the secondary render instance. Each render destroys the previous
/// instance before creating the next one.
pub struct SubgraphExtractor<A: RenderAdapter> {
    slot: RenderSlot<A>,
    overlay: LabelOverlay,
    cap: usize,
    current: Option<Subgraph>,
    labels_placed: bool,
}

impl<A: RenderAdapter> SubgraphExtractor<A> {
    pub fn new(cap: usize, label_offset: f32) -> Self {
        SubgraphExtractor { slot: RenderSlot::new(), overlay: LabelOverlay::new(label_offset), cap, current: None, labels_placed: false }
    }

    pub fn extract(&self, graph: &Graph, focus: &FocusSelection) -> Subgraph {
        let considered = focus.capped(self.cap);
        let (nodes, edges) = induced_subgraph(graph, considered);
        Subgraph { nodes, edges, requested: focus.total(), considered: considered.len() }
    }

    /// Build and show the subgraph for `focus`. An empty focus leaves the
    /// current subgraph untouched and returns `None`.
    pub fn render<F>(&mut self, graph: &Graph, focus: &FocusSelection, factory: &mut F) -> Result<Option<&Subgraph>>
    where
        F: AdapterFactory<Adapter = A>,
    {
        if focus.is_empty() {
            return Ok(None);
        }
        let sub = self.extract(graph, focus);
        self.slot.release();
        self.current = None;
        self.labels_placed = false;

        let mut adapter = factory.create(Surface::Subgraph);
        adapter.load(sub.elements(), &SUBGRAPH_STYLE, &LayoutSpec::Force(ForceParams::subgraph()))?;
        self.slot.install(RenderInstance::new(Surface::Subgraph, adapter));
        info!("{}{}", sub.caption(), sub.showing().map(|s| format!(", {}", s)).unwrap_or_default());
        Ok(Some(&*self.current.insert(sub)))
    }

    /// Once the subgraph layout has settled, add label satellites for the
    /// plantation anchors that lack one. Returns the number of satellites added.
    pub fn settle_labels(&mut self) -> usize {
        if self.labels_placed {
            return 0;
        }
        let (Some(sub), Some(inst)) = (self.current.as_ref(), self.slot.live_mut()) else { return 0 };
        if !inst.adapter().layout_settled() {
            return 0;
        }
        let anchors: Vec<RenderElement> = sub.elements().into_iter().filter(|e| matches!(e.node_type(), Some(NodeType::Plantacion))).collect();
        let adapter = inst.adapter_mut();
        let placed: Vec<(&RenderElement, egui::Pos2)> =
            anchors.iter().filter_map(|a| adapter.position(&a.id).map(|p| (a, p))).collect();
        let extra = self.overlay.synthesize(placed, |id| adapter.contains(id));
        let added = extra.len() / 2;
        if !extra.is_empty() {
            adapter.add_overlay(extra);
            debug!("added {} label satellites", added);
        }
        self.labels_placed = true;
        added
    }

    pub fn release(&mut self) {
        self.slot.release();
        self.current = None;
        self.labels_placed = false;
    }

    pub fn labels_placed(&self) -> bool { self.labels_placed }

    pub fn current(&self) -> Option<&Subgraph> { self.current.as_ref() }
    pub fn instance(&self) -> Option<&RenderInstance<A>> { self.slot.live() }
    pub fn instance_mut(&mut self) -> Option<&mut RenderInstance<A>> { self.slot.live_mut() }
    pub fn cap(&self) -> usize { self.cap }
}
