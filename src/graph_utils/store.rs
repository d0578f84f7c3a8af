use std::sync::Arc;

use log::info;
use uuid::Uuid;

use super::graph::Graph;
use crate::error::Result;
use crate::render::adapter::{AdapterFactory, RenderAdapter, RenderInstance, RenderSlot, Surface, graph_elements};
use crate::render::layout::{LayoutSpec, select_layout};
use crate::render::readiness::{InstanceTicket, ReadinessGate, ReadyWaiter};
use crate::render::style::PRIMARY_STYLE;

#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    /// No nodes: nothing rendered, previous instance released.
    Empty,
    Loaded { nodes: usize, edges: usize, layout: LayoutSpec, instance: Uuid },
}

/// Current snapshot plus the primary render instance built from it.
pub struct GraphStore<A: RenderAdapter> {
    graph: Option<Arc<Graph>>,
    primary: RenderSlot<A>,
    gate: ReadinessGate,
    layout: Option<LayoutSpec>,
}

impl<A: RenderAdapter> Default for GraphStore<A> {
    fn default() -> Self {
        GraphStore { graph: None, primary: RenderSlot::new(), gate: ReadinessGate::new(), layout: None }
    }
}

impl<A: RenderAdapter> GraphStore<A> {
    pub fn new() -> Self { Self::default() }

    /// Swap in a new snapshot. The previous instance is released before the
    /// new one is created, and the gate only opens once the load succeeded.
    pub fn load<F>(&mut self, graph: Graph, factory: &mut F) -> Result<LoadOutcome>
    where
        F: AdapterFactory<Adapter = A>,
    {
        self.gate.reset();
        self.primary.release();
        self.layout = None;
        let graph = Arc::new(graph);
        self.graph = Some(Arc::clone(&graph));

        if graph.is_empty() {
            info!("dataset has no nodes; nothing to render");
            return Ok(LoadOutcome::Empty);
        }

        let layout = select_layout(graph.element_count());
        let mut adapter = factory.create(Surface::Primary);
        adapter.load(graph_elements(&graph), &PRIMARY_STYLE, &layout)?;
        let instance = self.primary.install(RenderInstance::new(Surface::Primary, adapter)).id();
        self.gate.mark_ready(instance);
        info!(
            "loaded graph: {} nodes, {} edges, {} layout",
            graph.node_count(),
            graph.edge_count(),
            layout.name()
        );
        self.layout = Some(layout.clone());
        Ok(LoadOutcome::Loaded { nodes: graph.node_count(), edges: graph.edge_count(), layout, instance })
    }

    pub fn release(&mut self) {
        self.gate.reset();
        self.primary.release();
    }

    pub fn graph(&self) -> Option<&Arc<Graph>> { self.graph.as_ref() }
    pub fn layout(&self) -> Option<&LayoutSpec> { self.layout.as_ref() }
    pub fn primary(&self) -> Option<&RenderInstance<A>> { self.primary.live() }
    pub fn primary_mut(&mut self) -> Option<&mut RenderInstance<A>> { self.primary.live_mut() }
    pub fn instance_id(&self) -> Option<Uuid> { self.primary.live_id() }
    pub fn gate(&self) -> &ReadinessGate { &self.gate }
    pub fn waiter(&self) -> ReadyWaiter { self.gate.waiter() }

    /// Ticket for a request issued now, bound to the live primary instance if any.
    pub fn ticket(&self) -> InstanceTicket {
        InstanceTicket::new(self.instance_id(), self.gate.waiter())
    }

    pub fn has_graph(&self) -> bool {
        self.graph.as_ref().is_some_and(|g| !g.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::graph::{Node, NodeType};
    use crate::render::recording::{RecordingAdapter, RecordingFactory, RenderCall};

    fn tiny() -> Graph {
        Graph::new(vec![Node::new("A", "a", NodeType::Especie)], vec![])
    }

    #[test]
    fn reload_releases_previous_instance_and_reopens_gate() {
        let mut factory = RecordingFactory::new();
        let mut store: GraphStore<RecordingAdapter> = GraphStore::new();
        let first = match store.load(tiny(), &mut factory).unwrap() {
            LoadOutcome::Loaded { instance, .. } => instance,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(store.gate().current(), Some(first));
        let second = match store.load(tiny(), &mut factory).unwrap() {
            LoadOutcome::Loaded { instance, .. } => instance,
            other => panic!("unexpected {:?}", other),
        };
        assert_ne!(first, second);
        assert_eq!(store.instance_id(), Some(second));
        assert_eq!(store.gate().current(), Some(second));
        assert_eq!(factory.created.len(), 2);
    }

    #[test]
    fn empty_dataset_renders_nothing() {
        let mut factory = RecordingFactory::new();
        let mut store: GraphStore<RecordingAdapter> = GraphStore::new();
        store.load(tiny(), &mut factory).unwrap();
        let out = store.load(Graph::default(), &mut factory).unwrap();
        assert_eq!(out, LoadOutcome::Empty);
        assert!(store.primary().is_none());
        assert!(store.gate().current().is_none());
        assert!(!store.has_graph());
    }

    #[test]
    fn primary_load_uses_selected_layout() {
        let mut factory = RecordingFactory::new();
        let mut store: GraphStore<RecordingAdapter> = GraphStore::new();
        store.load(tiny(), &mut factory).unwrap();
        let calls = store.primary().unwrap().adapter().calls();
        assert_eq!(calls[0], RenderCall::Load { elements: 1, layout: "force" });
    }
}
