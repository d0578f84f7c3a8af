//! Highlight state for the primary render instance.
//!
//! Every operation starts by clearing whatever the previous one tagged; there is
//! no way to add to an existing highlight. All operations are no-ops against an
//! instance that is missing or already destroyed.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::graph_utils::graph::{ElementId, Graph};
use crate::render::adapter::{HighlightTag, RenderAdapter, RenderInstance};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HighlightMode {
    #[default]
    Clear,
    Nodes,
    Path,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathHighlight {
    /// Every node and edge the path touched, deduplicated, in path order.
    pub fit_set: Vec<ElementId>,
    pub start: Option<ElementId>,
    pub end: Option<ElementId>,
    pub edges: Vec<ElementId>,
}

#[derive(Debug, Default)]
pub struct HighlightEngine {
    mode: HighlightMode,
    tags: HashMap<ElementId, HighlightTag>,
}

fn live<A: RenderAdapter>(instance: Option<&mut RenderInstance<A>>) -> Option<&mut RenderInstance<A>> {
    let inst = instance.filter(|i| i.is_live());
    if inst.is_none() {
        debug!("no live graph view; skipping highlight");
    }
    inst
}

// Insertion-ordered tag assignment; a later assignment replaces the earlier tag
#[derive(Default)]
struct TagPlan {
    order: Vec<ElementId>,
    tags: HashMap<ElementId, HighlightTag>,
}

impl TagPlan {
    fn set(&mut self, id: &str, tag: HighlightTag) {
        if self.tags.insert(id.to_string(), tag).is_none() {
            self.order.push(id.to_string());
        }
    }
}

impl HighlightEngine {
    pub fn new() -> Self { Self::default() }

    pub fn mode(&self) -> HighlightMode { self.mode }

    pub fn tag_of(&self, id: &str) -> HighlightTag {
        self.tags.get(id).copied().unwrap_or_default()
    }

    /// Drop local state without touching any instance; used when the snapshot
    /// that owned the tagged elements is replaced.
    pub fn forget(&mut self) {
        self.tags.clear();
        self.mode = HighlightMode::Clear;
    }

    fn clear_on(&mut self, adapter: &mut impl RenderAdapter) {
        for (id, _) in self.tags.drain() {
            adapter.set_class(&id, HighlightTag::None);
        }
        self.mode = HighlightMode::Clear;
    }

    fn apply(&mut self, adapter: &mut impl RenderAdapter, plan: TagPlan, mode: HighlightMode) {
        self.clear_on(adapter);
        for id in plan.order {
            if let Some(&tag) = plan.tags.get(&id) {
                adapter.set_class(&id, tag);
                self.tags.insert(id, tag);
            }
        }
        self.mode = mode;
    }

    pub fn reset<A: RenderAdapter>(&mut self, instance: Option<&mut RenderInstance<A>>) -> bool {
        match live(instance) {
            Some(inst) => {
                self.clear_on(inst.adapter_mut());
                true
            }
            None => false,
        }
    }

    /// Tag every resolvable id (exact id, else exact label) as highlighted.
    /// Returns the resolved ids, or `None` when there is no live instance.
    pub fn highlight_nodes<A: RenderAdapter>(
        &mut self,
        graph: &Graph,
        instance: Option<&mut RenderInstance<A>>,
        ids: &[String],
    ) -> Option<Vec<ElementId>> {
        let inst = live(instance)?;
        let mut plan = TagPlan::default();
        for id in ids {
            match graph.resolve(id) {
                Some(node) => plan.set(&node.id, HighlightTag::Highlighted),
                None => debug!("highlight target {} not in the loaded graph", id),
            }
        }
        let resolved = plan.order.clone();
        let mode = if resolved.is_empty() { HighlightMode::Clear } else { HighlightMode::Nodes };
        self.apply(inst.adapter_mut(), plan, mode);
        Some(resolved)
    }

    /// Tag an ordered path: connecting edges in either orientation and every
    /// resolved node as highlighted, then the first resolved node as start and
    /// the last as end.
    pub fn highlight_path<A: RenderAdapter>(
        &mut self,
        graph: &Graph,
        instance: Option<&mut RenderInstance<A>>,
        ordered: &[String],
    ) -> Option<PathHighlight> {
        let inst = live(instance)?;
        let resolved: Vec<Option<&str>> = ordered.iter().map(|id| graph.resolve(id).map(|n| n.id.as_str())).collect();

        let mut plan = TagPlan::default();
        let mut out = PathHighlight::default();
        let mut touched: HashSet<&str> = HashSet::new();
        for (i, node) in resolved.iter().enumerate() {
            if let Some(a) = *node {
                plan.set(a, HighlightTag::Highlighted);
                if touched.insert(a) {
                    out.fit_set.push(a.to_string());
                }
            }
            let (Some(a), Some(&Some(b))) = (*node, resolved.get(i + 1)) else { continue };
            for edge in graph.edges_between(a, b) {
                plan.set(&edge.id, HighlightTag::Highlighted);
                if touched.insert(edge.id.as_str()) {
                    out.fit_set.push(edge.id.clone());
                    out.edges.push(edge.id.clone());
                }
            }
        }

        let mut ends = resolved.iter().flatten();
        let start = ends.next().copied();
        let end = ends.next_back().copied();
        if let Some(s) = start {
            plan.set(s, HighlightTag::Start);
            out.start = Some(s.to_string());
        }
        // A single-node path keeps its start tag
        if let Some(e) = end.filter(|e| Some(*e) != start) {
            plan.set(e, HighlightTag::End);
            out.end = Some(e.to_string());
        }

        let mode = if out.fit_set.is_empty() { HighlightMode::Clear } else { HighlightMode::Path };
        self.apply(inst.adapter_mut(), plan, mode);
        Some(out)
    }

    /// Fit the viewport to the ids that exist on the instance. Returns whether a fit was issued.
    pub fn fit_to<A: RenderAdapter>(instance: Option<&mut RenderInstance<A>>, ids: &[String], padding: f32) -> bool {
        let Some(inst) = live(instance) else { return false };
        let present: Vec<String> = ids.iter().filter(|id| inst.adapter().contains(id)).cloned().collect();
        if present.is_empty() {
            return false;
        }
        inst.adapter_mut().fit(&present, padding);
        true
    }
}
