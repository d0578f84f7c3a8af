//! The controller that owns every piece of per-dataset state.
//!
//! Index, store, highlighter and extractor live here and are handed to each
//! other by reference; nothing reaches them through globals. Loading a dataset
//! rebuilds the index and drops all highlight and focus state derived from the
//! previous snapshot.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use uuid::Uuid;

use crate::api::contracts::{AnalysisHighlight, AnalysisResult, BfsReport, SpeciesSearchResult};
use crate::config::AppSettings;
use crate::error::Result;
use crate::graph_utils::graph::{ElementId, Graph};
use crate::graph_utils::store::{GraphStore, LoadOutcome};
use crate::highlight::{HighlightEngine, PathHighlight};
use crate::render::adapter::AdapterFactory;
use crate::render::readiness::{InstanceTicket, ReadyWaiter};
use crate::search::index::{SearchIndex, Suggestion};
use crate::search::resolver::{QueryResolver, Resolution, split_tokens};
use crate::search::summary::{NodeDetails, ResultRow, SearchNotice, result_rows};
use crate::subgraph::{FocusSelection, SUBGRAPH_NODE_CAP, Subgraph, SubgraphExtractor};

#[derive(Clone, Debug, PartialEq)]
pub struct ExplorerConfig {
    pub readiness_timeout: Duration,
    pub subgraph_node_cap: usize,
    pub label_offset: f32,
    pub fit_padding: f32,
    pub suggestion_limit: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig {
            readiness_timeout: Duration::from_millis(3000),
            subgraph_node_cap: SUBGRAPH_NODE_CAP,
            label_offset: 80.0,
            fit_padding: 60.0,
            suggestion_limit: 50,
        }
    }
}

impl From<&AppSettings> for ExplorerConfig {
    fn from(s: &AppSettings) -> Self {
        ExplorerConfig {
            readiness_timeout: s.readiness_timeout(),
            subgraph_node_cap: s.subgraph_node_cap,
            label_offset: s.label_offset,
            fit_padding: s.fit_padding,
            suggestion_limit: s.suggestion_limit,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchOutcome {
    pub resolution: Resolution,
    pub details: Option<NodeDetails>,
    pub rows: Vec<ResultRow>,
    pub notice: Option<SearchNotice>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisApplied {
    /// A newer load replaced the instance the result was waiting for.
    Stale,
    NoHighlight,
    Path(PathHighlight),
    Visited(Vec<ElementId>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesApplied {
    pub report: BfsReport,
    /// Nodes highlighted on the primary view; `None` when the result was stale.
    pub highlighted: Option<Vec<ElementId>>,
}

pub struct Explorer<F: AdapterFactory> {
    factory: F,
    store: GraphStore<F::Adapter>,
    index: SearchIndex,
    highlighter: HighlightEngine,
    extractor: SubgraphExtractor<F::Adapter>,
    focus: FocusSelection,
    config: ExplorerConfig,
}

impl<F: AdapterFactory> Explorer<F> {
    pub fn new(factory: F, config: ExplorerConfig) -> Self {
        let extractor = SubgraphExtractor::new(config.subgraph_node_cap, config.label_offset);
        Explorer {
            factory,
            store: GraphStore::new(),
            index: SearchIndex::default(),
            highlighter: HighlightEngine::new(),
            extractor,
            focus: FocusSelection::default(),
            config,
        }
    }

    pub fn load_dataset(&mut self, graph: Graph) -> Result<LoadOutcome> {
        self.highlighter.forget();
        self.extractor.release();
        self.focus = FocusSelection::default();
        self.index = SearchIndex::build(&graph);
        self.store.load(graph, &mut self.factory)
    }

    /// Resolve a comma-separated query, highlight what matched and fit the view to it.
    pub fn search(&mut self, raw: &str) -> SearchOutcome {
        if split_tokens(raw).is_empty() {
            return SearchOutcome { notice: Some(SearchNotice::NoTokens), ..Default::default() };
        }
        let graph = match self.store.graph() {
            Some(g) if !g.is_empty() && self.store.primary().is_some() => Arc::clone(g),
            _ => return SearchOutcome { notice: Some(SearchNotice::NotLoaded), ..Default::default() },
        };

        let resolution = QueryResolver::new(&self.index, &graph).resolve(raw);
        if resolution.is_empty() {
            return SearchOutcome {
                notice: Some(SearchNotice::NothingFound(resolution.not_found.clone())),
                resolution,
                ..Default::default()
            };
        }
        if !resolution.not_found.is_empty() {
            info!("search: no match for {}", resolution.not_found.join(", "));
        }

        self.highlighter.highlight_nodes(&graph, self.store.primary_mut(), &resolution.nodes);
        HighlightEngine::fit_to(self.store.primary_mut(), &resolution.nodes, self.config.fit_padding);

        SearchOutcome {
            details: NodeDetails::build(&graph, &resolution.nodes),
            rows: result_rows(&graph, &resolution.nodes),
            notice: None,
            resolution,
        }
    }

    /// Suggestions for the last comma-separated token of `input`.
    pub fn suggestions(&self, input: &str) -> Vec<Suggestion> {
        let last = input.rsplit(',').next().unwrap_or_default();
        self.index.suggestions(last, self.config.suggestion_limit)
    }

    pub fn waiter(&self) -> ReadyWaiter {
        self.store.waiter()
    }

    /// Take this before sending a request whose result will highlight the
    /// primary view; stamp the result with what the ticket resolves to.
    pub fn ticket(&self) -> InstanceTicket {
        self.store.ticket()
    }

    fn is_current(&self, instance: Uuid) -> bool {
        let current = self.store.instance_id() == Some(instance);
        if !current {
            debug!("dropping result stamped for instance {}", instance);
        }
        current
    }

    /// Apply an analysis result that waited for `instance` to be ready.
    pub fn apply_analysis(&mut self, instance: Uuid, result: &AnalysisResult) -> Result<AnalysisApplied> {
        if !self.is_current(instance) {
            return Ok(AnalysisApplied::Stale);
        }
        let Some(graph) = self.store.graph().cloned() else { return Ok(AnalysisApplied::Stale) };
        match result.highlight() {
            AnalysisHighlight::Path(path) => {
                let Some(hl) = self.highlighter.highlight_path(&graph, self.store.primary_mut(), &path) else {
                    return Ok(AnalysisApplied::Stale);
                };
                HighlightEngine::fit_to(self.store.primary_mut(), &hl.fit_set, self.config.fit_padding);
                self.show_subgraph(&graph, path)?;
                Ok(AnalysisApplied::Path(hl))
            }
            AnalysisHighlight::Visited(ids) => {
                let Some(resolved) = self.highlighter.highlight_nodes(&graph, self.store.primary_mut(), &ids) else {
                    return Ok(AnalysisApplied::Stale);
                };
                HighlightEngine::fit_to(self.store.primary_mut(), &resolved, self.config.fit_padding);
                self.show_subgraph(&graph, ids)?;
                Ok(AnalysisApplied::Visited(resolved))
            }
            AnalysisHighlight::None => Ok(AnalysisApplied::NoHighlight),
        }
    }

    /// Build the BFS report and, when `instance` is still current, highlight
    /// the returned nodes and show them as a subgraph.
    pub fn apply_species_result(&mut self, instance: Uuid, result: &SpeciesSearchResult, species: &str) -> Result<SpeciesApplied> {
        let report = BfsReport::new(result, species);
        if !self.is_current(instance) || result.nodos_resaltar.is_empty() {
            return Ok(SpeciesApplied { report, highlighted: None });
        }
        let Some(graph) = self.store.graph().cloned() else { return Ok(SpeciesApplied { report, highlighted: None }) };
        let highlighted = self.highlighter.highlight_nodes(&graph, self.store.primary_mut(), &result.nodos_resaltar);
        if let Some(ids) = &highlighted {
            HighlightEngine::fit_to(self.store.primary_mut(), ids, self.config.fit_padding);
        }
        self.show_subgraph(&graph, result.nodos_resaltar.clone())?;
        Ok(SpeciesApplied { report, highlighted })
    }

    fn show_subgraph(&mut self, graph: &Graph, focus: Vec<ElementId>) -> Result<Option<&Subgraph>> {
        self.focus = FocusSelection::new(focus);
        self.extractor.render(graph, &self.focus, &mut self.factory)
    }

    /// Per-frame housekeeping; adds label satellites once the subgraph layout settles.
    pub fn tick(&mut self) -> usize {
        self.extractor.settle_labels()
    }

    pub fn clear_highlight(&mut self) -> bool {
        self.highlighter.reset(self.store.primary_mut())
    }

    pub fn counts(&self) -> (usize, usize) {
        self.store.graph().map(|g| (g.node_count(), g.edge_count())).unwrap_or((0, 0))
    }

    pub fn graph(&self) -> Option<&Arc<Graph>> { self.store.graph() }
    pub fn index(&self) -> &SearchIndex { &self.index }
    pub fn store(&self) -> &GraphStore<F::Adapter> { &self.store }
    pub fn store_mut(&mut self) -> &mut GraphStore<F::Adapter> { &mut self.store }
    pub fn highlighter(&self) -> &HighlightEngine { &self.highlighter }
    pub fn extractor(&self) -> &SubgraphExtractor<F::Adapter> { &self.extractor }
    pub fn extractor_mut(&mut self) -> &mut SubgraphExtractor<F::Adapter> { &mut self.extractor }
    pub fn focus(&self) -> &FocusSelection { &self.focus }
    pub fn factory(&self) -> &F { &self.factory }
    pub fn factory_mut(&mut self) -> &mut F { &mut self.factory }
    pub fn config(&self) -> &ExplorerConfig { &self.config }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::graph::{Edge, Node, NodeType};
    use crate::render::adapter::HighlightTag;
    use crate::render::recording::RecordingFactory;
    use serde_json::json;

    fn explorer() -> Explorer<RecordingFactory> {
        let mut ex = Explorer::new(RecordingFactory::new(), ExplorerConfig::default());
        let g = Graph::new(
            vec![
                Node::new("A", "Especie X", NodeType::Especie),
                Node::new("B", "Plantación 1", NodeType::Plantacion),
                Node::new("C", "Titular Y", NodeType::Titular),
            ],
            vec![Edge::new("e_A_B", "A", "B"), Edge::new("e_C_B", "C", "B")],
        );
        ex.load_dataset(g).unwrap();
        ex
    }

    #[test]
    fn search_guards() {
        let mut empty = Explorer::new(RecordingFactory::new(), ExplorerConfig::default());
        assert_eq!(empty.search(" , ").notice, Some(SearchNotice::NoTokens));
        assert_eq!(empty.search("A").notice, Some(SearchNotice::NotLoaded));
        let mut ex = explorer();
        assert_eq!(ex.search("nothing").notice, Some(SearchNotice::NothingFound(vec!["nothing".into()])));
    }

    #[test]
    fn search_highlights_and_fits() {
        let mut ex = explorer();
        let out = ex.search("especie x, zzz");
        assert_eq!(out.resolution.nodes, vec!["A".to_string()]);
        assert_eq!(out.resolution.not_found, vec!["zzz".to_string()]);
        assert!(matches!(out.details, Some(NodeDetails::Single(_))));
        let rec = ex.store().primary().unwrap().adapter();
        assert_eq!(rec.class_of("A"), HighlightTag::Highlighted);
        assert_eq!(rec.last_fit().unwrap(), &["A".to_string()]);
    }

    #[test]
    fn stale_analysis_is_dropped() {
        let mut ex = explorer();
        let old = ex.store().instance_id().unwrap();
        let g = ex.graph().unwrap().as_ref().clone();
        ex.load_dataset(g).unwrap();
        let res: AnalysisResult = serde_json::from_value(json!({"output": {"path": ["A", "B"]}})).unwrap();
        assert_eq!(ex.apply_analysis(old, &res).unwrap(), AnalysisApplied::Stale);
        assert!(ex.store().primary().unwrap().adapter().tagged(HighlightTag::Start).is_empty());
    }

    #[test]
    fn suggestions_use_last_token() {
        let ex = explorer();
        let s = ex.suggestions("A, titu");
        assert!(s.iter().any(|s| s.value == "Titular Y"));
    }
}
