use std::fmt;

use crate::graph_utils::graph::Graph;

/// Multi-node summaries list at most this many entries.
pub const DETAIL_LIST_CAP: usize = 30;

#[derive(Clone, Debug, PartialEq)]
pub struct NodeCard {
    pub id: String,
    pub label: String,
    pub node_type: String,
    pub species: String,
    pub department: String,
    pub district: String,
    pub connections: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeDetails {
    Single(NodeCard),
    Multi { total: usize, listed: Vec<(String, String)> },
}

impl NodeDetails {
    /// `None` when none of the ids resolve in `graph`.
    pub fn build(graph: &Graph, ids: &[String]) -> Option<Self> {
        let nodes: Vec<_> = ids.iter().filter_map(|id| graph.node(id)).collect();
        match nodes.as_slice() {
            [] => None,
            [n] => Some(NodeDetails::Single(NodeCard {
                id: n.id.clone(),
                label: n.label.clone(),
                node_type: n.node_type.as_str().to_string(),
                species: n.attrs.species.first().cloned().unwrap_or_default(),
                department: n.attrs.departments.first().cloned().unwrap_or_default(),
                district: n.attrs.district.clone().unwrap_or_default(),
                connections: graph.degree(&n.id),
            })),
            many => Some(NodeDetails::Multi {
                total: many.len(),
                listed: many.iter().take(DETAIL_LIST_CAP).map(|n| (n.id.clone(), n.label.clone())).collect(),
            }),
        }
    }
}

impl fmt::Display for NodeDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeDetails::Single(c) => {
                writeln!(f, "ID: {}", c.id)?;
                writeln!(f, "Label: {}", c.label)?;
                writeln!(f, "Type: {}", c.node_type)?;
                writeln!(f, "Species: {}", c.species)?;
                writeln!(f, "Department: {}", c.department)?;
                writeln!(f, "District: {}", c.district)?;
                write!(f, "Connections: {}", c.connections)
            }
            NodeDetails::Multi { total, listed } => {
                write!(f, "Nodes found: {}", total)?;
                for (id, label) in listed {
                    write!(f, "\n{} ({})", id, label)?;
                }
                Ok(())
            }
        }
    }
}

/// One line of the search results table.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRow {
    pub id: String,
    pub label_or_species: String,
    pub department: String,
    pub district: String,
    pub connections: usize,
}

pub fn result_rows(graph: &Graph, ids: &[String]) -> Vec<ResultRow> {
    ids.iter()
        .filter_map(|id| graph.node(id))
        .map(|n| ResultRow {
            id: n.id.clone(),
            label_or_species: n.attrs.species.first().cloned().unwrap_or_else(|| n.label.clone()),
            department: n.attrs.departments.first().cloned().unwrap_or_default(),
            district: n.attrs.district.clone().unwrap_or_default(),
            connections: graph.degree(&n.id),
        })
        .collect()
}

/// Why a search produced no highlight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchNotice {
    NoTokens,
    NotLoaded,
    NothingFound(Vec<String>),
}

impl fmt::Display for SearchNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchNotice::NoTokens => write!(f, "Enter at least one id"),
            SearchNotice::NotLoaded => write!(f, "Graph not loaded yet."),
            SearchNotice::NothingFound(tokens) => write!(f, "No nodes found for: {}", tokens.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::graph::{Edge, Node, NodeType};

    fn graph() -> Graph {
        let mut p = Node::new("P1", "Plantación 1", NodeType::Plantacion);
        p.attrs.species = vec!["Cedro".into()];
        p.attrs.district = Some("Lares".into());
        let mut nodes = vec![p, Node::new("T1", "Juan", NodeType::Titular)];
        nodes.extend((0..40).map(|i| Node::new(format!("N{}", i), format!("n{}", i), NodeType::Ubicacion)));
        Graph::new(nodes, vec![Edge::new("e1", "P1", "T1"), Edge::new("e2", "T1", "P1")])
    }

    #[test]
    fn single_node_card_counts_connections() {
        let g = graph();
        let details = NodeDetails::build(&g, &["P1".to_string()]).unwrap();
        let text = details.to_string();
        assert!(text.contains("Species: Cedro"));
        assert!(text.contains("District: Lares"));
        assert!(text.ends_with("Connections: 2"));
    }

    #[test]
    fn multi_node_listing_is_capped() {
        let g = graph();
        let ids: Vec<String> = g.nodes().iter().map(|n| n.id.clone()).collect();
        match NodeDetails::build(&g, &ids).unwrap() {
            NodeDetails::Multi { total, listed } => {
                assert_eq!(total, 42);
                assert_eq!(listed.len(), DETAIL_LIST_CAP);
                assert_eq!(listed[0], ("P1".to_string(), "Plantación 1".to_string()));
            }
            other => panic!("expected multi, got {:?}", other),
        }
        assert!(NodeDetails::build(&g, &["ghost".to_string()]).is_none());
    }

    #[test]
    fn rows_prefer_species_over_label() {
        let rows = result_rows(&graph(), &["P1".to_string(), "T1".to_string()]);
        assert_eq!(rows[0].label_or_species, "Cedro");
        assert_eq!(rows[1].label_or_species, "Juan");
        assert_eq!(rows[1].connections, 2);
    }

    #[test]
    fn notices_render_tokens() {
        let n = SearchNotice::NothingFound(vec!["a".into(), "b".into()]);
        assert_eq!(n.to_string(), "No nodes found for: a, b");
    }
}
