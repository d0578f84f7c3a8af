use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

// Basic type aliases for clarity
pub type ElementId = String;
type Key = String;
type Value = String;

/// Node category as exposed by the dataset. Unknown categories are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Plantacion,
    Especie,
    Titular,
    Ubicacion,
    Arffs,
    Other(String),
}

impl NodeType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Plantación" | "Plantacion" => NodeType::Plantacion,
            "Especie" => NodeType::Especie,
            "Titular" => NodeType::Titular,
            "Ubicación" | "Ubicacion" => NodeType::Ubicacion,
            "ARFFS" => NodeType::Arffs,
            other => NodeType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Plantacion => "Plantación",
            NodeType::Especie => "Especie",
            NodeType::Titular => "Titular",
            NodeType::Ubicacion => "Ubicación",
            NodeType::Arffs => "ARFFS",
            NodeType::Other(s) => s.as_str(),
        }
    }
}

impl Default for NodeType {
    fn default() -> Self {
        NodeType::Other("Node".to_string())
    }
}

/// Attributes after alias normalization. Downstream code reads only these names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub species: Vec<String>,
    pub departments: Vec<String>,
    pub district: Option<String>,
    pub holder: Option<String>,
    pub area: Option<String>,
    pub extra: BTreeMap<Key, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: ElementId,
    pub label: String,
    pub node_type: NodeType,
    pub attrs: NodeAttributes,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, node_type: NodeType) -> Self {
        Node { id: id.into(), label: label.into(), node_type, attrs: NodeAttributes::default() }
    }

    pub fn is_plantation(&self) -> bool {
        self.node_type == NodeType::Plantacion
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: ElementId,
    pub source: ElementId,
    pub target: ElementId,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Edge { id: id.into(), source: source.into(), target: target.into() }
    }

    // Direction-agnostic: {source, target} == {a, b}
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// One immutable dataset snapshot. Replacing it invalidates everything derived from it.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    by_id: HashMap<ElementId, usize>,
}

impl Graph {
    // Duplicate node ids keep the first occurrence
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut kept = Vec::with_capacity(nodes.len());
        let mut by_id = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if node.id.is_empty() || by_id.contains_key(&node.id) {
                continue;
            }
            by_id.insert(node.id.clone(), kept.len());
            kept.push(node);
        }
        Graph { nodes: kept, edges, by_id }
    }

    pub fn nodes(&self) -> &[Node] { &self.nodes }
    pub fn edges(&self) -> &[Edge] { &self.edges }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }
    pub fn element_count(&self) -> usize { self.nodes.len() + self.edges.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.by_id.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool { self.by_id.contains_key(id) }

    pub fn find_by_label(&self, label: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.label == label)
    }

    // Callers may hand us server-side identifiers that are labels rather than ids
    pub fn resolve(&self, id_or_label: &str) -> Option<&Node> {
        if id_or_label.is_empty() {
            return None;
        }
        self.node(id_or_label).or_else(|| self.find_by_label(id_or_label))
    }

    pub fn edges_between<'a>(&'a self, a: &'a str, b: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.connects(a, b))
    }

    pub fn degree(&self, id: &str) -> usize {
        self.edges.iter().filter(|e| e.touches(id)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_keep_first_and_empty_ids_are_dropped() {
        let g = Graph::new(
            vec![
                Node::new("A", "first", NodeType::Especie),
                Node::new("A", "second", NodeType::Titular),
                Node::new("", "nameless", NodeType::Titular),
            ],
            vec![],
        );
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node("A").map(|n| n.label.as_str()), Some("first"));
    }

    #[test]
    fn resolve_prefers_id_then_label() {
        let g = Graph::new(
            vec![Node::new("X", "Y", NodeType::Titular), Node::new("Y", "Z", NodeType::Titular)],
            vec![],
        );
        assert_eq!(g.resolve("Y").map(|n| n.id.as_str()), Some("Y"));
        assert_eq!(g.resolve("Z").map(|n| n.id.as_str()), Some("Y"));
        assert!(g.resolve("missing").is_none());
    }

    #[test]
    fn edge_matching_ignores_direction() {
        let e = Edge::new("e1", "B", "A");
        assert!(e.connects("A", "B"));
        assert!(e.connects("B", "A"));
        assert!(!e.connects("A", "C"));
    }

    #[test]
    fn node_type_round_trips_known_names() {
        assert_eq!(NodeType::parse("Plantación"), NodeType::Plantacion);
        assert_eq!(NodeType::parse("ARFFS").as_str(), "ARFFS");
        assert_eq!(NodeType::parse("Distrito"), NodeType::Other("Distrito".into()));
    }
}
