//! Lookup tables derived from one graph snapshot.
//!
//! Built in one pass over the nodes in dataset order; keys keep the order in
//! which they were first seen so two builds over the same snapshot compare
//! equal. Never patched in place: a new snapshot means a new index.

use std::collections::HashMap;

use crate::graph_utils::graph::{ElementId, Graph, Node, NodeType};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    Id,
    Label,
    Species,
    Department,
}

impl SuggestionKind {
    pub fn tag(&self) -> &'static str {
        match self {
            SuggestionKind::Id => "id",
            SuggestionKind::Label => "label",
            SuggestionKind::Species => "species",
            SuggestionKind::Department => "dept",
        }
    }

    /// Id and label picks complete the search token and run the search right away.
    pub fn runs_search(&self) -> bool {
        matches!(self, SuggestionKind::Id | SuggestionKind::Label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub value: String,
}

// Key -> member ids, with keys kept in first-seen order
#[derive(Clone, Debug, Default, PartialEq)]
struct Groups {
    keys: Vec<String>,
    members: HashMap<String, Vec<ElementId>>,
}

impl Groups {
    fn register(&mut self, key: &str, id: &str) {
        if !self.members.contains_key(key) {
            self.keys.push(key.to_string());
        }
        let list = self.members.entry(key.to_string()).or_default();
        if !list.iter().any(|m| m == id) {
            list.push(id.to_string());
        }
    }

    fn get(&self, key: &str) -> Option<&[ElementId]> {
        self.members.get(key).map(Vec::as_slice)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchIndex {
    ids: Vec<ElementId>,
    labels: Vec<String>,
    nodes_by_id: HashMap<ElementId, Node>,
    species: Groups,
    departments: Groups,
}

// Trimmed, non-empty, deduplicated, order kept
fn candidates<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for c in raw.into_iter().map(str::trim).filter(|c| !c.is_empty()) {
        if !out.iter().any(|o| o == c) {
            out.push(c.to_string());
        }
    }
    out
}

fn species_candidates(node: &Node) -> Vec<String> {
    let own_label = (node.node_type == NodeType::Especie).then_some(node.label.as_str());
    candidates(node.attrs.species.iter().map(String::as_str).chain(own_label))
}

fn department_candidates(node: &Node) -> Vec<String> {
    candidates(node.attrs.departments.iter().map(String::as_str).chain(node.attrs.district.as_deref()))
}

impl SearchIndex {
    pub fn build(graph: &Graph) -> Self {
        let mut index = SearchIndex::default();
        for node in graph.nodes() {
            if node.id.is_empty() || index.nodes_by_id.contains_key(&node.id) {
                continue;
            }
            index.ids.push(node.id.clone());
            let label = node.label.trim();
            if !label.is_empty() && !index.labels.iter().any(|l| l == label) {
                index.labels.push(label.to_string());
            }
            for sp in species_candidates(node) {
                index.species.register(&sp, &node.id);
            }
            for dep in department_candidates(node) {
                index.departments.register(&dep, &node.id);
            }
            index.nodes_by_id.insert(node.id.clone(), node.clone());
        }
        index
    }

    pub fn ids(&self) -> &[ElementId] { &self.ids }
    pub fn labels(&self) -> &[String] { &self.labels }
    pub fn species_names(&self) -> &[String] { &self.species.keys }
    pub fn department_names(&self) -> &[String] { &self.departments.keys }
    pub fn node(&self, id: &str) -> Option<&Node> { self.nodes_by_id.get(id) }
    pub fn len(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    pub fn species_group(&self, key: &str) -> Option<&[ElementId]> {
        self.species.get(key)
    }

    pub fn department_group(&self, key: &str) -> Option<&[ElementId]> {
        self.departments.get(key)
    }

    /// Case-insensitive substring matches for one partial token: ids, then
    /// labels, species and departments, capped at `limit` overall.
    pub fn suggestions(&self, partial: &str, limit: usize) -> Vec<Suggestion> {
        let needle = partial.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let tables: [(SuggestionKind, &[String]); 4] = [
            (SuggestionKind::Id, &self.ids),
            (SuggestionKind::Label, &self.labels),
            (SuggestionKind::Species, &self.species.keys),
            (SuggestionKind::Department, &self.departments.keys),
        ];
        tables
            .into_iter()
            .flat_map(|(kind, values)| {
                let needle = needle.as_str();
                values
                    .iter()
                    .filter(move |v| v.to_lowercase().contains(needle))
                    .map(move |v| Suggestion { kind, value: v.clone() })
            })
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::graph::{Edge, NodeAttributes};

    fn plantation(id: &str, species: &[&str], dept: &str) -> Node {
        let mut n = Node::new(id, format!("Plantación {}", id), NodeType::Plantacion);
        n.attrs = NodeAttributes {
            species: species.iter().map(|s| s.to_string()).collect(),
            departments: vec![dept.to_string()],
            district: Some("Lares".into()),
            ..Default::default()
        };
        n
    }

    fn sample() -> Graph {
        Graph::new(
            vec![
                Node::new("S1", "Pinus radiata", NodeType::Especie),
                plantation("P1", &["Pinus radiata", "Eucalyptus"], "Cusco"),
                plantation("P2", &["Eucalyptus"], "Puno"),
                Node::new("T1", "Juan", NodeType::Titular),
            ],
            vec![Edge::new("e1", "S1", "P1")],
        )
    }

    #[test]
    fn building_twice_is_deterministic() {
        let g = sample();
        assert_eq!(SearchIndex::build(&g), SearchIndex::build(&g));
    }

    #[test]
    fn nodes_register_under_every_species_candidate() {
        let idx = SearchIndex::build(&sample());
        assert_eq!(idx.species_group("Pinus radiata").unwrap(), &["S1".to_string(), "P1".to_string()]);
        assert_eq!(idx.species_group("Eucalyptus").unwrap(), &["P1".to_string(), "P2".to_string()]);
        assert_eq!(idx.species_names(), &["Pinus radiata".to_string(), "Eucalyptus".to_string()]);
        assert!(idx.species_group("Juan").is_none());
    }

    #[test]
    fn district_counts_as_department_candidate() {
        let idx = SearchIndex::build(&sample());
        assert_eq!(idx.department_group("Lares").unwrap().len(), 2);
        assert_eq!(idx.department_group("Puno").unwrap(), &["P2".to_string()]);
    }

    #[test]
    fn blank_candidates_are_dropped() {
        let mut n = Node::new("X", "  ", NodeType::Especie);
        n.attrs.species = vec!["   ".into()];
        let idx = SearchIndex::build(&Graph::new(vec![n], vec![]));
        assert!(idx.species_names().is_empty());
        assert!(idx.labels().is_empty());
        assert_eq!(idx.ids(), &["X".to_string()]);
    }

    #[test]
    fn suggestions_are_tagged_ordered_and_capped() {
        let idx = SearchIndex::build(&sample());
        let all = idx.suggestions("p", 50);
        assert_eq!(all[0], Suggestion { kind: SuggestionKind::Id, value: "P1".into() });
        assert!(all.iter().any(|s| s.kind == SuggestionKind::Species && s.value == "Pinus radiata"));
        assert!(all.iter().any(|s| s.kind == SuggestionKind::Department && s.value == "Puno"));
        assert_eq!(idx.suggestions("p", 2).len(), 2);
        assert!(idx.suggestions("  ", 50).is_empty());
    }
}
