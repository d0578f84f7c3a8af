//! Dataset ingestion.
//!
//! Turns the `{nodes: [...], edges: [...]}` payload served by the backend into a
//! [`Graph`] snapshot. Node entries may be flat or wrapped as `{data, attrs}`;
//! every accepted alias spelling is folded onto one canonical attribute here so
//! nothing downstream has to know about the spellings.

use std::path::Path;

use log::{debug, info};
use serde_json::{Map, Value};

use super::graph::{Edge, Graph, Node, NodeAttributes, NodeType};
use crate::error::Result;

const TYPE_KEYS: [&str; 3] = ["type", "tipo", "categoria"];
const SPECIES_KEYS: [&str; 2] = ["especie", "ESPECIE"];
const DEPARTMENT_KEYS: [&str; 2] = ["departamento", "DEPARTAMENTO"];
const DISTRICT_KEYS: [&str; 2] = ["distrito", "DISTRITO"];
const HOLDER_KEYS: [&str; 2] = ["titular", "TITULAR"];
const AREA_KEYS: [&str; 3] = ["superficie", "SUPERFICIE", "SUPERFICIE_PLANTACION"];

fn is_reserved(key: &str) -> bool {
    key == "id"
        || key == "label"
        || TYPE_KEYS.contains(&key)
        || SPECIES_KEYS.contains(&key)
        || DEPARTMENT_KEYS.contains(&key)
        || DISTRICT_KEYS.contains(&key)
        || HOLDER_KEYS.contains(&key)
        || AREA_KEYS.contains(&key)
}

/// Render a scalar JSON value as a string; `null`, arrays and objects yield `None`.
pub fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn trimmed(v: &Value) -> Option<String> {
    scalar_string(v).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn first_alias(bag: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| bag.get(*k).and_then(trimmed))
}

// All non-empty values across the alias spellings, in alias order, deduplicated
fn all_aliases(bag: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for k in keys {
        if let Some(v) = bag.get(*k).and_then(trimmed) {
            if !out.contains(&v) {
                out.push(v);
            }
        }
    }
    out
}

// Merge top-level keys, then `attrs`, then `data` (data wins)
fn element_bag(v: &Value) -> Option<Map<String, Value>> {
    let obj = v.as_object()?;
    let mut bag: Map<String, Value> = obj
        .iter()
        .filter(|(k, _)| k.as_str() != "data" && k.as_str() != "attrs")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for nested in ["attrs", "data"] {
        if let Some(Value::Object(inner)) = obj.get(nested) {
            for (k, v) in inner {
                bag.insert(k.clone(), v.clone());
            }
        }
    }
    Some(bag)
}

fn node_from_bag(bag: &Map<String, Value>) -> Option<Node> {
    let id = bag.get("id").and_then(scalar_string).filter(|s| !s.trim().is_empty())?;
    let label = bag.get("label").and_then(trimmed).unwrap_or_else(|| id.clone());
    let node_type = first_alias(bag, &TYPE_KEYS).map(|t| NodeType::parse(&t)).unwrap_or_default();
    let extra = bag
        .iter()
        .filter(|(k, _)| !is_reserved(k))
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::Array(_) | Value::Object(_) => Some((k.clone(), v.to_string())),
            other => scalar_string(other).map(|s| (k.clone(), s)),
        })
        .collect();
    let attrs = NodeAttributes {
        species: all_aliases(bag, &SPECIES_KEYS),
        departments: all_aliases(bag, &DEPARTMENT_KEYS),
        district: first_alias(bag, &DISTRICT_KEYS),
        holder: first_alias(bag, &HOLDER_KEYS),
        area: first_alias(bag, &AREA_KEYS),
        extra,
    };
    Some(Node { id, label, node_type, attrs })
}

fn edge_from_bag(bag: &Map<String, Value>) -> Option<Edge> {
    let source = bag.get("source").and_then(scalar_string).filter(|s| !s.is_empty())?;
    let target = bag.get("target").and_then(scalar_string).filter(|s| !s.is_empty())?;
    let id = bag
        .get("id")
        .and_then(scalar_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("e_{}_{}", source, target));
    Some(Edge { id, source, target })
}

/// Build a snapshot from an already-decoded payload. Anything that is not a
/// sequence of objects degrades to an empty list.
pub fn graph_from_value(value: &Value) -> Graph {
    let empty = Vec::new();
    let raw_nodes = value.get("nodes").and_then(Value::as_array).unwrap_or(&empty);
    let raw_edges = value.get("edges").and_then(Value::as_array).unwrap_or(&empty);

    let mut nodes = Vec::with_capacity(raw_nodes.len());
    for raw in raw_nodes {
        match element_bag(raw).as_ref().and_then(node_from_bag) {
            Some(n) => nodes.push(n),
            None => debug!("skipping node entry without id: {}", raw),
        }
    }
    let mut edges = Vec::with_capacity(raw_edges.len());
    for raw in raw_edges {
        match element_bag(raw).as_ref().and_then(edge_from_bag) {
            Some(e) => edges.push(e),
            None => debug!("skipping edge entry without endpoints: {}", raw),
        }
    }
    Graph::new(nodes, edges)
}

pub fn parse_dataset(text: &str) -> Result<Graph> {
    let value: Value = serde_json::from_str(text)?;
    Ok(graph_from_value(&value))
}

pub fn load_dataset_file(path: &Path) -> Result<Graph> {
    let text = std::fs::read_to_string(path)?;
    let graph = parse_dataset(&text)?;
    info!("read dataset {} ({} nodes, {} edges)", path.display(), graph.node_count(), graph.edge_count());
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapped_entries_are_merged_and_aliases_normalized() {
        let g = graph_from_value(&json!({
            "nodes": [
                {"data": {"id": "P1", "label": "Plantación 1", "type": "Plantación"},
                 "attrs": {"ESPECIE": "Pinus", "especie": "PINUS", "DEPARTAMENTO": "Cusco",
                           "distrito": "Lares", "TITULAR": "Juan", "SUPERFICIE_PLANTACION": 2.5,
                           "provincia": "Calca"}}
            ],
            "edges": []
        }));
        let n = g.node("P1").expect("node present");
        assert_eq!(n.node_type, NodeType::Plantacion);
        assert_eq!(n.attrs.species, vec!["PINUS".to_string(), "Pinus".to_string()]);
        assert_eq!(n.attrs.departments, vec!["Cusco".to_string()]);
        assert_eq!(n.attrs.district.as_deref(), Some("Lares"));
        assert_eq!(n.attrs.holder.as_deref(), Some("Juan"));
        assert_eq!(n.attrs.area.as_deref(), Some("2.5"));
        assert_eq!(n.attrs.extra.get("provincia").map(String::as_str), Some("Calca"));
    }

    #[test]
    fn flat_entries_use_type_aliases_and_default_label() {
        let g = graph_from_value(&json!({
            "nodes": [{"id": 7, "tipo": "Especie"}, {"label": "no id"}],
            "edges": [{"source": 7, "target": 8}, {"source": "7"}]
        }));
        assert_eq!(g.node_count(), 1);
        let n = g.node("7").unwrap();
        assert_eq!(n.label, "7");
        assert_eq!(n.node_type, NodeType::Especie);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edges()[0].id, "e_7_8");
    }

    #[test]
    fn absent_or_malformed_lists_are_empty() {
        assert!(graph_from_value(&json!({})).is_empty());
        assert!(graph_from_value(&json!({"nodes": "oops", "edges": 3})).is_empty());
        assert!(parse_dataset("not json").is_err());
    }

    #[test]
    fn whitespace_values_are_dropped() {
        let g = graph_from_value(&json!({
            "nodes": [{"id": "A", "especie": "   ", "ESPECIE": " Cedro "}]
        }));
        assert_eq!(g.node("A").unwrap().attrs.species, vec!["Cedro".to_string()]);
    }
}
