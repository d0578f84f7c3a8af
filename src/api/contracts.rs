//! Payloads exchanged with the backend collaborator.
//!
//! Result payloads are read leniently: anything malformed degrades to "no
//! highlight" or an empty list instead of failing the whole response.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ExplorerError, Result};
use crate::graph_utils::ingest::scalar_string;

/// Entries shown in the node and edge samples of a BFS report.
pub const REPORT_SAMPLE_CAP: usize = 200;

/// `{success, result | error}` wrapper used by the analysis and BFS endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn into_result(self) -> Result<T> {
        if !self.success {
            return Err(ExplorerError::Backend(self.error.unwrap_or_else(|| "unknown error".to_string())));
        }
        self.result.ok_or_else(|| ExplorerError::Backend("response carried no result".to_string()))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    #[default]
    Bfs,
    Dfs,
    Dijkstra,
    Components,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [AnalysisKind::Bfs, AnalysisKind::Dfs, AnalysisKind::Dijkstra, AnalysisKind::Components];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Bfs => "bfs",
            AnalysisKind::Dfs => "dfs",
            AnalysisKind::Dijkstra => "dijkstra",
            AnalysisKind::Components => "components",
        }
    }

    pub fn needs_start(&self) -> bool {
        !matches!(self, AnalysisKind::Components)
    }

    pub fn needs_target(&self) -> bool {
        matches!(self, AnalysisKind::Dijkstra)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub tipo: AnalysisKind,
    pub especie: String,
    pub departamento: String,
    #[serde(rename = "startNode", skip_serializing_if = "Option::is_none")]
    pub start_node: Option<String>,
    #[serde(rename = "targetNode", skip_serializing_if = "Option::is_none")]
    pub target_node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        AnalysisRequest {
            tipo: AnalysisKind::Bfs,
            especie: "Todas".to_string(),
            departamento: "Todos".to_string(),
            start_node: None,
            target_node: None,
            limit: Some(100),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub filtros: Value,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub note: String,
}

impl AnalysisResult {
    pub fn highlight(&self) -> AnalysisHighlight {
        AnalysisHighlight::from_output(&self.output)
    }

    pub fn pretty_output(&self) -> String {
        serde_json::to_string_pretty(&self.output).unwrap_or_default()
    }
}

/// What an analysis output asks the graph view to show.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisHighlight {
    Path(Vec<String>),
    Visited(Vec<String>),
    None,
}

fn id_list(v: &Value) -> Option<Vec<String>> {
    v.as_array().map(|items| items.iter().filter_map(scalar_string).collect())
}

impl AnalysisHighlight {
    /// `path` wins when present; otherwise `visited`, then `nodes`. Empty or
    /// non-sequence values mean no highlight.
    pub fn from_output(output: &Value) -> Self {
        if let Some(path) = output.get("path").and_then(id_list).filter(|p| !p.is_empty()) {
            return AnalysisHighlight::Path(path);
        }
        let visited = output.get("visited").filter(|v| !v.is_null()).or_else(|| output.get("nodes"));
        match visited.and_then(id_list).filter(|v| !v.is_empty()) {
            Some(ids) => AnalysisHighlight::Visited(ids),
            None => AnalysisHighlight::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpeciesQuery {
    pub query: String,
}

impl SpeciesQuery {
    /// Trimmed query, or `None` when there is nothing to send.
    pub fn new(raw: &str) -> Option<Self> {
        let query = raw.trim();
        (!query.is_empty()).then(|| SpeciesQuery { query: query.to_string() })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SpeciesMatches {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub matches: Vec<String>,
    pub error: Option<String>,
}

impl SpeciesMatches {
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.success {
            Ok(self.matches)
        } else {
            Err(ExplorerError::Backend(self.error.unwrap_or_else(|| "unknown error".to_string())))
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BfsRequest {
    pub species: String,
    pub generate_highlight: bool,
}

/// One `bordes` entry: `[source, target]` or `{source, target}`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EdgeRef {
    Pair(Vec<Value>),
    Tagged { source: Value, target: Value },
}

impl EdgeRef {
    pub fn endpoints(&self) -> Option<(String, String)> {
        let (s, t) = match self {
            EdgeRef::Pair(items) if items.len() >= 2 => (&items[0], &items[1]),
            EdgeRef::Pair(_) => return None,
            EdgeRef::Tagged { source, target } => (source, target),
        };
        Some((scalar_string(s)?, scalar_string(t)?))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PlantationRecord {
    #[serde(default, alias = "ID")]
    pub id: Value,
    #[serde(default, alias = "ESPECIE")]
    pub especie: Value,
    #[serde(default, alias = "TITULAR")]
    pub titular: Value,
    #[serde(default, alias = "DISTRITO")]
    pub distrito: Value,
    #[serde(default, alias = "SUPERFICIE")]
    pub superficie: Value,
}

impl PlantationRecord {
    pub fn cells(&self) -> [String; 5] {
        [&self.id, &self.especie, &self.titular, &self.distrito, &self.superficie]
            .map(|v| scalar_string(v).unwrap_or_default())
    }
}

fn lenient_ids<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(id_list(&Value::deserialize(d)?).unwrap_or_default())
}

fn lenient_edges<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<EdgeRef>, D::Error> {
    let raw = Value::deserialize(d)?;
    let items = raw.as_array().cloned().unwrap_or_default();
    Ok(items.into_iter().filter_map(|v| serde_json::from_value(v).ok()).collect())
}

fn lenient_records<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<PlantationRecord>, D::Error> {
    let raw = Value::deserialize(d)?;
    let items = raw.as_array().cloned().unwrap_or_default();
    Ok(items.into_iter().filter_map(|v| serde_json::from_value(v).ok()).collect())
}

/// Result of a species BFS run.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SpeciesSearchResult {
    #[serde(default)]
    pub especie: Option<String>,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub nodos_resaltar: Vec<String>,
    #[serde(default, deserialize_with = "lenient_edges")]
    pub bordes: Vec<EdgeRef>,
    #[serde(default)]
    pub num_bordes: Option<usize>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub plantaciones: Vec<PlantationRecord>,
    #[serde(default)]
    pub highlight_path: Option<String>,
}

/// Display-ready summary of a [`SpeciesSearchResult`].
#[derive(Clone, Debug, PartialEq)]
pub struct BfsReport {
    pub species: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub plantations: Vec<[String; 5]>,
    pub node_sample: Vec<String>,
    pub edge_sample: Vec<String>,
    pub highlight_path: Option<String>,
}

impl BfsReport {
    /// `fallback_species` fills in when the payload does not name the species.
    pub fn new(result: &SpeciesSearchResult, fallback_species: &str) -> Self {
        BfsReport {
            species: result.especie.clone().unwrap_or_else(|| fallback_species.to_string()),
            node_count: result.nodos_resaltar.len(),
            edge_count: result.num_bordes.unwrap_or(result.bordes.len()),
            plantations: result.plantaciones.iter().map(PlantationRecord::cells).collect(),
            node_sample: result.nodos_resaltar.iter().take(REPORT_SAMPLE_CAP).cloned().collect(),
            edge_sample: result
                .bordes
                .iter()
                .take(REPORT_SAMPLE_CAP)
                .filter_map(EdgeRef::endpoints)
                .map(|(s, t)| format!("{} → {}", s, t))
                .collect(),
            highlight_path: result.highlight_path.clone().filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn nodes_heading(&self) -> String {
        if self.node_count > self.node_sample.len() {
            format!("Highlighted nodes (showing {} of {})", self.node_sample.len(), self.node_count)
        } else {
            format!("Highlighted nodes (showing {})", self.node_sample.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_takes_precedence_over_visited() {
        let out = json!({"path": ["A", "B"], "visited": ["C"]});
        assert_eq!(AnalysisHighlight::from_output(&out), AnalysisHighlight::Path(vec!["A".into(), "B".into()]));
    }

    #[test]
    fn visited_falls_back_to_nodes_and_malformed_degrades() {
        assert_eq!(
            AnalysisHighlight::from_output(&json!({"nodes": [1, 2]})),
            AnalysisHighlight::Visited(vec!["1".into(), "2".into()])
        );
        assert_eq!(AnalysisHighlight::from_output(&json!({"path": "A-B"})), AnalysisHighlight::None);
        assert_eq!(AnalysisHighlight::from_output(&json!({"components": 3})), AnalysisHighlight::None);
        assert_eq!(AnalysisHighlight::from_output(&Value::Null), AnalysisHighlight::None);
    }

    #[test]
    fn request_uses_backend_field_names() {
        let req = AnalysisRequest {
            tipo: AnalysisKind::Dijkstra,
            start_node: Some("A".into()),
            target_node: Some("C".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["tipo"], "dijkstra");
        assert_eq!(v["startNode"], "A");
        assert_eq!(v["targetNode"], "C");
        assert_eq!(v["especie"], "Todas");
    }

    #[test]
    fn bordes_accept_pairs_and_tagged_objects() {
        let res: SpeciesSearchResult = serde_json::from_value(json!({
            "nodos_resaltar": ["X1", 2],
            "bordes": [["X1", "X2"], {"source": "X2", "target": "X3"}, ["lonely"], 7],
            "plantaciones": [{"ID": "P9", "ESPECIE": "Cedro", "superficie": 1.5}, "junk"]
        }))
        .unwrap();
        assert_eq!(res.nodos_resaltar, vec!["X1".to_string(), "2".to_string()]);
        let report = BfsReport::new(&res, "Cedro");
        assert_eq!(report.edge_sample, vec!["X1 → X2".to_string(), "X2 → X3".to_string()]);
        assert_eq!(report.plantations[0], ["P9", "Cedro", "", "", "1.5"].map(String::from));
        assert_eq!(report.species, "Cedro");
    }

    #[test]
    fn envelope_failure_becomes_backend_error() {
        let env: Envelope<AnalysisResult> = serde_json::from_value(json!({"success": false, "error": "startNode no existe"})).unwrap();
        match env.into_result() {
            Err(ExplorerError::Backend(msg)) => assert_eq!(msg, "startNode no existe"),
            other => panic!("unexpected {:?}", other.map(|r| r.output)),
        }
    }

    #[test]
    fn report_heading_mentions_cap() {
        let res = SpeciesSearchResult { nodos_resaltar: (0..201).map(|i| format!("X{}", i)).collect(), ..Default::default() };
        let report = BfsReport::new(&res, "Pinus");
        assert_eq!(report.nodes_heading(), "Highlighted nodes (showing 200 of 201)");
    }

    #[test]
    fn blank_species_query_is_not_sent() {
        assert_eq!(SpeciesQuery::new("   "), None);
        assert_eq!(SpeciesQuery::new(""), None);
        assert_eq!(SpeciesQuery::new(" Pinus ").map(|q| q.query), Some("Pinus".to_string()));
    }

    #[test]
    fn bfs_request_forwards_highlight_flag_and_report_keeps_path() {
        let req = BfsRequest { species: "Cedro".into(), generate_highlight: false };
        assert_eq!(serde_json::to_value(&req).unwrap()["generate_highlight"], false);

        let res: SpeciesSearchResult =
            serde_json::from_value(json!({"nodos_resaltar": ["P1"], "highlight_path": "static/bfs_cedro.html"})).unwrap();
        assert_eq!(BfsReport::new(&res, "Cedro").highlight_path.as_deref(), Some("static/bfs_cedro.html"));
        let bare = SpeciesSearchResult { highlight_path: Some(" ".into()), ..Default::default() };
        assert_eq!(BfsReport::new(&bare, "Cedro").highlight_path, None);
    }
}
