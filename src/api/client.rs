use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::contracts::{
    AnalysisRequest, AnalysisResult, BfsRequest, Envelope, SpeciesMatches, SpeciesQuery, SpeciesSearchResult,
};
use crate::error::{ExplorerError, Result};
use crate::graph_utils::graph::Graph;
use crate::graph_utils::ingest::graph_from_value;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the dataset and analysis backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: Client,
}

fn transport(e: reqwest::Error) -> ExplorerError {
    if e.is_timeout() {
        ExplorerError::Transport(format!("request timed out: {}", e))
    } else {
        ExplorerError::Transport(e.to_string())
    }
}

/// Turn a status code and body into a typed payload. A failed status whose
/// body carries an `error` field reports that message instead of the raw body.
pub fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string));
        return Err(match message {
            Some(m) => ExplorerError::Backend(m),
            None => ExplorerError::Status { status, body: body.trim().to_string() },
        });
    }
    Ok(serde_json::from_str(body)?)
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build().map_err(transport)?;
        Ok(BackendClient { base_url: base_url.into().trim_end_matches('/').to_string(), client })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let resp = req.send().await.map_err(transport)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(transport)?;
        debug!("backend answered {} ({} bytes)", status, body.len());
        decode_body(status, &body)
    }

    pub async fn fetch_dataset(&self) -> Result<Graph> {
        let raw: Value = self.read(self.client.get(self.url("/api/graph"))).await?;
        Ok(graph_from_value(&raw))
    }

    pub async fn run_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let env: Envelope<AnalysisResult> = self.read(self.client.post(self.url("/api/analysis")).json(request)).await?;
        env.into_result()
    }

    pub async fn species_search(&self, query: &SpeciesQuery) -> Result<Vec<String>> {
        let matches: SpeciesMatches = self.read(self.client.post(self.url("/api/species_search")).json(query)).await?;
        matches.into_result()
    }

    pub async fn bfs_execute(&self, species: &str, generate_highlight: bool) -> Result<SpeciesSearchResult> {
        let body = BfsRequest { species: species.to_string(), generate_highlight };
        let env: Envelope<SpeciesSearchResult> = self.read(self.client.post(self.url("/api/bfs_execute")).json(&body)).await?;
        env.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_prefers_backend_message() {
        let err = decode_body::<Value>(400, r#"{"success": false, "error": "species required"}"#).unwrap_err();
        assert!(matches!(err, ExplorerError::Backend(m) if m == "species required"));
    }

    #[test]
    fn error_status_without_json_keeps_body() {
        let err = decode_body::<Value>(502, "Bad Gateway\n").unwrap_err();
        assert!(matches!(err, ExplorerError::Status { status: 502, ref body } if body == "Bad Gateway"));
    }

    #[test]
    fn success_body_must_parse() {
        assert!(matches!(decode_body::<Value>(200, "<html>"), Err(ExplorerError::Format(_))));
        assert_eq!(decode_body::<Value>(200, "{\"a\":1}").unwrap()["a"], 1);
    }

    #[test]
    fn base_url_is_normalized() {
        let c = BackendClient::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(c.url("/api/graph"), "http://127.0.0.1:5000/api/graph");
    }
}
