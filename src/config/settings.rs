use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const APP_DIR: &str = "Plantation-Explorer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    // Dataset and analysis backend
    #[serde(default = "AppSettings::default_backend_url")]
    pub backend_url: String,
    // Local JSON dataset loaded instead of fetching /api/graph
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,
    #[serde(default = "AppSettings::default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,
    #[serde(default = "AppSettings::default_subgraph_node_cap")]
    pub subgraph_node_cap: usize,
    #[serde(default = "AppSettings::default_label_offset")]
    pub label_offset: f32,
    #[serde(default = "AppSettings::default_fit_padding")]
    pub fit_padding: f32,
    #[serde(default = "AppSettings::default_suggestion_limit")]
    pub suggestion_limit: usize,
    #[serde(default = "AppSettings::default_log_filter")]
    pub log_filter: String,
    // Label level-of-detail on the primary canvas
    #[serde(default = "AppSettings::default_true")]
    pub lod_enabled: bool,
    #[serde(default = "AppSettings::default_lod_label_min_zoom")]
    pub lod_label_min_zoom: f32,
    #[serde(default = "AppSettings::default_lod_threshold")]
    pub lod_hide_labels_node_threshold: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            backend_url: Self::default_backend_url(),
            dataset_path: None,
            readiness_timeout_ms: Self::default_readiness_timeout_ms(),
            subgraph_node_cap: Self::default_subgraph_node_cap(),
            label_offset: Self::default_label_offset(),
            fit_padding: Self::default_fit_padding(),
            suggestion_limit: Self::default_suggestion_limit(),
            log_filter: Self::default_log_filter(),
            lod_enabled: true,
            lod_label_min_zoom: Self::default_lod_label_min_zoom(),
            lod_hide_labels_node_threshold: Self::default_lod_threshold(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Plantation-Explorer
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join(APP_DIR);
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Plantation-Explorer
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join(APP_DIR);
            }
            return PathBuf::from(APP_DIR);
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Plantation-Explorer or ~/.config/Plantation-Explorer
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join(APP_DIR);
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join(APP_DIR);
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_dir(&Self::config_dir())
    }

    /// Read `settings.json` from `dir`, migrating a legacy `settings.ron` if that is all there is.
    pub fn load_from_dir(dir: &Path) -> anyhow::Result<Self> {
        let json_path = dir.join("settings.json");
        if json_path.exists() {
            return Self::load_from_path(&json_path);
        }
        // Migrate from legacy RON if present
        let ron_path = dir.join("settings.ron");
        if ron_path.exists() {
            let mut f = fs::File::open(&ron_path)?;
            let mut s = String::new();
            f.read_to_string(&mut s)?;
            let v: Self = ron::from_str(&s)?;
            // Save immediately to JSON for future reads, ignore errors silently
            let _ = v.save_to_dir(dir);
            return Ok(v);
        }
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let mut f = fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = serde_json::from_str(&s)?;
        Ok(v)
    }

    pub fn save_to_dir(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir)?;
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(dir.join("settings.json"))?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn readiness_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.readiness_timeout_ms)
    }

    pub(crate) fn default_backend_url() -> String { "http://127.0.0.1:5000".to_string() }
    pub(crate) fn default_readiness_timeout_ms() -> u64 { 3000 }
    pub(crate) fn default_subgraph_node_cap() -> usize { crate::subgraph::SUBGRAPH_NODE_CAP }
    pub(crate) fn default_label_offset() -> f32 { 80.0 }
    pub(crate) fn default_fit_padding() -> f32 { 60.0 }
    pub(crate) fn default_suggestion_limit() -> usize { 50 }
    pub(crate) fn default_log_filter() -> String { "info".to_string() }
    pub(crate) fn default_lod_label_min_zoom() -> f32 { 0.7 }
    pub(crate) fn default_lod_threshold() -> usize { 200 }
    fn default_true() -> bool { true }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = AppSettings::load_from_dir(dir.path()).unwrap();
        assert_eq!(s, AppSettings::default());
        assert_eq!(s.readiness_timeout_ms, 3000);
        assert_eq!(s.subgraph_node_cap, 200);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let s = AppSettings { backend_url: "http://10.0.0.2:5000".into(), fit_padding: 30.0, ..Default::default() };
        s.save_to_dir(dir.path()).unwrap();
        assert_eq!(AppSettings::load_from_dir(dir.path()).unwrap(), s);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.json"), r#"{"suggestion_limit": 10}"#).unwrap();
        let s = AppSettings::load_from_dir(dir.path()).unwrap();
        assert_eq!(s.suggestion_limit, 10);
        assert_eq!(s.backend_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn legacy_ron_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = AppSettings { label_offset: 120.0, ..Default::default() };
        fs::write(dir.path().join("settings.ron"), ron::to_string(&legacy).unwrap()).unwrap();
        let s = AppSettings::load_from_dir(dir.path()).unwrap();
        assert_eq!(s.label_offset, 120.0);
        assert!(dir.path().join("settings.json").exists());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.json"), "{ nope").unwrap();
        assert!(AppSettings::load_from_dir(dir.path()).is_err());
    }
}
