use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};

use eframe::egui::{self, Color32};
use log::{error, info, warn};
use uuid::Uuid;

use super::canvas::{EguiFactory, LodSettings};
use crate::api::contracts::{AnalysisKind, AnalysisRequest, AnalysisResult, BfsReport, SpeciesQuery, SpeciesSearchResult};
use crate::config::AppSettings;
use crate::error::{ExplorerError, Result};
use crate::explorer::{AnalysisApplied, Explorer, ExplorerConfig, SearchOutcome};
use crate::graph_utils::graph::Graph;
use crate::graph_utils::ingest::load_dataset_file;
use crate::graph_utils::store::LoadOutcome;
use crate::search::index::Suggestion;

#[cfg(feature = "http")]
use crate::api::client::BackendClient;

/// Work finished off the UI thread, delivered through the app's channel.
enum UiEvent {
    Dataset(Result<Graph>),
    Analysis { instance: Uuid, result: Result<AnalysisResult> },
    SpeciesMatches(Result<Vec<String>>),
    SpeciesBfs { instance: Uuid, species: String, result: Result<SpeciesSearchResult> },
    Failed(ExplorerError),
}

struct AnalysisForm {
    kind: AnalysisKind,
    especie: String,
    departamento: String,
    start: String,
    target: String,
    limit: u32,
}

impl Default for AnalysisForm {
    fn default() -> Self {
        let d = AnalysisRequest::default();
        AnalysisForm {
            kind: d.tipo,
            especie: d.especie,
            departamento: d.departamento,
            start: String::new(),
            target: String::new(),
            limit: d.limit.unwrap_or(100),
        }
    }
}

impl AnalysisForm {
    fn request(&self) -> AnalysisRequest {
        let opt = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        AnalysisRequest {
            tipo: self.kind,
            especie: self.especie.trim().to_string(),
            departamento: self.departamento.trim().to_string(),
            start_node: if self.kind.needs_start() { opt(&self.start) } else { None },
            target_node: if self.kind.needs_target() { opt(&self.target) } else { None },
            limit: Some(self.limit),
        }
    }
}

pub struct ExplorerApp {
    explorer: Explorer<EguiFactory>,
    settings: AppSettings,
    runtime: Option<tokio::runtime::Runtime>,
    tx: Sender<UiEvent>,
    rx: Receiver<UiEvent>,
    #[cfg(feature = "http")]
    backend: Option<BackendClient>,

    search_input: String,
    suggestions: Vec<Suggestion>,
    last_search: Option<SearchOutcome>,
    analysis: AnalysisForm,
    analysis_text: String,
    species_query: String,
    species_matches: Vec<String>,
    generate_highlight: bool,
    bfs_report: Option<BfsReport>,
    show_subgraph: bool,
    busy: usize,
    status: String,
}

impl ExplorerApp {
    pub fn new(settings: AppSettings) -> Self {
        let lod = LodSettings {
            enabled: settings.lod_enabled,
            label_min_zoom: settings.lod_label_min_zoom,
            hide_labels_node_threshold: settings.lod_hide_labels_node_threshold,
        };
        let explorer = Explorer::new(EguiFactory { lod }, ExplorerConfig::from(&settings));
        let runtime = match tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build() {
            Ok(rt) => Some(rt),
            Err(e) => {
                error!("failed to create tokio runtime for background requests: {}", e);
                None
            }
        };
        #[cfg(feature = "http")]
        let backend = match BackendClient::new(settings.backend_url.clone()) {
            Ok(c) => Some(c),
            Err(e) => {
                error!("backend client unavailable: {}", e);
                None
            }
        };
        let (tx, rx) = channel();
        ExplorerApp {
            explorer,
            settings,
            runtime,
            tx,
            rx,
            #[cfg(feature = "http")]
            backend,
            search_input: String::new(),
            suggestions: Vec::new(),
            last_search: None,
            analysis: AnalysisForm::default(),
            analysis_text: String::new(),
            species_query: String::new(),
            species_matches: Vec::new(),
            generate_highlight: true,
            bfs_report: None,
            show_subgraph: false,
            busy: 0,
            status: String::new(),
        }
    }

    /// Kick off the initial dataset load: the configured local file, else the backend.
    pub fn start(&mut self, ctx: &egui::Context) {
        match self.settings.dataset_path.clone() {
            Some(path) => self.load_file(path, ctx),
            None => self.fetch_dataset(ctx),
        }
    }

    fn spawn<Fut>(&mut self, ctx: &egui::Context, fut: Fut)
    where
        Fut: std::future::Future<Output = UiEvent> + Send + 'static,
    {
        let Some(rt) = &self.runtime else {
            self.status = "Background runtime unavailable".to_string();
            return;
        };
        self.busy += 1;
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        rt.spawn(async move {
            let ev = fut.await;
            // Receiver only goes away with the app
            let _ = tx.send(ev);
            ctx.request_repaint();
        });
    }

    fn load_file(&mut self, path: PathBuf, ctx: &egui::Context) {
        self.status = format!("Reading {}", path.display());
        self.spawn(ctx, async move { UiEvent::Dataset(load_dataset_file(&path)) });
    }

    #[cfg(feature = "http")]
    fn fetch_dataset(&mut self, ctx: &egui::Context) {
        let Some(client) = self.backend.clone() else { return };
        self.status = format!("Fetching graph from {}", client.base_url());
        self.spawn(ctx, async move { UiEvent::Dataset(client.fetch_dataset().await) });
    }

    #[cfg(not(feature = "http"))]
    fn fetch_dataset(&mut self, _ctx: &egui::Context) {
        self.status = "Built without HTTP support; set a dataset file".to_string();
    }

    #[cfg(feature = "http")]
    fn run_analysis(&mut self, ctx: &egui::Context) {
        let Some(client) = self.backend.clone() else { return };
        let request = self.analysis.request();
        let ticket = self.explorer.ticket();
        let timeout = self.explorer.config().readiness_timeout;
        self.analysis_text = format!("Running {}...", request.tipo.as_str());
        self.spawn(ctx, async move {
            let result = client.run_analysis(&request).await;
            match ticket.instance(Some(timeout), None).await {
                Ok(instance) => UiEvent::Analysis { instance, result },
                Err(e) => UiEvent::Failed(e.into()),
            }
        });
    }

    #[cfg(not(feature = "http"))]
    fn run_analysis(&mut self, _ctx: &egui::Context) {
        self.analysis_text = "Built without HTTP support".to_string();
    }

    #[cfg(feature = "http")]
    fn search_species(&mut self, ctx: &egui::Context) {
        let Some(query) = SpeciesQuery::new(&self.species_query) else {
            self.status = "Enter a species name".to_string();
            return;
        };
        let Some(client) = self.backend.clone() else { return };
        self.spawn(ctx, async move { UiEvent::SpeciesMatches(client.species_search(&query).await) });
    }

    #[cfg(not(feature = "http"))]
    fn search_species(&mut self, _ctx: &egui::Context) {
        self.status = match SpeciesQuery::new(&self.species_query) {
            Some(_) => "Built without HTTP support".to_string(),
            None => "Enter a species name".to_string(),
        };
    }

    #[cfg(feature = "http")]
    fn run_bfs(&mut self, species: String, ctx: &egui::Context) {
        let Some(client) = self.backend.clone() else { return };
        let ticket = self.explorer.ticket();
        let timeout = self.explorer.config().readiness_timeout;
        let generate_highlight = self.generate_highlight;
        self.status = format!("Running BFS for {}", species);
        self.spawn(ctx, async move {
            let result = client.bfs_execute(&species, generate_highlight).await;
            match ticket.instance(Some(timeout), None).await {
                Ok(instance) => UiEvent::SpeciesBfs { instance, species, result },
                Err(e) => UiEvent::Failed(e.into()),
            }
        });
    }

    #[cfg(not(feature = "http"))]
    fn run_bfs(&mut self, _species: String, _ctx: &egui::Context) {
        self.status = "Built without HTTP support".to_string();
    }

    fn run_search(&mut self) {
        let outcome = self.explorer.search(&self.search_input);
        self.suggestions.clear();
        if let Some(notice) = &outcome.notice {
            self.status = notice.to_string();
        } else {
            self.status = format!("{} node(s) highlighted", outcome.resolution.nodes.len());
        }
        self.last_search = Some(outcome);
    }

    fn accept_suggestion(&mut self, s: &Suggestion) {
        // Replace the token being typed, keep the earlier ones
        let head = match self.search_input.rfind(',') {
            Some(i) => format!("{}, ", self.search_input[..i].trim_end()),
            None => String::new(),
        };
        self.search_input = format!("{}{}", head, s.value);
        self.suggestions.clear();
        if s.kind.runs_search() {
            self.run_search();
        }
    }

    fn drain_events(&mut self) {
        while let Ok(ev) = self.rx.try_recv() {
            self.busy = self.busy.saturating_sub(1);
            if let Err(e) = self.handle_event(ev) {
                warn!("{}", e);
                self.status = e.to_string();
            }
        }
    }

    fn handle_event(&mut self, ev: UiEvent) -> Result<()> {
        match ev {
            UiEvent::Dataset(graph) => {
                self.last_search = None;
                self.bfs_report = None;
                self.show_subgraph = false;
                self.status = match self.explorer.load_dataset(graph?)? {
                    LoadOutcome::Empty => "Dataset is empty".to_string(),
                    LoadOutcome::Loaded { nodes, edges, layout, .. } => {
                        format!("Loaded {} nodes, {} edges ({} layout)", nodes, edges, layout.name())
                    }
                };
            }
            UiEvent::Analysis { instance, result } => {
                let result = result.inspect_err(|e| self.analysis_text = e.to_string())?;
                self.analysis_text = result.pretty_output();
                if !result.note.is_empty() {
                    self.analysis_text.push_str("\n\n");
                    self.analysis_text.push_str(&result.note);
                }
                match self.explorer.apply_analysis(instance, &result)? {
                    AnalysisApplied::Stale => info!("analysis result arrived for a replaced graph view"),
                    AnalysisApplied::NoHighlight => {}
                    AnalysisApplied::Path(_) | AnalysisApplied::Visited(_) => self.show_subgraph = true,
                }
            }
            UiEvent::SpeciesMatches(matches) => {
                self.species_matches = matches?;
                if self.species_matches.is_empty() {
                    self.status = format!("No species match '{}'", self.species_query.trim());
                }
            }
            UiEvent::SpeciesBfs { instance, species, result } => {
                let applied = self.explorer.apply_species_result(instance, &result?, &species)?;
                if applied.highlighted.is_some() {
                    self.show_subgraph = true;
                }
                self.status = format!("BFS for {}: {} nodes", applied.report.species, applied.report.node_count);
                self.bfs_report = Some(applied.report);
            }
            UiEvent::Failed(e) => return Err(e),
        }
        Ok(())
    }

    fn search_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Search");
        let resp = ui.text_edit_singleline(&mut self.search_input);
        if resp.changed() {
            self.suggestions = self.explorer.suggestions(&self.search_input);
        }
        let enter = resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        ui.horizontal(|ui| {
            if ui.button("Search").clicked() || enter {
                self.run_search();
            }
            if ui.button("Clear").clicked() {
                self.explorer.clear_highlight();
                self.last_search = None;
                self.search_input.clear();
                self.suggestions.clear();
            }
        });

        let mut picked = None;
        if !self.suggestions.is_empty() {
            egui::ScrollArea::vertical().id_salt("suggestions").max_height(140.0).show(ui, |ui| {
                for s in &self.suggestions {
                    if ui.selectable_label(false, format!("{} ({})", s.value, s.kind.tag())).clicked() {
                        picked = Some(s.clone());
                    }
                }
            });
        }
        if let Some(s) = picked {
            self.accept_suggestion(&s);
        }

        if let Some(outcome) = &self.last_search {
            if let Some(details) = &outcome.details {
                ui.separator();
                ui.label(details.to_string());
            }
            if !outcome.rows.is_empty() {
                egui::ScrollArea::vertical().id_salt("rows").max_height(200.0).show(ui, |ui| {
                    egui::Grid::new("result_rows").striped(true).show(ui, |ui| {
                        for h in ["ID", "Species / Label", "Department", "District", "Connections"] {
                            ui.strong(h);
                        }
                        ui.end_row();
                        for r in &outcome.rows {
                            ui.label(&r.id);
                            ui.label(&r.label_or_species);
                            ui.label(&r.department);
                            ui.label(&r.district);
                            ui.label(r.connections.to_string());
                            ui.end_row();
                        }
                    });
                });
            }
        }
    }

    fn analysis_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading("Analysis");
        egui::ComboBox::from_label("Algorithm").selected_text(self.analysis.kind.as_str()).show_ui(ui, |ui| {
            for k in AnalysisKind::ALL {
                ui.selectable_value(&mut self.analysis.kind, k, k.as_str());
            }
        });
        egui::Grid::new("analysis_form").num_columns(2).show(ui, |ui| {
            ui.label("Species");
            ui.text_edit_singleline(&mut self.analysis.especie);
            ui.end_row();
            ui.label("Department");
            ui.text_edit_singleline(&mut self.analysis.departamento);
            ui.end_row();
            if self.analysis.kind.needs_start() {
                ui.label("Start node");
                ui.text_edit_singleline(&mut self.analysis.start);
                ui.end_row();
            }
            if self.analysis.kind.needs_target() {
                ui.label("Target node");
                ui.text_edit_singleline(&mut self.analysis.target);
                ui.end_row();
            }
            ui.label("Limit");
            ui.add(egui::DragValue::new(&mut self.analysis.limit).range(1..=100_000));
            ui.end_row();
        });
        if ui.button("Run").clicked() {
            self.run_analysis(ctx);
        }
        if !self.analysis_text.is_empty() {
            egui::ScrollArea::vertical().id_salt("analysis_out").max_height(160.0).show(ui, |ui| {
                ui.monospace(&self.analysis_text);
            });
        }
    }

    fn species_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading("Species BFS");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.species_query);
            if ui.button("Find").clicked() {
                self.search_species(ctx);
            }
        });
        ui.checkbox(&mut self.generate_highlight, "Generate highlight");
        let mut chosen = None;
        for m in &self.species_matches {
            if ui.selectable_label(false, m).clicked() {
                chosen = Some(m.clone());
            }
        }
        if let Some(species) = chosen {
            self.run_bfs(species, ctx);
        }
        if let Some(report) = &self.bfs_report {
            ui.separator();
            ui.strong(format!("{}: {} nodes, {} edges", report.species, report.node_count, report.edge_count));
            if let Some(path) = &report.highlight_path {
                ui.label(format!("Highlight: {}", path));
            }
            egui::CollapsingHeader::new(report.nodes_heading()).show(ui, |ui| {
                egui::ScrollArea::vertical().id_salt("bfs_nodes").max_height(160.0).show(ui, |ui| {
                    for id in &report.node_sample {
                        ui.label(id);
                    }
                });
            });
            egui::CollapsingHeader::new(format!("Edges ({})", report.edge_sample.len())).show(ui, |ui| {
                egui::ScrollArea::vertical().id_salt("bfs_edges").max_height(160.0).show(ui, |ui| {
                    for e in &report.edge_sample {
                        ui.label(e);
                    }
                });
            });
            if !report.plantations.is_empty() {
                egui::CollapsingHeader::new(format!("Plantations ({})", report.plantations.len())).show(ui, |ui| {
                    egui::Grid::new("plantations").striped(true).show(ui, |ui| {
                        for h in ["ID", "Species", "Holder", "District", "Area"] {
                            ui.strong(h);
                        }
                        ui.end_row();
                        for row in &report.plantations {
                            for cell in row {
                                ui.label(cell);
                            }
                            ui.end_row();
                        }
                    });
                });
            }
        }
    }
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.explorer.tick();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Reload").clicked() {
                    self.start(ctx);
                }
                if ui.button("Fit view").clicked() {
                    if let Some(instance) = self.explorer.store_mut().primary_mut() {
                        instance.adapter_mut().reset_view();
                    }
                }
                let (nodes, edges) = self.explorer.counts();
                ui.label(format!("Nodes: {}  Edges: {}", nodes, edges));
                if self.busy > 0 {
                    ui.spinner();
                }
                if !self.status.is_empty() {
                    ui.colored_label(Color32::GRAY, &self.status);
                }
            });
        });

        egui::SidePanel::left("explorer_side").resizable(true).default_width(340.0).show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.search_panel(ui);
                ui.separator();
                self.analysis_panel(ui, ctx);
                ui.separator();
                self.species_panel(ui, ctx);
            });
        });

        let mut clicked = None;
        egui::CentralPanel::default().show(ctx, |ui| match self.explorer.store_mut().primary_mut() {
            Some(instance) => clicked = instance.adapter_mut().show(ui),
            None => {
                ui.centered_and_justified(|ui| ui.label("No graph loaded"));
            }
        });
        if let Some(id) = clicked {
            self.search_input = id;
            self.run_search();
        }

        if self.show_subgraph {
            let mut open = true;
            let caption = self.explorer.extractor().current().map(|s| (s.caption(), s.showing()));
            egui::Window::new("Subgraph").open(&mut open).default_size([520.0, 420.0]).show(ctx, |ui| {
                if let Some((caption, showing)) = &caption {
                    ui.label(caption);
                    if let Some(showing) = showing {
                        ui.small(showing);
                    }
                }
                if let Some(instance) = self.explorer.extractor_mut().instance_mut() {
                    instance.adapter_mut().show(ui);
                }
            });
            self.show_subgraph = open;
        }
    }
}
