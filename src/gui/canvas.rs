//! egui implementation of the rendering adapter.
//!
//! Positions live in world space; the canvas maps them to the screen with its
//! own pan and zoom. Force layouts run a fixed number of spring/repulsion steps,
//! either all at load time or a few per frame when animated.

use std::collections::HashMap;

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Shape as EguiShape, Stroke, Vec2, pos2, vec2};

use crate::error::Result;
use crate::render::adapter::{AdapterFactory, ElementKind, HighlightTag, RenderAdapter, RenderElement, Surface};
use crate::render::layout::{ForceParams, LayoutSpec};
use crate::render::style::{ResolvedStyle, Shape, StyleSheet};

const GRID_SPACING: f32 = 60.0;
const GRID_PADDING: f32 = 20.0;
const STEP_DT: f32 = 1.0 / 30.0;
const STEPS_PER_FRAME: u32 = 8;

const SPRING_K: f32 = 4.0;
const DAMPING: f32 = 6.0;
const REPULSE_SCALE: f32 = 100.0;
const REPULSE_CUTOFF: f32 = 400.0;
const GRAVITY_K: f32 = 0.5;
const MAX_SPEED: f32 = 600.0;
const MAX_STEP: f32 = 5.0;

/// Label visibility rules carried over from user settings.
#[derive(Clone, Debug)]
pub struct LodSettings {
    pub enabled: bool,
    pub label_min_zoom: f32,
    pub hide_labels_node_threshold: usize,
}

impl Default for LodSettings {
    fn default() -> Self {
        LodSettings { enabled: true, label_min_zoom: 0.7, hide_labels_node_threshold: 200 }
    }
}

// Spring-damper integration over the layout nodes
struct ForceSim {
    params: ForceParams,
    remaining: u32,
    ids: Vec<String>,
    pos: Vec<Pos2>,
    vel: Vec<Vec2>,
    springs: Vec<(usize, usize)>,
}

impl ForceSim {
    fn new(params: ForceParams, ids: Vec<String>, pos: Vec<Pos2>, springs: Vec<(usize, usize)>) -> Self {
        let n = ids.len();
        ForceSim { remaining: params.iterations, params, ids, pos, vel: vec![Vec2::ZERO; n], springs }
    }

    fn done(&self) -> bool {
        self.remaining == 0
    }

    fn step(&mut self) {
        if self.done() {
            return;
        }
        let n = self.pos.len();
        let mut forces = vec![Vec2::ZERO; n];

        for &(a, b) in &self.springs {
            let d = self.pos[b] - self.pos[a];
            let dist = d.length();
            if dist > 1e-3 {
                let f = d / dist * (SPRING_K * (dist - self.params.ideal_edge_length));
                forces[a] += f;
                forces[b] -= f;
            }
        }

        let cutoff2 = REPULSE_CUTOFF * REPULSE_CUTOFF;
        for i in 0..n {
            for j in (i + 1)..n {
                let d = self.pos[j] - self.pos[i];
                let dist2 = d.length_sq();
                if dist2 > cutoff2 {
                    continue;
                }
                // Coincident nodes get pushed apart along a deterministic direction
                let dir = if dist2 < 1e-6 { vec2(1.0, 0.0) } else { d / dist2.sqrt() };
                let f = dir * (self.params.node_repulsion * REPULSE_SCALE / dist2.max(25.0));
                forces[i] -= f;
                forces[j] += f;
            }
        }

        for i in 0..n {
            forces[i] -= self.pos[i].to_vec2() * GRAVITY_K;
            let mut v = self.vel[i];
            v += (forces[i] - v * DAMPING) * STEP_DT;
            let speed = v.length();
            if speed > MAX_SPEED {
                v *= MAX_SPEED / speed;
            }
            let mut step = v * STEP_DT;
            let step_len = step.length();
            if step_len > MAX_STEP {
                step *= MAX_STEP / step_len;
            }
            self.pos[i] += step;
            self.vel[i] = v;
        }
        self.remaining -= 1;
    }
}

// Golden-angle spiral placement around the origin; k is the 0-based index
fn golden_spiral_position(k: usize, base: f32) -> Pos2 {
    let golden_angle = std::f32::consts::TAU * (1.0 - 1.0 / 1.618_034);
    let t = k as f32;
    let r = base * t.sqrt();
    let theta = t * golden_angle;
    pos2(r * theta.cos(), r * theta.sin())
}

fn grid_position(k: usize, cols: usize) -> Pos2 {
    pos2((k % cols) as f32 * GRID_SPACING, (k / cols) as f32 * GRID_SPACING)
}

pub struct EguiCanvas {
    surface: Surface,
    elements: Vec<RenderElement>,
    classes: HashMap<String, HighlightTag>,
    positions: HashMap<String, Pos2>,
    style: StyleSheet,
    sim: Option<ForceSim>,
    animate: bool,
    pan: Vec2,
    zoom: f32,
    pending_fit: Option<(Vec<String>, f32)>,
    fit_on_settle: Option<f32>,
    hover: Option<String>,
    destroyed: bool,
    lod: LodSettings,
}

impl EguiCanvas {
    pub fn new(surface: Surface, lod: LodSettings) -> Self {
        EguiCanvas {
            surface,
            elements: Vec::new(),
            classes: HashMap::new(),
            positions: HashMap::new(),
            style: StyleSheet::new(),
            sim: None,
            animate: false,
            pan: Vec2::ZERO,
            zoom: 1.0,
            pending_fit: None,
            fit_on_settle: None,
            hover: None,
            destroyed: false,
            lod,
        }
    }

    pub fn surface(&self) -> Surface { self.surface }
    pub fn zoom(&self) -> f32 { self.zoom }

    pub fn reset_view(&mut self) {
        let ids: Vec<String> = self.elements.iter().map(|e| e.id.clone()).collect();
        self.pending_fit = Some((ids, GRID_PADDING));
    }

    fn sync_sim_positions(&mut self) {
        if let Some(sim) = &self.sim {
            for (id, p) in sim.ids.iter().zip(sim.pos.iter()) {
                self.positions.insert(id.clone(), *p);
            }
        }
    }

    fn advance_layout(&mut self, steps: u32) {
        let Some(sim) = self.sim.as_mut() else { return };
        for _ in 0..steps {
            sim.step();
        }
        self.sync_sim_positions();
        if self.sim.as_ref().is_some_and(ForceSim::done) {
            if let Some(padding) = self.fit_on_settle.take() {
                if self.pending_fit.is_none() {
                    let ids = self.elements.iter().map(|e| e.id.clone()).collect();
                    self.pending_fit = Some((ids, padding));
                }
            }
        }
    }

    // World-space bounding box of the given elements; edges count through their endpoints
    fn bounds(&self, ids: &[String]) -> Option<Rect> {
        let mut rect: Option<Rect> = None;
        let mut grow = |p: Pos2| {
            rect = Some(match rect {
                Some(r) => r.union(Rect::from_min_max(p, p)),
                None => Rect::from_min_max(p, p),
            });
        };
        for id in ids {
            if let Some(p) = self.positions.get(id) {
                grow(*p);
            } else if let Some(el) = self.elements.iter().find(|e| &e.id == id) {
                if let Some((s, t)) = el.endpoints() {
                    for end in [s, t] {
                        if let Some(p) = self.positions.get(end) {
                            grow(*p);
                        }
                    }
                }
            }
        }
        rect
    }

    fn apply_fit(&mut self, viewport: Rect) {
        let Some((ids, padding)) = self.pending_fit.take() else { return };
        let Some(bounds) = self.bounds(&ids) else { return };
        let avail = (viewport.size() - Vec2::splat(2.0 * padding)).max(Vec2::splat(1.0));
        let size = bounds.size().max(Vec2::splat(1.0));
        self.zoom = (avail.x / size.x).min(avail.y / size.y).clamp(0.05, 2.0);
        self.pan = -bounds.center().to_vec2() * self.zoom;
    }

    fn resolved(&self, el: &RenderElement) -> ResolvedStyle {
        let tag = self.classes.get(&el.id).copied().unwrap_or_default();
        self.style.resolve(el, tag, self.hover.as_deref() == Some(el.id.as_str()))
    }

    /// Paint into the remaining space of `ui`. Returns the id of a clicked node.
    pub fn show(&mut self, ui: &mut egui::Ui) -> Option<String> {
        if self.destroyed {
            ui.centered_and_justified(|ui| ui.label("No graph loaded"));
            return None;
        }
        let available = ui.available_rect_before_wrap();
        if self.animate && self.sim.as_ref().is_some_and(|s| !s.done()) {
            self.advance_layout(STEPS_PER_FRAME);
            ui.ctx().request_repaint();
        }
        self.apply_fit(available);

        let bg_resp = ui.allocate_rect(available, Sense::click_and_drag());
        let center = available.center();
        let (zoom, pan) = (self.zoom, self.pan);
        let to_screen = move |p: Pos2| -> Pos2 { center + pan + p.to_vec2() * zoom };

        if bg_resp.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let factor = (1.0 + scroll * 0.001).clamp(0.9, 1.1);
                self.zoom = (self.zoom * factor).clamp(0.05, 4.0);
            }
        }
        let delta = bg_resp.drag_delta();
        if delta != Vec2::ZERO {
            self.pan += delta;
        }

        // Hover: nearest node-like element under the pointer
        self.hover = None;
        if let Some(mouse) = bg_resp.hover_pos() {
            let mut best = f32::INFINITY;
            for el in self.elements.iter().filter(|e| matches!(e.kind, ElementKind::Node { .. })) {
                let Some(p) = self.positions.get(&el.id) else { continue };
                let r = self.style.resolve(el, HighlightTag::None, false).size * 0.5 * zoom;
                let d2 = (to_screen(*p) - mouse).length_sq();
                if d2 <= r * r && d2 < best {
                    best = d2;
                    self.hover = Some(el.id.clone());
                }
            }
        }
        let clicked = if bg_resp.clicked() { self.hover.clone() } else { None };

        let painter = ui.painter_at(available);
        painter.rect_filled(available, 0.0, Color32::from_rgb(250, 250, 250));

        for el in &self.elements {
            let Some((s, t)) = el.endpoints() else { continue };
            let (Some(a), Some(b)) = (self.positions.get(s), self.positions.get(t)) else { continue };
            let st = self.resolved(el);
            if st.opacity <= 0.0 || st.width <= 0.0 {
                continue;
            }
            let color = st.line.gamma_multiply(st.opacity);
            painter.line_segment([to_screen(*a), to_screen(*b)], Stroke::new(st.width * zoom.max(0.5), color));
        }

        let many = self.elements.iter().filter(|e| matches!(e.kind, ElementKind::Node { .. })).count()
            >= self.lod.hide_labels_node_threshold;
        let mut nodes: Vec<(&RenderElement, ResolvedStyle)> =
            self.elements.iter().filter(|e| e.is_node_like()).map(|e| (e, self.resolved(e))).collect();
        nodes.sort_by_key(|(_, st)| st.z);
        for (el, st) in nodes {
            let Some(p) = self.positions.get(&el.id) else { continue };
            let ps = to_screen(*p);
            let r = st.size * 0.5 * zoom;
            let fill = st.fill.gamma_multiply(st.opacity);
            let stroke = Stroke::new(st.border_width * zoom.max(0.5), st.border_color);
            let is_satellite = matches!(el.kind, ElementKind::LabelSatellite { .. });
            if !is_satellite {
                match st.shape {
                    Shape::Ellipse => {
                        painter.circle_filled(ps, r, fill);
                        if st.border_width > 0.0 {
                            painter.circle_stroke(ps, r, stroke);
                        }
                    }
                    Shape::RoundRect => {
                        let rect = Rect::from_center_size(ps, Vec2::splat(r * 2.0));
                        painter.rect_filled(rect, r * 0.3, fill);
                        if st.border_width > 0.0 {
                            painter.rect_stroke(rect, r * 0.3, stroke, egui::StrokeKind::Inside);
                        }
                    }
                    Shape::Diamond => {
                        let pts = vec![ps + vec2(0.0, -r), ps + vec2(r, 0.0), ps + vec2(0.0, r), ps + vec2(-r, 0.0)];
                        painter.add(EguiShape::convex_polygon(pts, fill, stroke));
                    }
                }
            }

            let tagged = self.classes.contains_key(&el.id);
            let is_hover = self.hover.as_deref() == Some(el.id.as_str());
            let show_label = st.show_label
                && (!self.lod.enabled || is_satellite || tagged || is_hover || (!many && zoom >= self.lod.label_min_zoom));
            if show_label && !el.display_label.is_empty() {
                let font = egui::FontId::proportional((st.font_size * zoom).clamp(8.0, 22.0));
                let (anchor, at) = if is_satellite {
                    (egui::Align2::LEFT_CENTER, ps)
                } else {
                    (egui::Align2::CENTER_BOTTOM, ps + vec2(0.0, -r - 2.0))
                };
                painter.text(at, anchor, &el.display_label, font, st.text);
            }
        }

        let hover_text = self.hover.as_ref().and_then(|id| self.elements.iter().find(|e| &e.id == id)).map(|el| {
            if el.full_label.is_empty() { el.id.clone() } else { format!("{} ({})", el.full_label, el.id) }
        });
        if let Some(text) = hover_text {
            bg_resp.on_hover_text(text);
        }
        clicked
    }
}

impl RenderAdapter for EguiCanvas {
    fn load(&mut self, elements: Vec<RenderElement>, style: &StyleSheet, layout: &LayoutSpec) -> Result<()> {
        self.classes.clear();
        self.positions.clear();
        self.hover = None;
        self.style = style.clone();
        self.pending_fit = None;

        let node_ids: Vec<String> = elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::Node { .. }))
            .map(|e| e.id.clone())
            .collect();
        let slot: HashMap<&str, usize> = node_ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

        match layout {
            LayoutSpec::Grid => {
                let cols = (node_ids.len() as f32).sqrt().ceil().max(1.0) as usize;
                for (i, id) in node_ids.iter().enumerate() {
                    self.positions.insert(id.clone(), grid_position(i, cols));
                }
                self.sim = None;
                self.animate = false;
                self.fit_on_settle = None;
                self.pending_fit = Some((node_ids.clone(), GRID_PADDING));
            }
            LayoutSpec::Force(params) => {
                let springs = elements
                    .iter()
                    .filter(|e| matches!(e.kind, ElementKind::Edge { .. }))
                    .filter_map(|e| e.endpoints())
                    .filter_map(|(s, t)| Some((*slot.get(s)?, *slot.get(t)?)))
                    .filter(|(a, b)| a != b)
                    .collect();
                let base = params.ideal_edge_length * 0.5;
                let pos = (0..node_ids.len()).map(|k| golden_spiral_position(k, base)).collect();
                self.sim = Some(ForceSim::new(params.clone(), node_ids.clone(), pos, springs));
                self.animate = params.animate;
                self.fit_on_settle = Some(params.padding);
                if !self.animate {
                    self.advance_layout(params.iterations);
                } else {
                    self.sync_sim_positions();
                }
            }
        }
        for el in &elements {
            if let Some(p) = el.position {
                self.positions.insert(el.id.clone(), p);
            }
        }
        self.elements = elements;
        self.destroyed = false;
        Ok(())
    }

    fn set_class(&mut self, element_id: &str, tag: HighlightTag) {
        if tag == HighlightTag::None {
            self.classes.remove(element_id);
        } else {
            self.classes.insert(element_id.to_string(), tag);
        }
    }

    fn fit(&mut self, element_ids: &[String], padding: f32) {
        self.pending_fit = Some((element_ids.to_vec(), padding));
        // An explicit fit wins over the automatic one after layout
        self.fit_on_settle = None;
    }

    fn destroy(&mut self) {
        self.elements.clear();
        self.classes.clear();
        self.positions.clear();
        self.sim = None;
        self.destroyed = true;
    }

    fn is_destroyed(&self) -> bool { self.destroyed }

    fn layout_settled(&self) -> bool {
        self.sim.as_ref().is_none_or(ForceSim::done)
    }

    fn position(&self, element_id: &str) -> Option<Pos2> {
        self.positions.get(element_id).copied()
    }

    fn contains(&self, element_id: &str) -> bool {
        self.elements.iter().any(|e| e.id == element_id)
    }

    fn add_overlay(&mut self, elements: Vec<RenderElement>) {
        for el in elements {
            if let Some(p) = el.position {
                self.positions.insert(el.id.clone(), p);
            }
            self.elements.push(el);
        }
    }
}

/// Creates canvases for the explorer panel.
#[derive(Clone, Debug, Default)]
pub struct EguiFactory {
    pub lod: LodSettings,
}

impl AdapterFactory for EguiFactory {
    type Adapter = EguiCanvas;

    fn create(&mut self, surface: Surface) -> EguiCanvas {
        EguiCanvas::new(surface, self.lod.clone())
    }
}
