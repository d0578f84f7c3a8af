//! Label satellites for plantation anchors.
//!
//! Plantation labels are long and collide in dense layouts, so the anchor shows
//! its id and a satellite placed beside it carries the full label, tied to the
//! anchor by an invisible connector. The overlay is render-only: the subgraph
//! data itself never gains these elements.

use egui::{Pos2, vec2};

use crate::render::adapter::{ElementKind, RenderElement};

pub fn satellite_id(anchor: &str) -> String {
    format!("lbl_{}", anchor)
}

pub fn connector_id(anchor: &str) -> String {
    format!("e_{}_{}", satellite_id(anchor), anchor)
}

#[derive(Clone, Debug)]
pub struct LabelOverlay {
    offset: f32,
}

impl LabelOverlay {
    pub fn new(offset: f32) -> Self {
        LabelOverlay { offset }
    }

    pub fn offset(&self) -> f32 { self.offset }

    /// Satellite and connector for one anchor at `anchor_pos`.
    pub fn pair(&self, anchor: &RenderElement, anchor_pos: Pos2) -> [RenderElement; 2] {
        let sat = satellite_id(&anchor.id);
        [
            RenderElement {
                id: sat.clone(),
                kind: ElementKind::LabelSatellite { anchor: anchor.id.clone() },
                display_label: anchor.full_label.clone(),
                full_label: anchor.full_label.clone(),
                position: Some(anchor_pos + vec2(self.offset, 0.0)),
            },
            RenderElement {
                id: connector_id(&anchor.id),
                kind: ElementKind::Connector { source: sat, target: anchor.id.clone() },
                display_label: String::new(),
                full_label: String::new(),
                position: None,
            },
        ]
    }

    /// Overlay elements for every anchor that does not have a satellite yet.
    /// `exists` reports ids already present on the target instance.
    pub fn synthesize<'a>(
        &self,
        anchors: impl IntoIterator<Item = (&'a RenderElement, Pos2)>,
        exists: impl Fn(&str) -> bool,
    ) -> Vec<RenderElement> {
        let mut out: Vec<RenderElement> = Vec::new();
        for (anchor, pos) in anchors {
            let sat = satellite_id(&anchor.id);
            if exists(&sat) || out.iter().any(|e| e.id == sat) {
                continue;
            }
            out.extend(self.pair(anchor, pos));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::graph::{Node, NodeType};
    use egui::pos2;

    #[test]
    fn satellite_sits_at_fixed_offset_with_full_label() {
        let anchor = RenderElement::node(&Node::new("P7", "Plantación 7 - Lote Norte", NodeType::Plantacion));
        let [sat, conn] = LabelOverlay::new(80.0).pair(&anchor, pos2(10.0, 20.0));
        assert_eq!(sat.id, "lbl_P7");
        assert_eq!(sat.position, Some(pos2(90.0, 20.0)));
        assert_eq!(sat.display_label, "Plantación 7 - Lote Norte");
        assert_eq!(conn.id, "e_lbl_P7_P7");
        assert_eq!(conn.endpoints(), Some(("lbl_P7", "P7")));
    }

    #[test]
    fn synthesis_is_idempotent_per_anchor() {
        let anchor = RenderElement::node(&Node::new("P1", "Plantación 1", NodeType::Plantacion));
        let overlay = LabelOverlay::new(80.0);
        let first = overlay.synthesize([(&anchor, pos2(0.0, 0.0)), (&anchor, pos2(0.0, 0.0))], |_| false);
        assert_eq!(first.len(), 2);
        let again = overlay.synthesize([(&anchor, pos2(0.0, 0.0))], |id| first.iter().any(|e| e.id == id));
        assert!(again.is_empty());
    }
}
