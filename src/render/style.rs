use egui::Color32;
use once_cell::sync::Lazy;

use super::adapter::{ElementKind, HighlightTag, RenderElement};
use crate::graph_utils::graph::NodeType;

#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    Node,
    Edge,
    NodeType(NodeType),
    Class(HighlightTag),
    LabelSatellite,
    Connector,
    Hover,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    Ellipse,
    RoundRect,
    Diamond,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleProps {
    pub fill: Option<Color32>,
    pub line: Option<Color32>,
    pub border: Option<(f32, Color32)>,
    pub shape: Option<Shape>,
    pub size: Option<f32>,
    pub width: Option<f32>,
    pub font_size: Option<f32>,
    pub text: Option<Color32>,
    pub opacity: Option<f32>,
    pub show_label: Option<bool>,
    pub z: Option<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StyleRule {
    pub selector: Selector,
    pub props: StyleProps,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStyle {
    pub fill: Color32,
    pub line: Color32,
    pub border_width: f32,
    pub border_color: Color32,
    pub shape: Shape,
    pub size: f32,
    pub width: f32,
    pub font_size: f32,
    pub text: Color32,
    pub opacity: f32,
    pub show_label: bool,
    pub z: i32,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        ResolvedStyle {
            fill: Color32::GRAY,
            line: Color32::GRAY,
            border_width: 0.0,
            border_color: Color32::TRANSPARENT,
            shape: Shape::Ellipse,
            size: 20.0,
            width: 1.5,
            font_size: 12.0,
            text: Color32::BLACK,
            opacity: 1.0,
            show_label: true,
            z: 0,
        }
    }
}

impl ResolvedStyle {
    fn apply(&mut self, p: &StyleProps) {
        if let Some(v) = p.fill { self.fill = v; }
        if let Some(v) = p.line { self.line = v; }
        if let Some((w, c)) = p.border { self.border_width = w; self.border_color = c; }
        if let Some(v) = p.shape { self.shape = v; }
        if let Some(v) = p.size { self.size = v; }
        if let Some(v) = p.width { self.width = v; }
        if let Some(v) = p.font_size { self.font_size = v; }
        if let Some(v) = p.text { self.text = v; }
        if let Some(v) = p.opacity { self.opacity = v; }
        if let Some(v) = p.show_label { self.show_label = v; }
        if let Some(v) = p.z { self.z = v; }
    }
}

/// Ordered rule list; later matching rules override earlier ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleSheet {
    rules: Vec<StyleRule>,
}

impl StyleSheet {
    pub fn new() -> Self { Self::default() }

    pub fn rule(mut self, selector: Selector, props: StyleProps) -> Self {
        self.rules.push(StyleRule { selector, props });
        self
    }

    pub fn rules(&self) -> &[StyleRule] { &self.rules }

    fn matches(selector: &Selector, el: &RenderElement, tag: HighlightTag, hovered: bool) -> bool {
        match (selector, &el.kind) {
            (Selector::Node, ElementKind::Node { .. } | ElementKind::LabelSatellite { .. }) => true,
            (Selector::Edge, ElementKind::Edge { .. } | ElementKind::Connector { .. }) => true,
            (Selector::NodeType(t), ElementKind::Node { node_type }) => t == node_type,
            (Selector::LabelSatellite, ElementKind::LabelSatellite { .. }) => true,
            (Selector::Connector, ElementKind::Connector { .. }) => true,
            (Selector::Class(c), _) => *c != HighlightTag::None && *c == tag,
            (Selector::Hover, _) => hovered,
            _ => false,
        }
    }

    pub fn resolve(&self, el: &RenderElement, tag: HighlightTag, hovered: bool) -> ResolvedStyle {
        let mut out = ResolvedStyle::default();
        for rule in self.rules.iter().filter(|r| Self::matches(&r.selector, el, tag, hovered)) {
            out.apply(&rule.props);
        }
        out
    }
}

fn hex(rgb: u32) -> Color32 {
    Color32::from_rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

pub static PRIMARY_STYLE: Lazy<StyleSheet> = Lazy::new(|| {
    StyleSheet::new()
        .rule(Selector::Node, StyleProps { fill: Some(hex(0xFFD700)), show_label: Some(true), ..Default::default() })
        .rule(Selector::Edge, StyleProps { width: Some(2.0), line: Some(hex(0xCCCCCC)), ..Default::default() })
        .rule(Selector::NodeType(NodeType::Titular), StyleProps { fill: Some(hex(0x87CEEB)), ..Default::default() })
        .rule(Selector::NodeType(NodeType::Especie), StyleProps { fill: Some(hex(0x90EE90)), ..Default::default() })
        .rule(Selector::Hover, StyleProps { fill: Some(hex(0xFFB6C1)), border: Some((3.0, hex(0x333333))), ..Default::default() })
        .rule(Selector::Class(HighlightTag::Highlighted), StyleProps {
            fill: Some(hex(0xFF4136)),
            line: Some(hex(0xFF4136)),
            border: Some((4.0, hex(0x990000))),
            z: Some(9999),
            ..Default::default()
        })
        .rule(Selector::Class(HighlightTag::Start), StyleProps {
            fill: Some(hex(0x2ECC40)),
            border: Some((5.0, hex(0x006400))),
            z: Some(10000),
            ..Default::default()
        })
        .rule(Selector::Class(HighlightTag::End), StyleProps {
            fill: Some(hex(0x0074D9)),
            border: Some((5.0, hex(0x001F3F))),
            z: Some(10000),
            ..Default::default()
        })
});

pub static SUBGRAPH_STYLE: Lazy<StyleSheet> = Lazy::new(|| {
    let typed = |t: NodeType, fill: u32, shape: Shape| {
        (Selector::NodeType(t), StyleProps { fill: Some(hex(fill)), shape: Some(shape), ..Default::default() })
    };
    let mut sheet = StyleSheet::new()
        .rule(Selector::Node, StyleProps {
            fill: Some(hex(0xFFD700)),
            size: Some(38.0),
            font_size: Some(10.0),
            text: Some(Color32::BLACK),
            border: Some((1.0, hex(0x333333))),
            ..Default::default()
        })
        .rule(Selector::Edge, StyleProps { width: Some(2.0), line: Some(hex(0x222222)), ..Default::default() })
        .rule(Selector::NodeType(NodeType::Plantacion), StyleProps {
            fill: Some(hex(0xFFC107)),
            shape: Some(Shape::Ellipse),
            border: Some((3.0, hex(0x3B2F00))),
            ..Default::default()
        });
    for (selector, props) in [
        typed(NodeType::Especie, 0x8BC34A, Shape::RoundRect),
        typed(NodeType::Titular, 0x03A9F4, Shape::RoundRect),
        typed(NodeType::Ubicacion, 0xFF7043, Shape::RoundRect),
        typed(NodeType::Arffs, 0xDA70D6, Shape::Diamond),
    ] {
        sheet = sheet.rule(selector, props);
    }
    sheet
        .rule(Selector::Class(HighlightTag::Highlighted), StyleProps { fill: Some(hex(0xFF4136)), line: Some(hex(0xFF4136)), ..Default::default() })
        .rule(Selector::Class(HighlightTag::Start), StyleProps { fill: Some(hex(0x2ECC40)), border: Some((3.0, hex(0x006400))), ..Default::default() })
        .rule(Selector::Class(HighlightTag::End), StyleProps { fill: Some(hex(0x0074D9)), border: Some((3.0, hex(0x001F3F))), ..Default::default() })
        .rule(Selector::LabelSatellite, StyleProps {
            fill: Some(Color32::TRANSPARENT),
            border: Some((0.0, Color32::TRANSPARENT)),
            font_size: Some(10.0),
            text: Some(hex(0x111111)),
            show_label: Some(true),
            ..Default::default()
        })
        .rule(Selector::Connector, StyleProps { opacity: Some(0.0), width: Some(0.0), ..Default::default() })
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::graph::{Edge, Node};

    #[test]
    fn highlight_classes_override_type_colors() {
        let titular = RenderElement::node(&Node::new("T", "Titular Y", NodeType::Titular));
        let base = PRIMARY_STYLE.resolve(&titular, HighlightTag::None, false);
        assert_eq!(base.fill, hex(0x87CEEB));
        let hl = PRIMARY_STYLE.resolve(&titular, HighlightTag::Highlighted, false);
        assert_eq!(hl.fill, hex(0xFF4136));
        let start = PRIMARY_STYLE.resolve(&titular, HighlightTag::Start, false);
        assert_eq!(start.fill, hex(0x2ECC40));
        assert_eq!(start.z, 10000);
    }

    #[test]
    fn subgraph_plantations_get_thick_border() {
        let p = RenderElement::node(&Node::new("P", "Plantación 1", NodeType::Plantacion));
        let s = SUBGRAPH_STYLE.resolve(&p, HighlightTag::None, false);
        assert_eq!(s.border_width, 3.0);
        assert_eq!(s.size, 38.0);
    }

    #[test]
    fn edges_pick_up_line_color_when_highlighted() {
        let e = RenderElement::edge(&Edge::new("e", "A", "B"));
        assert_eq!(PRIMARY_STYLE.resolve(&e, HighlightTag::None, false).line, hex(0xCCCCCC));
        assert_eq!(PRIMARY_STYLE.resolve(&e, HighlightTag::Highlighted, false).line, hex(0xFF4136));
    }
}
