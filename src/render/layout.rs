/// Above this many elements (nodes + edges) the primary view falls back to a grid.
pub const GRID_THRESHOLD: usize = 800;

#[derive(Clone, Debug, PartialEq)]
pub struct ForceParams {
    pub ideal_edge_length: f32,
    pub node_repulsion: f32,
    pub iterations: u32,
    pub padding: f32,
    pub animate: bool,
}

impl ForceParams {
    pub fn primary() -> Self {
        ForceParams { ideal_edge_length: 80.0, node_repulsion: 4000.0, iterations: 250, padding: 20.0, animate: false }
    }

    // Subgraphs are small; push nodes further apart so labels stay readable
    pub fn subgraph() -> Self {
        ForceParams { ideal_edge_length: 80.0, node_repulsion: 8000.0, iterations: 250, padding: 10.0, animate: true }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayoutSpec {
    Grid,
    Force(ForceParams),
}

impl LayoutSpec {
    pub fn name(&self) -> &'static str {
        match self {
            LayoutSpec::Grid => "grid",
            LayoutSpec::Force(_) => "force",
        }
    }
}

pub fn select_layout(element_count: usize) -> LayoutSpec {
    if element_count > GRID_THRESHOLD {
        LayoutSpec::Grid
    } else {
        LayoutSpec::Force(ForceParams::primary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive_for_force_layout() {
        assert!(matches!(select_layout(0), LayoutSpec::Force(_)));
        assert!(matches!(select_layout(800), LayoutSpec::Force(_)));
        assert_eq!(select_layout(801), LayoutSpec::Grid);
        assert_eq!(select_layout(50_000), LayoutSpec::Grid);
    }

    #[test]
    fn force_layout_uses_tuned_parameters() {
        match select_layout(10) {
            LayoutSpec::Force(p) => {
                assert_eq!(p.ideal_edge_length, 80.0);
                assert_eq!(p.node_repulsion, 4000.0);
            }
            other => panic!("unexpected layout {:?}", other),
        }
    }
}
