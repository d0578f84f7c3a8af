pub mod extractor;
pub mod overlay;

pub use extractor::{FocusSelection, SUBGRAPH_NODE_CAP, Subgraph, SubgraphExtractor, induced_subgraph};
pub use overlay::LabelOverlay;
