pub mod engine;

pub use engine::{HighlightEngine, HighlightMode, PathHighlight};
