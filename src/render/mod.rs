pub mod adapter;
pub mod layout;
pub mod readiness;
pub mod recording;
pub mod style;

pub use adapter::{AdapterFactory, HighlightTag, RenderAdapter, RenderElement, RenderInstance, RenderSlot, Surface};
pub use layout::{LayoutSpec, select_layout};
