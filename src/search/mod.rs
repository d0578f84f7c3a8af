pub mod index;
pub mod resolver;
pub mod summary;

pub use index::{SearchIndex, Suggestion, SuggestionKind};
pub use resolver::{MatchStrategy, QueryResolver, Resolution};
