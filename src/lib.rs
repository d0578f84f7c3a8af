//! Interactive explorer for forestry plantation graphs: search, highlighting,
//! analysis results and subgraph views over one loaded dataset.

pub mod api;
pub mod config;
pub mod error;
pub mod explorer;
pub mod graph_utils;
pub mod gui;
pub mod highlight;
pub mod render;
pub mod search;
pub mod subgraph;
