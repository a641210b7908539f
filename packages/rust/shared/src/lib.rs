//! Shared types, error model, and configuration for flowgraph.
//!
//! This crate is the foundation depended on by all other flowgraph crates.
//! It provides:
//! - [`FlowGraphError`], the unified error type
//! - The canonical graph model ([`Graph`], [`Node`], [`Edge`], [`NodeType`], [`EdgeKind`])
//!   and the pre-rewrite [`RawFlow`] both text parsers produce
//! - Configuration ([`AppConfig`], [`ParseOptions`], [`ExtractOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractOptions, ExtractionConfig, ParseOptions, ParserConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{FlowGraphError, Result};
pub use types::{DataUse, Edge, EdgeKind, Graph, Node, NodeType, RawFlow};
