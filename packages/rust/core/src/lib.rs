//! Flowchart extraction engine.
//!
//! Ties the classifier and both text grammars together with the data-flow
//! rewriter into one pipeline ([`extract`]), plus the alternate entry point
//! for graphs produced elsewhere ([`adapter`]) and a concurrent batch mode.

pub mod adapter;
pub mod batch;
pub mod dataflow;
pub mod pipeline;
pub mod sample;

pub use adapter::{ForeignEdge, ForeignGraph, ForeignNode, adapt, adapt_response, extract_payload};
pub use batch::{BatchOutcome, BatchProgress, SilentProgress, extract_batch};
pub use dataflow::rewrite;
pub use pipeline::{Extraction, extract, extract_or_fallback};
pub use sample::FALLBACK_SAMPLE;
