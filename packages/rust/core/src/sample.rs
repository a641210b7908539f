//! Bundled fallback document.
//!
//! A loan-application flow in the annotated-code grammar that uses every
//! common node type. It stands in for missing or unrecognized input.

pub const FALLBACK_SAMPLE: &str =
    include_str!("../../../../fixtures/annotated/loan-application.py");
