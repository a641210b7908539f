//! Text grammars for flowchart extraction.
//!
//! Two grammars share one line tokenizer ([`tokens`]):
//!
//! - **annotated code**: `# type: <kind>` markers on functions, classes or
//!   assignments, with `# YES:` / `# NO:` branches and `# uses:` data references
//!   ([`parse_type_tags`]);
//! - **step procedures**: `STEP <n>: <description>` lists with `Go to STEP`
//!   redirections and `Yes:` / `No:` branches ([`parse_steps`]).
//!
//! Both return explicit values and hold no state between calls, so documents
//! can be parsed concurrently. Neither fails: unmatched lines are skipped.

pub mod tokens;

mod steps;
mod type_tags;

pub use steps::{StepProcedure, infer_type, parse_steps};
pub use type_tags::parse_type_tags;
