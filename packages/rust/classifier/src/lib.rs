//! Content classification for flowchart extraction.
//!
//! Before any grammar runs, the raw text is scored line by line to decide
//! whether it looks like annotated code (`# type:` markers on functions) or a
//! step procedure (`STEP <n>:` lines). The result is a heuristic: callers must
//! handle [`ContentKind::Unknown`] themselves, usually by substituting a
//! default document.

mod signals;

use serde::Serialize;
use tracing::{debug, instrument};

use signals::Side;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which grammar a document matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Annotated code with `# type:` markers.
    Code,
    /// Numbered `STEP` procedure.
    Procedure,
    /// Neither grammar scored; not an error.
    Unknown,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Procedure => "procedure",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification verdict together with the scores that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub kind: ContentKind,
    pub code_score: u32,
    pub step_score: u32,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Score every line and pick a grammar.
///
/// Code wins only with a strictly higher score, procedure likewise; a tie
/// (including `0 == 0`) is `Unknown`.
#[instrument(skip_all, fields(lines = text.lines().count()))]
pub fn classify(text: &str) -> Classification {
    let (code_score, step_score) = score(text);

    let kind = if code_score > step_score {
        ContentKind::Code
    } else if step_score > code_score {
        ContentKind::Procedure
    } else {
        ContentKind::Unknown
    };

    debug!(code_score, step_score, kind = %kind, "content classified");

    Classification {
        kind,
        code_score,
        step_score,
    }
}

/// Raw `(code_score, step_score)` for a document.
pub fn score(text: &str) -> (u32, u32) {
    text.lines()
        .flat_map(signals::signals)
        .fold((0, 0), |(code, step), signal| match signal.side() {
            Side::Code => (code + signal.weight(), step),
            Side::Step => (code, step + signal.weight()),
        })
}
