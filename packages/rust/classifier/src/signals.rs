//! Per-line evidence for the content classifier.
//!
//! Each pattern is one [`Signal`]; a line may raise several at once
//! (`# type: start` is both a type marker and a comment).

use regex::Regex;
use std::sync::LazyLock;

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Which grammar a signal counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Code,
    Step,
}

/// A single pattern match on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    /// `# type: <kind>`
    TypeMarker,
    /// `def name`, `fn name`, `function name`
    FunctionDecl,
    /// `class Name`
    ClassDecl,
    /// Any `#`
    Comment,
    /// `import x` at line start
    Import,
    /// `from x import y` at line start
    FromImport,
    /// `STEP <n>` at line start
    StepHeader,
    /// `1.` / `1)` list marker
    NumberedItem,
    /// `•` / `·` bullet
    Bullet,
    /// `-` / `*` list marker
    Dash,
    /// A question immediately answered with yes/no
    YesNoQuestion,
}

impl Signal {
    pub(crate) fn side(&self) -> Side {
        match self {
            Self::TypeMarker
            | Self::FunctionDecl
            | Self::ClassDecl
            | Self::Comment
            | Self::Import
            | Self::FromImport => Side::Code,
            Self::StepHeader
            | Self::NumberedItem
            | Self::Bullet
            | Self::Dash
            | Self::YesNoQuestion => Side::Step,
        }
    }

    pub(crate) fn weight(&self) -> u32 {
        match self {
            Self::TypeMarker | Self::StepHeader => 5,
            Self::FunctionDecl | Self::ClassDecl | Self::NumberedItem => 3,
            Self::Comment | Self::Bullet | Self::Dash | Self::YesNoQuestion => 2,
            Self::Import | Self::FromImport => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

static TYPE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*type:").expect("type marker regex"));

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:def|fn|function)\s+\w+").expect("function regex")
});

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bclass\s+\w+").expect("class regex"));

static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+").expect("import regex"));

static FROM_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*from\s+\S+\s+import\b").expect("from-import regex")
});

static STEP_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*STEP\s*\d+").expect("step header regex"));

static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]").expect("numbered item regex"));

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[•·]\s+").expect("bullet regex"));

static DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s+").expect("dash regex"));

static YES_NO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\?\s*(?:yes|no|y|n)\b").expect("yes/no question regex")
});

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// All signals raised by one line, in a fixed order.
pub(crate) fn signals(line: &str) -> Vec<Signal> {
    let checks: [(&LazyLock<Regex>, Signal); 10] = [
        (&TYPE_MARKER_RE, Signal::TypeMarker),
        (&FUNCTION_RE, Signal::FunctionDecl),
        (&CLASS_RE, Signal::ClassDecl),
        (&IMPORT_RE, Signal::Import),
        (&FROM_IMPORT_RE, Signal::FromImport),
        (&STEP_HEADER_RE, Signal::StepHeader),
        (&NUMBERED_RE, Signal::NumberedItem),
        (&BULLET_RE, Signal::Bullet),
        (&DASH_RE, Signal::Dash),
        (&YES_NO_RE, Signal::YesNoQuestion),
    ];

    let mut found: Vec<Signal> = checks
        .iter()
        .filter(|(re, _)| re.is_match(line))
        .map(|(_, signal)| *signal)
        .collect();

    if line.contains('#') {
        found.push(Signal::Comment);
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_marker_line_is_also_a_comment() {
        let found = signals("# type: decision");
        assert!(found.contains(&Signal::TypeMarker));
        assert!(found.contains(&Signal::Comment));
    }

    #[test]
    fn declarations() {
        assert_eq!(signals("def check(): pass"), vec![Signal::FunctionDecl]);
        assert_eq!(signals("class Ledger:"), vec![Signal::ClassDecl]);
        assert_eq!(signals("fn main() {}"), vec![Signal::FunctionDecl]);
        assert!(signals("undefined behaviour").is_empty());
    }

    #[test]
    fn imports_only_at_line_start() {
        assert_eq!(signals("import os"), vec![Signal::Import]);
        assert_eq!(signals("from io import BytesIO"), vec![Signal::FromImport]);
        assert!(signals("Retrieve the record from the database").is_empty());
    }

    #[test]
    fn step_header_is_case_insensitive() {
        assert_eq!(signals("STEP 1: Begin"), vec![Signal::StepHeader]);
        assert_eq!(signals("step 12 collect input"), vec![Signal::StepHeader]);
        assert!(signals("Go to STEP 3").is_empty());
    }

    #[test]
    fn list_markers() {
        assert_eq!(signals("1. Open the form"), vec![Signal::NumberedItem]);
        assert_eq!(signals("2) Submit"), vec![Signal::NumberedItem]);
        assert_eq!(signals("• Review"), vec![Signal::Bullet]);
        assert_eq!(signals("- Approve"), vec![Signal::Dash]);
        assert_eq!(signals("* Approve"), vec![Signal::Dash]);
        assert!(signals("-notalist").is_empty());
    }

    #[test]
    fn yes_no_question() {
        assert_eq!(signals("Valid ID? Yes -> continue"), vec![Signal::YesNoQuestion]);
        assert_eq!(signals("Paid? n"), vec![Signal::YesNoQuestion]);
        assert!(signals("Is age over 18?").is_empty());
    }

    #[test]
    fn weights() {
        assert_eq!(Signal::TypeMarker.weight(), 5);
        assert_eq!(Signal::StepHeader.weight(), 5);
        assert_eq!(Signal::NumberedItem.weight(), 3);
        assert_eq!(Signal::Comment.weight(), 2);
        assert_eq!(Signal::Import.weight(), 1);
        assert_eq!(Signal::YesNoQuestion.side(), Side::Step);
        assert_eq!(Signal::ClassDecl.side(), Side::Code);
    }
}
