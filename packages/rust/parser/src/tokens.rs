//! Line tokenizer for both text grammars.
//!
//! Every raw line is classified once into a typed token; the parsers then work
//! on token slices instead of re-running patterns ad hoc. Each rule is a single
//! regex so it can be tested on its own.

use regex::Regex;
use std::sync::LazyLock;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// `# type: <kind>` anywhere on a line.
static TYPE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*type:\s*(\w+)").expect("type marker regex"));

/// A declaration somewhere in the code part of a marker line.
static INLINE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:def|class|fn|function)\s+(\w+)").expect("inline declaration regex")
});

/// A declaration starting a line (optionally `async` / `pub`).
static DECL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:async|pub)\s+)*(?:def|class|fn|function)\s+(\w+)")
        .expect("declaration line regex")
});

/// `name = ...` (but not `==`).
static ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*=(?:[^=]|$)").expect("assignment regex"));

/// `name = ...` starting a line.
static ASSIGN_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\w+)\s*=(?:[^=]|$)").expect("assignment line regex"));

static YES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*YES:\s*(\w+)").expect("YES branch regex"));

static NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*NO:\s*(\w+)").expect("NO branch regex"));

/// `# uses: a, b, c`
static USES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*uses:\s*([\w, ]+)").expect("uses regex"));

/// `STEP <n>[:] <description>`
static STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^STEP\s*(\d+):?\s*(.*)$").expect("step regex"));

/// `WHILE <condition>:`
static LOOP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^WHILE\s+.+:$").expect("loop header regex"));

/// `Go to STEP <n>` as a whole line.
static GOTO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^go\s+to\s+step[_ ]?(\d+)").expect("goto regex"));

/// `Yes: go to STEP <n>` / `Then:` / `No:` / `Else:`
static STEP_BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(yes|then|no|else):\s*go\s+to\s+step[_ ]?(\d+)").expect("step branch regex")
});

/// `go to step <n>` inside a step description.
static INLINE_GOTO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)go\s+to\s*step[_ ]?(\d+)").expect("inline goto regex"));

// ---------------------------------------------------------------------------
// Annotated-code tokens
// ---------------------------------------------------------------------------

/// Which side of a decision a branch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

/// One line of annotated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeLine {
    /// `... # type: <kind>`, with whatever names the code part of the line offers.
    TypeMarker {
        /// Lowercased kind name.
        kind: String,
        /// Function/class declared before the marker.
        declared: Option<String>,
        /// Assignment target before the marker.
        assigned: Option<String>,
    },
    /// A function/class declaration with no marker.
    Declaration(String),
    /// A plain assignment with no marker.
    Assignment(String),
    /// `# YES: <label>` and/or `# NO: <label>`.
    Branches {
        yes: Option<String>,
        no: Option<String>,
    },
    /// `# uses: a, b`
    Uses(Vec<String>),
    Other,
}

impl CodeLine {
    pub fn classify(line: &str) -> Self {
        if let Some(caps) = TYPE_MARKER_RE.captures(line) {
            let code_part = &line[..caps.get(0).map_or(0, |m| m.start())];
            return Self::TypeMarker {
                kind: caps[1].to_lowercase(),
                declared: first_capture(&INLINE_DECL_RE, code_part),
                assigned: first_capture(&ASSIGN_RE, code_part),
            };
        }

        if let Some(name) = first_capture(&DECL_LINE_RE, line) {
            return Self::Declaration(name);
        }

        let yes = first_capture(&YES_RE, line);
        let no = first_capture(&NO_RE, line);
        if yes.is_some() || no.is_some() {
            return Self::Branches { yes, no };
        }

        if let Some(caps) = USES_RE.captures(line) {
            let names = caps[1]
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
            return Self::Uses(names);
        }

        if let Some(name) = first_capture(&ASSIGN_LINE_RE, line) {
            return Self::Assignment(name);
        }

        Self::Other
    }

    /// Lines that end the body of the node declared above them.
    pub fn starts_node(&self) -> bool {
        matches!(self, Self::TypeMarker { .. } | Self::Declaration(_))
    }
}

// ---------------------------------------------------------------------------
// Step-procedure tokens
// ---------------------------------------------------------------------------

/// One line of a step procedure (matched after trimming).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepLine {
    /// `STEP <n>[:] <description>`; `number` keeps the digits as written.
    Step { number: String, description: String },
    /// `WHILE <condition>:`
    LoopHeader,
    /// `Go to STEP <n>`
    Goto(String),
    /// `Yes: go to STEP <n>` (or `Then:` / `No:` / `Else:`).
    Branch { answer: Answer, target: String },
    Other,
}

impl StepLine {
    pub fn classify(line: &str) -> Self {
        let line = line.trim();

        if LOOP_RE.is_match(line) {
            return Self::LoopHeader;
        }

        if let Some(caps) = STEP_RE.captures(line) {
            return Self::Step {
                number: caps[1].to_string(),
                description: caps[2].trim().to_string(),
            };
        }

        if let Some(caps) = STEP_BRANCH_RE.captures(line) {
            let answer = match caps[1].to_lowercase().as_str() {
                "yes" | "then" => Answer::Yes,
                _ => Answer::No,
            };
            return Self::Branch {
                answer,
                target: caps[2].to_string(),
            };
        }

        if let Some(number) = first_capture(&GOTO_RE, line) {
            return Self::Goto(number);
        }

        Self::Other
    }
}

/// Step number named by a `go to step <n>` phrase inside a description.
pub fn inline_goto(description: &str) -> Option<String> {
    first_capture(&INLINE_GOTO_RE, description)
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
