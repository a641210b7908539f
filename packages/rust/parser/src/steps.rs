//! Numbered step-procedure grammar.
//!
//! `STEP <n>: <description>` lines become `Step_<n>` nodes whose type is
//! inferred from the description. Successors come from, in order: an inline
//! `go to step <n>` phrase, a `Go to STEP <n>` line right after the step,
//! `Yes:` / `No:` branch lines for decisions, or the next step.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use flowgraph_shared::{Edge, EdgeKind, Node, NodeType, ParseOptions, RawFlow};

use crate::tokens::{self, Answer, StepLine};

/// Phrases that mark a description as a question even without a `?`.
const INTERROGATIVES: [&str; 4] = ["is this", "is customer", "is there", "are there"];

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Everything the step grammar recovers from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepProcedure {
    /// Step ids in discovery order. Duplicated step numbers appear twice.
    pub order: Vec<String>,
    pub edges: Vec<Edge>,
    /// Id → inferred type. A later duplicate wins.
    pub types: BTreeMap<String, NodeType>,
    /// Id → step description as written.
    pub descriptions: BTreeMap<String, String>,
}

impl StepProcedure {
    /// Convert into the parser-neutral flow, labelling each node with its description.
    pub fn into_flow(self) -> RawFlow {
        let mut flow = RawFlow::default();

        for id in &self.order {
            let node_type = self.types.get(id).cloned().unwrap_or(NodeType::Process);
            let label = match self.descriptions.get(id) {
                Some(desc) if !desc.is_empty() => desc.as_str(),
                _ => id.as_str(),
            };
            flow.declare(Node::new(id, node_type, label));
        }

        for edge in self.edges {
            flow.push_edge(edge);
        }

        flow
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// A discovered step and where it sits in the raw text.
#[derive(Debug)]
struct Step {
    id: String,
    line: usize,
    description: String,
    node_type: NodeType,
    /// Target of a `Go to STEP <n>` line directly below the step.
    redirect: Option<String>,
}

/// Parse a step procedure. Never fails; unmatched lines are skipped and
/// numbering is taken as written.
#[instrument(skip_all, fields(lines = text.lines().count()))]
pub fn parse_steps(text: &str, opts: &ParseOptions) -> StepProcedure {
    let lines: Vec<StepLine> = text.lines().map(StepLine::classify).collect();
    let steps = discover(&lines);

    let mut procedure = StepProcedure::default();
    for step in &steps {
        procedure.order.push(step.id.clone());
        procedure.types.insert(step.id.clone(), step.node_type.clone());
        procedure
            .descriptions
            .insert(step.id.clone(), step.description.clone());
    }

    for (pos, step) in steps.iter().enumerate() {
        let jump = tokens::inline_goto(&step.description)
            .map(|n| step_id(&n))
            .or_else(|| step.redirect.clone());

        if let Some(target) = jump {
            procedure.edges.push(Edge::sequential(&step.id, target));
            continue;
        }

        if step.node_type == NodeType::Decision {
            let (yes, no) = find_branches(&lines, step.line, opts.step_branch_lookahead);
            if yes.is_none() && no.is_none() {
                debug!(step = %step.id, "decision step has no branch lines");
            }
            if let Some(target) = yes {
                procedure
                    .edges
                    .push(Edge::new(&step.id, target, EdgeKind::DecisionYes));
            }
            if let Some(target) = no {
                procedure
                    .edges
                    .push(Edge::new(&step.id, target, EdgeKind::DecisionNo));
            }
            continue;
        }

        if let Some(next) = steps.get(pos + 1) {
            procedure.edges.push(Edge::sequential(&step.id, &next.id));
        }
    }

    debug!(
        steps = procedure.order.len(),
        edges = procedure.edges.len(),
        "step procedure parsed"
    );

    procedure
}

fn discover(lines: &[StepLine]) -> Vec<Step> {
    let mut steps = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        match line {
            StepLine::LoopHeader => debug!(line = idx, "loop header ignored"),
            StepLine::Step {
                number,
                description,
            } => {
                let redirect = match lines.get(idx + 1) {
                    Some(StepLine::Goto(target)) => Some(step_id(target)),
                    _ => None,
                };
                steps.push(Step {
                    id: step_id(number),
                    line: idx,
                    description: description.clone(),
                    node_type: infer_type(description),
                    redirect,
                });
            }
            _ => {}
        }
    }

    steps
}

/// First `Yes`/`Then` and first `No`/`Else` target within `lookahead` lines
/// after `line`, stopping at the next step.
fn find_branches(
    lines: &[StepLine],
    line: usize,
    lookahead: usize,
) -> (Option<String>, Option<String>) {
    let mut yes = None;
    let mut no = None;

    for candidate in lines.iter().skip(line + 1).take(lookahead) {
        match candidate {
            StepLine::Step { .. } => break,
            StepLine::Branch { answer, target } => {
                let slot = match answer {
                    Answer::Yes => &mut yes,
                    Answer::No => &mut no,
                };
                if slot.is_none() {
                    *slot = Some(step_id(target));
                }
            }
            _ => {}
        }
    }

    (yes, no)
}

fn step_id(number: &str) -> String {
    format!("Step_{number}")
}

/// Infer a node type from a step description. First matching rule wins.
pub fn infer_type(description: &str) -> NodeType {
    let desc = description.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| desc.contains(w));

    if has_any(&["begin", "start"]) {
        NodeType::Start
    } else if has_any(&["end", "finish", "successfully"]) {
        NodeType::End
    } else if desc.trim_end().ends_with('?') || has_any(&INTERROGATIVES) {
        NodeType::Decision
    } else if has_any(&["database", "store"]) {
        NodeType::Data
    } else if has_any(&["collect", "input", "enter"]) {
        NodeType::Io
    } else {
        // retrieve / create / determine / escalate, and everything else
        NodeType::Process
    }
}
