//! Annotated-code grammar.
//!
//! Nodes are declared with `# type: <kind>` markers. Consecutive declarations
//! are chained with sequential edges; decisions look a few lines ahead for
//! `# YES:` / `# NO:` targets; `# uses:` comments in a node's body record data
//! usage for the data-flow rewriter.

use tracing::{debug, instrument};

use flowgraph_shared::{Edge, EdgeKind, Node, NodeType, ParseOptions, RawFlow};

use crate::tokens::CodeLine;

/// A node as it was declared in the text.
#[derive(Debug, Clone)]
struct Declaration {
    id: String,
    node_type: NodeType,
    /// Index of the line the label came from; the body and branch window start after it.
    anchor: usize,
}

/// Parse annotated code into a raw flow.
///
/// Never fails: lines that match no rule are ordinary content and are skipped.
#[instrument(skip_all, fields(lines = text.lines().count()))]
pub fn parse_type_tags(text: &str, opts: &ParseOptions) -> RawFlow {
    let lines: Vec<CodeLine> = text.lines().map(CodeLine::classify).collect();
    let declarations = discover(&lines);

    let mut flow = RawFlow::default();
    for decl in &declarations {
        flow.declare(Node::new(&decl.id, decl.node_type.clone(), &decl.id));
    }

    record_data_uses(&lines, &declarations, &mut flow);
    link_chain(&lines, &declarations, opts.code_branch_lookahead, &mut flow);

    debug!(
        nodes = flow.nodes.len(),
        edges = flow.edges.len(),
        data_uses = flow.data_uses.len(),
        "annotated code parsed"
    );

    flow
}

// ---------------------------------------------------------------------------
// Pass 1: node discovery
// ---------------------------------------------------------------------------

fn discover(lines: &[CodeLine]) -> Vec<Declaration> {
    let mut declarations = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let CodeLine::TypeMarker {
            kind,
            declared,
            assigned,
        } = line
        else {
            continue;
        };

        let (id, anchor) = match (declared, assigned, lines.get(idx + 1)) {
            (Some(name), _, _) | (None, Some(name), _) => (name.clone(), idx),
            (None, None, Some(CodeLine::Declaration(name)))
            | (None, None, Some(CodeLine::Assignment(name))) => (name.clone(), idx + 1),
            _ => (format!("Step_{idx}"), idx),
        };

        declarations.push(Declaration {
            id,
            node_type: NodeType::from_name(kind),
            anchor,
        });
    }

    declarations
}

// ---------------------------------------------------------------------------
// Pass 2: data usage
// ---------------------------------------------------------------------------

/// Record `# uses:` names that refer to a data node declared earlier.
fn record_data_uses(lines: &[CodeLine], declarations: &[Declaration], flow: &mut RawFlow) {
    for (pos, decl) in declarations.iter().enumerate() {
        if decl.node_type == NodeType::Data {
            continue;
        }

        let body_start = decl.anchor + 1;
        let body_end = lines
            .iter()
            .enumerate()
            .skip(body_start)
            .find(|(_, line)| line.starts_node())
            .map_or(lines.len(), |(idx, _)| idx);

        for line in lines.get(body_start..body_end).unwrap_or_default() {
            let CodeLine::Uses(names) = line else {
                continue;
            };
            for name in names {
                if is_data_before(declarations, pos, name) {
                    flow.use_data(name, &decl.id);
                } else {
                    debug!(
                        node = %decl.id,
                        name,
                        "uses name is not an earlier data node, ignoring"
                    );
                }
            }
        }
    }
}

fn is_data_before(declarations: &[Declaration], pos: usize, name: &str) -> bool {
    declarations[..pos]
        .iter()
        .rev()
        .find(|d| d.id == name)
        .is_some_and(|d| d.node_type == NodeType::Data)
}

// ---------------------------------------------------------------------------
// Pass 3: control-flow chain
// ---------------------------------------------------------------------------

fn link_chain(
    lines: &[CodeLine],
    declarations: &[Declaration],
    lookahead: usize,
    flow: &mut RawFlow,
) {
    // Data nodes sit outside the main chain.
    let chain: Vec<&Declaration> = declarations
        .iter()
        .filter(|d| d.node_type != NodeType::Data)
        .collect();

    for (pos, decl) in chain.iter().enumerate() {
        let next = chain.get(pos + 1).map(|d| d.id.as_str());

        match decl.node_type {
            NodeType::End => {}
            NodeType::Decision => {
                let (yes, no) = find_branches(lines, decl.anchor, lookahead);
                if let Some(target) = &yes {
                    flow.push_edge(Edge::new(&decl.id, target, EdgeKind::DecisionYes));
                }
                if let Some(target) = &no {
                    flow.push_edge(Edge::new(&decl.id, target, EdgeKind::DecisionNo));
                }
                if yes.is_none() && no.is_none() {
                    if let Some(next) = next {
                        debug!(
                            decision = %decl.id,
                            next,
                            "no branch annotations, falling back to next node"
                        );
                        flow.push_edge(Edge::sequential(&decl.id, next));
                    }
                }
            }
            _ => {
                if let Some(next) = next {
                    flow.push_edge(Edge::sequential(&decl.id, next));
                }
            }
        }
    }
}

/// First `YES` and first `NO` target within `lookahead` lines after `anchor`,
/// stopping at the next type marker.
fn find_branches(
    lines: &[CodeLine],
    anchor: usize,
    lookahead: usize,
) -> (Option<String>, Option<String>) {
    let mut yes = None;
    let mut no = None;

    for line in lines.iter().skip(anchor + 1).take(lookahead) {
        match line {
            CodeLine::TypeMarker { .. } => break,
            CodeLine::Branches { yes: y, no: n } => {
                if yes.is_none() {
                    yes = y.clone();
                }
                if no.is_none() {
                    no = n.clone();
                }
            }
            _ => {}
        }
    }

    (yes, no)
}
