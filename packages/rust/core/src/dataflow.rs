//! Data-flow rewriting.
//!
//! A data node never points straight at the step that reads it. For every
//! `(data, target)` use, the main-chain edge into the target is split around a
//! synthetic access node:
//!
//! ```text
//! prior -> target          prior -> access_<data>_for_<target> -> target
//! data  -> target   ==>    data  -> access_<data>_for_<target>
//! ```
//!
//! Uses with no main-chain edge into the target are dropped.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use flowgraph_shared::{Edge, EdgeKind, Graph, Node, NodeType, RawFlow};

/// Rewrite a parsed flow into the canonical graph.
#[instrument(skip_all, fields(nodes = flow.nodes.len(), edges = flow.edges.len()))]
pub fn rewrite(flow: RawFlow) -> Graph {
    let types = flow.type_map();
    let candidates = candidates(&flow, &types);

    let RawFlow { nodes, mut edges, .. } = flow;

    let mut graph = Graph::new();
    for node in nodes {
        graph.upsert_node(node);
    }

    let mut rerouted = 0usize;
    let mut dropped = 0usize;

    for (data, target) in &candidates {
        edges.retain(|e| !(e.source == *data && e.destination == *target));

        let prior = edges.iter().position(|e| {
            e.destination == *target && e.source != *data && !is_data(&types, &e.source)
        });
        let Some(prior) = prior else {
            debug!(%data, %target, "no main-chain edge into target, dropping data use");
            dropped += 1;
            continue;
        };

        let access = access_id(data, target);
        graph.upsert_node(Node::new(&access, NodeType::Process, format!("Access {data}")));

        let superseded = edges.remove(prior);
        let replacement = [
            Edge::new(&superseded.source, &access, EdgeKind::Access)
                .with_label(superseded.display_label),
            Edge::new(data, &access, EdgeKind::DataAccess),
            Edge::new(&access, target, EdgeKind::AccessToTarget),
        ];
        edges.splice(prior..prior, replacement);
        rerouted += 1;
    }

    for edge in edges {
        graph.push_edge(edge);
    }

    debug!(
        rerouted,
        dropped,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "data flow rewritten"
    );

    graph
}

/// `(data, target)` pairs to reroute, in discovery order without repeats:
/// recorded uses first, then any edge leaving a data node for a non-data node.
fn candidates(flow: &RawFlow, types: &BTreeMap<String, NodeType>) -> Vec<(String, String)> {
    let recorded = flow
        .data_uses
        .iter()
        .map(|u| (u.data.clone(), u.target.clone()));
    let direct = flow
        .edges
        .iter()
        .filter(|e| is_data(types, &e.source) && !is_data(types, &e.destination))
        .map(|e| (e.source.clone(), e.destination.clone()));

    let mut pairs: Vec<(String, String)> = Vec::new();
    for pair in recorded.chain(direct) {
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs
}

fn is_data(types: &BTreeMap<String, NodeType>, id: &str) -> bool {
    types.get(id) == Some(&NodeType::Data)
}

/// Id of the synthetic node between `data` and `target`.
pub fn access_id(data: &str, target: &str) -> String {
    format!("access_{data}_for_{target}")
}
