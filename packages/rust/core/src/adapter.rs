//! Foreign graph payloads.
//!
//! The LLM-based extraction path returns `{nodes: [{id, label, type}], edges:
//! [{from, to, label}]}`, usually wrapped in chatter or a Markdown code fence.
//! The adapter maps it onto the canonical model without any decision or data
//! rewriting; every edge becomes `sequential`. It also accepts the canonical
//! shape, so feeding a graph back through the adapter is a no-op.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, instrument};

use flowgraph_shared::{Edge, FlowGraphError, Graph, Node, NodeType, Result};

// ---------------------------------------------------------------------------
// Foreign shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignGraph {
    pub nodes: Vec<ForeignNode>,
    pub edges: Vec<ForeignEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignNode {
    /// A string, or a number that is kept as its decimal text.
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    #[serde(alias = "display_label")]
    pub label: String,
    /// Unknown names are kept verbatim.
    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: NodeType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignEdge {
    #[serde(alias = "source", deserialize_with = "scalar_string")]
    pub from: String,
    #[serde(alias = "destination", deserialize_with = "scalar_string")]
    pub to: String,
    #[serde(alias = "display_label", default, deserialize_with = "nullable_string")]
    pub label: String,
}

fn default_node_type() -> NodeType {
    NodeType::Process
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

fn scalar_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => text,
        Scalar::Number(number) => number.to_string(),
    })
}

fn nullable_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<ForeignGraph> for Graph {
    fn from(foreign: ForeignGraph) -> Self {
        let mut graph = Graph::new();
        for node in foreign.nodes {
            graph.upsert_node(Node::new(node.id, node.node_type, node.label));
        }
        // Node identities stay exactly as given; dangling ends are not filled in.
        graph.edges = foreign
            .edges
            .into_iter()
            .map(|edge| Edge::sequential(edge.from, edge.to).with_label(edge.label))
            .collect();
        graph
    }
}

impl From<&Graph> for ForeignGraph {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph
                .nodes
                .iter()
                .map(|n| ForeignNode {
                    id: n.id.clone(),
                    label: n.display_label.clone(),
                    node_type: n.node_type.clone(),
                })
                .collect(),
            edges: graph
                .edges
                .iter()
                .map(|e| ForeignEdge {
                    from: e.source.clone(),
                    to: e.destination.clone(),
                    label: e.display_label.clone(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse a foreign JSON payload into the canonical graph.
///
/// Malformed JSON or a missing `nodes`, `edges`, `id`, `label`, `from` or `to`
/// is a [`FlowGraphError::Payload`].
#[instrument(skip_all, fields(len = payload.len()))]
pub fn adapt(payload: &str) -> Result<Graph> {
    let foreign: ForeignGraph = serde_json::from_str(payload)
        .map_err(|e| FlowGraphError::payload(format!("invalid graph payload: {e}")))?;

    debug!(
        nodes = foreign.nodes.len(),
        edges = foreign.edges.len(),
        "foreign graph adapted"
    );

    Ok(Graph::from(foreign))
}

/// Adapt a free-text model response that contains a JSON payload somewhere in it.
pub fn adapt_response(response: &str) -> Result<Graph> {
    adapt(extract_payload(response)?)
}

/// Slice the outermost JSON object out of a model response.
///
/// Code fences and surrounding prose fall outside the first `{` and last `}`.
pub fn extract_payload(response: &str) -> Result<&str> {
    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&response[start..=end]),
        _ => Err(FlowGraphError::payload("no JSON object found in response")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use flowgraph_shared::EdgeKind;

    #[test]
    fn single_node_payload() {
        let graph = adapt(r#"{"nodes":[{"id":"a","label":"A","type":"start"}],"edges":[]}"#)
            .expect("adapt");

        assert_eq!(graph.nodes, vec![Node::new("a", NodeType::Start, "A")]);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn edges_are_sequential_and_keep_labels() {
        let payload = std::fs::read_to_string("../../../fixtures/foreign/payload.json")
            .expect("read fixture");
        let graph = adapt(&payload).expect("adapt");

        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.node("handle").map(|n| &n.node_type), Some(&NodeType::Process));
        assert!(graph.edges.iter().all(|e| e.kind == EdgeKind::Sequential));
        assert_eq!(graph.edges[1].display_label, "Yes");
        assert_eq!(graph.edges[3].display_label, "");
    }

    #[test]
    fn llm_response_with_fence_and_numeric_ids() {
        let response = std::fs::read_to_string("../../../fixtures/foreign/llm-response.md")
            .expect("read fixture");
        let graph = adapt_response(&response).expect("adapt");

        assert_eq!(graph.nodes.len(), 6);
        assert_eq!(graph.nodes[0].id, "1");
        assert_eq!(
            graph.node("5").map(|n| &n.node_type),
            Some(&NodeType::Other("swimlane".into()))
        );
        assert_eq!(graph.edges.len(), 6);
        assert_eq!(graph.edges[0].source, "1");
        assert_eq!(graph.edges[0].destination, "2");
        // Data edges are not rewritten on this path.
        assert!(graph.edges.iter().any(|e| e.source == "4" && e.destination == "5"));
    }

    #[test]
    fn adapter_is_idempotent() {
        let payload = std::fs::read_to_string("../../../fixtures/foreign/payload.json")
            .expect("read fixture");
        let first = adapt(&payload).expect("adapt");

        let foreign_json = serde_json::to_string(&ForeignGraph::from(&first)).expect("serialize");
        let second = adapt(&foreign_json).expect("re-adapt foreign shape");
        assert_eq!(first, second);

        let canonical_json = first.to_json().expect("serialize");
        let third = adapt(&canonical_json).expect("re-adapt canonical shape");
        assert_eq!(first, third);
    }

    #[test]
    fn dangling_edge_targets_are_kept_as_is() {
        let graph = adapt(r#"{"nodes":[{"id":"a","label":"A"}],"edges":[{"from":"a","to":"b"}]}"#)
            .expect("adapt");
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.edges[0].destination, "b");
    }

    #[test]
    fn null_edge_label_is_empty() {
        let graph = adapt(
            r#"{"nodes":[],"edges":[{"from":"a","to":"b","label":null}]}"#,
        )
        .expect("adapt");
        assert_eq!(graph.edges[0].display_label, "");
    }

    #[test]
    fn missing_required_fields_fail() {
        for payload in [
            r#"{"edges":[]}"#,
            r#"{"nodes":[]}"#,
            r#"{"nodes":[{"label":"no id"}],"edges":[]}"#,
            r#"{"nodes":[{"id":"a"}],"edges":[]}"#,
            r#"{"nodes":[],"edges":[{"to":"b"}]}"#,
            r#"{"nodes":[{"id":null,"label":"x"}],"edges":[]}"#,
            "not json",
        ] {
            let err = adapt(payload).expect_err(payload);
            assert!(matches!(err, FlowGraphError::Payload { .. }), "{payload}: {err}");
        }
    }

    #[test]
    fn extract_payload_slices_outer_object() {
        let text = r#"Sure!
```json
{"nodes": [], "edges": [{"from": "a", "to": "b"}]}
```
Done."#;
        let payload = extract_payload(text).expect("object");
        assert!(payload.starts_with('{'));
        assert!(payload.ends_with('}'));
        assert!(adapt(payload).is_ok());

        assert!(extract_payload("no json here").is_err());
        assert!(extract_payload("} backwards {").is_err());
    }
}
