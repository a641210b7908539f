//! Canonical flowchart graph model.
//!
//! Both text grammars produce a [`RawFlow`]; the data-flow rewriter turns it
//! into a [`Graph`], which is what the renderer consumes and what gets
//! serialized as the canonical JSON output.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NodeType
// ---------------------------------------------------------------------------

/// The semantic role a flowchart box plays.
///
/// Unknown type names survive as [`NodeType::Other`] so foreign payloads pass
/// through verbatim and the renderer decides how to style them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Start,
    End,
    Process,
    Io,
    Decision,
    Predefined,
    Preprocessor,
    Data,
    OffPage,
    PageConnector,
    Comment,
    Other(String),
}

impl NodeType {
    /// Wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Process => "process",
            Self::Io => "io",
            Self::Decision => "decision",
            Self::Predefined => "predefined",
            Self::Preprocessor => "preprocessor",
            Self::Data => "data",
            Self::OffPage => "off_page",
            Self::PageConnector => "page_connector",
            Self::Comment => "comment",
            Self::Other(name) => name,
        }
    }

    /// Map a wire name to a type. Matching is exact; anything else is kept as `Other`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "start" => Self::Start,
            "end" => Self::End,
            "process" => Self::Process,
            "io" => Self::Io,
            "decision" => Self::Decision,
            "predefined" => Self::Predefined,
            "preprocessor" => Self::Preprocessor,
            "data" => Self::Data,
            "off_page" => Self::OffPage,
            "page_connector" => Self::PageConnector,
            "comment" => Self::Comment,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for NodeType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<NodeType> for String {
    fn from(node_type: NodeType) -> Self {
        node_type.as_str().to_string()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EdgeKind
// ---------------------------------------------------------------------------

/// How control (or data) moves along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Sequential,
    DecisionYes,
    DecisionNo,
    /// Main-chain edge rerouted into a synthetic access node.
    Access,
    /// Data store feeding its access node.
    DataAccess,
    /// Access node handing control to the node that used the data.
    AccessToTarget,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::DecisionYes => "decision_yes",
            Self::DecisionNo => "decision_no",
            Self::Access => "access",
            Self::DataAccess => "data_access",
            Self::AccessToTarget => "access_to_target",
        }
    }

    /// Label shown on the edge when none was given explicitly.
    fn default_label(&self) -> &'static str {
        match self {
            Self::DecisionYes => "Yes",
            Self::DecisionNo => "No",
            _ => "",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Node / Edge
// ---------------------------------------------------------------------------

/// A flowchart box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique within one graph.
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub display_label: String,
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        node_type: NodeType,
        display_label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            display_label: display_label.into(),
        }
    }
}

/// A directed connection between two node ids.
///
/// The destination may name a node that was never declared; such dangling
/// references are kept and the node is created lazily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub destination: String,
    pub kind: EdgeKind,
    #[serde(default)]
    pub display_label: String,
}

impl Edge {
    /// Create an edge carrying the default label for its kind ("Yes"/"No" for branches).
    pub fn new(source: impl Into<String>, destination: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            kind,
            display_label: kind.default_label().to_string(),
        }
    }

    pub fn sequential(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(source, destination, EdgeKind::Sequential)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.display_label = label.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// The canonical graph handed to the renderer.
///
/// Node order is discovery order. Edges are kept as a list; duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Declare a node. Re-declaring an existing id overwrites its type and label in place.
    pub fn upsert_node(&mut self, node: Node) {
        upsert(&mut self.nodes, node);
    }

    /// Make sure `id` exists, creating a plain process node labelled with the id if not.
    pub fn ensure_node(&mut self, id: &str) {
        if !self.contains(id) {
            self.nodes.push(Node::new(id, NodeType::Process, id));
        }
    }

    /// Append an edge, lazily creating any endpoint that was never declared.
    pub fn push_edge(&mut self, edge: Edge) {
        self.ensure_node(&edge.source);
        self.ensure_node(&edge.destination);
        self.edges.push(edge);
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    pub fn edges_into<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.destination == id)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn upsert(nodes: &mut Vec<Node>, node: Node) {
    match nodes.iter_mut().find(|n| n.id == node.id) {
        Some(existing) => {
            existing.node_type = node.node_type;
            existing.display_label = node.display_label;
        }
        None => nodes.push(node),
    }
}

// ---------------------------------------------------------------------------
// RawFlow
// ---------------------------------------------------------------------------

/// A recorded "data node `data` is used by `target`" relation, awaiting rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataUse {
    pub data: String,
    pub target: String,
}

/// Parser output before the data-flow rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFlow {
    /// Declared nodes in discovery order.
    pub nodes: Vec<Node>,
    /// Control-flow edges in emission order.
    pub edges: Vec<Edge>,
    /// Data usages; never emitted as edges directly.
    pub data_uses: Vec<DataUse>,
}

impl RawFlow {
    /// Declare a node; same overwrite semantics as [`Graph::upsert_node`].
    pub fn declare(&mut self, node: Node) {
        upsert(&mut self.nodes, node);
    }

    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn use_data(&mut self, data: impl Into<String>, target: impl Into<String>) {
        self.data_uses.push(DataUse {
            data: data.into(),
            target: target.into(),
        });
    }

    pub fn node_type(&self, id: &str) -> Option<&NodeType> {
        self.nodes.iter().find(|n| n.id == id).map(|n| &n.node_type)
    }

    /// Id → type map of every declared node.
    pub fn type_map(&self) -> BTreeMap<String, NodeType> {
        self.nodes
            .iter()
            .map(|n| (n.id.clone(), n.node_type.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_names_roundtrip() {
        for name in [
            "start",
            "end",
            "process",
            "io",
            "decision",
            "predefined",
            "preprocessor",
            "data",
            "off_page",
            "page_connector",
            "comment",
        ] {
            let t = NodeType::from_name(name);
            assert!(!matches!(t, NodeType::Other(_)), "{name} should be known");
            assert_eq!(t.as_str(), name);
        }
    }

    #[test]
    fn unknown_node_type_passes_through_verbatim() {
        let t = NodeType::from_name("Swimlane");
        assert_eq!(t, NodeType::Other("Swimlane".into()));
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#""Swimlane""#);
    }

    #[test]
    fn node_serializes_with_type_key() {
        let node = Node::new("check", NodeType::Decision, "Check credit");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], "check");
        assert_eq!(json["type"], "decision");
        assert_eq!(json["display_label"], "Check credit");
    }

    #[test]
    fn edge_kinds_serialize_snake_case() {
        let edge = Edge::new("a", "b", EdgeKind::AccessToTarget);
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["kind"], "access_to_target");
        assert_eq!(json["display_label"], "");
    }

    #[test]
    fn decision_edges_get_default_labels() {
        assert_eq!(Edge::new("d", "y", EdgeKind::DecisionYes).display_label, "Yes");
        assert_eq!(Edge::new("d", "n", EdgeKind::DecisionNo).display_label, "No");
        assert_eq!(Edge::sequential("a", "b").display_label, "");
    }

    #[test]
    fn upsert_overwrites_instead_of_duplicating() {
        let mut graph = Graph::new();
        graph.upsert_node(Node::new("a", NodeType::Process, "a"));
        graph.upsert_node(Node::new("b", NodeType::Process, "b"));
        graph.upsert_node(Node::new("a", NodeType::End, "Finish"));

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].id, "a");
        assert_eq!(graph.nodes[0].node_type, NodeType::End);
        assert_eq!(graph.nodes[0].display_label, "Finish");
    }

    #[test]
    fn push_edge_creates_dangling_nodes_lazily() {
        let mut graph = Graph::new();
        graph.upsert_node(Node::new("a", NodeType::Start, "a"));
        graph.push_edge(Edge::sequential("a", "ghost"));

        let ghost = graph.node("ghost").expect("lazily created");
        assert_eq!(ghost.node_type, NodeType::Process);
        assert_eq!(ghost.display_label, "ghost");
        assert_eq!(graph.edges_into("ghost").count(), 1);
    }

    #[test]
    fn duplicate_edges_are_kept() {
        let mut graph = Graph::new();
        graph.push_edge(Edge::sequential("a", "b"));
        graph.push_edge(Edge::sequential("a", "b"));
        assert_eq!(graph.edges_from("a").count(), 2);
    }

    #[test]
    fn raw_flow_type_map() {
        let mut flow = RawFlow::default();
        flow.declare(Node::new("db", NodeType::Data, "db"));
        flow.declare(Node::new("load", NodeType::Process, "load"));
        flow.use_data("db", "load");

        let types = flow.type_map();
        assert_eq!(types.get("db"), Some(&NodeType::Data));
        assert_eq!(flow.node_type("load"), Some(&NodeType::Process));
        assert_eq!(flow.data_uses.len(), 1);
    }

    #[test]
    fn graph_json_shape() {
        let mut graph = Graph::new();
        graph.upsert_node(Node::new("a", NodeType::Start, "Begin"));
        graph.upsert_node(Node::new("b", NodeType::End, "Done"));
        graph.push_edge(Edge::sequential("a", "b"));

        let value: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
        assert_eq!(value["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(value["edges"][0]["source"], "a");
        assert_eq!(value["edges"][0]["destination"], "b");
        assert_eq!(value["edges"][0]["kind"], "sequential");
    }
}
