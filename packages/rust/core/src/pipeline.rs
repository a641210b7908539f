//! End-to-end extraction: text → classify → parse → rewrite → graph.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use flowgraph_classifier::{Classification, ContentKind, classify};
use flowgraph_parser::{parse_steps, parse_type_tags};
use flowgraph_shared::{ExtractOptions, FlowGraphError, Graph, Result};

use crate::dataflow;
use crate::sample::FALLBACK_SAMPLE;

/// Result of running the pipeline on one document.
///
/// Unrecognized or too-short content is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Extraction {
    Graph { kind: ContentKind, graph: Graph },
    Unrecognized { classification: Classification },
    /// Trimmed input below `min_content_len`; never parsed.
    TooShort { length: usize, minimum: usize },
}

impl Extraction {
    pub fn graph(&self) -> Option<&Graph> {
        match self {
            Self::Graph { graph, .. } => Some(graph),
            Self::Unrecognized { .. } | Self::TooShort { .. } => None,
        }
    }

    /// The graph, or a parse error saying why there is none.
    pub fn into_graph(self) -> Result<Graph> {
        match self {
            Self::Graph { graph, .. } => Ok(graph),
            Self::Unrecognized { classification } => Err(FlowGraphError::parse(format!(
                "content matches neither grammar (code score {}, step score {})",
                classification.code_score, classification.step_score
            ))),
            Self::TooShort { length, minimum } => Err(FlowGraphError::parse(format!(
                "content too short to extract ({length} bytes after trimming, minimum {minimum})"
            ))),
        }
    }
}

/// Classify `text` and run the matching grammar. No fallback.
#[instrument(skip_all, fields(len = text.len()))]
pub fn extract(text: &str, opts: &ExtractOptions) -> Extraction {
    let classification = classify(text);

    let flow = match classification.kind {
        ContentKind::Code => parse_type_tags(text, &opts.parse),
        ContentKind::Procedure => parse_steps(text, &opts.parse).into_flow(),
        ContentKind::Unknown => {
            debug!("content not recognized, no parser invoked");
            return Extraction::Unrecognized { classification };
        }
    };

    let graph = dataflow::rewrite(flow);

    info!(
        kind = %classification.kind,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "graph extracted"
    );

    Extraction::Graph {
        kind: classification.kind,
        graph,
    }
}

/// Like [`extract`], but substitutes the bundled sample when the input is too
/// short or unrecognized and `use_fallback_sample` is on.
///
/// Input shorter than `min_content_len` (after trimming) counts as absent and
/// is never parsed.
#[instrument(skip_all, fields(len = text.len()))]
pub fn extract_or_fallback(text: &str, opts: &ExtractOptions) -> Extraction {
    let length = text.trim().len();
    if length < opts.min_content_len {
        warn!(
            length,
            min = opts.min_content_len,
            "input shorter than minimum content length"
        );
        if opts.use_fallback_sample {
            warn!("using fallback sample");
            return extract(FALLBACK_SAMPLE, opts);
        }
        return Extraction::TooShort {
            length,
            minimum: opts.min_content_len,
        };
    }

    match extract(text, opts) {
        Extraction::Unrecognized { classification } if opts.use_fallback_sample => {
            warn!(
                code_score = classification.code_score,
                step_score = classification.step_score,
                "content not recognized, using fallback sample"
            );
            extract(FALLBACK_SAMPLE, opts)
        }
        extraction => extraction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use flowgraph_shared::{EdgeKind, NodeType};

    fn no_fallback() -> ExtractOptions {
        ExtractOptions {
            use_fallback_sample: false,
            ..ExtractOptions::default()
        }
    }

    #[test]
    fn start_end_document() {
        let text = "# type: start\ndef begin(): pass\n# type: end\ndef finish(): pass\n";
        let extraction = extract(text, &ExtractOptions::default());

        let Extraction::Graph { kind, graph } = extraction else {
            panic!("expected a graph");
        };
        assert_eq!(kind, ContentKind::Code);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "begin");
        assert_eq!(graph.edges[0].destination, "finish");
        assert_eq!(graph.edges[0].kind, EdgeKind::Sequential);
    }

    #[test]
    fn decision_with_both_branches() {
        let text = "\
# type: start
def begin(): pass
# type: decision
def eligible(): pass
# YES: approve
# NO: reject
# type: process
def approve(): pass
# type: end
def reject(): pass
";
        let graph = extract(text, &ExtractOptions::default())
            .into_graph()
            .expect("graph");

        let from_decision: Vec<_> = graph.edges_from("eligible").collect();
        assert_eq!(from_decision.len(), 2);
        assert_eq!(from_decision[0].kind, EdgeKind::DecisionYes);
        assert_eq!(from_decision[0].destination, "approve");
        assert_eq!(from_decision[1].kind, EdgeKind::DecisionNo);
        assert_eq!(from_decision[1].destination, "reject");
    }

    #[test]
    fn procedure_document() {
        let text = "\
STEP 1: Begin process
STEP 2: Is age over 18?
Yes: go to STEP 4
No: go to STEP 3
STEP 3: Reject
STEP 4: Approve
";
        let Extraction::Graph { kind, graph } = extract(text, &ExtractOptions::default()) else {
            panic!("expected a graph");
        };

        assert_eq!(kind, ContentKind::Procedure);
        assert_eq!(graph.node("Step_1").map(|n| &n.node_type), Some(&NodeType::Start));
        assert_eq!(
            graph.node("Step_2").map(|n| n.display_label.as_str()),
            Some("Is age over 18?")
        );
        assert!(graph.edges.iter().any(|e| {
            e.source == "Step_1" && e.destination == "Step_2" && e.kind == EdgeKind::Sequential
        }));
    }

    #[test]
    fn data_use_is_rerouted() {
        let text = "\
# type: start
def begin(): pass
DB = connect()  # type: data
# type: process
def lookup(): pass
    # uses: DB
";
        let graph = extract(text, &ExtractOptions::default())
            .into_graph()
            .expect("graph");

        assert!(!graph.edges.iter().any(|e| e.source == "DB" && e.destination == "lookup"));
        let access = "access_DB_for_lookup";
        assert!(graph.edges.iter().any(|e| e.source == "begin" && e.destination == access));
        assert!(graph.edges.iter().any(|e| e.source == "DB" && e.destination == access));
        assert!(graph.edges.iter().any(|e| e.source == access && e.destination == "lookup"));
    }

    #[test]
    fn unrecognized_text_invokes_no_parser() {
        let extraction = extract("Thanks for reading our newsletter.", &ExtractOptions::default());
        assert!(matches!(extraction, Extraction::Unrecognized { .. }));
        assert!(extraction.graph().is_none());

        let err = extraction.into_graph().expect_err("no graph");
        assert!(matches!(err, FlowGraphError::Parse { .. }));
    }

    #[test]
    fn short_input_uses_fallback_sample() {
        let extraction = extract_or_fallback("STEP 1: Begin", &ExtractOptions::default());
        let graph = extraction.into_graph().expect("fallback graph");
        assert_eq!(graph.nodes.len(), 12);
        assert!(graph.contains("credit_score_ok"));
    }

    #[test]
    fn short_input_without_fallback_is_too_short() {
        let text = "STEP 1: Begin\nSTEP 2: Finish\n";
        assert_eq!(classify(text).kind, ContentKind::Procedure);

        let extraction = extract_or_fallback(text, &no_fallback());
        assert_eq!(
            extraction,
            Extraction::TooShort {
                length: text.trim().len(),
                minimum: 50,
            }
        );
        assert!(extraction.graph().is_none());

        let message = extraction.into_graph().expect_err("no graph").to_string();
        assert!(message.contains("too short"), "{message}");
        assert!(!message.contains("neither grammar"), "{message}");
    }

    #[test]
    fn too_short_serializes_with_status() {
        let value = serde_json::to_value(extract_or_fallback("STEP 1: Begin", &no_fallback()))
            .expect("serialize");
        assert_eq!(value["status"], "too_short");
        assert_eq!(value["length"], 13);
        assert_eq!(value["minimum"], 50);
    }

    #[test]
    fn unrecognized_input_uses_fallback_sample() {
        let prose = "This paragraph describes our quarterly planning offsite in some detail.";
        let fallback = extract_or_fallback(prose, &ExtractOptions::default());
        assert_eq!(fallback, extract(FALLBACK_SAMPLE, &ExtractOptions::default()));

        let plain = extract_or_fallback(prose, &no_fallback());
        assert!(matches!(plain, Extraction::Unrecognized { .. }));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a subscriber that keeps only WARN and above.
    fn warnings_during<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let value = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(captured.0.lock().expect("log buffer").clone())
            .expect("utf-8 logs");
        (value, logs)
    }

    #[test]
    fn fallback_substitution_is_a_warning() {
        let prose = "This paragraph describes our quarterly planning offsite in some detail.";
        let (extraction, logs) =
            warnings_during(|| extract_or_fallback(prose, &ExtractOptions::default()));

        assert!(extraction.graph().is_some());
        assert!(logs.contains("content not recognized, using fallback sample"), "{logs}");
    }

    #[test]
    fn recognized_input_is_not_replaced() {
        let text = std::fs::read_to_string("../../../fixtures/procedures/password-reset.txt")
            .expect("read fixture");
        let graph = extract_or_fallback(&text, &ExtractOptions::default())
            .into_graph()
            .expect("graph");
        assert_eq!(graph.nodes.len(), 6);
        assert!(graph.contains("Step_6"));
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = std::fs::read_to_string("../../../fixtures/annotated/order-fulfilment.py")
            .expect("read fixture");
        let opts = ExtractOptions::default();
        let a = extract(&text, &opts).into_graph().expect("graph");
        let b = extract(&text, &opts).into_graph().expect("graph");
        assert_eq!(a.to_json().expect("json"), b.to_json().expect("json"));
    }

    #[test]
    fn extraction_serializes_with_status() {
        let value = serde_json::to_value(extract("hello", &ExtractOptions::default()))
            .expect("serialize");
        assert_eq!(value["status"], "unrecognized");
        assert_eq!(value["classification"]["kind"], "unknown");
    }
}
