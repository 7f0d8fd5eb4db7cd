//! Canonical trace model shared by every execution strategy.
//!
//! Whatever a language strategy captures, the caller always sees one of three
//! shapes: an ordered trace of steps, plain captured output, or an error
//! message. Steps are ordered by insertion and never reordered; each step
//! carries exactly one synthetic frame in the current design (the engine does
//! not model a real call stack).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One synthetic stack level's variable bindings at a trace step.
///
/// Variables are stored as stringified values in a sorted map so the
/// serialized form is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub variables: BTreeMap<String, String>,
}

impl Frame {
    /// The synthetic frame every strategy produces today.
    pub fn main(variables: BTreeMap<String, String>) -> Self {
        Self {
            name: "main".to_string(),
            variables,
        }
    }
}

/// One captured program state.
///
/// `line` is 1-based; line 0 marks a synthetic completion step carrying
/// trailing output. `stdout_delta` is the text the program printed since the
/// previous step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub line: u32,
    pub stack: Vec<Frame>,
    #[serde(rename = "stdout", default, skip_serializing_if = "String::is_empty")]
    pub stdout_delta: String,
}

/// Result of one execution request, serialized exactly as the wire contract:
/// `{"trace": [...]}`, `{"output": "..."}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionOutcome {
    Trace { trace: Vec<TraceStep> },
    PlainOutput { output: String },
    Error { error: String },
}

impl ExecutionOutcome {
    pub fn trace(steps: Vec<TraceStep>) -> Self {
        ExecutionOutcome::Trace { trace: steps }
    }

    pub fn output(text: impl Into<String>) -> Self {
        ExecutionOutcome::PlainOutput {
            output: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ExecutionOutcome::Error {
            error: message.into(),
        }
    }

    pub fn is_trace(&self) -> bool {
        matches!(self, ExecutionOutcome::Trace { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(line: u32, vars: &[(&str, &str)]) -> TraceStep {
        let variables = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TraceStep {
            line,
            stack: vec![Frame::main(variables)],
            stdout_delta: String::new(),
        }
    }

    #[test]
    fn trace_serializes_under_the_trace_key() {
        let outcome = ExecutionOutcome::trace(vec![step(3, &[("x", "4"), ("i", "2")])]);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["trace"][0]["line"], 3);
        assert_eq!(json["trace"][0]["stack"][0]["name"], "main");
        assert_eq!(json["trace"][0]["stack"][0]["variables"]["x"], "4");
        // Empty stdout deltas are omitted from the wire format.
        assert!(json["trace"][0].get("stdout").is_none());
    }

    #[test]
    fn plain_output_and_error_shapes() {
        let out = serde_json::to_value(ExecutionOutcome::output("hi\n")).unwrap();
        assert_eq!(out, serde_json::json!({ "output": "hi\n" }));

        let err = serde_json::to_value(ExecutionOutcome::error("boom")).unwrap();
        assert_eq!(err, serde_json::json!({ "error": "boom" }));
    }

    #[test]
    fn untagged_roundtrip_picks_the_right_variant() {
        let parsed: ExecutionOutcome =
            serde_json::from_str(r#"{"output":"plain text"}"#).unwrap();
        assert_eq!(parsed, ExecutionOutcome::output("plain text"));

        let parsed: ExecutionOutcome = serde_json::from_str(r#"{"trace":[]}"#).unwrap();
        assert!(parsed.is_trace());
    }

    #[test]
    fn variables_serialize_in_sorted_order() {
        let s = step(1, &[("zeta", "1"), ("alpha", "2")]);
        let json = serde_json::to_string(&s).unwrap();
        let alpha = json.find("alpha").unwrap();
        let zeta = json.find("zeta").unwrap();
        assert!(alpha < zeta);
    }
}
