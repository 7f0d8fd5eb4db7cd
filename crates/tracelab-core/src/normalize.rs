//! Normalizes raw tracer output into the canonical outcome.
//!
//! Each strategy's payload lives somewhere different: the Python companion
//! tracer prints the step array as its last stdout line, the JavaScript
//! tracer owns the whole stdout, and the generated Java program prints one
//! `{ "trace": [...], "output": "" }` line after anything the submission
//! printed directly. Deserialization is intentionally forgiving: unknown
//! fields are ignored, absent fields default, and a payload that does not
//! parse at all degrades to `PlainOutput` of the raw stdout instead of
//! failing the request.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::trace::{ExecutionOutcome, Frame, TraceStep};

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    line: u32,
    #[serde(default)]
    variables: BTreeMap<String, Value>,
    #[serde(default)]
    stdout: String,
    /// Present in the Java payload, absent for Python and JavaScript.
    #[serde(default)]
    stack: Option<Vec<RawFrame>>,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default = "frame_name")]
    name: String,
    #[serde(default)]
    variables: BTreeMap<String, Value>,
}

fn frame_name() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize)]
struct JavaPayload {
    trace: Vec<RawStep>,
    #[serde(default)]
    #[allow(dead_code)]
    output: String,
}

/// Strings are shown without JSON quoting; everything else keeps its
/// serialized form, so `[1,2,3]` and `{"a":1}` read naturally.
fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn convert(raw: RawStep) -> TraceStep {
    let stack = match raw.stack {
        Some(frames) => frames
            .into_iter()
            .map(|frame| Frame {
                name: frame.name,
                variables: frame
                    .variables
                    .iter()
                    .map(|(name, value)| (name.clone(), render(value)))
                    .collect(),
            })
            .collect(),
        None => vec![Frame::main(
            raw.variables
                .iter()
                .map(|(name, value)| (name.clone(), render(value)))
                .collect(),
        )],
    };
    TraceStep {
        line: raw.line,
        stack,
        stdout_delta: raw.stdout,
    }
}

fn steps_from_json(payload: &str) -> Option<Vec<TraceStep>> {
    let raw: Vec<RawStep> = serde_json::from_str(payload).ok()?;
    Some(raw.into_iter().map(convert).collect())
}

/// Python: the companion tracer prints the step array as the last nonempty
/// stdout line; everything before it is debug noise from the interpreter.
pub fn from_python(stdout: &str) -> ExecutionOutcome {
    let payload = stdout.lines().rev().find(|line| !line.trim().is_empty());
    match payload.and_then(steps_from_json) {
        Some(steps) => ExecutionOutcome::trace(steps),
        None => {
            log::debug!("python payload did not parse, returning raw output");
            ExecutionOutcome::output(stdout)
        }
    }
}

/// JavaScript: the instrumented program owns its whole stdout, which is
/// exactly one JSON array.
pub fn from_javascript(stdout: &str) -> ExecutionOutcome {
    match steps_from_json(stdout.trim()) {
        Some(steps) => ExecutionOutcome::trace(steps),
        None => {
            log::debug!("javascript payload did not parse, returning raw output");
            ExecutionOutcome::output(stdout)
        }
    }
}

/// Java: the generated program prints one payload line; the submission's own
/// `System.out` writes land before it, so scan from the end.
pub fn from_java(stdout: &str) -> ExecutionOutcome {
    let payload = stdout
        .lines()
        .rev()
        .find_map(|line| serde_json::from_str::<JavaPayload>(line).ok());
    match payload {
        Some(payload) => {
            ExecutionOutcome::trace(payload.trace.into_iter().map(convert).collect())
        }
        None => {
            log::debug!("java payload did not parse, returning raw output");
            ExecutionOutcome::output(stdout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_payload_is_the_last_nonempty_line() {
        let stdout = "interpreter noise\n[{\"line\":1,\"variables\":{\"x\":5},\"stdout\":\"\"}]\n";
        let outcome = from_python(stdout);
        match outcome {
            ExecutionOutcome::Trace { trace } => {
                assert_eq!(trace.len(), 1);
                assert_eq!(trace[0].line, 1);
                assert_eq!(trace[0].stack[0].name, "main");
                assert_eq!(trace[0].stack[0].variables["x"], "5");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn malformed_python_payload_degrades_to_plain_output() {
        let stdout = "Traceback (most recent call last):\n  boom\n";
        assert_eq!(from_python(stdout), ExecutionOutcome::output(stdout));
        assert_eq!(from_python(""), ExecutionOutcome::output(""));
    }

    #[test]
    fn string_variables_lose_quoting_but_composites_keep_shape() {
        let stdout = r#"[{"line":2,"variables":{"s":"hi","xs":[1,2]},"stdout":""}]"#;
        let outcome = from_javascript(stdout);
        match outcome {
            ExecutionOutcome::Trace { trace } => {
                assert_eq!(trace[0].stack[0].variables["s"], "hi");
                assert_eq!(trace[0].stack[0].variables["xs"], "[1,2]");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn java_payload_line_is_found_behind_direct_prints() {
        let stdout = concat!(
            "hello from the program\n",
            r#"{ "trace": [ { "line": 1, "stack": [ { "name": "main", "variables": {"x": "5"} } ] } ], "output": "" }"#,
            "\n"
        );
        let outcome = from_java(stdout);
        match outcome {
            ExecutionOutcome::Trace { trace } => {
                assert_eq!(trace[0].line, 1);
                assert_eq!(trace[0].stack[0].variables["x"], "5");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn completion_steps_and_stdout_deltas_survive() {
        let stdout = r#"[{"line":1,"variables":{},"stdout":"a\n"},{"line":0,"variables":{},"stdout":"b\n"}]"#;
        match from_javascript(stdout) {
            ExecutionOutcome::Trace { trace } => {
                assert_eq!(trace[0].stdout_delta, "a\n");
                assert_eq!(trace[1].line, 0);
                assert_eq!(trace[1].stdout_delta, "b\n");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let stdout = r#"[{"line":1,"variables":{},"stdout":"","event":"step"}]"#;
        assert!(from_javascript(stdout).is_trace());
    }
}
