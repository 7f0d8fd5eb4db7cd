//! Source-to-source instrumentation passes.
//!
//! A pass rewrites a submitted program into an equivalent one that also
//! records `{line, variables}` snapshots while it runs. Two very different
//! implementations sit behind one interface: an AST-based rewriter for
//! JavaScript and a line-based lexical rewriter for Java. Keeping the seam
//! here means the lexical heuristics can later be replaced by a real parser
//! without touching the dispatcher.

use thiserror::Error;

pub mod java;
pub mod javascript;
pub mod python;

/// The output of a pass: generated source text plus the file name it must be
/// written under (some targets, like Java, constrain the name).
#[derive(Debug, Clone)]
pub struct InstrumentedProgram {
    pub source: String,
    pub file_name: String,
}

#[derive(Error, Debug)]
pub enum InstrumentError {
    /// The submission could not be parsed. The dispatcher degrades this to
    /// an empty trace rather than failing the request.
    #[error("syntax error: {0}")]
    Syntax(String),
}

pub trait InstrumentationPass: Send + Sync {
    fn instrument(&self, source: &str) -> Result<InstrumentedProgram, InstrumentError>;
}
