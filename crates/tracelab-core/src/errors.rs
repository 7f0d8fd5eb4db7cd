//! Error types for the execution engine.
//!
//! The taxonomy separates caller mistakes (rejected before any side effect),
//! toolchain failures (surfaced verbatim because the diagnostic is actionable
//! for the learner), and internal faults. Instrumentation and parse failures
//! are deliberately absent here: they are recovered locally with graceful
//! degradation and never escape the dispatcher as hard errors.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The submission was empty. Rejected before any file or process exists.
    #[error("no code provided")]
    InvalidInput,

    /// The language identifier is not a recognized member of the supported
    /// set. Rejected before any file or process exists.
    #[error("language '{0}' is not supported")]
    UnsupportedLanguage(String),

    /// The compiler exited nonzero. Carries the raw diagnostic verbatim.
    #[error("compilation failed:\n{0}")]
    Compile(String),

    /// The program exited nonzero. Carries the raw diagnostic verbatim.
    #[error("execution failed:\n{0}")]
    Runtime(String),

    /// A subprocess outlived its deadline and was killed.
    #[error("execution timed out after {0:?}")]
    Timeout(Duration),

    /// Scratch workspace creation or artifact write failed.
    #[error("workspace error: {0}")]
    Workspace(String),

    /// Engine configuration is invalid or could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether this failure is something the learner can act on (their code
    /// or their program's behavior), as opposed to a caller or engine fault.
    pub fn is_learner_facing(&self) -> bool {
        matches!(
            self,
            EngineError::Compile(_) | EngineError::Runtime(_) | EngineError::Timeout(_)
        )
    }
}
