//! Core engine for executing learner programs and capturing execution traces.
//!
//! This crate implements the polyglot execution-and-instrumentation engine
//! behind the step-through visualizer. A submitted program is rewritten by a
//! per-language instrumentation pass so that it records its own state while it
//! runs, executed as an ordinary OS subprocess, and the heterogeneous raw
//! output is normalized into one canonical trace format.
//!
//! # Architecture Overview
//!
//! - **Dispatcher**: selects an execution strategy per language, owns the
//!   per-request scratch workspace, and drives the compile/run subprocesses
//! - **Instrumentation passes**: an AST-based source rewriter for JavaScript
//!   and a line-based lexical rewriter for Java, both behind one trait
//! - **Companion tracer**: an embedded Python tracer shipped with the engine
//! - **Normalizer**: turns raw subprocess output into the canonical
//!   trace / plain-output / error shape, degrading gracefully
//! - **Rate limiter**: sliding-window request limiter with an injectable store

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod instrument;
pub mod language;
pub mod limiter;
pub mod normalize;
pub mod runner;
pub mod trace;
pub mod workspace;

pub use config::EngineConfig;
pub use dispatcher::Dispatcher;
pub use errors::EngineError;
pub use language::Language;
pub use limiter::{InMemoryRateStore, RateLimiter, RateStore};
pub use trace::{ExecutionOutcome, Frame, TraceStep};
