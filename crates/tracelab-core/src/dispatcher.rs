//! Request execution: one entry point that picks a language strategy, runs
//! it inside a scratch workspace, and folds failures into the wire contract.
//!
//! Caller mistakes (empty code) are rejected before any file or process
//! exists. Learner-facing failures (compile errors, runtime errors,
//! timeouts) are folded into an `{"error": ...}` outcome so the HTTP layer
//! returns them as payload, not as transport failures. Everything else
//! (workspace faults, bad configuration) stays a hard error.
//!
//! Strategies with an in-program tracer (Python, JavaScript, Java) report
//! learner errors in-band and own their stdout, so only the exit code
//! decides failure there. The plain C++ strategy has no tracer: nonzero exit
//! or any stderr output is a runtime error carrying the diagnostic verbatim.

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::instrument::java::JavaLinePass;
use crate::instrument::javascript::JsAstPass;
use crate::instrument::{python, InstrumentationPass, InstrumentedProgram};
use crate::language::Language;
use crate::normalize;
use crate::runner::{run_with_deadline, CommandSpec};
use crate::trace::ExecutionOutcome;
use crate::workspace::ScratchWorkspace;

pub struct Dispatcher {
    config: EngineConfig,
}

impl Dispatcher {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one submission and produce the canonical outcome.
    pub async fn execute(
        &self,
        language: Language,
        code: &str,
    ) -> Result<ExecutionOutcome, EngineError> {
        if code.trim().is_empty() {
            return Err(EngineError::InvalidInput);
        }

        let result = match language {
            Language::Python => self.run_python(code).await,
            Language::JavaScript => self.run_javascript(code).await,
            Language::Java => self.run_java(code).await,
            Language::Cpp => self.run_cpp(code).await,
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_learner_facing() => {
                log::info!("{} execution failed: {}", language, err);
                Ok(ExecutionOutcome::error(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    fn workspace(&self) -> Result<ScratchWorkspace, EngineError> {
        ScratchWorkspace::create(self.config.scratch_root.as_deref())
    }

    async fn run_python(&self, code: &str) -> Result<ExecutionOutcome, EngineError> {
        let ws = self.workspace()?;
        let tracer = ws.write_file(python::TRACER_FILE, python::TRACER_SOURCE)?;
        let program = ws.write_file(python::PROGRAM_FILE, code)?;

        let spec = CommandSpec::new(&self.config.python.runner)
            .arg(tracer.display().to_string())
            .arg(program.display().to_string())
            .current_dir(ws.path());
        let run = run_with_deadline(&spec, self.config.python.run_timeout()).await?;
        if !run.is_success() {
            // The tracer catches user exceptions itself; a nonzero exit
            // means the tracer process itself fell over.
            return Err(EngineError::Runtime(run.diagnostic()));
        }
        Ok(normalize::from_python(&run.stdout))
    }

    async fn run_javascript(&self, code: &str) -> Result<ExecutionOutcome, EngineError> {
        let pass = JsAstPass::new(self.config.trace_budget_ms);
        let program = match pass.instrument(code) {
            Ok(program) => program,
            Err(err) => {
                // Outside the supported subset: an empty trace, not a
                // failure, so the caller still renders something.
                log::info!("javascript instrumentation degraded: {}", err);
                return Ok(ExecutionOutcome::trace(Vec::new()));
            }
        };

        let ws = self.workspace()?;
        let path = ws.write_file(&program.file_name, &program.source)?;

        let spec = CommandSpec::new(&self.config.javascript.runner)
            .arg(path.display().to_string())
            .current_dir(ws.path());
        let run = run_with_deadline(&spec, self.config.javascript.run_timeout()).await?;
        if !run.is_success() {
            return Err(EngineError::Runtime(run.diagnostic()));
        }
        Ok(normalize::from_javascript(&run.stdout))
    }

    async fn run_java(&self, code: &str) -> Result<ExecutionOutcome, EngineError> {
        let ws = self.workspace()?;
        let pass = JavaLinePass::new(ws.request_id());
        let InstrumentedProgram { source, file_name } = match pass.instrument(code) {
            Ok(program) => program,
            Err(err) => {
                log::info!("java instrumentation degraded: {}", err);
                return Ok(ExecutionOutcome::trace(Vec::new()));
            }
        };
        let source_path = ws.write_file(&file_name, &source)?;

        let compiler = self
            .config
            .java
            .compiler
            .as_deref()
            .ok_or_else(|| EngineError::Config("java toolchain has no compiler".into()))?;
        let compile = CommandSpec::new(compiler)
            .arg(source_path.display().to_string())
            .current_dir(ws.path());
        let compiled = run_with_deadline(&compile, self.config.java.compile_timeout()).await?;
        if !compiled.is_success() {
            return Err(EngineError::Compile(compiled.diagnostic()));
        }

        let run_spec = CommandSpec::new(&self.config.java.runner)
            .arg("-cp")
            .arg(ws.path().display().to_string())
            .arg(pass.class_name())
            .current_dir(ws.path());
        let run = run_with_deadline(&run_spec, self.config.java.run_timeout()).await?;
        if !run.is_success() {
            return Err(EngineError::Runtime(run.diagnostic()));
        }
        Ok(normalize::from_java(&run.stdout))
    }

    async fn run_cpp(&self, code: &str) -> Result<ExecutionOutcome, EngineError> {
        let ws = self.workspace()?;
        let source_path = ws.write_file("program.cpp", code)?;
        let binary_path = ws.file_path(&format!("program_{}", ws.request_id()));

        let compiler = self
            .config
            .cpp
            .compiler
            .as_deref()
            .ok_or_else(|| EngineError::Config("cpp toolchain has no compiler".into()))?;
        let compile = CommandSpec::new(compiler)
            .arg("-std=c++17")
            .arg(source_path.display().to_string())
            .arg("-o")
            .arg(binary_path.display().to_string())
            .current_dir(ws.path());
        let compiled = run_with_deadline(&compile, self.config.cpp.compile_timeout()).await?;
        if !compiled.is_success() {
            return Err(EngineError::Compile(compiled.diagnostic()));
        }

        let run_spec = CommandSpec::new(binary_path.display().to_string()).current_dir(ws.path());
        let run = run_with_deadline(&run_spec, self.config.cpp.run_timeout()).await?;
        if !run.is_success() || !run.stderr.trim().is_empty() {
            return Err(EngineError::Runtime(run.diagnostic()));
        }
        Ok(ExecutionOutcome::output(run.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher_with_root(root: &std::path::Path) -> Dispatcher {
        Dispatcher::new(EngineConfig::default().with_scratch_root(root))
    }

    #[tokio::test]
    async fn empty_code_is_rejected_before_any_side_effect() {
        let root = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher_with_root(root.path());
        for language in Language::all() {
            for code in ["", "   \n\t"] {
                let err = dispatcher.execute(*language, code).await.unwrap_err();
                assert!(
                    matches!(err, EngineError::InvalidInput),
                    "{}: {:?}",
                    language,
                    err
                );
            }
        }
        // No workspace was ever created.
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn javascript_outside_the_subset_degrades_to_an_empty_trace() {
        let root = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default().with_scratch_root(root.path());
        // Guard: if the dispatcher tried to run anything, spawning would
        // fail loudly instead of silently succeeding.
        config.javascript.runner = "definitely-not-a-real-binary".to_string();
        let dispatcher = Dispatcher::new(config);

        let outcome = dispatcher
            .execute(Language::JavaScript, "class Widget {}")
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::trace(Vec::new()));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_toolchain_is_an_engine_fault_not_a_learner_error() {
        let root = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default().with_scratch_root(root.path());
        config.python.runner = "definitely-not-a-real-binary".to_string();
        let dispatcher = Dispatcher::new(config);

        let err = dispatcher.execute(Language::Python, "x = 1").await.unwrap_err();
        assert!(matches!(err, EngineError::Workspace(_)));
    }

    #[tokio::test]
    async fn runtime_failures_fold_into_an_error_outcome() {
        let root = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default().with_scratch_root(root.path());
        // `sleep` rejects the tracer/program file arguments and exits
        // nonzero, standing in for an interpreter crash.
        config.python.runner = "sleep".to_string();
        let dispatcher = Dispatcher::new(config);

        let outcome = dispatcher.execute(Language::Python, "x = 1").await.unwrap();
        match outcome {
            ExecutionOutcome::Error { error } => {
                assert!(error.starts_with("execution failed:"), "got: {}", error);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        // The scratch workspace is gone even though the run failed.
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn deadline_expiry_folds_into_a_timeout_error_outcome() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let script_dir = tempfile::tempdir().unwrap();
        let script = script_dir.path().join("hang.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let mut config = EngineConfig::default().with_scratch_root(root.path());
        config.python.runner = script.display().to_string();
        config.python.run_timeout_secs = 1;
        let dispatcher = Dispatcher::new(config);

        let outcome = dispatcher.execute(Language::Python, "x = 1").await.unwrap();
        match outcome {
            ExecutionOutcome::Error { error } => {
                assert!(error.contains("timed out"), "got: {}", error);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn misconfigured_compiled_toolchain_is_a_config_error() {
        let root = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default().with_scratch_root(root.path());
        config.cpp.compiler = None;
        let dispatcher = Dispatcher::new(config);

        let err = dispatcher
            .execute(Language::Cpp, "int main() { return 0; }")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
