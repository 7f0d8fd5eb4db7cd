//! Engine configuration.
//!
//! Defaults match the toolchain names the engine has always invoked; every
//! field can be overridden from a YAML file or the environment. Deadlines are
//! mandatory: every subprocess invocation the dispatcher makes carries an
//! explicit kill-after-deadline, including compile steps.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::EngineError;

/// Deadlines and toolchain commands for one language strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Executable invoked to compile, where the language has a compile step.
    pub compiler: Option<String>,
    /// Executable invoked to run the (possibly compiled) program.
    pub runner: String,
    /// Deadline for the compile subprocess, in seconds.
    pub compile_timeout_secs: u64,
    /// Deadline for the run subprocess, in seconds.
    pub run_timeout_secs: u64,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: None,
            runner: String::new(),
            compile_timeout_secs: 15,
            run_timeout_secs: 10,
        }
    }
}

impl ToolchainConfig {
    fn interpreted(runner: &str) -> Self {
        Self {
            runner: runner.to_string(),
            ..Self::default()
        }
    }

    fn compiled(compiler: &str, runner: &str) -> Self {
        Self {
            compiler: Some(compiler.to_string()),
            runner: runner.to_string(),
            ..Self::default()
        }
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory under which per-request scratch workspaces are created.
    /// Defaults to the system temp directory.
    pub scratch_root: Option<PathBuf>,
    /// Wall-clock budget for the in-program trace recorder, in milliseconds.
    /// Once exceeded, record calls become no-ops so infinite loops produce a
    /// bounded trace instead of an unbounded one.
    pub trace_budget_ms: u64,
    pub python: ToolchainConfig,
    pub javascript: ToolchainConfig,
    pub java: ToolchainConfig,
    pub cpp: ToolchainConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scratch_root: None,
            trace_budget_ms: 2000,
            python: ToolchainConfig::interpreted("python3"),
            javascript: ToolchainConfig::interpreted("node"),
            java: ToolchainConfig::compiled("javac", "java"),
            cpp: ToolchainConfig::compiled("g++", ""),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut config: EngineConfig = serde_yaml::from_str(&text)
            .map_err(|e| EngineError::Config(format!("invalid configuration: {}", e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn load() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn with_trace_budget_ms(mut self, budget_ms: u64) -> Self {
        self.trace_budget_ms = budget_ms;
        self
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(root) = env::var("TRACELAB_SCRATCH_ROOT") {
            if !root.is_empty() {
                self.scratch_root = Some(PathBuf::from(root));
            }
        }
        if let Ok(budget) = env::var("TRACELAB_TRACE_BUDGET_MS") {
            if let Ok(ms) = budget.parse() {
                self.trace_budget_ms = ms;
            }
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, tc) in [
            ("python", &self.python),
            ("javascript", &self.javascript),
            ("java", &self.java),
            ("cpp", &self.cpp),
        ] {
            if tc.runner.is_empty() && tc.compiler.is_none() {
                return Err(EngineError::Config(format!(
                    "toolchain for {} has neither a compiler nor a runner",
                    name
                )));
            }
            if tc.run_timeout_secs == 0 || tc.compile_timeout_secs == 0 {
                return Err(EngineError::Config(format!(
                    "toolchain for {} has a zero deadline",
                    name
                )));
            }
        }
        if self.trace_budget_ms == 0 {
            return Err(EngineError::Config("trace budget must be nonzero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trace_budget_ms, 2000);
        assert_eq!(config.javascript.runner, "node");
        assert_eq!(config.java.compiler.as_deref(), Some("javac"));
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let yaml = r#"
trace_budget_ms: 500
javascript:
  runner: nodejs
  run_timeout_secs: 3
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.trace_budget_ms, 500);
        assert_eq!(config.javascript.runner, "nodejs");
        assert_eq!(config.javascript.run_timeout_secs, 3);
        // Untouched sections keep their defaults.
        assert_eq!(config.python.runner, "python3");
    }

    #[test]
    fn zero_deadline_is_rejected() {
        let mut config = EngineConfig::default();
        config.cpp.run_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }
}
