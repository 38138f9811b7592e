// Startup validation of runner configuration.
// Errors are fatal; warnings are logged and the service starts anyway.

use crate::config::runner::RunnerConfig;
use crate::config::types::{RunnerError, Result};
use tokio::sync::Semaphore;

/// Validation result with detailed errors
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate config before any workspace or process is created.
pub fn validate_config(config: &RunnerConfig) -> Result<ValidationResult> {
    let mut result = ValidationResult::default();

    validate_timeouts(config, &mut result);
    validate_limits(config, &mut result);
    validate_toolchains(config, &mut result);

    if !config.workspace_root.is_absolute() {
        result.add_warning(format!(
            "workspace_root {} is relative; it is resolved against the service cwd at startup",
            config.workspace_root.display()
        ));
    }

    if !result.is_valid() {
        return Err(RunnerError::Config(format!(
            "Config validation failed:\n{}",
            result.errors.join("\n")
        )));
    }

    Ok(result)
}

fn validate_timeouts(config: &RunnerConfig, result: &mut ValidationResult) {
    if config.run_timeout_ms == 0 {
        result.add_error("run_timeout_ms cannot be zero".to_string());
    }
    if config.compile_timeout_ms == 0 {
        result.add_error("compile_timeout_ms cannot be zero".to_string());
    }
    if config.compile_timeout_ms < config.run_timeout_ms {
        result.add_warning(format!(
            "compile_timeout_ms ({}) is tighter than run_timeout_ms ({}); JVM and g++ builds may time out",
            config.compile_timeout_ms, config.run_timeout_ms
        ));
    }
}

fn validate_limits(config: &RunnerConfig, result: &mut ValidationResult) {
    if config.max_concurrent_executions == 0 {
        result.add_error("max_concurrent_executions cannot be zero".to_string());
    } else if config.max_concurrent_executions > Semaphore::MAX_PERMITS {
        result.add_error(format!(
            "max_concurrent_executions ({}) exceeds the limit of {}",
            config.max_concurrent_executions,
            Semaphore::MAX_PERMITS
        ));
    }
    if config.stdout_limit == 0 {
        result.add_error("stdout_limit cannot be zero".to_string());
    }
    if config.stderr_limit == 0 {
        result.add_error("stderr_limit cannot be zero".to_string());
    }
}

fn validate_toolchains(config: &RunnerConfig, result: &mut ValidationResult) {
    let toolchains = &config.toolchains;
    for (name, value) in [
        ("javac", &toolchains.javac),
        ("java", &toolchains.java),
        ("gxx", &toolchains.gxx),
        ("node", &toolchains.node),
        ("python", &toolchains.python),
    ] {
        if value.trim().is_empty() {
            result.add_error(format!("toolchains.{name} cannot be empty"));
        } else if value.chars().any(char::is_whitespace) {
            // Binaries are invoked from an argv, never through a shell.
            result.add_error(format!(
                "toolchains.{name} must be a single executable path, got '{value}'"
            ));
        }
    }
}
