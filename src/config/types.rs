/// Core types shared by the runner: languages, requests, results, errors.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Languages accepted by the execution service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Cpp,
    JavaScript,
    Python,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Java,
        Language::Cpp,
        Language::JavaScript,
        Language::Python,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "cpp" | "c++" | "cxx" | "cc" => Ok(Language::Cpp),
            "js" | "javascript" | "node" => Ok(Language::JavaScript),
            "python" | "py" | "python3" => Ok(Language::Python),
            other => Err(RunnerError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// A single submission. Immutable once accepted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub language: Language,
    pub source: String,
    /// Bytes fed to the program's stdin; `None` attaches `/dev/null`.
    #[serde(default)]
    pub stdin: Option<String>,
}

impl ExecutionRequest {
    pub fn new(language: Language, source: impl Into<String>) -> Self {
        Self {
            language,
            source: source.into(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }
}

/// Phase an execution failed at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    #[default]
    None,
    Compile,
    Run,
    Timeout,
    Internal,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::None => "none",
            FailureStage::Compile => "compile",
            FailureStage::Run => "run",
            FailureStage::Timeout => "timeout",
            FailureStage::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Per-request lifecycle. The last five variants are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Pending,
    Compiling,
    Running,
    Succeeded,
    CompileFailed,
    RunFailed,
    TimedOut,
    InternalError,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            ExecutionState::Pending | ExecutionState::Compiling | ExecutionState::Running
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: ExecutionState) -> bool {
        use ExecutionState::*;
        match (self, next) {
            (Pending, Compiling) | (Pending, Running) | (Pending, InternalError) => true,
            (Compiling, Running)
            | (Compiling, CompileFailed)
            | (Compiling, TimedOut)
            | (Compiling, InternalError) => true,
            (Running, Succeeded)
            | (Running, RunFailed)
            | (Running, TimedOut)
            | (Running, InternalError) => true,
            _ => false,
        }
    }
}

/// Final outcome of one submission. Built once by the coordinator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Workspace run id, doubles as the correlation id in audit events.
    pub run_id: String,
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub failure_stage: FailureStage,
    /// Runner-side description of the failure, if any.
    pub message: Option<String>,
    pub entry_symbol: Option<String>,
    pub wall_time_ms: u64,
    pub output_truncated: bool,
}

impl ExecutionResult {
    pub fn state(&self) -> ExecutionState {
        match self.failure_stage {
            FailureStage::None if self.succeeded => ExecutionState::Succeeded,
            FailureStage::None => ExecutionState::InternalError,
            FailureStage::Compile => ExecutionState::CompileFailed,
            FailureStage::Run => ExecutionState::RunFailed,
            FailureStage::Timeout => ExecutionState::TimedOut,
            FailureStage::Internal => ExecutionState::InternalError,
        }
    }

    /// Text shown to clients of the `{success, output}` routes.
    ///
    /// Stdout on success. On failure the captured stderr, falling back to the
    /// runner message when stderr is blank. Timeouts always report the runner
    /// message so the client can tell a kill from a crash.
    pub fn display_output(&self) -> String {
        if self.succeeded {
            return self.stdout.clone();
        }
        let message = self.message.clone().unwrap_or_default();
        match self.failure_stage {
            FailureStage::Timeout | FailureStage::Internal => message,
            _ if !self.stderr.trim().is_empty() => self.stderr.clone(),
            _ => message,
        }
    }

    pub fn compat_view(&self) -> CompatResponse {
        CompatResponse {
            success: self.succeeded,
            output: self.display_output(),
        }
    }
}

/// Response shape of the per-language routes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatResponse {
    pub success: bool,
    pub output: String,
}

/// Errors raised by the runner
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workspace allocation failed: {0}")]
    Resource(String),

    #[error("Compilation failed: {0}")]
    Compile(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Execution timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

impl RunnerError {
    /// Stage an execution is reported at when this error ends it.
    pub fn failure_stage(&self) -> FailureStage {
        match self {
            RunnerError::Compile(_) => FailureStage::Compile,
            RunnerError::Runtime(_) => FailureStage::Run,
            RunnerError::Timeout(_) => FailureStage::Timeout,
            _ => FailureStage::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
