use crate::config::types::{Language, RunnerError};
use crate::utils::output::OutputIntegrity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Plan step kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Compile,
    Run,
}

impl Stage {
    /// Error ending an execution at this stage.
    pub fn failure(self, detail: impl Into<String>) -> RunnerError {
        match self {
            Stage::Compile => RunnerError::Compile(detail.into()),
            Stage::Run => RunnerError::Runtime(detail.into()),
        }
    }
}

/// One subprocess to launch: program plus argument vector. Never goes
/// through a shell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub stage: Stage,
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(stage: Stage, program: impl Into<String>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Short label for logs, e.g. `javac`.
    pub fn program_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.program)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {:?}", arg)?;
        }
        Ok(())
    }
}

/// Ordered compile/run invocations for one request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandPlan {
    pub language: Language,
    /// File name, relative to the workspace, the source is written to
    pub source_file: String,
    pub entry_symbol: Option<String>,
    pub compile: Option<Invocation>,
    pub run: Invocation,
}

impl CommandPlan {
    pub fn steps(&self) -> impl Iterator<Item = &Invocation> {
        self.compile.iter().chain(std::iter::once(&self.run))
    }
}

/// Signal escalation report for timeout paths.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KillReport {
    pub term_sent: bool,
    pub kill_sent: bool,
    pub waited_ms: u64,
    pub notes: Vec<String>,
}

/// What one finished (or killed) subprocess produced.
#[derive(Clone, Debug)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub timed_out: bool,
    pub wall_time: Duration,
    pub integrity: OutputIntegrity,
    pub kill_report: Option<KillReport>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    pub fn describe_exit(&self) -> String {
        match (self.exit_code, self.signal) {
            (Some(code), _) => format!("exited with status {code}"),
            (None, Some(signal)) => format!("terminated by signal {signal}"),
            (None, None) => "exited abnormally".to_string(),
        }
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_invocation_builder_and_display() {
        let inv = Invocation::new(Stage::Compile, "/usr/bin/javac")
            .arg("-d")
            .path_arg(&PathBuf::from("/tmp/ws"));
        assert_eq!(inv.args, vec!["-d".to_string(), "/tmp/ws".to_string()]);
        assert_eq!(inv.program_name(), "javac");
        assert_eq!(inv.to_string(), "/usr/bin/javac \"-d\" \"/tmp/ws\"");
    }

    #[test]
    fn test_plan_steps_order() {
        let plan = CommandPlan {
            language: Language::Cpp,
            source_file: "main.cpp".to_string(),
            entry_symbol: None,
            compile: Some(Invocation::new(Stage::Compile, "g++")),
            run: Invocation::new(Stage::Run, "./main"),
        };
        let stages: Vec<Stage> = plan.steps().map(|s| s.stage).collect();
        assert_eq!(stages, vec![Stage::Compile, Stage::Run]);

        let interpreted = CommandPlan { compile: None, ..plan };
        assert_eq!(interpreted.steps().count(), 1);
    }

    #[test]
    fn test_stage_failure_kind() {
        assert!(matches!(Stage::Compile.failure("x"), RunnerError::Compile(_)));
        assert!(matches!(Stage::Run.failure("x"), RunnerError::Runtime(_)));
    }
}
