/// Per-request execution lifecycle
///
/// acquire workspace -> write source -> compile (if any) -> run -> judge ->
/// release workspace. The workspace is released on every path, including
/// internal failures.
use crate::config::runner::RunnerConfig;
use crate::config::types::{
    ExecutionRequest, ExecutionResult, ExecutionState, FailureStage, Result, RunnerError,
};
use crate::config::validator::validate_config;
use crate::core::types::{CommandPlan, Invocation, ProcessOutput};
use crate::exec::runner::ProcessRunner;
use crate::judge::registry::adapter_for;
use crate::observability::audit::events;
use crate::safety::workspace::{Workspace, WorkspaceManager};
use std::time::{Duration, Instant};

pub struct ExecutionCoordinator {
    config: RunnerConfig,
    workspaces: WorkspaceManager,
    runner: ProcessRunner,
}

/// Where a request ended up, before it is flattened into an [`ExecutionResult`].
struct Outcome {
    state: ExecutionState,
    output: Option<ProcessOutput>,
    error: Option<RunnerError>,
    truncated: bool,
}

impl Outcome {
    fn new() -> Self {
        Self {
            state: ExecutionState::Pending,
            output: None,
            error: None,
            truncated: false,
        }
    }

    fn advance(&mut self, next: ExecutionState) {
        if !self.state.can_transition_to(next) {
            log::error!("Illegal execution transition {:?} -> {:?}", self.state, next);
        }
        debug_assert!(self.state.can_transition_to(next));
        self.state = next;
    }

    fn fail(mut self, error: RunnerError, output: Option<ProcessOutput>) -> Self {
        let next = match error.failure_stage() {
            FailureStage::Compile => ExecutionState::CompileFailed,
            FailureStage::Run => ExecutionState::RunFailed,
            FailureStage::Timeout => ExecutionState::TimedOut,
            FailureStage::None | FailureStage::Internal => ExecutionState::InternalError,
        };
        self.advance(next);
        self.record(output);
        self.error = Some(error);
        self
    }

    fn record(&mut self, output: Option<ProcessOutput>) {
        if let Some(out) = &output {
            self.truncated |= out.integrity.is_truncated();
        }
        if output.is_some() {
            self.output = output;
        }
    }
}

/// Decide whether a finished stage counts as a success.
///
/// With `strict_stderr`, any byte on stderr fails the stage even when the
/// exit status is zero.
pub fn judge_stage(
    output: &ProcessOutput,
    invocation: &Invocation,
    timeout: Duration,
    strict_stderr: bool,
) -> Result<()> {
    if output.timed_out {
        return Err(RunnerError::Timeout(timeout.as_millis() as u64));
    }
    if !output.success() {
        return Err(invocation.stage.failure(format!(
            "{} {}",
            invocation.program_name(),
            output.describe_exit()
        )));
    }
    if strict_stderr && !output.stderr.is_empty() {
        return Err(invocation
            .stage
            .failure(format!("{} wrote to stderr", invocation.program_name())));
    }
    Ok(())
}

impl ExecutionCoordinator {
    pub fn new(config: RunnerConfig) -> Result<Self> {
        let validation = validate_config(&config)?;
        for warning in validation.warnings {
            log::warn!("Configuration warning: {}", warning);
        }

        let workspaces = WorkspaceManager::new(config.workspace_root.clone())?;
        let runner = ProcessRunner::from_config(&config);
        Ok(Self {
            config,
            workspaces,
            runner,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Execute one submission.
    ///
    /// Compile errors, runtime errors and timeouts are reported in the
    /// returned result. Only a failure to allocate a workspace is an `Err`.
    pub fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let started = Instant::now();
        let mut workspace = self.workspaces.acquire()?;
        let run_id = workspace.run_id().to_string();
        let language = request.language.as_str();
        events::execution_start(&run_id, language);

        let adapter = adapter_for(request.language, &self.config.toolchains);
        let plan = adapter.plan(workspace.path(), &request.source);
        let outcome = self.drive(&workspace, &plan, request);
        if !outcome.state.is_terminal() {
            log::error!("Execution {} stopped in non-terminal state {:?}", run_id, outcome.state);
        }

        if let Err(e) = workspace.release() {
            log::warn!("Failed to release workspace {}: {}", run_id, e);
            events::cleanup_failure(&run_id, &e.to_string());
        }

        let result = build_result(run_id, plan.entry_symbol, outcome, started.elapsed());
        let state = result.state();
        log::info!(
            "Execution {} ({}) finished: {:?} in {} ms",
            result.run_id,
            language,
            state,
            result.wall_time_ms
        );
        events::execution_end(
            &result.run_id,
            language,
            &format!("{:?}", state),
            result.wall_time_ms,
        );
        Ok(result)
    }

    fn drive(
        &self,
        workspace: &Workspace,
        plan: &CommandPlan,
        request: &ExecutionRequest,
    ) -> Outcome {
        let mut outcome = Outcome::new();

        if let Err(e) = workspace.write_file(&plan.source_file, request.source.as_bytes()) {
            return outcome.fail(RunnerError::Internal(e.to_string()), None);
        }

        if let Some(compile) = &plan.compile {
            outcome.advance(ExecutionState::Compiling);
            let timeout = self.config.compile_timeout();
            match self.run_stage(workspace, compile, timeout, None) {
                Ok(output) => outcome.record(Some(output)),
                Err((e, output)) => return outcome.fail(e, output),
            }
        }

        outcome.advance(ExecutionState::Running);
        let stdin = request.stdin.as_deref().map(str::as_bytes);
        match self.run_stage(workspace, &plan.run, self.config.run_timeout(), stdin) {
            Ok(output) => {
                outcome.advance(ExecutionState::Succeeded);
                outcome.record(Some(output));
                outcome
            }
            Err((e, output)) => outcome.fail(e, output),
        }
    }

    fn run_stage(
        &self,
        workspace: &Workspace,
        invocation: &Invocation,
        timeout: Duration,
        stdin: Option<&[u8]>,
    ) -> std::result::Result<ProcessOutput, (RunnerError, Option<ProcessOutput>)> {
        let output = self
            .runner
            .run(invocation, workspace.path(), timeout, stdin)
            .map_err(|e| (e, None))?;

        if output.timed_out {
            events::forced_kill(
                workspace.run_id(),
                invocation.program_name(),
                timeout.as_millis() as u64,
            );
        }

        match judge_stage(&output, invocation, timeout, self.config.strict_stderr) {
            Ok(()) => Ok(output),
            Err(e) => Err((e, Some(output))),
        }
    }
}

fn build_result(
    run_id: String,
    entry_symbol: Option<String>,
    outcome: Outcome,
    elapsed: Duration,
) -> ExecutionResult {
    let succeeded = outcome.state == ExecutionState::Succeeded;
    let failure_stage = match &outcome.error {
        Some(e) => e.failure_stage(),
        None if succeeded => FailureStage::None,
        None => FailureStage::Internal,
    };
    let (stdout, stderr, exit_code) = match &outcome.output {
        Some(out) => (out.stdout_lossy(), out.stderr_lossy(), out.exit_code),
        None => (String::new(), String::new(), None),
    };

    ExecutionResult {
        run_id,
        succeeded,
        stdout,
        stderr,
        exit_code,
        failure_stage,
        message: outcome.error.map(|e| e.to_string()),
        entry_symbol,
        wall_time_ms: elapsed.as_millis() as u64,
        output_truncated: outcome.truncated,
    }
}
