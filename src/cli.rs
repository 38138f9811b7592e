use crate::config::runner::{RunnerConfig, ServerConfig};
use crate::config::types::{ExecutionRequest, Language};
use crate::exec::coordinator::ExecutionCoordinator;
use crate::judge::registry::probe_toolchains;
use crate::safety::workspace::WorkspaceManager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON runner config; ALGOSYNC_* environment variables override it
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP execution service
    Serve {
        /// Listen port (defaults to $PORT, then 5000)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Compile and run one submission, printing the result as JSON
    ExecuteCode {
        /// Programming language (java, cpp, javascript, python)
        #[arg(long)]
        language: String,
        /// Source code as string
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        code: Option<String>,
        /// Read source code from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Input data to pass to stdin
        #[arg(long)]
        stdin: Option<String>,
        /// Run-step wall clock limit in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Do not treat stderr output as failure
        #[arg(long)]
        permissive_stderr: bool,
    },
    /// Check if all language toolchains are installed
    CheckDeps {
        /// Verbose output showing detailed version information
        #[arg(long)]
        verbose: bool,
    },
    /// Remove workspaces left behind by a previous process
    Cleanup {
        /// Only remove workspaces at least this old
        #[arg(long, default_value_t = 3600)]
        max_age_secs: u64,
    },
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let runner = RunnerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port } => serve(runner, port),
        Commands::ExecuteCode {
            language,
            code,
            file,
            stdin,
            timeout_ms,
            permissive_stderr,
        } => {
            let source = match (code, file) {
                (Some(code), _) => code,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("either --code or --file is required"),
            };
            execute_code(runner, &language, source, stdin, timeout_ms, permissive_stderr)
        }
        Commands::CheckDeps { verbose } => check_dependencies(&runner, verbose),
        Commands::Cleanup { max_age_secs } => cleanup(&runner, max_age_secs),
    }
}

fn serve(runner: RunnerConfig, port: Option<u16>) -> Result<()> {
    let mut server = ServerConfig::from_env()?;
    if let Some(port) = port {
        server.port = port;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(crate::http::serve(server, runner))
}

fn execute_code(
    mut runner: RunnerConfig,
    language: &str,
    source: String,
    stdin: Option<String>,
    timeout_ms: Option<u64>,
    permissive_stderr: bool,
) -> Result<()> {
    let language: Language = language.parse()?;
    if let Some(timeout_ms) = timeout_ms {
        runner.run_timeout_ms = timeout_ms;
    }
    if permissive_stderr {
        runner.strict_stderr = false;
    }

    let coordinator = ExecutionCoordinator::new(runner)?;
    let request = ExecutionRequest {
        language,
        source,
        stdin,
    };
    let result = coordinator.execute(&request)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn check_dependencies(runner: &RunnerConfig, verbose: bool) -> Result<()> {
    println!("🔍 Checking language toolchains...");
    println!();

    let probes = probe_toolchains(&runner.toolchains);
    let mut missing = Vec::new();

    for language in Language::ALL {
        let probes: Vec<_> = probes.iter().filter(|p| p.language == language).collect();
        let ok = probes.iter().all(|p| p.available);

        if ok {
            println!("✅ {} - OK", language);
        } else {
            println!("❌ {} - MISSING", language);
            missing.push(language);
        }

        if verbose {
            for probe in &probes {
                match (&probe.version, &probe.error) {
                    (Some(version), _) => println!("  {} -> {}", probe.program, version),
                    (None, Some(error)) => println!("  {} -> {}", probe.program, error),
                    (None, None) => println!("  {} -> OK", probe.program),
                }
            }
            println!();
        }
    }

    println!();
    if missing.is_empty() {
        println!("🎉 All language toolchains are installed!");
        return Ok(());
    }

    let names: Vec<_> = missing.iter().map(|l| l.as_str()).collect();
    println!("⚠️  Missing toolchains: {}", names.join(", "));
    println!("Submissions in these languages will fail with an internal error.");
    std::process::exit(1);
}

fn cleanup(runner: &RunnerConfig, max_age_secs: u64) -> Result<()> {
    let manager = WorkspaceManager::new(runner.workspace_root.clone())?;
    let removed = manager.sweep_stale(Duration::from_secs(max_age_secs))?;
    if removed > 0 {
        crate::observability::audit::events::stale_sweep(removed);
    }
    println!(
        "Removed {} stale workspace(s) under {}",
        removed,
        manager.root().display()
    );
    Ok(())
}
