/// Runner and server configuration
///
/// Load order: built-in defaults, then an optional JSON file, then
/// `ALGOSYNC_*` environment variables. CLI flags are applied last by the
/// caller.
use crate::config::types::{RunnerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Toolchain binaries. Bare names are resolved through `PATH`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub javac: String,
    pub java: String,
    pub gxx: String,
    pub node: String,
    pub python: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            javac: "javac".to_string(),
            java: "java".to_string(),
            gxx: "g++".to_string(),
            node: "node".to_string(),
            python: "python3".to_string(),
        }
    }
}

/// Execution service configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory under which per-request workspaces are created
    pub workspace_root: PathBuf,
    /// Wall-clock limit for the run step
    pub run_timeout_ms: u64,
    /// Wall-clock limit for the compile step
    pub compile_timeout_ms: u64,
    /// Delay between SIGTERM and SIGKILL when a process group is terminated
    pub kill_grace_ms: u64,
    /// Upper bound on executions in flight at once
    pub max_concurrent_executions: usize,
    /// Treat any stderr output as failure of the stage that produced it
    pub strict_stderr: bool,
    /// Per-stream capture limits (bytes)
    pub stdout_limit: usize,
    pub stderr_limit: usize,
    pub toolchains: ToolchainConfig,
}

impl RunnerConfig {
    /// Default workspace root, scoped by effective UID so root and non-root
    /// services on one host never share a tree.
    pub fn default_workspace_root() -> PathBuf {
        let euid = nix::unistd::geteuid();
        std::env::temp_dir().join(format!("algosync-runner-uid-{}", euid))
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    /// Defaults, overlaid with `path` if given, overlaid with the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a (possibly partial) JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            RunnerError::Config(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    /// Apply `ALGOSYNC_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("ALGOSYNC_WORKSPACE_ROOT") {
            self.workspace_root = PathBuf::from(root);
        }
        if let Some(value) = lookup("ALGOSYNC_RUN_TIMEOUT_MS") {
            self.run_timeout_ms = parse_override("ALGOSYNC_RUN_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("ALGOSYNC_COMPILE_TIMEOUT_MS") {
            self.compile_timeout_ms = parse_override("ALGOSYNC_COMPILE_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("ALGOSYNC_MAX_CONCURRENCY") {
            self.max_concurrent_executions = parse_override("ALGOSYNC_MAX_CONCURRENCY", &value)?;
        }
        if let Some(value) = lookup("ALGOSYNC_STRICT_STDERR") {
            self.strict_stderr = parse_override("ALGOSYNC_STRICT_STDERR", &value)?;
        }
        for (key, slot) in [
            ("ALGOSYNC_JAVAC", &mut self.toolchains.javac),
            ("ALGOSYNC_JAVA", &mut self.toolchains.java),
            ("ALGOSYNC_GXX", &mut self.toolchains.gxx),
            ("ALGOSYNC_NODE", &mut self.toolchains.node),
            ("ALGOSYNC_PYTHON", &mut self.toolchains.python),
        ] {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workspace_root: Self::default_workspace_root(),
            run_timeout_ms: 10_000,
            compile_timeout_ms: 30_000,
            kill_grace_ms: 200,
            max_concurrent_executions: 8,
            strict_stderr: true,
            stdout_limit: 1024 * 1024,
            stderr_limit: 256 * 1024,
            toolchains: ToolchainConfig::default(),
        }
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RunnerError::Config(format!("Invalid {key} value '{value}': {e}")))
}

const PRODUCTION_FRONTEND: &str = "https://algosyncv1.vercel.app";
const DEVELOPMENT_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:8080",
    "http://localhost:8081",
];

/// HTTP listener configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Deployment environment name, `production` switches the CORS list
    pub environment: String,
    /// Extra origin allowed in production
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            environment: "development".to_string(),
            cors_origin: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(port) = lookup("PORT") {
            config.port = parse_override("PORT", &port)?;
        }
        if let Some(environment) = lookup("APP_ENV").or_else(|| lookup("NODE_ENV")) {
            config.environment = environment;
        }
        config.cors_origin = lookup("CORS_ORIGIN").filter(|origin| !origin.trim().is_empty());
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Origins accepted by the CORS layer.
    pub fn allowed_origins(&self) -> Vec<String> {
        if self.is_production() {
            self.cors_origin
                .iter()
                .cloned()
                .chain(std::iter::once(PRODUCTION_FRONTEND.to_string()))
                .collect()
        } else {
            DEVELOPMENT_ORIGINS.iter().map(|o| o.to_string()).collect()
        }
    }
}
