use crate::config::types::Language;
use crate::core::types::{CommandPlan, Invocation};
use std::path::Path;

/// Per-language knowledge: where the source goes and how to build and run it.
///
/// Adapters only describe commands. Launching them is the process runner's job.
pub trait ToolchainAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Name the run step needs to find the program, e.g. a Java class.
    fn detect_entry_point(&self, _source: &str) -> Option<String> {
        None
    }

    /// File name, relative to the workspace, the source is written to.
    fn source_file_name(&self, entry: Option<&str>) -> String;

    fn compile_invocation(&self, workspace: &Path, entry: Option<&str>) -> Option<Invocation>;

    fn run_invocation(&self, workspace: &Path, entry: Option<&str>) -> Invocation;

    /// Toolchain binaries this adapter launches, with the flag that prints a version.
    fn toolchain_probes(&self) -> Vec<(&str, &'static str)>;

    fn plan(&self, workspace: &Path, source: &str) -> CommandPlan {
        let entry = self.detect_entry_point(source);
        let entry = entry.as_deref();
        CommandPlan {
            language: self.language(),
            source_file: self.source_file_name(entry),
            entry_symbol: entry.map(str::to_string),
            compile: self.compile_invocation(workspace, entry),
            run: self.run_invocation(workspace, entry),
        }
    }
}
