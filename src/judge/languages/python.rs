use crate::config::types::Language;
use crate::core::types::{Invocation, Stage};
use crate::judge::adapter::ToolchainAdapter;
use std::path::Path;

const SOURCE_FILE: &str = "script.py";

#[derive(Debug, Clone)]
pub struct PythonAdapter {
    python: String,
}

impl PythonAdapter {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

impl Default for PythonAdapter {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl ToolchainAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn source_file_name(&self, _entry: Option<&str>) -> String {
        SOURCE_FILE.to_string()
    }

    fn compile_invocation(&self, _workspace: &Path, _entry: Option<&str>) -> Option<Invocation> {
        None
    }

    fn run_invocation(&self, workspace: &Path, _entry: Option<&str>) -> Invocation {
        // -B: no __pycache__ in the workspace
        Invocation::new(Stage::Run, self.python.clone())
            .arg("-B")
            .path_arg(&workspace.join(SOURCE_FILE))
    }

    fn toolchain_probes(&self) -> Vec<(&str, &'static str)> {
        vec![(self.python.as_str(), "--version")]
    }
}
