use crate::config::types::Language;
use crate::core::types::{Invocation, Stage};
use crate::judge::adapter::ToolchainAdapter;
use std::path::Path;

const SOURCE_FILE: &str = "script.js";

#[derive(Debug, Clone)]
pub struct JavaScriptAdapter {
    node: String,
}

impl JavaScriptAdapter {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl Default for JavaScriptAdapter {
    fn default() -> Self {
        Self::new("node")
    }
}

impl ToolchainAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn source_file_name(&self, _entry: Option<&str>) -> String {
        SOURCE_FILE.to_string()
    }

    fn compile_invocation(&self, _workspace: &Path, _entry: Option<&str>) -> Option<Invocation> {
        None
    }

    fn run_invocation(&self, workspace: &Path, _entry: Option<&str>) -> Invocation {
        Invocation::new(Stage::Run, self.node.clone()).path_arg(&workspace.join(SOURCE_FILE))
    }

    fn toolchain_probes(&self) -> Vec<(&str, &'static str)> {
        vec![(self.node.as_str(), "--version")]
    }
}
