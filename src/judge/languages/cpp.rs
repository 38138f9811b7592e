use crate::config::types::Language;
use crate::core::types::{Invocation, Stage};
use crate::judge::adapter::ToolchainAdapter;
use std::path::Path;

const SOURCE_FILE: &str = "main.cpp";
const BINARY: &str = "main";

#[derive(Debug, Clone)]
pub struct CppAdapter {
    gxx: String,
}

impl CppAdapter {
    pub fn new(gxx: impl Into<String>) -> Self {
        Self { gxx: gxx.into() }
    }
}

impl Default for CppAdapter {
    fn default() -> Self {
        Self::new("g++")
    }
}

impl ToolchainAdapter for CppAdapter {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn source_file_name(&self, _entry: Option<&str>) -> String {
        SOURCE_FILE.to_string()
    }

    fn compile_invocation(&self, workspace: &Path, _entry: Option<&str>) -> Option<Invocation> {
        Some(
            Invocation::new(Stage::Compile, self.gxx.clone())
                .arg("-std=c++17")
                .arg("-O2")
                .arg("-o")
                .path_arg(&workspace.join(BINARY))
                .path_arg(&workspace.join(SOURCE_FILE)),
        )
    }

    fn run_invocation(&self, workspace: &Path, _entry: Option<&str>) -> Invocation {
        Invocation::new(Stage::Run, workspace.join(BINARY).to_string_lossy().into_owned())
    }

    fn toolchain_probes(&self) -> Vec<(&str, &'static str)> {
        vec![(self.gxx.as_str(), "--version")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_compiles_then_runs_binary() {
        let plan = CppAdapter::default().plan(Path::new("/ws/7"), "int main() {}");
        assert_eq!(plan.source_file, "main.cpp");
        assert!(plan.entry_symbol.is_none());

        let compile = plan.compile.unwrap();
        assert_eq!(compile.program, "g++");
        assert_eq!(
            compile.args,
            vec!["-std=c++17", "-O2", "-o", "/ws/7/main", "/ws/7/main.cpp"]
        );
        assert_eq!(plan.run.program, "/ws/7/main");
        assert!(plan.run.args.is_empty());
    }
}
