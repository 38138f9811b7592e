use crate::config::types::Language;
use crate::core::types::{Invocation, Stage};
use crate::judge::adapter::ToolchainAdapter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

const DEFAULT_CLASS: &str = "Main";

static PUBLIC_CLASS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"public\s+class\s+(\w+)").ok());

#[derive(Debug, Clone)]
pub struct JavaAdapter {
    javac: String,
    java: String,
}

impl JavaAdapter {
    pub fn new(javac: impl Into<String>, java: impl Into<String>) -> Self {
        Self {
            javac: javac.into(),
            java: java.into(),
        }
    }
}

impl Default for JavaAdapter {
    fn default() -> Self {
        Self::new("javac", "java")
    }
}

/// First `public class <Name>` in the source, if any.
pub fn detect_class_name(source: &str) -> Option<String> {
    (*PUBLIC_CLASS)
        .as_ref()?
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().to_string())
}

fn class_or_default(entry: Option<&str>) -> &str {
    entry.unwrap_or(DEFAULT_CLASS)
}

impl ToolchainAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn detect_entry_point(&self, source: &str) -> Option<String> {
        Some(detect_class_name(source).unwrap_or_else(|| DEFAULT_CLASS.to_string()))
    }

    fn source_file_name(&self, entry: Option<&str>) -> String {
        format!("{}.java", class_or_default(entry))
    }

    fn compile_invocation(&self, workspace: &Path, entry: Option<&str>) -> Option<Invocation> {
        Some(
            Invocation::new(Stage::Compile, self.javac.clone())
                .arg("-encoding")
                .arg("UTF-8")
                .arg("-d")
                .path_arg(workspace)
                .path_arg(&workspace.join(self.source_file_name(entry))),
        )
    }

    fn run_invocation(&self, workspace: &Path, entry: Option<&str>) -> Invocation {
        Invocation::new(Stage::Run, self.java.clone())
            .arg("-cp")
            .path_arg(workspace)
            .arg(class_or_default(entry))
    }

    fn toolchain_probes(&self) -> Vec<(&str, &'static str)> {
        vec![(self.javac.as_str(), "-version"), (self.java.as_str(), "-version")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_public_class() {
        let src = "import java.util.*;\npublic  class Solver {\n  public static void main(String[] a) {}\n}";
        assert_eq!(detect_class_name(src).as_deref(), Some("Solver"));
    }

    #[test]
    fn test_defaults_to_main() {
        let adapter = JavaAdapter::default();
        let plan = adapter.plan(Path::new("/ws/1"), "class Helper {}");
        assert_eq!(plan.entry_symbol.as_deref(), Some("Main"));
        assert_eq!(plan.source_file, "Main.java");
        assert_eq!(plan.run.args, vec!["-cp", "/ws/1", "Main"]);
    }

    #[test]
    fn test_plan_uses_detected_class() {
        let adapter = JavaAdapter::new("/opt/jdk/bin/javac", "/opt/jdk/bin/java");
        let plan = adapter.plan(Path::new("/ws/2"), "public class Solver { }");
        assert_eq!(plan.source_file, "Solver.java");

        let compile = plan.compile.unwrap();
        assert_eq!(compile.stage, Stage::Compile);
        assert_eq!(compile.program, "/opt/jdk/bin/javac");
        assert_eq!(
            compile.args,
            vec!["-encoding", "UTF-8", "-d", "/ws/2", "/ws/2/Solver.java"]
        );
        assert_eq!(plan.run.program, "/opt/jdk/bin/java");
        assert_eq!(plan.run.args.last().map(String::as_str), Some("Solver"));
    }
}
