use crate::config::runner::ToolchainConfig;
use crate::config::types::Language;
use crate::judge::adapter::ToolchainAdapter;
use crate::judge::languages::{
    cpp::CppAdapter, java::JavaAdapter, javascript::JavaScriptAdapter, python::PythonAdapter,
};
use serde::Serialize;
use std::process::{Command, Stdio};

pub fn adapter_for(language: Language, toolchains: &ToolchainConfig) -> Box<dyn ToolchainAdapter> {
    match language {
        Language::Java => Box::new(JavaAdapter::new(&toolchains.javac, &toolchains.java)),
        Language::Cpp => Box::new(CppAdapter::new(&toolchains.gxx)),
        Language::JavaScript => Box::new(JavaScriptAdapter::new(&toolchains.node)),
        Language::Python => Box::new(PythonAdapter::new(&toolchains.python)),
    }
}

/// Availability of one toolchain binary.
#[derive(Debug, Clone, Serialize)]
pub struct ToolchainProbe {
    pub language: Language,
    pub program: String,
    pub available: bool,
    pub version: Option<String>,
    pub error: Option<String>,
}

/// Run every configured toolchain binary with its version flag.
pub fn probe_toolchains(toolchains: &ToolchainConfig) -> Vec<ToolchainProbe> {
    let mut probes = Vec::new();
    for language in Language::ALL {
        let adapter = adapter_for(language, toolchains);
        for (program, flag) in adapter.toolchain_probes() {
            probes.push(probe(language, program, flag));
        }
    }
    probes
}

fn probe(language: Language, program: &str, flag: &str) -> ToolchainProbe {
    let output = Command::new(program)
        .arg(flag)
        .stdin(Stdio::null())
        .output();

    match output {
        Ok(out) if out.status.success() => {
            // javac/java print their version on stderr.
            let stdout = String::from_utf8_lossy(&out.stdout);
            let stderr = String::from_utf8_lossy(&out.stderr);
            let version = stdout
                .lines()
                .chain(stderr.lines())
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string);
            ToolchainProbe {
                language,
                program: program.to_string(),
                available: true,
                version,
                error: None,
            }
        }
        Ok(out) => ToolchainProbe {
            language,
            program: program.to_string(),
            available: false,
            version: None,
            error: Some(format!("{program} {flag} exited with {}", out.status)),
        },
        Err(e) => ToolchainProbe {
            language,
            program: program.to_string(),
            available: false,
            version: None,
            error: Some(e.to_string()),
        },
    }
}
