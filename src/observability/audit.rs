/// Structured execution events
///
/// Every event is a single JSON object logged through the `log` facade under
/// the `algosync::audit` target, so operators can route or filter it with
/// `RUST_LOG=algosync::audit=info` without a separate sink.
use chrono::{DateTime, Utc};
use log::{error, info, warn, Level};
use serde::{Deserialize, Serialize};

pub const AUDIT_TARGET: &str = "algosync::audit";

/// Event types tracked for each execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ExecutionStart,
    ExecutionEnd,
    ForcedKill,
    CleanupFailure,
    StaleSweep,
}

impl AuditEventType {
    pub fn level(self) -> Level {
        match self {
            AuditEventType::ExecutionStart
            | AuditEventType::ExecutionEnd
            | AuditEventType::StaleSweep => Level::Info,
            AuditEventType::ForcedKill => Level::Warn,
            AuditEventType::CleanupFailure => Level::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub timestamp: DateTime<Utc>,
    /// Workspace run id; absent for service-level events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_time_ms: Option<u64>,
    pub process_id: u32,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, details: impl Into<String>) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            run_id: None,
            details: details.into(),
            language: None,
            outcome: None,
            wall_time_ms: None,
            process_id: std::process::id(),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>, wall_time_ms: u64) -> Self {
        self.outcome = Some(outcome.into());
        self.wall_time_ms = Some(wall_time_ms);
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                "{{\"event_type\":\"{:?}\",\"details\":\"unserializable event: {}\"}}",
                self.event_type, e
            )
        })
    }
}

pub fn log_audit_event(event: AuditEvent) {
    let line = event.to_json();
    match event.event_type.level() {
        Level::Error => error!(target: AUDIT_TARGET, "{}", line),
        Level::Warn => warn!(target: AUDIT_TARGET, "{}", line),
        _ => info!(target: AUDIT_TARGET, "{}", line),
    }
}

/// Convenience functions for the events the coordinator emits
pub mod events {
    use super::*;

    pub fn execution_start(run_id: &str, language: &str) {
        log_audit_event(
            AuditEvent::new(
                AuditEventType::ExecutionStart,
                format!("Execution started: run_id={}", run_id),
            )
            .with_run_id(run_id)
            .with_language(language),
        );
    }

    pub fn execution_end(run_id: &str, language: &str, outcome: &str, wall_time_ms: u64) {
        log_audit_event(
            AuditEvent::new(
                AuditEventType::ExecutionEnd,
                format!("Execution ended: run_id={}, outcome={}", run_id, outcome),
            )
            .with_run_id(run_id)
            .with_language(language)
            .with_outcome(outcome, wall_time_ms),
        );
    }

    pub fn forced_kill(run_id: &str, program: &str, limit_ms: u64) {
        log_audit_event(
            AuditEvent::new(
                AuditEventType::ForcedKill,
                format!("{} exceeded {} ms and was terminated", program, limit_ms),
            )
            .with_run_id(run_id),
        );
    }

    pub fn cleanup_failure(run_id: &str, error: &str) {
        log_audit_event(
            AuditEvent::new(
                AuditEventType::CleanupFailure,
                format!("Workspace removal failed: {}", error),
            )
            .with_run_id(run_id),
        );
    }

    pub fn stale_sweep(removed: usize) {
        log_audit_event(AuditEvent::new(
            AuditEventType::StaleSweep,
            format!("Removed {} stale workspaces", removed),
        ));
    }
}
