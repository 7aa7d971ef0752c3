use crate::error::ReaperErrorCode;
use crate::reaper::util::now_epoch_secs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub level: AuditLevel,
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub message: String,
}

/// Audit trail handle. Every event goes to `tracing` and, when a path is
/// configured, is appended to a JSONL file.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    #[cfg(test)]
    pub fn console_only() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, phase: &str, channel: Option<&str>, message: &str) {
        tracing::info!(phase, channel = channel.unwrap_or("-"), "{message}");
        self.record(AuditLevel::Info, phase, channel, None, message);
    }

    pub fn error(
        &self,
        phase: &str,
        channel: Option<&str>,
        code: ReaperErrorCode,
        message: &str,
    ) {
        tracing::error!(
            phase,
            channel = channel.unwrap_or("-"),
            code = code.as_str(),
            "{message}"
        );
        self.record(AuditLevel::Error, phase, channel, Some(code), message);
    }

    fn record(
        &self,
        level: AuditLevel,
        phase: &str,
        channel: Option<&str>,
        code: Option<ReaperErrorCode>,
        message: &str,
    ) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        let event = AuditEvent {
            at_epoch_secs: now_epoch_secs().unwrap_or(0),
            level,
            phase: phase.to_string(),
            channel: channel.map(str::to_string),
            code: code.map(ReaperErrorCode::as_str),
            message: message.to_string(),
        };
        if let Err(err) = append_event(path, &event) {
            tracing::warn!("audit log write failed: {err:#}");
        }
    }
}

fn append_event(path: &Path, event: &AuditEvent) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let line = format!("{}\n", serde_json::to_string(event)?);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    #[test]
    fn events_are_appended_as_json_lines() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("logs/audit.log");
        let audit = AuditLog::to_file(&path);

        audit.info("sweep", None, "sweep started");
        audit.error(
            "archive",
            Some("old-stuff"),
            ReaperErrorCode::E003ApiError,
            "Error archiving #old-stuff: restricted_action",
        );

        let raw = fs::read_to_string(&path).expect("read audit log");
        let lines: Vec<Value> = raw
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "info");
        assert!(lines[0].get("channel").is_none());
        assert_eq!(lines[1]["level"], "error");
        assert_eq!(lines[1]["channel"], "old-stuff");
        assert_eq!(lines[1]["code"], "E003_API_ERROR");
    }

    #[test]
    fn console_only_never_touches_disk() {
        let audit = AuditLog::console_only();
        audit.info("sweep", None, "nothing written");
        assert!(audit.path().is_none());
    }
}
