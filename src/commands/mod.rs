pub mod create_test_channels;
pub mod status;
pub mod sweep;

use crate::reaper::audit::AuditLog;
use crate::reaper::config::Settings;
use crate::slack::client::RateLimitedClient;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Build the HTTP client for commands that talk to Slack.
pub fn connect(settings: &Settings, audit: &AuditLog) -> Result<RateLimitedClient> {
    let token = settings.require_token()?;
    Ok(RateLimitedClient::new(
        &settings.api_base_url,
        token,
        settings.rate_limit_margin_secs,
        audit.clone(),
    )?)
}
