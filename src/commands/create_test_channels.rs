use anyhow::Result;

use crate::commands::{CommandReport, connect};
use crate::reaper::audit::AuditLog;
use crate::reaper::config::{SettingsOverrides, load_settings};
use crate::reaper::fixtures;

#[derive(Debug, Clone)]
pub struct CreateTestChannelsOptions {
    pub prefix: String,
    pub count: u32,
}

pub fn run(opts: &CreateTestChannelsOptions) -> Result<CommandReport> {
    let settings = load_settings(SettingsOverrides::default())?;
    let audit = AuditLog::to_file(&settings.audit_log);
    let client = connect(&settings, &audit)?;

    let summary = fixtures::create_test_channels(&client, &audit, &opts.prefix, opts.count)?;

    let mut report = CommandReport::new("create-test-channels");
    report.detail(format!("created={}", summary.created.len()));
    report.detail(format!("leave_failures={}", summary.leave_failures));
    if summary.create_failures > 0 {
        report.issue(format!(
            "{} of {} channels could not be created",
            summary.create_failures, opts.count
        ));
    }
    Ok(report)
}
