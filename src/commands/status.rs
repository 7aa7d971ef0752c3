use anyhow::Result;
use std::path::Path;

use crate::commands::CommandReport;
use crate::env_loader;
use crate::reaper::config::{SettingsOverrides, load_settings};
use crate::reaper::exemption::load_whitelist;

pub fn run(env_file: Option<&Path>) -> Result<CommandReport> {
    let settings = load_settings(SettingsOverrides::default())?;
    let mut report = CommandReport::new("status");

    report.detail(format!("env_file={}", env_loader::describe(env_file)));

    report.detail(format!("bot_token={}", settings.redacted_token()));
    report.detail(format!("days_inactive={}", settings.days_inactive));
    report.detail(format!(
        "inactivity_threshold={}",
        settings.inactivity_threshold.to_rfc3339()
    ));
    report.detail(format!("min_members={}", settings.min_member_exemption));
    report.detail(format!("skip_channel_str={}", settings.skip_marker));
    report.detail(format!(
        "admin_channel={}",
        settings.admin_report_channel.as_deref().unwrap_or("<none>")
    ));
    report.detail(format!("dry_run={}", settings.dry_run));
    report.detail(format!("whitelist_file={}", settings.whitelist_file.display()));
    report.detail(format!("audit_log={}", settings.audit_log.display()));
    report.detail(format!("slack_api_url={}", settings.api_base_url));

    match load_whitelist(&settings.whitelist_file, &settings.whitelist_keywords) {
        Ok(keywords) => report.detail(format!("whitelist_entries={}", keywords.len())),
        Err(err) => report.issue(format!("whitelist unreadable: {err:#}")),
    }
    if let Err(err) = settings.require_token() {
        report.issue(format!("{err}"));
    }

    Ok(report)
}
