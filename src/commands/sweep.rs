use anyhow::Result;

use crate::commands::{CommandReport, connect};
use crate::reaper::audit::AuditLog;
use crate::reaper::config::{SettingsOverrides, load_settings};
use crate::reaper::exemption::load_whitelist;
use crate::reaper::sweep::Reaper;

#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOptions {
    pub dry_run: Option<bool>,
    pub days_inactive: Option<u64>,
}

pub fn run(opts: &SweepOptions) -> Result<CommandReport> {
    let settings = load_settings(SettingsOverrides {
        dry_run: opts.dry_run,
        days_inactive: opts.days_inactive,
    })?;
    let audit = AuditLog::to_file(&settings.audit_log);
    let client = connect(&settings, &audit)?;
    let whitelist = load_whitelist(&settings.whitelist_file, &settings.whitelist_keywords)?;

    let summary = Reaper::new(&client, &settings, whitelist, audit.clone()).sweep()?;

    let mut report = CommandReport::new("sweep");
    if let Some(path) = audit.path() {
        report.detail(format!("audit_log={}", path.display()));
    }
    report.detail(format!("dry_run={}", summary.dry_run));
    report.detail(format!("threshold={}", summary.threshold.to_rfc3339()));
    report.detail(format!("scanned={}", summary.scanned));
    report.detail(format!("disused={}", summary.disused));
    report.detail(format!("joined={}", summary.joined));
    report.detail(format!("exempt={}", summary.exempt));
    report.detail(format!("active={}", summary.active));
    report.detail(format!("archived={}", summary.archived.len()));
    report.detail(format!("archive_failures={}", summary.archive_failures));
    report.detail(format!("channel_errors={}", summary.channel_errors));
    report.detail(format!("admin_report_sent={}", summary.admin_report_sent));
    for name in summary.archived_names() {
        report.detail(format!("archived.channel=#{name}"));
    }
    Ok(report)
}
