use crate::error::{ReaperError, ReaperErrorCode};
use crate::reaper::activity::{self, Disuse};
use crate::reaper::audit::AuditLog;
use crate::reaper::catalog::{self, ChannelRecord};
use crate::reaper::config::Settings;
use crate::reaper::exemption;
use crate::slack::{Method, SlackApi, error_text, is_ok};
use chrono::{DateTime, Utc};
use serde::Serialize;

const JOIN_ENDPOINT: &str = "conversations.join";
const ARCHIVE_ENDPOINT: &str = "conversations.archive";
const POST_ENDPOINT: &str = "chat.postMessage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelOutcome {
    Archived,
    SkippedExempt,
    SkippedActive,
    JoinedForInspection,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub dry_run: bool,
    pub threshold: DateTime<Utc>,
    pub scanned: usize,
    pub disused: usize,
    pub joined: usize,
    pub exempt: usize,
    pub active: usize,
    pub archive_failures: usize,
    pub channel_errors: usize,
    pub archived: Vec<ChannelRecord>,
    pub admin_report_sent: bool,
}

impl SweepSummary {
    fn new(dry_run: bool, threshold: DateTime<Utc>) -> Self {
        Self {
            dry_run,
            threshold,
            scanned: 0,
            disused: 0,
            joined: 0,
            exempt: 0,
            active: 0,
            archive_failures: 0,
            channel_errors: 0,
            archived: Vec::new(),
            admin_report_sent: false,
        }
    }

    pub fn archived_names(&self) -> Vec<&str> {
        self.archived.iter().map(|c| c.name.as_str()).collect()
    }
}

pub fn admin_report_text(names: &[&str], dry_run: bool) -> String {
    let listed = names
        .iter()
        .map(|name| format!("#{name}"))
        .collect::<Vec<_>>()
        .join(", ");
    let msg = format!("Archiving {} channels: {listed}", names.len());
    if dry_run {
        format!("[DRY RUN] {msg}")
    } else {
        msg
    }
}

/// Drives one sweep: catalog, classify, filter, act, report.
pub struct Reaper<'a> {
    api: &'a dyn SlackApi,
    settings: &'a Settings,
    whitelist: Vec<String>,
    audit: AuditLog,
}

impl<'a> Reaper<'a> {
    pub fn new(
        api: &'a dyn SlackApi,
        settings: &'a Settings,
        whitelist: Vec<String>,
        audit: AuditLog,
    ) -> Self {
        Self {
            api,
            settings,
            whitelist,
            audit,
        }
    }

    pub fn sweep(&self) -> Result<SweepSummary, ReaperError> {
        let threshold = self.settings.inactivity_threshold;
        let dry_run = self.settings.dry_run;
        let mut summary = SweepSummary::new(dry_run, threshold);

        if dry_run {
            self.audit.info(
                "sweep",
                None,
                "THIS IS A DRY RUN. NO CHANNELS ARE ACTUALLY ARCHIVED.",
            );
        }
        self.audit.info(
            "sweep",
            None,
            &format!(
                "sweep started (dry_run={dry_run}, threshold={}). Grabbing a list of all channels. \
                 This could take a moment depending on the number of channels.",
                threshold.to_rfc3339()
            ),
        );

        for channel in catalog::list_active_channels(self.api)? {
            summary.scanned += 1;
            match self.process(&channel, threshold, &mut summary) {
                Ok(ChannelOutcome::Archived) => summary.archived.push(channel),
                Ok(ChannelOutcome::SkippedExempt) => summary.exempt += 1,
                Ok(ChannelOutcome::SkippedActive) => summary.active += 1,
                Ok(ChannelOutcome::JoinedForInspection) => summary.joined += 1,
                Err(err) if !err.is_fatal() => {
                    summary.channel_errors += 1;
                    self.audit.error(
                        "inspect",
                        Some(&channel.name),
                        ReaperErrorCode::from(&err),
                        &format!("Error inspecting #{}: {err}", channel.name),
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let names = summary.archived_names();
        self.audit.info(
            "summary",
            None,
            &format!(
                "Archived the following {} channels: {}",
                names.len(),
                names.join(", ")
            ),
        );
        summary.admin_report_sent = self.send_admin_report(&names)?;
        Ok(summary)
    }

    fn process(
        &self,
        channel: &ChannelRecord,
        threshold: DateTime<Utc>,
        summary: &mut SweepSummary,
    ) -> Result<ChannelOutcome, ReaperError> {
        let Disuse { disused, verdict } = activity::classify(
            self.api,
            channel,
            threshold,
            self.settings.min_member_exemption,
        )?;

        if disused {
            summary.disused += 1;
            self.audit.info(
                "detect",
                Some(&channel.name),
                &format!(
                    "Found channel #{} older than {}. It was last updated {}",
                    channel.name,
                    threshold.to_rfc3339(),
                    verdict.last_activity_at.to_rfc3339()
                ),
            );
            if !channel.bot_is_member {
                // Reclassified on the next sweep, once history is readable.
                self.join(channel)?;
                return Ok(ChannelOutcome::JoinedForInspection);
            }
        }

        if !channel.bot_is_member {
            return Ok(ChannelOutcome::SkippedActive);
        }

        let exempt = exemption::is_exempt(
            self.api,
            channel,
            &self.settings.skip_marker,
            &self.whitelist,
        )?;
        if exempt {
            tracing::debug!(channel = %channel.name, "exempt from archival");
            return Ok(ChannelOutcome::SkippedExempt);
        }
        if !disused {
            return Ok(ChannelOutcome::SkippedActive);
        }

        if !self.archive(channel)? {
            summary.archive_failures += 1;
        }
        Ok(ChannelOutcome::Archived)
    }

    fn join(&self, channel: &ChannelRecord) -> Result<(), ReaperError> {
        self.audit.info(
            "join",
            Some(&channel.name),
            &format!("Adding bot to #{}", channel.name),
        );
        let resp = self.api.call(
            JOIN_ENDPOINT,
            &[("channel", channel.id.clone())],
            Method::Post,
        )?;
        if !is_ok(&resp) {
            self.audit.error(
                "join",
                Some(&channel.name),
                ReaperErrorCode::E003ApiError,
                &format!("Error joining #{}: {}", channel.name, error_text(&resp)),
            );
        }
        Ok(())
    }

    /// Returns false when Slack refused the archive call.
    fn archive(&self, channel: &ChannelRecord) -> Result<bool, ReaperError> {
        if self.settings.dry_run {
            self.audit.info(
                "archive",
                Some(&channel.name),
                &format!(
                    "THIS IS A DRY RUN. #{} would have been archived.",
                    channel.name
                ),
            );
            return Ok(true);
        }

        self.audit.info(
            "archive",
            Some(&channel.name),
            &format!("Archiving channel #{}", channel.name),
        );
        let resp = self.api.call(
            ARCHIVE_ENDPOINT,
            &[("channel", channel.id.clone())],
            Method::Post,
        )?;
        if is_ok(&resp) {
            return Ok(true);
        }
        self.audit.error(
            "archive",
            Some(&channel.name),
            ReaperErrorCode::E003ApiError,
            &format!("Error archiving #{}: {}", channel.name, error_text(&resp)),
        );
        Ok(false)
    }

    fn send_admin_report(&self, names: &[&str]) -> Result<bool, ReaperError> {
        let Some(admin_channel) = self.settings.admin_report_channel.as_deref() else {
            return Ok(false);
        };
        let text = admin_report_text(names, self.settings.dry_run);
        let resp = self.api.call(
            POST_ENDPOINT,
            &[("channel", admin_channel.to_string()), ("text", text)],
            Method::Post,
        )?;
        if is_ok(&resp) {
            self.audit.info(
                "report",
                Some(admin_channel),
                "admin report posted",
            );
            return Ok(true);
        }
        self.audit.error(
            "report",
            Some(admin_channel),
            ReaperErrorCode::E003ApiError,
            &format!("Error posting admin report: {}", error_text(&resp)),
        );
        Ok(false)
    }
}
