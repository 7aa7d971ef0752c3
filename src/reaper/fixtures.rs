use crate::error::{ReaperError, ReaperErrorCode};
use crate::reaper::audit::AuditLog;
use crate::slack::{Method, SlackApi, error_text, is_ok};
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_PREFIX: &str = "an-interesting-channel";
pub const DEFAULT_COUNT: u32 = 50;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FixtureSummary {
    pub created: Vec<String>,
    pub create_failures: usize,
    pub leave_failures: usize,
}

/// Create empty channels `{prefix}-0..{count}` and take the bot back out of
/// each one, so a trial sweep has something to find.
pub fn create_test_channels(
    api: &dyn SlackApi,
    audit: &AuditLog,
    prefix: &str,
    count: u32,
) -> Result<FixtureSummary, ReaperError> {
    let mut summary = FixtureSummary::default();

    for i in 0..count {
        let name = format!("{prefix}-{i}");
        audit.info("fixture", Some(&name), &format!("Creating channel: {name}"));
        let created = api.call(
            "conversations.create",
            &[("name", name.clone())],
            Method::Post,
        )?;
        if !is_ok(&created) {
            summary.create_failures += 1;
            audit.error(
                "fixture",
                Some(&name),
                ReaperErrorCode::E003ApiError,
                &format!("Error creating #{name}: {}", error_text(&created)),
            );
            continue;
        }

        let Some(id) = created
            .get("channel")
            .and_then(|c| c.get("id"))
            .and_then(Value::as_str)
        else {
            return Err(ReaperError::malformed(
                "conversations.create",
                "reply missing `channel.id`",
            ));
        };
        summary.created.push(name.clone());

        let left = api.call(
            "conversations.leave",
            &[("channel", id.to_string())],
            Method::Post,
        )?;
        if !is_ok(&left) {
            summary.leave_failures += 1;
            audit.error(
                "fixture",
                Some(&name),
                ReaperErrorCode::E003ApiError,
                &format!("Error removing the bot from #{name}: {}", error_text(&left)),
            );
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::fake::FakeSlack;
    use serde_json::json;

    #[test]
    fn creates_then_leaves_each_channel() {
        let api = FakeSlack::new();
        api.reply("conversations.create", json!({"ok": true, "channel": {"id": "CNEW"}}));
        api.reply("conversations.leave", json!({"ok": true}));

        let summary = create_test_channels(&api, &AuditLog::console_only(), "trial", 3)
            .expect("fixtures");

        assert_eq!(summary.created, vec!["trial-0", "trial-1", "trial-2"]);
        let creates = api.calls_to("conversations.create");
        assert_eq!(creates[2].param("name"), Some("trial-2"));
        assert_eq!(api.calls_to("conversations.leave").len(), 3);
    }

    #[test]
    fn failures_are_counted_and_loop_continues() {
        let api = FakeSlack::new();
        api.reply("conversations.create", json!({"ok": false, "error": "name_taken"}))
            .reply("conversations.create", json!({"ok": true, "channel": {"id": "C2"}}));
        api.reply("conversations.leave", json!({"ok": false, "error": "cant_leave_general"}));

        let summary = create_test_channels(&api, &AuditLog::console_only(), "trial", 2)
            .expect("fixtures");

        assert_eq!(summary.create_failures, 1);
        assert_eq!(summary.leave_failures, 1);
        assert_eq!(summary.created, vec!["trial-1"]);
    }
}
