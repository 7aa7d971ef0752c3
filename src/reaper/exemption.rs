use crate::error::ReaperError;
use crate::reaper::catalog::ChannelRecord;
use crate::slack::{Method, SlackApi, require_ok};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const INFO_ENDPOINT: &str = "conversations.info";

/// Whitelist entries from the keyword file (one per line, optional) followed
/// by the configured keywords.
pub fn load_whitelist(path: &Path, configured: &[String]) -> Result<Vec<String>> {
    let mut keywords = match fs::read_to_string(path) {
        Ok(raw) => raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>(),
        Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    keywords.extend(
        configured
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string),
    );
    Ok(keywords)
}

pub fn matches_skip_marker(skip_marker: &str, purpose: &str, topic: &str) -> bool {
    !skip_marker.is_empty() && (purpose.contains(skip_marker) || topic.contains(skip_marker))
}

pub fn matches_whitelist(channel_name: &str, whitelist: &[String]) -> bool {
    whitelist
        .iter()
        .map(|entry| entry.trim().trim_start_matches('#'))
        .any(|entry| !entry.is_empty() && channel_name.contains(entry))
}

fn text_field<'a>(channel: &'a Value, key: &str) -> &'a str {
    channel
        .get(key)
        .and_then(|v| v.get("value"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

pub fn is_exempt(
    api: &dyn SlackApi,
    channel: &ChannelRecord,
    skip_marker: &str,
    whitelist: &[String],
) -> Result<bool, ReaperError> {
    let payload = [("channel", channel.id.clone())];
    let info = require_ok(INFO_ENDPOINT, api.call(INFO_ENDPOINT, &payload, Method::Get)?)?;
    let detail = info
        .get("channel")
        .ok_or_else(|| ReaperError::malformed(INFO_ENDPOINT, "reply missing `channel`"))?;

    if matches_skip_marker(skip_marker, text_field(detail, "purpose"), text_field(detail, "topic")) {
        tracing::debug!(channel = %channel.name, "skip marker present");
        return Ok(true);
    }
    Ok(matches_whitelist(&channel.name, whitelist))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::fake::FakeSlack;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::tempdir;

    fn channel(name: &str) -> ChannelRecord {
        ChannelRecord {
            id: "C1".to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
            member_count: 3,
            bot_is_member: true,
        }
    }

    fn info(purpose: &str, topic: &str) -> Value {
        json!({"ok": true, "channel": {
            "id": "C1",
            "purpose": {"value": purpose},
            "topic": {"value": topic},
        }})
    }

    #[test]
    fn skip_marker_in_purpose_or_topic() {
        assert!(matches_skip_marker("%noarchive", "keep this %noarchive", ""));
        assert!(matches_skip_marker("%noarchive", "", "%noarchive please"));
        assert!(!matches_skip_marker("%noarchive", "%NOARCHIVE", "nothing"));
        assert!(!matches_skip_marker("", "anything", "at all"));
    }

    #[test]
    fn whitelist_is_substring_of_name_with_hash_stripped() {
        let whitelist = vec!["general".to_string()];
        assert!(matches_whitelist("general-archive", &whitelist));
        assert!(matches_whitelist("#general-archive", &whitelist));
        assert!(matches_whitelist("general-archive", &["#general".to_string()]));
        assert!(!matches_whitelist("random", &whitelist));
        assert!(!matches_whitelist("General", &whitelist));
        assert!(!matches_whitelist("random", &[String::new(), "#".to_string()]));
    }

    #[test]
    fn whitelist_file_lines_then_configured_keywords() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("whitelist.txt");
        fs::write(&path, "#announcements\n  team-  \n\nops\n").expect("write whitelist");
        let got = load_whitelist(&path, &[" hr ".to_string(), "legal".to_string()]).expect("load");
        assert_eq!(got, vec!["#announcements", "team-", "ops", "hr", "legal"]);
    }

    #[test]
    fn missing_whitelist_file_is_empty() {
        let tmp = tempdir().expect("tempdir");
        let got = load_whitelist(&tmp.path().join("nope.txt"), &[]).expect("load");
        assert!(got.is_empty());
    }

    #[test]
    fn is_exempt_checks_marker_then_name() {
        let api = FakeSlack::new();
        api.reply_for(INFO_ENDPOINT, "C1", info("Team chat %noarchive", ""));
        assert!(is_exempt(&api, &channel("misc"), "%noarchive", &[]).expect("exempt"));

        let api = FakeSlack::new();
        api.reply_for(INFO_ENDPOINT, "C1", info("", ""));
        assert!(is_exempt(&api, &channel("team-ops"), "%noarchive", &["ops".to_string()])
            .expect("exempt"));
        assert!(!is_exempt(&api, &channel("random"), "%noarchive", &["ops".to_string()])
            .expect("exempt"));
    }

    #[test]
    fn info_error_is_reported() {
        let api = FakeSlack::new();
        api.reply(INFO_ENDPOINT, json!({"ok": false, "error": "channel_not_found"}));
        let err = is_exempt(&api, &channel("gone"), "%noarchive", &[]).unwrap_err();
        assert!(err.to_string().contains("channel_not_found"));
    }
}
