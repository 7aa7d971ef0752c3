use crate::error::ReaperError;
use crate::reaper::catalog::ChannelRecord;
use crate::reaper::util::parse_slack_ts;
use crate::slack::{Method, SlackApi};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

const HISTORY_ENDPOINT: &str = "conversations.history";
pub const HISTORY_LIMIT: u32 = 50;

/// Membership system messages do not count as activity.
const MEMBERSHIP_SUBTYPES: &[&str] = &["channel_join", "channel_leave"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivityVerdict {
    pub last_activity_at: DateTime<Utc>,
    pub had_human_message: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Disuse {
    pub disused: bool,
    pub verdict: ActivityVerdict,
}

fn is_membership_event(message: &Value) -> bool {
    message
        .get("subtype")
        .and_then(Value::as_str)
        .is_some_and(|subtype| MEMBERSHIP_SUBTYPES.contains(&subtype))
}

/// Newest qualifying message in a history reply, or the creation time when
/// the channel has none.
pub fn last_activity(history: &Value, created_at: DateTime<Utc>) -> ActivityVerdict {
    let newest_real = history
        .get("messages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|message| !is_membership_event(message))
        .find_map(|message| message.get("ts").and_then(Value::as_str).and_then(parse_slack_ts));

    match newest_real {
        Some(at) => ActivityVerdict {
            last_activity_at: at,
            had_human_message: true,
        },
        None => ActivityVerdict {
            last_activity_at: created_at,
            had_human_message: false,
        },
    }
}

/// Old enough, and either never had a real message or falls under the
/// small-channel rule. With `min_member_exemption == 0` the rule always applies;
/// otherwise it applies only while `member_count < min_member_exemption`.
pub fn is_disused(
    verdict: &ActivityVerdict,
    member_count: u64,
    threshold: DateTime<Utc>,
    min_member_exemption: u64,
) -> bool {
    let small_channel = min_member_exemption == 0 || min_member_exemption > member_count;
    verdict.last_activity_at <= threshold && (!verdict.had_human_message || small_channel)
}

pub fn classify(
    api: &dyn SlackApi,
    channel: &ChannelRecord,
    threshold: DateTime<Utc>,
    min_member_exemption: u64,
) -> Result<Disuse, ReaperError> {
    let payload = [
        ("channel", channel.id.clone()),
        ("inclusive", "0".to_string()),
        ("oldest", "0".to_string()),
        ("limit", HISTORY_LIMIT.to_string()),
    ];
    let history = api.call(HISTORY_ENDPOINT, &payload, Method::Get)?;
    if let Some(error) = history.get("error").and_then(Value::as_str) {
        tracing::debug!(channel = %channel.name, error, "history unavailable, using creation time");
    }

    let verdict = last_activity(&history, channel.created_at);
    Ok(Disuse {
        disused: is_disused(&verdict, channel.member_count, threshold, min_member_exemption),
        verdict,
    })
}
