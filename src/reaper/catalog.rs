use crate::error::ReaperError;
use crate::reaper::util::from_epoch_secs;
use crate::slack::{Method, SlackApi, require_ok};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

const LIST_ENDPOINT: &str = "conversations.list";
const PAGE_SIZE: u32 = 200;

/// Snapshot of a channel taken once per sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub member_count: u64,
    pub bot_is_member: bool,
}

impl ChannelRecord {
    pub fn from_raw(raw: &Value) -> Result<Self, ReaperError> {
        let field = |key: &str| {
            raw.get(key).ok_or_else(|| {
                ReaperError::malformed(LIST_ENDPOINT, format!("channel missing `{key}`"))
            })
        };
        let id = field("id")?
            .as_str()
            .ok_or_else(|| ReaperError::malformed(LIST_ENDPOINT, "channel `id` is not a string"))?;
        let name = field("name")?.as_str().ok_or_else(|| {
            ReaperError::malformed(LIST_ENDPOINT, format!("channel {id} `name` is not a string"))
        })?;
        let created_at = field("created")?
            .as_i64()
            .and_then(from_epoch_secs)
            .ok_or_else(|| {
                ReaperError::malformed(LIST_ENDPOINT, format!("channel {id} has invalid `created`"))
            })?;

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            created_at,
            member_count: raw.get("num_members").and_then(Value::as_u64).unwrap_or(0),
            bot_is_member: raw.get("is_member").and_then(Value::as_bool).unwrap_or(false),
        })
    }
}

fn next_cursor(page: &Value) -> Option<String> {
    page.get("response_metadata")
        .and_then(|m| m.get("next_cursor"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// Every non-archived channel, following `next_cursor` until the last page.
pub fn list_active_channels(api: &dyn SlackApi) -> Result<Vec<ChannelRecord>, ReaperError> {
    let mut channels = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let mut payload = vec![
            ("exclude_archived", "1".to_string()),
            ("limit", PAGE_SIZE.to_string()),
        ];
        if let Some(cursor) = &cursor {
            payload.push(("cursor", cursor.clone()));
        }

        let page = require_ok(LIST_ENDPOINT, api.call(LIST_ENDPOINT, &payload, Method::Get)?)?;
        let raw_channels = page
            .get("channels")
            .and_then(Value::as_array)
            .ok_or_else(|| ReaperError::malformed(LIST_ENDPOINT, "page missing `channels`"))?;
        for raw in raw_channels {
            channels.push(ChannelRecord::from_raw(raw)?);
        }

        match next_cursor(&page) {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    tracing::debug!(count = channels.len(), "catalog fetched");
    Ok(channels)
}
