use thiserror::Error;

pub const AUTH_INSTRUCTIONS: &str =
    "Need to setup auth. eg, BOT_SLACK_TOKEN=<secret token> channel-reaper sweep";

#[derive(Debug, Error)]
pub enum ReaperError {
    #[error("slack request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("slack rejected the bot token ({0}). {}", AUTH_INSTRUCTIONS)]
    NotAuthed(String),
    #[error("slack {endpoint} returned error: {error}")]
    Api { endpoint: String, error: String },
    #[error("malformed slack response from {endpoint}: {detail}")]
    MalformedResponse { endpoint: String, detail: String },
}

impl ReaperError {
    pub fn malformed(endpoint: &str, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }

    /// Fatal errors stop the whole sweep; everything else is reported per channel.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::NotAuthed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperErrorCode {
    E001NotAuthed,
    E002Transport,
    E003ApiError,
    E004Malformed,
}

impl ReaperErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001NotAuthed => "E001_NOT_AUTHED",
            Self::E002Transport => "E002_TRANSPORT",
            Self::E003ApiError => "E003_API_ERROR",
            Self::E004Malformed => "E004_MALFORMED",
        }
    }
}

impl From<&ReaperError> for ReaperErrorCode {
    fn from(err: &ReaperError) -> Self {
        match err {
            ReaperError::NotAuthed(_) => Self::E001NotAuthed,
            ReaperError::Transport { .. } => Self::E002Transport,
            ReaperError::Api { .. } => Self::E003ApiError,
            ReaperError::MalformedResponse { .. } => Self::E004Malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_authed_message_carries_instructions() {
        let err = ReaperError::NotAuthed("not_authed".to_string());
        let text = err.to_string();
        assert!(text.contains("not_authed"));
        assert!(text.contains("BOT_SLACK_TOKEN"));
        assert!(err.is_fatal());
    }

    #[test]
    fn api_errors_are_not_fatal() {
        let err = ReaperError::Api {
            endpoint: "conversations.archive".to_string(),
            error: "cant_archive_general".to_string(),
        };
        assert!(!err.is_fatal());
        assert_eq!(ReaperErrorCode::from(&err).as_str(), "E003_API_ERROR");
    }
}
