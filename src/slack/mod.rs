pub mod client;

use crate::error::ReaperError;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One Slack Web API call. Implementations return the decoded JSON body
/// untouched, leaving `ok: false` replies for the caller to inspect.
pub trait SlackApi {
    fn call(
        &self,
        endpoint: &str,
        payload: &[(&str, String)],
        method: Method,
    ) -> Result<Value, ReaperError>;
}

pub fn is_ok(resp: &Value) -> bool {
    resp.get("ok").and_then(Value::as_bool).unwrap_or(false)
}

pub fn error_text(resp: &Value) -> String {
    resp.get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_string()
}

/// Turn an `ok: false` reply into a typed error for callers that cannot continue.
pub fn require_ok(endpoint: &str, resp: Value) -> Result<Value, ReaperError> {
    if is_ok(&resp) {
        return Ok(resp);
    }
    Err(ReaperError::Api {
        endpoint: endpoint.to_string(),
        error: error_text(&resp),
    })
}
