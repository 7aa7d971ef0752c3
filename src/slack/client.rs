use crate::error::ReaperError;
use crate::reaper::audit::AuditLog;
use crate::slack::{Method, SlackApi};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use serde_json::Value;
use std::thread;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";
pub const DEFAULT_RATE_LIMIT_MARGIN_SECS: u64 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const FALLBACK_RETRY_AFTER_SECS: u64 = 1;

/// Error codes in an otherwise successful reply that mean the token itself is unusable.
const AUTH_ERRORS: &[&str] = &[
    "not_authed",
    "invalid_auth",
    "account_inactive",
    "token_revoked",
];

type Pause = Box<dyn Fn(Duration)>;

pub struct RateLimitedClient {
    http: Client,
    base_url: String,
    token: String,
    margin: Duration,
    pause: Pause,
    audit: AuditLog,
}

impl RateLimitedClient {
    pub fn new(
        base_url: &str,
        token: &str,
        margin_secs: u64,
        audit: AuditLog,
    ) -> Result<Self, ReaperError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|source| ReaperError::Transport {
                endpoint: "client-builder".to_string(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            margin: Duration::from_secs(margin_secs),
            pause: Box::new(thread::sleep),
            audit,
        })
    }

    /// Replace the blocking sleep used while rate-limited.
    #[cfg(test)]
    pub fn with_pause(mut self, pause: impl Fn(Duration) + 'static) -> Self {
        self.pause = Box::new(pause);
        self
    }

    fn send(
        &self,
        endpoint: &str,
        payload: &[(&str, String)],
        method: Method,
    ) -> Result<Response, ReaperError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let request = match method {
            Method::Get => self.http.get(&url).query(payload),
            Method::Post => self.http.post(&url).form(payload),
        };
        request
            .bearer_auth(&self.token)
            .send()
            .map_err(|source| ReaperError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    fn backoff_for(&self, response: &Response) -> Duration {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(FALLBACK_RETRY_AFTER_SECS);
        Duration::from_secs(retry_after) + self.margin
    }
}

impl SlackApi for RateLimitedClient {
    fn call(
        &self,
        endpoint: &str,
        payload: &[(&str, String)],
        method: Method,
    ) -> Result<Value, ReaperError> {
        let response = loop {
            let response = self.send(endpoint, payload, method)?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                break response;
            }
            let wait = self.backoff_for(&response);
            self.audit.info(
                "rate-limit",
                None,
                &format!(
                    "rate-limited on {endpoint}: trying again in {} seconds",
                    wait.as_secs()
                ),
            );
            (self.pause)(wait);
        };

        let status = response.status();
        let body = response.text().map_err(|source| ReaperError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let json: Value = serde_json::from_str(&body).map_err(|err| {
            ReaperError::malformed(endpoint, format!("status {status}: {err}"))
        })?;

        if status.is_success()
            && let Some(code) = json.get("error").and_then(Value::as_str)
            && AUTH_ERRORS.contains(&code)
        {
            return Err(ReaperError::NotAuthed(code.to_string()));
        }

        tracing::debug!(endpoint, method = method.as_str(), %status, "slack call finished");
        Ok(json)
    }
}
