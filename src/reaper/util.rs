use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current Unix epoch in seconds.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Parse a Slack `ts` value (`"1512085950.000216"`) into a UTC instant.
pub fn parse_slack_ts(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = match ts.trim().split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (ts.trim(), ""),
    };
    let secs = secs.parse::<i64>().ok()?;
    let micros = if frac.is_empty() {
        0
    } else {
        let digits: String = frac.chars().take(6).collect();
        let padded = format!("{digits:0<6}");
        padded.parse::<u32>().ok()?
    };
    DateTime::from_timestamp(secs, micros * 1_000)
}

pub fn from_epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slack_ts_with_micros() {
        let got = parse_slack_ts("1512085950.000216").expect("ts");
        assert_eq!(got.timestamp(), 1_512_085_950);
        assert_eq!(got.timestamp_subsec_micros(), 216);
    }

    #[test]
    fn parses_slack_ts_without_fraction() {
        let got = parse_slack_ts("1700000000").expect("ts");
        assert_eq!(got.timestamp(), 1_700_000_000);
    }

    #[test]
    fn rejects_garbage_ts() {
        assert!(parse_slack_ts("yesterday").is_none());
        assert!(parse_slack_ts("12.ab").is_none());
    }
}
