use crate::error::AUTH_INSTRUCTIONS;
use crate::slack::client::{DEFAULT_API_BASE_URL, DEFAULT_RATE_LIMIT_MARGIN_SECS};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaperConfig {
    pub days_inactive: u64,
    pub min_members: u64,
    pub skip_channel_str: String,
    pub admin_channel: Option<String>,
    pub dry_run: bool,
    pub whitelist_keywords: Vec<String>,
    pub whitelist_file: PathBuf,
    pub audit_log: PathBuf,
    pub api_base_url: String,
    pub rate_limit_margin_secs: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            days_inactive: 60,
            min_members: 0,
            skip_channel_str: "%noarchive".to_string(),
            admin_channel: None,
            dry_run: true,
            whitelist_keywords: Vec::new(),
            whitelist_file: PathBuf::from("whitelist.txt"),
            audit_log: PathBuf::from("audit.log"),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            rate_limit_margin_secs: DEFAULT_RATE_LIMIT_MARGIN_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PartialReaperConfig {
    days_inactive: Option<u64>,
    min_members: Option<u64>,
    skip_channel_str: Option<String>,
    admin_channel: Option<String>,
    dry_run: Option<bool>,
    whitelist_keywords: Option<Vec<String>>,
    whitelist_file: Option<PathBuf>,
    audit_log: Option<PathBuf>,
    api_base_url: Option<String>,
    rate_limit_margin_secs: Option<u64>,
}

/// Command-line values that win over every other layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsOverrides {
    pub dry_run: Option<bool>,
    pub days_inactive: Option<u64>,
}

/// Read-only settings for one run. `inactivity_threshold` is computed once
/// when the settings are built and every comparison in a sweep uses it.
#[derive(Clone)]
pub struct Settings {
    pub bot_token: String,
    pub days_inactive: u64,
    pub inactivity_threshold: DateTime<Utc>,
    pub min_member_exemption: u64,
    pub skip_marker: String,
    pub admin_report_channel: Option<String>,
    pub dry_run: bool,
    pub whitelist_keywords: Vec<String>,
    pub whitelist_file: PathBuf,
    pub audit_log: PathBuf,
    pub api_base_url: String,
    pub rate_limit_margin_secs: u64,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("bot_token", &self.redacted_token())
            .field("days_inactive", &self.days_inactive)
            .field("inactivity_threshold", &self.inactivity_threshold)
            .field("min_member_exemption", &self.min_member_exemption)
            .field("skip_marker", &self.skip_marker)
            .field("admin_report_channel", &self.admin_report_channel)
            .field("dry_run", &self.dry_run)
            .field("whitelist_keywords", &self.whitelist_keywords)
            .field("whitelist_file", &self.whitelist_file)
            .field("audit_log", &self.audit_log)
            .field("api_base_url", &self.api_base_url)
            .field("rate_limit_margin_secs", &self.rate_limit_margin_secs)
            .finish()
    }
}

impl Settings {
    pub fn from_config(cfg: ReaperConfig, bot_token: String, now: DateTime<Utc>) -> Result<Self> {
        let days = i64::try_from(cfg.days_inactive)
            .map_err(|_| anyhow!("invalid days inactive: {} is too large", cfg.days_inactive))?;
        let window = Duration::try_days(days)
            .ok_or_else(|| anyhow!("invalid days inactive: {days} is too large"))?;
        let inactivity_threshold = now
            .checked_sub_signed(window)
            .ok_or_else(|| anyhow!("invalid days inactive: {days} reaches before the epoch"))?;

        Ok(Self {
            bot_token,
            days_inactive: cfg.days_inactive,
            inactivity_threshold,
            min_member_exemption: cfg.min_members,
            skip_marker: cfg.skip_channel_str,
            admin_report_channel: cfg.admin_channel.filter(|c| !c.trim().is_empty()),
            dry_run: cfg.dry_run,
            whitelist_keywords: cfg.whitelist_keywords,
            whitelist_file: cfg.whitelist_file,
            audit_log: cfg.audit_log,
            api_base_url: cfg.api_base_url,
            rate_limit_margin_secs: cfg.rate_limit_margin_secs,
        })
    }

    pub fn require_token(&self) -> Result<&str> {
        if self.bot_token.trim().is_empty() {
            return Err(anyhow!(
                "BOT_SLACK_TOKEN is not set. {AUTH_INSTRUCTIONS}"
            ));
        }
        Ok(self.bot_token.trim())
    }

    pub fn redacted_token(&self) -> String {
        let token = self.bot_token.trim();
        if token.is_empty() {
            return "<unset>".to_string();
        }
        let prefix: String = token.chars().take(5).collect();
        format!("{prefix}…")
    }
}

type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_or_u64(var: EnvLookup<'_>, name: &str, fallback: u64) -> u64 {
    match var(name) {
        Some(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        None => fallback,
    }
}

fn env_or_bool(var: EnvLookup<'_>, name: &str, fallback: bool) -> bool {
    match var(name) {
        Some(v) => match v.trim() {
            "1" | "true" | "TRUE" | "True" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "False" | "no" | "off" => false,
            _ => fallback,
        },
        None => fallback,
    }
}

fn env_or_string(var: EnvLookup<'_>, name: &str, fallback: &str) -> String {
    match var(name) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_path(var: EnvLookup<'_>, name: &str, fallback: &Path) -> PathBuf {
    match var(name) {
        Some(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback.to_path_buf(),
    }
}

/// A set but empty variable yields an empty list.
fn env_or_csv(var: EnvLookup<'_>, name: &str, fallback: &[String]) -> Vec<String> {
    match var(name) {
        Some(v) => v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        None => fallback.to_vec(),
    }
}

fn apply_env(cfg: &mut ReaperConfig, var: EnvLookup<'_>) {
    cfg.days_inactive = env_or_u64(var, "DAYS_INACTIVE", cfg.days_inactive);
    cfg.min_members = env_or_u64(var, "MIN_MEMBERS", cfg.min_members);
    // An explicitly empty SKIP_CHANNEL_STR disables the marker.
    if let Some(v) = var("SKIP_CHANNEL_STR") {
        cfg.skip_channel_str = v.trim().to_string();
    }
    if let Some(v) = var("ADMIN_CHANNEL") {
        let trimmed = v.trim();
        cfg.admin_channel = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    cfg.dry_run = env_or_bool(var, "DRY_RUN", cfg.dry_run);
    cfg.whitelist_keywords = env_or_csv(var, "WHITELIST_KEYWORDS", &cfg.whitelist_keywords);
    cfg.whitelist_file = env_or_path(var, "REAPER_WHITELIST_FILE", &cfg.whitelist_file);
    cfg.audit_log = env_or_path(var, "REAPER_AUDIT_LOG", &cfg.audit_log);
    cfg.api_base_url = env_or_string(var, "REAPER_SLACK_API_URL", &cfg.api_base_url);
    cfg.rate_limit_margin_secs = env_or_u64(
        var,
        "REAPER_RATE_LIMIT_MARGIN_SECS",
        cfg.rate_limit_margin_secs,
    );
}

fn apply_overrides(cfg: &mut ReaperConfig, overrides: SettingsOverrides) {
    if let Some(dry_run) = overrides.dry_run {
        cfg.dry_run = dry_run;
    }
    if let Some(days) = overrides.days_inactive {
        cfg.days_inactive = days;
    }
}

fn validate(cfg: &ReaperConfig) -> Result<()> {
    if cfg.days_inactive == 0 {
        return Err(anyhow!("invalid days inactive: must be >= 1"));
    }
    if cfg.api_base_url.trim().is_empty() {
        return Err(anyhow!("invalid slack api url: cannot be empty"));
    }
    Ok(())
}

fn resolve_config_path(var: EnvLookup<'_>) -> Option<PathBuf> {
    if let Some(custom) = var("REAPER_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".channel-reaper").join("reaper.toml"))
}

fn merge_file_config(base: &mut ReaperConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: PartialReaperConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse reaper config {}: {err}", path.display()))?;

    if let Some(v) = parsed.days_inactive {
        base.days_inactive = v;
    }
    if let Some(v) = parsed.min_members {
        base.min_members = v;
    }
    if let Some(v) = parsed.skip_channel_str {
        base.skip_channel_str = v;
    }
    if parsed.admin_channel.is_some() {
        base.admin_channel = parsed.admin_channel;
    }
    if let Some(v) = parsed.dry_run {
        base.dry_run = v;
    }
    if let Some(v) = parsed.whitelist_keywords {
        base.whitelist_keywords = v;
    }
    if let Some(v) = parsed.whitelist_file {
        base.whitelist_file = v;
    }
    if let Some(v) = parsed.audit_log {
        base.audit_log = v;
    }
    if let Some(v) = parsed.api_base_url {
        base.api_base_url = v;
    }
    if let Some(v) = parsed.rate_limit_margin_secs {
        base.rate_limit_margin_secs = v;
    }
    Ok(())
}

fn load_config_from(var: EnvLookup<'_>, overrides: SettingsOverrides) -> Result<ReaperConfig> {
    let mut cfg = ReaperConfig::default();
    if let Some(path) = resolve_config_path(var) {
        merge_file_config(&mut cfg, &path)?;
    }
    apply_env(&mut cfg, var);
    apply_overrides(&mut cfg, overrides);
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_settings(overrides: SettingsOverrides) -> Result<Settings> {
    let lookup = |name: &str| env::var(name).ok();
    let cfg = load_config_from(&lookup, overrides)?;
    let token = lookup("BOT_SLACK_TOKEN").unwrap_or_default();
    Settings::from_config(cfg, token, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let tmp = tempdir().expect("tempdir");
        let missing = tmp.path().join("absent.toml");
        let missing = missing.to_string_lossy().to_string();
        let var = lookup_from(&[("REAPER_CONFIG_PATH", missing.as_str())]);
        let cfg = load_config_from(&var, SettingsOverrides::default()).expect("config");

        assert_eq!(cfg, ReaperConfig::default());
        assert_eq!(cfg.days_inactive, 60);
        assert!(cfg.dry_run);
        assert_eq!(cfg.skip_channel_str, "%noarchive");
    }

    #[test]
    fn file_then_env_then_cli_layering() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("reaper.toml");
        fs::write(
            &path,
            "days_inactive = 30\nmin_members = 4\nadmin_channel = \"C-ADMIN\"\nwhitelist_keywords = [\"keep\"]\n",
        )
        .expect("write config");
        let path = path.to_string_lossy().to_string();
        let var = lookup_from(&[
            ("REAPER_CONFIG_PATH", path.as_str()),
            ("MIN_MEMBERS", "7"),
            ("DRY_RUN", "false"),
            ("WHITELIST_KEYWORDS", " alpha, #beta ,,"),
        ]);
        let cfg = load_config_from(
            &var,
            SettingsOverrides {
                dry_run: None,
                days_inactive: Some(90),
            },
        )
        .expect("config");

        assert_eq!(cfg.days_inactive, 90);
        assert_eq!(cfg.min_members, 7);
        assert_eq!(cfg.admin_channel.as_deref(), Some("C-ADMIN"));
        assert!(!cfg.dry_run);
        assert_eq!(cfg.whitelist_keywords, vec!["alpha", "#beta"]);
    }

    #[test]
    fn empty_env_clears_file_lists_and_marker() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("reaper.toml");
        fs::write(
            &path,
            "skip_channel_str = \"%keep\"\nwhitelist_keywords = [\"keep\", \"ops\"]\n",
        )
        .expect("write config");
        let path = path.to_string_lossy().to_string();

        let unset = lookup_from(&[("REAPER_CONFIG_PATH", path.as_str())]);
        let cfg = load_config_from(&unset, SettingsOverrides::default()).expect("config");
        assert_eq!(cfg.whitelist_keywords, vec!["keep", "ops"]);
        assert_eq!(cfg.skip_channel_str, "%keep");

        let cleared = lookup_from(&[
            ("REAPER_CONFIG_PATH", path.as_str()),
            ("WHITELIST_KEYWORDS", " , "),
            ("SKIP_CHANNEL_STR", ""),
        ]);
        let cfg = load_config_from(&cleared, SettingsOverrides::default()).expect("config");
        assert!(cfg.whitelist_keywords.is_empty());
        assert!(cfg.skip_channel_str.is_empty());
    }

    #[test]
    fn unparseable_env_values_keep_previous_layer() {
        let var = lookup_from(&[
            ("REAPER_CONFIG_PATH", "/nonexistent/reaper.toml"),
            ("DAYS_INACTIVE", "soon"),
            ("DRY_RUN", "maybe"),
        ]);
        let cfg = load_config_from(&var, SettingsOverrides::default()).expect("config");
        assert_eq!(cfg.days_inactive, 60);
        assert!(cfg.dry_run);
    }

    #[test]
    fn zero_days_is_rejected() {
        let var = lookup_from(&[
            ("REAPER_CONFIG_PATH", "/nonexistent/reaper.toml"),
            ("DAYS_INACTIVE", "0"),
        ]);
        let err = load_config_from(&var, SettingsOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("days inactive"));
    }

    #[test]
    fn broken_toml_is_reported_with_path() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("reaper.toml");
        fs::write(&path, "days_inactive = \"many\"").expect("write config");
        let mut cfg = ReaperConfig::default();
        let err = merge_file_config(&mut cfg, &path).unwrap_err();
        assert!(err.to_string().contains("reaper.toml"));
    }

    #[test]
    fn threshold_is_frozen_at_construction() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("now");
        let cfg = ReaperConfig {
            days_inactive: 90,
            ..ReaperConfig::default()
        };
        let settings = Settings::from_config(cfg, "xoxb-abcdef".to_string(), now).expect("settings");
        assert_eq!(settings.inactivity_threshold, now - Duration::days(90));
        assert_eq!(settings.redacted_token(), "xoxb-…");
        assert!(!format!("{settings:?}").contains("abcdef"));
    }

    #[test]
    fn missing_token_explains_setup() {
        let settings = Settings::from_config(ReaperConfig::default(), String::new(), Utc::now())
            .expect("settings");
        let err = settings.require_token().unwrap_err();
        assert!(err.to_string().contains("BOT_SLACK_TOKEN"));
    }
}
