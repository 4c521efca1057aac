//! Process-wide configuration, threaded through constructors rather than kept as module-level
//! statics.
//!
//! The upstream source this crate's behaviour is modelled on (`config.py`) is a module of bare
//! constants imported wherever they're needed. That works in a single-process script but hides
//! every dependency a type has on its environment. Here a single [`Config`] value is built once at
//! startup and passed (usually behind an `Arc`) into every constructor that needs it.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Deserialize;

use crate::planner::status::PlanTaskStatus;

/// Horizons a [`crate::planner::Planner`] maintains a plan for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Horizon {
    pub const ALL: [Horizon; 5] = [
        Horizon::Day,
        Horizon::Week,
        Horizon::Month,
        Horizon::Quarter,
        Horizon::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Day => "day",
            Horizon::Week => "week",
            Horizon::Month => "month",
            Horizon::Quarter => "quarter",
            Horizon::Year => "year",
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two label names the analyzer and planner treat specially.
#[derive(Debug, Clone)]
pub struct SpecialLabels {
    pub goal: String,
    pub success: String,
}

impl Default for SpecialLabels {
    fn default() -> Self {
        Self {
            goal: "GOAL".to_string(),
            success: "SUCCESS".to_string(),
        }
    }
}

/// Acceptable `strftime`-style patterns for the three wire representations of a due-datetime.
pub fn default_datetime_formats() -> Vec<String> {
    vec![
        "%Y-%m-%dT%H:%M:%S".to_string(),
        "%Y-%m-%dT%H:%M:%SZ".to_string(),
        "%Y-%m-%dT%H:%M:%S%.fZ".to_string(),
    ]
}

/// Builds the legal plan-task-status transition table (§4.5) as data, per open-question decision
/// D2 in DESIGN.md, instead of hard-coding it in the state machine's match arms.
///
/// Keyed by [`PlanTaskStatus`] — the status a task is currently *stored* under inside one plan.
/// A task not yet present in the plan has no entry here; [`Plan::process_task`] falls back to
/// `{Planned}` in that case (see DESIGN.md's note on the table's `added`/`loaded` rows, which
/// key off the arriving event kind rather than a stored status and are unreachable in the source
/// this is ported from).
pub fn default_transition_table() -> HashMap<PlanTaskStatus, HashSet<PlanTaskStatus>> {
    use PlanTaskStatus::*;
    let mut table = HashMap::new();
    table.insert(Planned, HashSet::from([Postponed, Completed, Deleted]));
    table.insert(Postponed, HashSet::from([Planned, Completed, Deleted]));
    table.insert(Completed, HashSet::from([Planned, Postponed, Deleted]));
    table.insert(
        CompletedRecurring,
        HashSet::from([Planned, Completed, Postponed, Deleted]),
    );
    table.insert(Deleted, HashSet::new());
    table
}

/// Process-wide configuration. Build with [`Config::from_env`] at startup and thread it through
/// every constructor (stores, remote client, planner, analyzer, orchestrator) that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote task service, e.g. `https://api.example.com`.
    pub remote_base_url: String,
    /// Bearer token used to authenticate against the remote task service.
    pub remote_token: String,
    /// Postgres connection string.
    pub database_url: String,
    /// Base URL of the notifier HTTP endpoint.
    pub notifier_base_url: Option<String>,
    /// Chat/recipient id the notifier forwards reports to.
    pub notifier_chat_id: Option<String>,

    /// Tick interval, in seconds. Also used to derive the daily rollover's wall-clock minute.
    pub sync_timeout: Duration,
    /// Maximum event-log page budget, in weeks.
    pub events_sync_full_sync_pages: u32,
    /// `strftime`-style pattern for a bare due-date.
    pub date_format: String,
    /// Acceptable patterns for a due-datetime.
    pub datetime_formats: Vec<String>,
    /// Label names with special meaning to the planner and analyzer.
    pub special_labels: SpecialLabels,
    /// Character budget before a task's content is truncated in log lines.
    pub task_content_len_threshold: usize,
    /// Delay between per-project archive-fetch calls (§5/§9, decision D3).
    pub archive_fetch_delay: Duration,
    /// Per-remote-call timeout.
    pub remote_call_timeout: Duration,
    /// Maximum attempts (including the first) for a single remote call before giving up on a
    /// transient ([`crate::error::WaypointError::retryable`]) failure (§4.3, §7).
    pub max_remote_retries: u32,
    /// Base delay for the remote client's exponential backoff between retries.
    pub remote_retry_backoff_base: Duration,
}

/// Errors that can occur while assembling [`Config`] from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
}

impl Config {
    /// Builds configuration by layering environment variables (`WAYPOINT_*`) over compiled-in
    /// defaults. Credentials never have a compiled-in default: a missing one is a startup error
    /// (§6 "Exit codes").
    pub fn from_env() -> Result<Self, ConfigError> {
        #[derive(Deserialize, Default)]
        struct Raw {
            remote_base_url: Option<String>,
            remote_token: Option<String>,
            database_url: Option<String>,
            notifier_base_url: Option<String>,
            notifier_chat_id: Option<String>,
            sync_timeout_seconds: Option<u64>,
            events_sync_full_sync_pages: Option<u32>,
        }

        let raw: Raw = config::Config::builder()
            .add_source(config::Environment::with_prefix("WAYPOINT"))
            .build()?
            .try_deserialize()
            .unwrap_or_default();

        let remote_base_url = raw
            .remote_base_url
            .ok_or(ConfigError::MissingVar("WAYPOINT_REMOTE_BASE_URL"))?;
        let remote_token = raw
            .remote_token
            .ok_or(ConfigError::MissingVar("WAYPOINT_REMOTE_TOKEN"))?;
        let database_url = raw
            .database_url
            .ok_or(ConfigError::MissingVar("WAYPOINT_DATABASE_URL"))?;

        Ok(Config {
            remote_base_url,
            remote_token,
            database_url,
            notifier_base_url: raw.notifier_base_url,
            notifier_chat_id: raw.notifier_chat_id,
            sync_timeout: Duration::from_secs(raw.sync_timeout_seconds.unwrap_or(600)),
            events_sync_full_sync_pages: raw.events_sync_full_sync_pages.unwrap_or(52),
            date_format: "%Y-%m-%d".to_string(),
            datetime_formats: default_datetime_formats(),
            special_labels: SpecialLabels::default(),
            task_content_len_threshold: 50,
            archive_fetch_delay: Duration::from_secs(5),
            remote_call_timeout: Duration::from_secs(30),
            max_remote_retries: 3,
            remote_retry_backoff_base: Duration::from_millis(200),
        })
    }

    /// The transition table a fresh [`Config`] carries. Exposed as a method (rather than forcing
    /// every caller through [`default_transition_table`]) so a future revision could make this
    /// data-driven from the environment instead of compiled in.
    pub fn transition_table(&self) -> HashMap<PlanTaskStatus, HashSet<PlanTaskStatus>> {
        default_transition_table()
    }

    /// The wall-clock minute-of-day the daily rollover fires at: `sync_timeout` minutes (rounded
    /// up) past midnight, plus one, guaranteeing the preceding tick has completed (§4.7).
    pub fn rollover_minute_of_day(&self) -> u32 {
        (self.sync_timeout.as_secs() / 60) as u32 + 1
    }

    /// A [`Config`] with placeholder credentials, for use in tests that never open a real
    /// network or DB connection. Not `#[cfg(test)]`-gated since integration tests under `tests/`
    /// link the crate as an ordinary dependency and need it too.
    pub fn for_tests() -> Self {
        Config {
            remote_base_url: "http://localhost".to_string(),
            remote_token: "test-token".to_string(),
            database_url: "postgres://localhost/test".to_string(),
            notifier_base_url: None,
            notifier_chat_id: None,
            sync_timeout: Duration::from_secs(600),
            events_sync_full_sync_pages: 52,
            date_format: "%Y-%m-%d".to_string(),
            datetime_formats: default_datetime_formats(),
            special_labels: SpecialLabels::default(),
            task_content_len_threshold: 50,
            archive_fetch_delay: Duration::from_millis(0),
            remote_call_timeout: Duration::from_secs(30),
            max_remote_retries: 3,
            remote_retry_backoff_base: Duration::from_millis(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollover_minute_is_one_past_sync_timeout() {
        let mut config = Config::for_tests();
        config.sync_timeout = Duration::from_secs(600);
        assert_eq!(config.rollover_minute_of_day(), 11);
    }

    #[test]
    fn transition_table_has_no_outgoing_edges_from_deleted() {
        let config = Config::for_tests();
        let table = config.transition_table();
        assert!(table[&PlanTaskStatus::Deleted].is_empty());
    }
}
