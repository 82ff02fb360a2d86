//! Fitness data from an external helper script.
//!
//! The script is invoked once per command as
//! `<program> <script> <command> --username U --password P [--date D]
//! [--start-date S] [--end-date E] [--activity-id A]` and prints one JSON
//! document on stdout. Diagnostics go to stderr and are only logged.
//!
//! Responses share the food cache's expiry semantics, and calls are spaced
//! per user so a burst of requests does not trip the upstream rate limit.

mod limiter;
mod types;

pub use limiter::UserRateLimiter;
pub use types::{Activity, ConnectionProfile, ConnectionStatus, DailySummary};

use crate::cache::{Clock, ResponseCache, SystemClock};
use crate::config::FitnessSettings;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const PROFILE_TTL: Duration = Duration::from_secs(60 * 60);
const ACTIVITY_TTL: Duration = Duration::from_secs(15 * 60);
const MAX_STDERR: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum FitnessError {
    #[error("Failed to start fitness helper: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Fitness helper timed out after {0:?}")]
    Timeout(Duration),

    #[error("Fitness helper exited with {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("Fitness helper returned malformed output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Fitness service error: {0}")]
    Upstream(String),

    #[error("Rate limited; retry in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },
}

impl FitnessError {
    pub fn code_str(&self) -> &'static str {
        match self {
            FitnessError::Spawn(_) => "spawn_error",
            FitnessError::Timeout(_) => "timeout",
            FitnessError::Exit { .. } => "exit_error",
            FitnessError::Decode(_) => "parse_error",
            FitnessError::Upstream(_) => "upstream_error",
            FitnessError::RateLimited { .. } => "rate_limited",
        }
    }
}

/// Account credentials. The password is never printed.
#[derive(Clone)]
pub struct FitnessCredentials {
    pub username: String,
    pub password: String,
}

impl FitnessCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for FitnessCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitnessCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FitnessCommand {
    Authenticate,
    Profile,
    Activities {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
    ActivityDetails {
        activity_id: String,
    },
    DailySummary {
        date: NaiveDate,
    },
    DailySummaries {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
    Test,
}

impl FitnessCommand {
    pub fn name(&self) -> &'static str {
        match self {
            FitnessCommand::Authenticate => "authenticate",
            FitnessCommand::Profile => "profile",
            FitnessCommand::Activities { .. } => "activities",
            FitnessCommand::ActivityDetails { .. } => "activity_details",
            FitnessCommand::DailySummary { .. } => "daily_summary",
            FitnessCommand::DailySummaries { .. } => "daily_summaries",
            FitnessCommand::Test => "test",
        }
    }

    /// Command-specific flags, excluding credentials.
    pub fn args(&self) -> Vec<(&'static str, String)> {
        let day = |d: &NaiveDate| d.format("%Y-%m-%d").to_string();
        match self {
            FitnessCommand::Authenticate | FitnessCommand::Profile | FitnessCommand::Test => {
                Vec::new()
            }
            FitnessCommand::Activities { start, end }
            | FitnessCommand::DailySummaries { start, end } => {
                let mut args = vec![("--start-date", day(start))];
                if let Some(end) = end {
                    args.push(("--end-date", day(end)));
                }
                args
            }
            FitnessCommand::ActivityDetails { activity_id } => {
                vec![("--activity-id", activity_id.clone())]
            }
            FitnessCommand::DailySummary { date } => vec![("--date", day(date))],
        }
    }

    /// How long a response stays fresh; `None` for commands never cached.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            FitnessCommand::Authenticate | FitnessCommand::Test => None,
            FitnessCommand::Profile => Some(PROFILE_TTL),
            FitnessCommand::Activities { .. }
            | FitnessCommand::ActivityDetails { .. }
            | FitnessCommand::DailySummary { .. }
            | FitnessCommand::DailySummaries { .. } => Some(ACTIVITY_TTL),
        }
    }

    pub fn cache_key(&self, username: &str) -> String {
        let args: Vec<String> = self.args().into_iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("fitness:{}:{}:{}", username, self.name(), args.join(","))
    }
}

/// Runs one helper invocation and returns its decoded stdout.
#[async_trait]
pub trait FitnessRunner: Send + Sync {
    async fn run(
        &self,
        credentials: &FitnessCredentials,
        command: &FitnessCommand,
    ) -> Result<Value, FitnessError>;
}

/// Runs the helper as a child process.
pub struct ScriptRunner {
    program: String,
    script: PathBuf,
    timeout: Duration,
}

impl ScriptRunner {
    pub fn new(program: impl Into<String>, script: PathBuf, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            script,
            timeout,
        }
    }

    pub fn from_settings(settings: &FitnessSettings) -> Self {
        Self::new(
            settings.program.clone(),
            settings.resolved_script(),
            Duration::from_secs(settings.timeout_secs),
        )
    }
}

#[async_trait]
impl FitnessRunner for ScriptRunner {
    async fn run(
        &self,
        credentials: &FitnessCredentials,
        command: &FitnessCommand,
    ) -> Result<Value, FitnessError> {
        use tokio::process::Command;

        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.script)
            .arg(command.name())
            .arg("--username")
            .arg(&credentials.username)
            .arg("--password")
            .arg(&credentials.password);
        for (flag, value) in command.args() {
            cmd.arg(flag).arg(value);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(FitnessError::Spawn)?;

        // Dropping the wait future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| FitnessError::Timeout(self.timeout))?
            .map_err(FitnessError::Spawn)?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(target: "larder.fitness", command = command.name(), stderr = %stderr.trim(), "helper diagnostics");
        }
        if !output.status.success() {
            return Err(FitnessError::Exit {
                code: output.status.code(),
                stderr: tail(stderr.trim(), MAX_STDERR),
            });
        }

        parse_output(&String::from_utf8_lossy(&output.stdout))
    }
}

fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

/// Decode helper stdout. Stray lines printed before the result are
/// tolerated; the last line holding JSON wins.
fn parse_output(stdout: &str) -> Result<Value, FitnessError> {
    let trimmed = stdout.trim();
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(e) => trimmed
            .lines()
            .rev()
            .map(str::trim)
            .filter(|line| line.starts_with('{') || line.starts_with('['))
            .find_map(|line| serde_json::from_str(line).ok())
            .ok_or(FitnessError::Decode(e)),
    }
}

/// Turn an `{"error": ..}` payload into an error. Payloads carrying a
/// `success` flag are statuses and are returned as-is.
fn check_payload(value: Value) -> Result<Value, FitnessError> {
    let Some(object) = value.as_object() else {
        return Ok(value);
    };
    if object.get("status_code").and_then(Value::as_u64) == Some(429) {
        return Err(FitnessError::RateLimited {
            retry_after: Duration::ZERO,
        });
    }
    if object.contains_key("success") {
        return Ok(value);
    }
    match object.get("error") {
        Some(Value::String(message)) => Err(FitnessError::Upstream(message.clone())),
        Some(other) => Err(FitnessError::Upstream(other.to_string())),
        None => Ok(value),
    }
}

pub struct SubprocessFitnessClient {
    runner: Arc<dyn FitnessRunner>,
    cache: Arc<ResponseCache<Value>>,
    limiter: UserRateLimiter,
    sweeper: Option<JoinHandle<()>>,
}

impl SubprocessFitnessClient {
    pub fn new(settings: &FitnessSettings) -> Self {
        Self::with_runner(
            Arc::new(ScriptRunner::from_settings(settings)),
            settings,
            Arc::new(SystemClock),
        )
    }

    /// The periodic cache sweeper is started when a tokio runtime is running.
    pub fn with_runner(
        runner: Arc<dyn FitnessRunner>,
        settings: &FitnessSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(ResponseCache::new(clock.clone(), ACTIVITY_TTL));
        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(_) => Some(cache.spawn_sweeper()),
            Err(_) => {
                debug!(target: "larder.fitness", "no runtime; cache sweeper not started");
                None
            }
        };

        Self {
            runner,
            cache,
            limiter: UserRateLimiter::new(
                Duration::from_secs(settings.min_interval_secs),
                Duration::from_secs(settings.rate_limit_cooldown_secs),
                clock,
            ),
            sweeper,
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache<Value>> {
        &self.cache
    }

    fn cached(&self, key: &str, command: &FitnessCommand) -> Option<Value> {
        command.ttl()?;
        let value = self.cache.get(key)?;
        debug!(target: "larder.fitness", key = %key, "cache hit");
        Some(value)
    }

    /// Call the helper, bypassing the cache.
    async fn fetch(
        &self,
        credentials: &FitnessCredentials,
        command: &FitnessCommand,
    ) -> Result<Value, FitnessError> {
        let user = credentials.username.as_str();
        self.limiter
            .acquire(user)
            .map_err(|retry_after| FitnessError::RateLimited { retry_after })?;

        let raw = self.runner.run(credentials, command).await?;
        match check_payload(raw) {
            Err(FitnessError::RateLimited { .. }) => {
                warn!(target: "larder.fitness", user, command = command.name(), "upstream rate limit; cooling down");
                self.limiter.penalize(user);
                Err(FitnessError::RateLimited {
                    retry_after: self.limiter.cooldown(),
                })
            }
            other => other,
        }
    }

    fn store(&self, key: String, command: &FitnessCommand, value: &Value) {
        if let Some(ttl) = command.ttl() {
            self.cache.set(key, value.clone(), ttl);
        }
    }

    /// Run `command`, serving fresh cached responses first.
    pub async fn execute(
        &self,
        credentials: &FitnessCredentials,
        command: &FitnessCommand,
    ) -> Result<Value, FitnessError> {
        let key = command.cache_key(&credentials.username);
        if let Some(value) = self.cached(&key, command) {
            return Ok(value);
        }

        let value = self.fetch(credentials, command).await?;
        self.store(key, command, &value);
        Ok(value)
    }

    /// Like [`SubprocessFitnessClient::execute`], decoding into `T`. A cached
    /// value that no longer decodes is dropped and fetched again; a fresh
    /// value that does not decode is an error and is never cached.
    async fn execute_typed<T: DeserializeOwned>(
        &self,
        credentials: &FitnessCredentials,
        command: FitnessCommand,
    ) -> Result<T, FitnessError> {
        let key = command.cache_key(&credentials.username);
        if let Some(value) = self.cached(&key, &command) {
            match serde_json::from_value(value) {
                Ok(typed) => return Ok(typed),
                Err(_) => {
                    debug!(target: "larder.fitness", command = command.name(), "stale cache entry; refetching");
                    self.cache.delete(&key);
                }
            }
        }

        let value = self.fetch(credentials, &command).await?;
        let typed = serde_json::from_value(value.clone())?;
        self.store(key, &command, &value);
        Ok(typed)
    }

    pub async fn authenticate(
        &self,
        credentials: &FitnessCredentials,
    ) -> Result<ConnectionStatus, FitnessError> {
        self.execute_typed(credentials, FitnessCommand::Authenticate).await
    }

    pub async fn test_connection(
        &self,
        credentials: &FitnessCredentials,
    ) -> Result<ConnectionStatus, FitnessError> {
        self.execute_typed(credentials, FitnessCommand::Test).await
    }

    pub async fn profile(&self, credentials: &FitnessCredentials) -> Result<Value, FitnessError> {
        self.execute(credentials, &FitnessCommand::Profile).await
    }

    pub async fn daily_summary(
        &self,
        credentials: &FitnessCredentials,
        date: NaiveDate,
    ) -> Result<DailySummary, FitnessError> {
        self.execute_typed(credentials, FitnessCommand::DailySummary { date })
            .await
    }

    pub async fn daily_summaries(
        &self,
        credentials: &FitnessCredentials,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DailySummary>, FitnessError> {
        self.execute_typed(credentials, FitnessCommand::DailySummaries { start, end })
            .await
    }

    pub async fn activities(
        &self,
        credentials: &FitnessCredentials,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Activity>, FitnessError> {
        self.execute_typed(credentials, FitnessCommand::Activities { start, end })
            .await
    }

    pub async fn activity_details(
        &self,
        credentials: &FitnessCredentials,
        activity_id: &str,
    ) -> Result<Value, FitnessError> {
        let command = FitnessCommand::ActivityDetails {
            activity_id: activity_id.to_string(),
        };
        self.execute(credentials, &command).await
    }
}

impl Drop for SubprocessFitnessClient {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeRunner {
        responses: Mutex<Vec<Value>>,
        calls: AtomicUsize,
    }

    impl FakeRunner {
        fn new(responses: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FitnessRunner for FakeRunner {
        async fn run(
            &self,
            _credentials: &FitnessCredentials,
            _command: &FitnessCommand,
        ) -> Result<Value, FitnessError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            Ok(if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            })
        }
    }

    fn client(runner: Arc<FakeRunner>) -> (SubprocessFitnessClient, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let settings = FitnessSettings {
            min_interval_secs: 0,
            ..FitnessSettings::default()
        };
        (
            SubprocessFitnessClient::with_runner(runner, &settings, clock.clone()),
            clock,
        )
    }

    fn creds() -> FitnessCredentials {
        FitnessCredentials::new("ana@example.com", "hunter2")
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_command_args_and_keys() {
        let cmd = FitnessCommand::Activities {
            start: date("2024-03-01"),
            end: Some(date("2024-03-07")),
        };
        assert_eq!(cmd.name(), "activities");
        assert_eq!(
            cmd.args(),
            vec![
                ("--start-date", "2024-03-01".to_string()),
                ("--end-date", "2024-03-07".to_string())
            ]
        );
        assert_eq!(
            cmd.cache_key("ana"),
            "fitness:ana:activities:--start-date=2024-03-01,--end-date=2024-03-07"
        );
        assert_eq!(FitnessCommand::Test.ttl(), None);
        assert_eq!(FitnessCommand::Profile.ttl(), Some(PROFILE_TTL));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let printed = format!("{:?}", creds());
        assert!(printed.contains("ana@example.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_parse_output_tolerates_stray_lines() {
        let value = parse_output("Connecting...\n{\"date\": \"2024-03-01\"}\n").unwrap();
        assert_eq!(value["date"], "2024-03-01");
        assert!(matches!(parse_output("nope"), Err(FitnessError::Decode(_))));
    }

    #[test]
    fn test_check_payload() {
        assert!(matches!(
            check_payload(json!({"error": "bad password"})),
            Err(FitnessError::Upstream(m)) if m == "bad password"
        ));
        assert!(matches!(
            check_payload(json!({"error": "slow down", "status_code": 429})),
            Err(FitnessError::RateLimited { .. })
        ));
        assert!(check_payload(json!({"success": false, "error": "nope"})).is_ok());
        assert!(check_payload(json!([1, 2])).is_ok());
    }

    #[tokio::test]
    async fn test_daily_summary_cached_until_ttl() {
        let runner = FakeRunner::new(vec![json!({
            "date": "2024-03-01",
            "total_steps": 8412,
            "total_calories": "2310",
            "resting_heart_rate": null
        })]);
        let (client, clock) = client(runner.clone());

        let summary = client.daily_summary(&creds(), date("2024-03-01")).await.unwrap();
        assert_eq!(summary.total_steps, Some(8412.0));
        assert_eq!(summary.total_calories, Some(2310.0));
        assert_eq!(summary.resting_heart_rate, None);

        client.daily_summary(&creds(), date("2024-03-01")).await.unwrap();
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);

        clock.advance(ACTIVITY_TTL);
        client.daily_summary(&creds(), date("2024-03-01")).await.unwrap();
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_test_connection_never_cached() {
        let runner = FakeRunner::new(vec![json!({"success": true, "message": "ok"})]);
        let (client, _clock) = client(runner.clone());
        assert!(client.test_connection(&creds()).await.unwrap().success);
        assert!(client.test_connection(&creds()).await.unwrap().success);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_starts_cooldown() {
        let runner = FakeRunner::new(vec![
            json!({"error": "Too many requests", "status_code": 429}),
            json!([]),
        ]);
        let (client, clock) = client(runner.clone());

        let err = client
            .activities(&creds(), date("2024-03-01"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FitnessError::RateLimited { retry_after } if retry_after == Duration::from_secs(900)
        ));

        // blocked without touching the helper
        assert!(client.activities(&creds(), date("2024-03-01"), None).await.is_err());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(900));
        let activities = client
            .activities(&creds(), date("2024-03-01"), None)
            .await
            .unwrap();
        assert!(activities.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_error_not_cached() {
        let runner = FakeRunner::new(vec![
            json!({"error": "No fitness data available for 2024-03-02"}),
            json!({"date": "2024-03-02"}),
        ]);
        let (client, _clock) = client(runner.clone());
        assert!(matches!(
            client.daily_summary(&creds(), date("2024-03-02")).await,
            Err(FitnessError::Upstream(_))
        ));
        assert!(client.daily_summary(&creds(), date("2024-03-02")).await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_cache_entry_refetched() {
        let runner = FakeRunner::new(vec![json!({"date": "2024-03-03", "total_steps": 10})]);
        let (client, _clock) = client(runner.clone());
        let command = FitnessCommand::DailySummary {
            date: date("2024-03-03"),
        };
        client.cache().set(
            command.cache_key("ana@example.com"),
            json!("not a summary"),
            ACTIVITY_TTL,
        );

        let summary = client.daily_summary(&creds(), date("2024-03-03")).await.unwrap();
        assert_eq!(summary.total_steps, Some(10.0));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = ScriptRunner::new(
            "larder-definitely-missing-program",
            PathBuf::from("fitness_service.py"),
            Duration::from_secs(5),
        );
        let err = runner
            .run(&creds(), &FitnessCommand::Test)
            .await
            .unwrap_err();
        assert!(matches!(err, FitnessError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_fresh_undecodable_payload_is_decode_error() {
        let runner = FakeRunner::new(vec![json!({"unexpected": true})]);
        let clock = Arc::new(ManualClock::new());
        let client =
            SubprocessFitnessClient::with_runner(runner.clone(), &FitnessSettings::default(), clock);

        let err = client
            .daily_summary(&creds(), date("2024-03-04"))
            .await
            .unwrap_err();
        assert!(matches!(err, FitnessError::Decode(_)), "{err:?}");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert!(client.cache().is_empty());
    }

    #[test]
    fn test_sweeper_needs_runtime() {
        let runner = FakeRunner::new(vec![json!({})]);
        let (client, _clock) = client(runner);
        assert!(client.sweeper.is_none());
    }

    #[tokio::test]
    async fn test_sweeper_started_inside_runtime() {
        let runner = FakeRunner::new(vec![json!({})]);
        let (client, _clock) = client(runner);
        assert!(client.sweeper.is_some());
    }
}
