//! # Load Configuration
//!
//! Everything tunable about a run comes from the process environment. Unset
//! variables fall back to the defaults below; a set but unparsable value is an
//! error rather than a silent fallback.
//!
//! `KEY_FILE_PATH` must hold a pre-issued bearer token, not a service-account
//! key.
//!
//! | Variable | Default |
//! |---|---|
//! | `INGEST_API_URL` | `http://localhost:8080` |
//! | `FILE_UPLOAD_URL` | `http://localhost:8070/v1` |
//! | `KEY_FILE_PATH` | `/data/secrets/key.json` |
//! | `AUTH_TOKEN` | unset |
//! | `FIXTURE_DIR` | `fixtures/secondary_analysis` |
//! | `LOAD_SCENARIO` | `sequence` |
//! | `LOAD_USERS` | `10` |
//! | `LOAD_UPLOADERS` | `10` |
//! | `LOAD_HATCH_RATE` | `10` |
//! | `LOAD_RUN_TIME` | `60` |
//! | `LOAD_ITERATIONS` | unset |
//! | `REQUEST_TIMEOUT_SECS` | `30` |
//! | `ACCESSIONING_MAX_ATTEMPTS` | unset |
//! | `UPLOAD_AREA_MAX_ATTEMPTS` | unset |
//! | `LOAD_TEARDOWN` | `run` |

use crate::framework::PollPolicy;
use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_INGEST_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_FILE_UPLOAD_URL: &str = "http://localhost:8070/v1";
pub const DEFAULT_KEY_FILE_PATH: &str = "/data/secrets/key.json";
pub const DEFAULT_FIXTURE_DIR: &str = "fixtures/secondary_analysis";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Which actor pools a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    /// Every user runs the four ordered stages itself.
    #[default]
    Sequence,
    /// Submission producers and file uploaders bridged by the shared queues.
    Split,
}

impl FromStr for Scenario {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequence" => Ok(Scenario::Sequence),
            "split" => Ok(Scenario::Split),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::Sequence => f.write_str("sequence"),
            Scenario::Split => f.write_str("split"),
        }
    }
}

/// Who ends the auth session and clears the shared queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeardownScope {
    /// Once, after every actor of the run has stopped.
    #[default]
    Run,
    /// Every actor on its own stop, affecting the whole run.
    EveryActor,
}

impl FromStr for TeardownScope {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "run" => Ok(TeardownScope::Run),
            "actor" => Ok(TeardownScope::EveryActor),
            _ => Err(()),
        }
    }
}

/// Configuration for a load run
#[derive(Debug, Clone, PartialEq)]
pub struct LoadConfig {
    pub ingest_api_url: String,
    pub file_upload_url: String,
    pub key_file_path: PathBuf,
    pub auth_token: Option<String>,
    pub fixture_dir: PathBuf,
    pub scenario: Scenario,
    pub users: usize,
    /// Uploader pool size, split scenario only.
    pub uploaders: usize,
    /// Actors spawned per second.
    pub hatch_rate: f64,
    /// `None` runs until the iteration budget is spent or the run is interrupted.
    pub run_time: Option<Duration>,
    /// Tasks per actor.
    pub iterations: Option<u64>,
    pub request_timeout: Duration,
    pub accessioning_max_attempts: Option<u32>,
    pub upload_area_max_attempts: Option<u32>,
    pub teardown: TeardownScope,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            ingest_api_url: DEFAULT_INGEST_API_URL.to_string(),
            file_upload_url: DEFAULT_FILE_UPLOAD_URL.to_string(),
            key_file_path: PathBuf::from(DEFAULT_KEY_FILE_PATH),
            auth_token: None,
            fixture_dir: PathBuf::from(DEFAULT_FIXTURE_DIR),
            scenario: Scenario::Sequence,
            users: 10,
            uploaders: 10,
            hatch_rate: 10.0,
            run_time: Some(Duration::from_secs(60)),
            iterations: None,
            request_timeout: Duration::from_secs(30),
            accessioning_max_attempts: None,
            upload_area_max_attempts: None,
            teardown: TeardownScope::Run,
        }
    }
}

impl LoadConfig {
    /// Load configuration from environment variables or defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LoadConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let run_time_secs: u64 = parse_or(&lookup, "LOAD_RUN_TIME", 60)?;
        let hatch_rate: f64 = parse_or(&lookup, "LOAD_HATCH_RATE", defaults.hatch_rate)?;
        if !(hatch_rate.is_finite() && hatch_rate > 0.0)
            || Duration::try_from_secs_f64(1.0 / hatch_rate).is_err()
        {
            return Err(invalid(&lookup, "LOAD_HATCH_RATE"));
        }

        Ok(Self {
            ingest_api_url: lookup("INGEST_API_URL").unwrap_or(defaults.ingest_api_url),
            file_upload_url: lookup("FILE_UPLOAD_URL").unwrap_or(defaults.file_upload_url),
            key_file_path: lookup("KEY_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.key_file_path),
            auth_token: lookup("AUTH_TOKEN").filter(|token| !token.trim().is_empty()),
            fixture_dir: lookup("FIXTURE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.fixture_dir),
            scenario: parse_or(&lookup, "LOAD_SCENARIO", defaults.scenario)?,
            users: parse_or(&lookup, "LOAD_USERS", defaults.users)?,
            uploaders: parse_or(&lookup, "LOAD_UPLOADERS", defaults.uploaders)?,
            hatch_rate,
            run_time: (run_time_secs > 0).then(|| Duration::from_secs(run_time_secs)),
            iterations: parse_opt(&lookup, "LOAD_ITERATIONS")?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?),
            accessioning_max_attempts: parse_attempts(&lookup, "ACCESSIONING_MAX_ATTEMPTS")?,
            upload_area_max_attempts: parse_attempts(&lookup, "UPLOAD_AREA_MAX_ATTEMPTS")?,
            teardown: parse_or(&lookup, "LOAD_TEARDOWN", defaults.teardown)?,
        })
    }

    pub fn accessioning_policy(&self) -> PollPolicy {
        PollPolicy::ACCESSIONING.with_max_attempts(self.accessioning_max_attempts)
    }

    pub fn upload_area_policy(&self) -> PollPolicy {
        PollPolicy::UPLOAD_AREA.with_max_attempts(self.upload_area_max_attempts)
    }

    /// Delay between two consecutive actor spawns. A rate too small to
    /// express waits forever.
    pub fn hatch_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.hatch_rate).unwrap_or(Duration::MAX)
    }
}

fn invalid<F>(lookup: &F, key: &'static str) -> ConfigError
where
    F: Fn(&str) -> Option<String>,
{
    ConfigError::Invalid {
        key,
        value: lookup(key).unwrap_or_default(),
    }
}

fn parse_opt<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// A poll bound has to allow at least one attempt.
fn parse_attempts<F>(lookup: &F, key: &'static str) -> Result<Option<u32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_opt::<NonZeroU32, F>(lookup, key)? {
        Some(attempts) => Ok(Some(attempts.get())),
        None => Ok(None),
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}
