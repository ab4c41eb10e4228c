//! Scheduler configuration and environment loading.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::WorkerPoolConfig;

/// Prefix for every environment variable read by [`RuntimeConfig::from_env`].
pub const ENV_PREFIX: &str = "AGENT_TASK_";

/// Retry budget and timeout applied to tasks that do not set their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefaults {
    /// Times a failed task may be requeued.
    pub max_retries: u32,
    /// Per-attempt execution timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout_secs: 300,
        }
    }
}

/// Configuration for a [`TaskScheduler`](crate::core::TaskScheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Cap on simultaneously running tasks.
    pub max_concurrent: usize,
    /// Defaults for tasks that leave retry budget or timeout unset.
    pub defaults: TaskDefaults,
    /// Base delay before a retried task becomes ready again. Zero disables backoff.
    pub retry_backoff_ms: u64,
    /// Upper bound for the exponential retry delay.
    pub max_retry_backoff_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            defaults: TaskDefaults::default(),
            retry_backoff_ms: 0,
            max_retry_backoff_ms: 30_000,
        }
    }
}

impl SchedulerConfig {
    /// Set the concurrency cap.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Set the task defaults.
    #[must_use]
    pub const fn with_defaults(mut self, defaults: TaskDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the base retry delay and its cap.
    #[must_use]
    pub const fn with_retry_backoff(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.retry_backoff_ms = base_ms;
        self.max_retry_backoff_ms = max_ms;
        self
    }

    /// Delay before attempt `retry_count` (1-based) becomes ready, if any.
    ///
    /// Doubles with each retry and is clamped at `max_retry_backoff_ms`.
    #[must_use]
    pub fn retry_delay(&self, retry_count: u32) -> Option<Duration> {
        if self.retry_backoff_ms == 0 {
            return None;
        }
        let exponent = retry_count.saturating_sub(1).min(32);
        let ms = self
            .retry_backoff_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.max_retry_backoff_ms);
        Some(Duration::from_millis(ms))
    }

    /// Validate scheduler configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.defaults.timeout_secs == 0 {
            return Err("defaults.timeout_secs must be greater than 0".into());
        }
        if self.retry_backoff_ms > self.max_retry_backoff_ms {
            return Err("retry_backoff_ms must not exceed max_retry_backoff_ms".into());
        }
        Ok(())
    }
}

/// Root configuration: one scheduler and the pool that drains it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Worker pool settings.
    pub pool: WorkerPoolConfig,
}

impl RuntimeConfig {
    /// Validate both halves.
    pub fn validate(&self) -> Result<(), String> {
        self.scheduler
            .validate()
            .map_err(|e| format!("scheduler invalid: {e}"))?;
        self.pool.validate().map_err(|e| format!("pool invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `AGENT_TASK_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        if let Some(v) = env_var("MAX_CONCURRENT")? {
            cfg.scheduler.max_concurrent = v;
        }
        if let Some(v) = env_var("MAX_RETRIES")? {
            cfg.scheduler.defaults.max_retries = v;
        }
        if let Some(v) = env_var("TIMEOUT_SECS")? {
            cfg.scheduler.defaults.timeout_secs = v;
        }
        if let Some(v) = env_var("RETRY_BACKOFF_MS")? {
            cfg.scheduler.retry_backoff_ms = v;
        }
        if let Some(v) = env_var("MAX_RETRY_BACKOFF_MS")? {
            cfg.scheduler.max_retry_backoff_ms = v;
        }
        if let Some(v) = env_var("WORKER_COUNT")? {
            cfg.pool.worker_count = v;
        }
        if let Some(v) = env_var("IDLE_POLL_INTERVAL_MS")? {
            cfg.pool.idle_poll_interval_ms = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn env_var<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let key = format!("{ENV_PREFIX}{name}");
    match env::var(&key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{key}: {e}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(format!("{key}: {e}")),
    }
}
