// crates/server-jobs/src/config.rs
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// How long a finished job stays retrievable, absent any observer bump.
    pub after_life_secs: i64,
    /// How often the reaper sweeps expired jobs.
    pub reap_interval_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            after_life_secs: 60,
            reap_interval_secs: 30,
        }
    }
}

impl RunnerConfig {
    pub fn after_life(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.after_life_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        // A zero period would make `tokio::time::interval` panic.
        Duration::from_secs(self.reap_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.after_life(), chrono::Duration::minutes(1));
        assert_eq!(config.reap_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = RunnerConfig {
            reap_interval_secs: 0,
            ..RunnerConfig::default()
        };
        assert_eq!(config.reap_interval(), Duration::from_secs(1));
    }
}
