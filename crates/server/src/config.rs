// crates/server/src/config.rs
//! Server configuration: one TOML file with a section per component.
//!
//! ```toml
//! port = 47900
//!
//! [monitor]
//! line_break = "<br />"
//!
//! [runner]
//! after_life_secs = 120
//! ```

use std::path::Path;

use jobwatch_core::{load_toml, ConfigError, MonitorConfig};
use jobwatch_server_jobs::RunnerConfig;
use serde::Deserialize;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47900;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub monitor: MonitorConfig,
    pub runner: RunnerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            monitor: MonitorConfig::default(),
            runner: RunnerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from `path` if given, otherwise use defaults. The port can still be
    /// overridden by `JOBWATCH_PORT` or `PORT`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => load_toml(path)?,
            None => Self::default(),
        };
        if let Some(port) = env_port() {
            config.port = port;
        }
        Ok(config)
    }
}

/// Port from the environment, if set and valid.
fn env_port() -> Option<u16> {
    std::env::var("JOBWATCH_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sections_are_optional() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[monitor]").unwrap();
        writeln!(file, "summary_clip_limit = 80").unwrap();
        writeln!(file, "[runner]").unwrap();
        writeln!(file, "after_life_secs = 120").unwrap();

        let config: ServerConfig = load_toml(file.path()).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.monitor.summary_clip_limit, 80);
        assert_eq!(config.monitor.determinate_poll_ms, 500);
        assert_eq!(config.runner.after_life_secs, 120);
        assert_eq!(config.runner.reap_interval_secs, 30);
    }

    #[test]
    fn test_port_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 8123").unwrap();
        let config: ServerConfig = load_toml(file.path()).unwrap();
        assert_eq!(config.port, 8123);
    }
}
