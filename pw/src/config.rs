//! planwrap configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use eyre::{Context, Result};
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};

/// Main planwrap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Planner invocation settings
    pub planner: PlannerConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .planwrap.yml
        let local_config = PathBuf::from(".planwrap.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/planwrap/planwrap.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("planwrap").join("planwrap.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// How the external planner is launched and read back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Planner directory; the worker runs here and writes its result here
    pub dir: PathBuf,

    /// Launcher script inside `dir`
    pub launcher: String,

    /// Interpreter executable that runs the launcher
    pub interpreter: PathBuf,

    /// Search configuration passed after `--search`
    #[serde(rename = "search-strategy")]
    pub search_strategy: String,

    /// Result artifact name inside `dir`
    #[serde(rename = "result-file")]
    pub result_file: String,

    /// Wall-clock deadline for one run in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Signal delivered when the deadline elapses
    #[serde(rename = "kill-signal")]
    pub kill_signal: String,

    /// Wait after `kill-signal` before SIGKILL, in milliseconds
    #[serde(rename = "kill-grace-ms")]
    pub kill_grace_ms: u64,

    /// Discard planner stdout/stderr
    pub quiet: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fast-downward"),
            launcher: "fast-downward.py".to_string(),
            interpreter: PathBuf::from("/usr/bin/python"),
            search_strategy: "astar(lmcut())".to_string(),
            result_file: "sas_plan_em".to_string(),
            timeout_ms: 10_000,
            kill_signal: "SIGKILL".to_string(),
            kill_grace_ms: 5_000,
            quiet: false,
        }
    }
}

impl PlannerConfig {
    /// Config rooted at a planner directory, other fields default
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn launcher_path(&self) -> PathBuf {
        self.dir.join(&self.launcher)
    }

    pub fn result_path(&self) -> PathBuf {
        self.dir.join(&self.result_file)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    /// Resolve `kill-signal`; accepts `SIGTERM`, `TERM` or `term`
    pub fn kill_signal(&self) -> Option<Signal> {
        parse_signal(&self.kill_signal)
    }
}

/// Parse a signal name, with or without the `SIG` prefix
pub fn parse_signal(name: &str) -> Option<Signal> {
    let upper = name.trim().to_uppercase();
    let full = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{}", upper)
    };
    Signal::from_str(&full).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.search_strategy, "astar(lmcut())");
        assert_eq!(config.launcher, "fast-downward.py");
        assert_eq!(config.result_file, "sas_plan_em");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.kill_signal(), Some(Signal::SIGKILL));
    }

    #[test]
    fn test_paths_relative_to_dir() {
        let config = PlannerConfig::with_dir("/opt/fd");
        assert_eq!(config.launcher_path(), PathBuf::from("/opt/fd/fast-downward.py"));
        assert_eq!(config.result_path(), PathBuf::from("/opt/fd/sas_plan_em"));
    }

    #[test]
    fn test_parse_signal_forms() {
        assert_eq!(parse_signal("SIGTERM"), Some(Signal::SIGTERM));
        assert_eq!(parse_signal("term"), Some(Signal::SIGTERM));
        assert_eq!(parse_signal(" INT "), Some(Signal::SIGINT));
        assert_eq!(parse_signal("SIGBOGUS"), None);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("planwrap.yml");
        fs::write(
            &path,
            "planner:\n  dir: /srv/fd\n  search-strategy: lazy_greedy([ff()])\n  timeout-ms: 2500\n  kill-signal: SIGTERM\nlog-level: DEBUG\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.planner.dir, PathBuf::from("/srv/fd"));
        assert_eq!(config.planner.search_strategy, "lazy_greedy([ff()])");
        assert_eq!(config.planner.timeout_ms, 2500);
        assert_eq!(config.planner.kill_signal(), Some(Signal::SIGTERM));
        assert_eq!(config.planner.launcher, "fast-downward.py");
        assert_eq!(config.log_level.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp = tempdir().unwrap();
        assert!(Config::load(Some(&temp.path().join("nope.yml"))).is_err());
    }
}
