//! Configuration loaded from `tether-debug.toml`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::debugger::ConnectOptions;
use crate::locator::ProjectRoot;

pub const CONFIG_FILE: &str = "tether-debug.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugConfig {
    /// Timeout for establishing a debugger connection.
    pub connect_timeout: Duration,
    /// Timeout for one request to a connected debugger.
    pub request_timeout: Duration,
    /// Delay between event polls of remote adapters.
    pub event_poll_interval: Duration,
    /// `tracing` filter directive for the binary.
    pub log_filter: String,
    /// Project roots used to map targets to workspace files.
    pub projects: Vec<ProjectRoot>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        let options = ConnectOptions::default();
        Self {
            connect_timeout: options.connect_timeout,
            request_timeout: options.request_timeout,
            event_poll_interval: options.event_poll_interval,
            log_filter: "info".to_string(),
            projects: Vec::new(),
        }
    }
}

impl DebugConfig {
    /// Load `path`; a missing file yields the defaults. Relative project
    /// roots are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_contents(base, &contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_contents(base: &Path, contents: &str) -> Result<Self, toml::de::Error> {
        let parsed: ConfigFile = toml::from_str(contents)?;
        Ok(Self {
            connect_timeout: Duration::from_millis(parsed.connect.timeout_ms),
            request_timeout: Duration::from_millis(parsed.connect.request_timeout_ms),
            event_poll_interval: Duration::from_millis(parsed.connect.event_poll_interval_ms),
            log_filter: parsed.log.filter,
            projects: parsed
                .projects
                .into_iter()
                .map(|project| ProjectRoot {
                    name: project.name,
                    root: resolve_path(base, &project.root),
                })
                .collect(),
        })
    }

    #[must_use]
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
            event_poll_interval: self.event_poll_interval,
        }
    }
}

impl FromStr for DebugConfig {
    type Err = toml::de::Error;

    fn from_str(contents: &str) -> Result<Self, Self::Err> {
        Self::from_contents(Path::new("."), contents)
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    connect: ConnectSection,
    log: LogSection,
    projects: Vec<ProjectSection>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConnectSection {
    timeout_ms: u64,
    request_timeout_ms: u64,
    event_poll_interval_ms: u64,
}

impl Default for ConnectSection {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            request_timeout_ms: 10_000,
            event_poll_interval_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LogSection {
    filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProjectSection {
    name: String,
    root: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn empty_file_yields_defaults() {
        let config: DebugConfig = "".parse().unwrap();
        assert_eq!(config, DebugConfig::default());
        assert_eq!(config.connect_options(), ConnectOptions::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config: DebugConfig = r#"
[connect]
request_timeout_ms = 250

[log]
filter = "tether_debug=debug"

[[projects]]
name = "test"
root = "/work/test"
"#
        .parse()
        .unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.log_filter, "tether_debug=debug");
        assert_eq!(
            config.projects,
            [ProjectRoot {
                name: "test".into(),
                root: PathBuf::from("/work/test"),
            }]
        );
    }

    #[test]
    fn load_resolves_project_roots_next_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[[projects]]\nname = \"app\"\nroot = \"app\"\n").unwrap();
        let config = DebugConfig::load(&path).unwrap();
        assert_eq!(config.projects[0].root, dir.path().join("app"));

        let missing = DebugConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(missing, DebugConfig::default());
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[connect]\ntimeout_ms = \"soon\"\n").unwrap();
        let err = DebugConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
