use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::encoder::StringPolicy;
use crate::error::{MonitorError, Result};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Tail a self-checkout log and emit its device events as JSON Lines
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sco-monitor",
    about = "Tail a self-checkout log and emit its device events as JSON Lines",
    version
)]
pub struct Settings {
    /// Log file to monitor
    #[arg(value_name = "LOG_FILE", required_unless_present = "init_markers")]
    pub input: Option<PathBuf>,

    /// File that every emitted record is appended to
    #[arg(long, default_value = "output.json")]
    pub output: PathBuf,

    /// Only write records to standard output
    #[arg(long)]
    pub no_output_file: bool,

    /// JSON file with the start/end markers used to frame messages
    #[arg(long)]
    pub markers: Option<PathBuf>,

    /// Write the default marker file to ~/.sco-monitor/markers.json and exit
    #[arg(long)]
    pub init_markers: bool,

    /// Maximum wait for a change notification before re-reading, in milliseconds
    #[arg(long, default_value = "200", value_parser = clap::value_parser!(u64).range(1..=60_000))]
    pub poll_timeout_ms: u64,

    /// Bytes requested from the log per read
    #[arg(long, default_value = "8192", value_parser = clap::value_parser!(u32).range(1..=16_777_216))]
    pub chunk_size: u32,

    /// Process the existing content of the log instead of starting at its end
    #[arg(long)]
    pub from_beginning: bool,

    /// Escape quotes, backslashes and control characters in string values
    #[arg(long)]
    pub escape_strings: bool,

    /// Sleep between reads instead of using file-system notifications
    #[arg(long)]
    pub poll: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`load`](Self::load) but accepts an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// Secondary sink path, or `None` when disabled.
    pub fn output_path(&self) -> Option<&Path> {
        if self.no_output_file {
            None
        } else {
            Some(&self.output)
        }
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size as usize
    }

    pub fn string_policy(&self) -> StringPolicy {
        if self.escape_strings {
            StringPolicy::Escaped
        } else {
            StringPolicy::Verbatim
        }
    }

    /// Resolve the marker configuration.
    ///
    /// An explicit `--markers` file must exist and parse. Otherwise the
    /// file at [`MarkerConfig::config_path`] is used when present, falling
    /// back to the built-in markers.
    pub fn marker_config(&self) -> Result<MarkerConfig> {
        self.marker_config_with_default(&MarkerConfig::config_path())
    }

    /// Same as [`marker_config`](Self::marker_config) with an explicit
    /// default path (used for testing).
    pub fn marker_config_with_default(&self, default_path: &Path) -> Result<MarkerConfig> {
        let config = match &self.markers {
            Some(path) => MarkerConfig::load_from(path)?,
            None if default_path.exists() => match MarkerConfig::load_from(default_path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        path = %default_path.display(),
                        error = %e,
                        "ignoring unreadable marker file; using built-in markers"
                    );
                    MarkerConfig::default()
                }
            },
            None => MarkerConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }
}

// ── MarkerConfig ───────────────────────────────────────────────────────────────

/// Line-level markers that delimit a message in the device log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// A line containing any of these opens a message.
    pub start: Vec<String>,
    /// A line containing this closes the open message.
    pub end: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            start: vec![
                "[ScoAdapter] CONTENT [<message".to_string(),
                r#"<message name="EnterAssistMode""#.to_string(),
                r#"<message name="ExitAssistMode""#.to_string(),
            ],
            end: "</message>".to_string(),
        }
    }
}

impl MarkerConfig {
    /// Return the default path of the marker file.
    /// Uses `~/.sco-monitor/markers.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the marker file path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".sco-monitor").join("markers.json")
    }

    /// Load markers from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| MonitorError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Atomically write markers to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Reject marker sets that would never open or close a message.
    pub fn validate(&self) -> Result<()> {
        if self.start.is_empty() || self.start.iter().any(String::is_empty) {
            return Err(MonitorError::Config(
                "start markers must be a non-empty list of non-empty strings".to_string(),
            ));
        }
        if self.end.is_empty() {
            return Err(MonitorError::Config("end marker must not be empty".to_string()));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── CLI parsing ───────────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::load_from_args(["sco-monitor", "/var/log/sco.log"]);

        assert_eq!(settings.input, Some(PathBuf::from("/var/log/sco.log")));
        assert_eq!(settings.output, PathBuf::from("output.json"));
        assert!(!settings.no_output_file);
        assert!(settings.markers.is_none());
        assert!(!settings.init_markers);
        assert_eq!(settings.poll_timeout_ms, 200);
        assert_eq!(settings.chunk_size, 8192);
        assert!(!settings.from_beginning);
        assert!(!settings.escape_strings);
        assert!(!settings.poll);
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_requires_input() {
        let result = Settings::try_parse_from(["sco-monitor"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_init_markers_without_input() {
        let settings = Settings::load_from_args(["sco-monitor", "--init-markers"]);
        assert!(settings.init_markers);
        assert!(settings.input.is_none());
    }

    #[test]
    fn test_settings_debug_overrides_log_level() {
        let settings = Settings::load_from_args(["sco-monitor", "a.log", "--debug"]);
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_settings_output_path() {
        let settings = Settings::load_from_args(["sco-monitor", "a.log", "--output", "/tmp/events.jsonl"]);
        assert_eq!(settings.output_path(), Some(Path::new("/tmp/events.jsonl")));

        let settings = Settings::load_from_args(["sco-monitor", "a.log", "--no-output-file"]);
        assert!(settings.output_path().is_none());
    }

    #[test]
    fn test_settings_durations_and_sizes() {
        let settings = Settings::load_from_args([
            "sco-monitor",
            "a.log",
            "--poll-timeout-ms",
            "50",
            "--chunk-size",
            "16",
        ]);
        assert_eq!(settings.poll_timeout(), Duration::from_millis(50));
        assert_eq!(settings.chunk_size(), 16);
    }

    #[test]
    fn test_settings_rejects_zero_chunk_size() {
        let result = Settings::try_parse_from(["sco-monitor", "a.log", "--chunk-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_string_policy() {
        let settings = Settings::load_from_args(["sco-monitor", "a.log"]);
        assert_eq!(settings.string_policy(), StringPolicy::Verbatim);

        let settings = Settings::load_from_args(["sco-monitor", "a.log", "--escape-strings"]);
        assert_eq!(settings.string_policy(), StringPolicy::Escaped);
    }

    // ── MarkerConfig ──────────────────────────────────────────────────────────

    #[test]
    fn test_marker_config_defaults() {
        let config = MarkerConfig::default();
        assert_eq!(config.start.len(), 3);
        assert_eq!(config.start[0], "[ScoAdapter] CONTENT [<message");
        assert_eq!(config.end, "</message>");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_marker_config_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = MarkerConfig::config_path_in(tmp.path());
        let config = MarkerConfig {
            start: vec!["BEGIN".to_string()],
            end: "END".to_string(),
        };

        config.save_to(&path).expect("save");
        let loaded = MarkerConfig::load_from(&path).expect("load");

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_marker_config_load_missing_file() {
        let tmp = TempDir::new().expect("tempdir");
        let err = MarkerConfig::load_from(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, MonitorError::FileOpen { .. }));
    }

    #[test]
    fn test_marker_config_validate_rejects_empty() {
        let config = MarkerConfig {
            start: vec![],
            end: "</message>".to_string(),
        };
        assert!(config.validate().is_err());

        let config = MarkerConfig {
            start: vec!["<message".to_string(), String::new()],
            end: "</message>".to_string(),
        };
        assert!(config.validate().is_err());

        let config = MarkerConfig {
            start: vec!["<message".to_string()],
            end: String::new(),
        };
        assert!(config.validate().is_err());
    }

    // ── marker resolution ─────────────────────────────────────────────────────

    #[test]
    fn test_marker_config_explicit_file_wins() {
        let tmp = TempDir::new().expect("tempdir");
        let explicit = tmp.path().join("custom.json");
        std::fs::write(&explicit, r#"{"start":["<msg"],"end":"</msg>"}"#).unwrap();

        let default_path = MarkerConfig::config_path_in(tmp.path());
        MarkerConfig::default().save_to(&default_path).unwrap();

        let settings = Settings::load_from_args([
            "sco-monitor".into(),
            "a.log".into(),
            "--markers".into(),
            explicit.into_os_string(),
        ]);
        let config = settings.marker_config_with_default(&default_path).unwrap();
        assert_eq!(config.start, vec!["<msg".to_string()]);
        assert_eq!(config.end, "</msg>");
    }

    #[test]
    fn test_marker_config_explicit_file_invalid_is_error() {
        let tmp = TempDir::new().expect("tempdir");
        let explicit = tmp.path().join("bad.json");
        std::fs::write(&explicit, "{not json").unwrap();

        let settings = Settings::load_from_args([
            "sco-monitor".into(),
            "a.log".into(),
            "--markers".into(),
            explicit.into_os_string(),
        ]);
        let err = settings
            .marker_config_with_default(&tmp.path().join("absent.json"))
            .unwrap_err();
        assert!(matches!(err, MonitorError::JsonParse(_)));
    }

    #[test]
    fn test_marker_config_uses_default_file_when_present() {
        let tmp = TempDir::new().expect("tempdir");
        let default_path = MarkerConfig::config_path_in(tmp.path());
        let stored = MarkerConfig {
            start: vec!["OPEN".to_string()],
            end: "CLOSE".to_string(),
        };
        stored.save_to(&default_path).unwrap();

        let settings = Settings::load_from_args(["sco-monitor", "a.log"]);
        let config = settings.marker_config_with_default(&default_path).unwrap();
        assert_eq!(config, stored);
    }

    #[test]
    fn test_marker_config_unreadable_default_falls_back() {
        let tmp = TempDir::new().expect("tempdir");
        let default_path = MarkerConfig::config_path_in(tmp.path());
        std::fs::create_dir_all(default_path.parent().unwrap()).unwrap();
        std::fs::write(&default_path, "garbage").unwrap();

        let settings = Settings::load_from_args(["sco-monitor", "a.log"]);
        let config = settings.marker_config_with_default(&default_path).unwrap();
        assert_eq!(config, MarkerConfig::default());
    }

    #[test]
    fn test_marker_config_builtin_without_files() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_from_args(["sco-monitor", "a.log"]);
        let config = settings
            .marker_config_with_default(&MarkerConfig::config_path_in(tmp.path()))
            .unwrap();
        assert_eq!(config, MarkerConfig::default());
    }
}
