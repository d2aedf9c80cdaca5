//! Configuration structures.
//!
//! Configuration is loaded from an optional JSON file, then overridden by
//! command-line flags and environment variables in `main.rs`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use super::{Error, Result};

/// Global kernel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Child interpreter configuration.
    #[serde(default)]
    pub repl: ReplConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from a JSON file. Missing sections use defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::not_found(format!("config file {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.repl.validate()?;
        Ok(config)
    }
}

/// How to launch and talk to the child interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    /// Interpreter binary.
    pub command: String,

    /// Arguments; the defaults disable line editing so the output stream
    /// carries no terminal control sequences.
    pub args: Vec<String>,

    /// Primary prompt, printed when the interpreter is ready for input.
    pub prompt: String,

    /// Continuation prompt, printed while a multi-line block is open.
    pub continuation_prompt: String,

    /// How long to wait for a prompt. `null` waits forever.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// Consume the terminal's echo of each submitted line before looking
    /// for a prompt.
    pub strip_echo: bool,

    /// Extra environment for the child process.
    pub env: BTreeMap<String, String>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            command: "mi".to_string(),
            args: vec!["repl".to_string(), "--no-line-edit".to_string()],
            prompt: ">> ".to_string(),
            continuation_prompt: " | ".to_string(),
            timeout: Some(Duration::from_secs(30)),
            strip_echo: true,
            env: BTreeMap::new(),
        }
    }
}

impl ReplConfig {
    /// Replace command and args from a whitespace-separated command line.
    pub fn set_command_line(&mut self, command_line: &str) -> Result<()> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let command = parts
            .next()
            .ok_or_else(|| Error::validation("REPL command line cannot be empty"))?;
        self.command = command;
        self.args = parts.collect();
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(Error::validation("repl.command cannot be empty"));
        }
        if self.prompt.is_empty() {
            return Err(Error::validation("repl.prompt cannot be empty"));
        }
        if self.continuation_prompt.is_empty() {
            return Err(Error::validation("repl.continuation_prompt cannot be empty"));
        }
        if self.prompt == self.continuation_prompt {
            return Err(Error::validation(
                "repl.prompt and repl.continuation_prompt must differ",
            ));
        }
        Ok(())
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_launch_mi_repl() {
        let config = ReplConfig::default();
        assert_eq!(config.command, "mi");
        assert_eq!(config.args, vec!["repl", "--no-line-edit"]);
        assert_eq!(config.prompt, ">> ");
        assert_eq!(config.continuation_prompt, " | ");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"repl": {"timeout": "2m 5s"}}"#).unwrap();
        assert_eq!(config.repl.timeout, Some(Duration::from_secs(125)));
        assert_eq!(config.repl.command, "mi");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_null_timeout_disables_it() {
        let config: Config = serde_json::from_str(r#"{"repl": {"timeout": null}}"#).unwrap();
        assert_eq!(config.repl.timeout, None);
    }

    #[test]
    fn test_set_command_line() {
        let mut config = ReplConfig::default();
        config.set_command_line("  /opt/mi/bin/mi repl   --no-line-edit ").unwrap();
        assert_eq!(config.command, "/opt/mi/bin/mi");
        assert_eq!(config.args, vec!["repl", "--no-line-edit"]);

        assert!(config.set_command_line("   ").is_err());
    }

    #[test]
    fn test_validate_rejects_identical_prompts() {
        let config = ReplConfig {
            continuation_prompt: ">> ".to_string(),
            ..ReplConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"repl": {{"command": "mi-dev"}}, "observability": {{"log_level": "debug", "json_logs": true}}}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.repl.command, "mi-dev");
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/mcore.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
