//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.quizbundler.toml` files.

use crate::extract::SelectorSet;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = ".quizbundler.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Moodle site settings.
    #[serde(default)]
    pub moodle: MoodleConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub bundler: BundlerConfig,

    /// Question markup selectors.
    #[serde(default)]
    pub selectors: SelectorSet,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "quiz_bundle.md".to_string()
}

/// Moodle site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodleConfig {
    /// Site root, without the trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Web service the token is requested for.
    #[serde(default = "default_service")]
    pub service: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for MoodleConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            service: default_service(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://my.uopeople.edu".to_string()
}

fn default_service() -> String {
    "moodle_mobile_app".to_string()
}

fn default_timeout() -> u64 {
    60
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundlerConfig {
    /// Pause between consecutive attempt review requests, in milliseconds.
    #[serde(default = "default_review_delay")]
    pub review_delay_ms: u64,

    /// Reject review fragments the HTML parser had to repair.
    #[serde(default)]
    pub strict_markup: bool,

    /// Cancel the whole run after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_seconds: Option<u64>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            review_delay_ms: default_review_delay(),
            strict_markup: false,
            deadline_seconds: None,
        }
    }
}

fn default_review_delay() -> u64 {
    1000
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.quizbundler.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref base_url) = args.base_url {
            self.moodle.base_url = base_url.clone();
        }
        self.moodle.base_url = self.moodle.base_url.trim_end_matches('/').to_string();

        if let Some(timeout) = args.timeout {
            self.moodle.timeout_seconds = timeout;
        }

        if let Some(delay) = args.delay_ms {
            self.bundler.review_delay_ms = delay;
        }
        if args.deadline.is_some() {
            self.bundler.deadline_seconds = args.deadline;
        }
        if args.strict_markup {
            self.bundler.strict_markup = true;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.moodle.base_url, "https://my.uopeople.edu");
        assert_eq!(config.moodle.service, "moodle_mobile_app");
        assert_eq!(config.bundler.review_delay_ms, 1000);
        assert!(!config.bundler.strict_markup);
        assert_eq!(config.selectors.question_text, "div.qtext");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "algebra.json"

[moodle]
base_url = "https://moodle.example.edu"
timeout_seconds = 15

[bundler]
review_delay_ms = 250
strict_markup = true

[selectors]
choices = "div.answer label"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "algebra.json");
        assert_eq!(config.moodle.base_url, "https://moodle.example.edu");
        assert_eq!(config.moodle.service, "moodle_mobile_app");
        assert_eq!(config.moodle.timeout_seconds, 15);
        assert_eq!(config.bundler.review_delay_ms, 250);
        assert!(config.bundler.strict_markup);
        assert_eq!(config.selectors.choices, "div.answer label");
        assert_eq!(config.selectors.right_answer, "div.rightanswer");
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[bundler]\nreview_delay_ms = 5\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.bundler.review_delay_ms, 5);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[bundler\nreview_delay_ms = ").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut args = make_args();
        args.base_url = Some("https://moodle.example.edu/".to_string());
        args.delay_ms = Some(0);
        args.deadline = Some(30);
        args.strict_markup = true;
        args.output = Some(PathBuf::from("out.json"));

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.moodle.base_url, "https://moodle.example.edu");
        assert_eq!(config.moodle.timeout_seconds, 60);
        assert_eq!(config.bundler.review_delay_ms, 0);
        assert_eq!(config.bundler.deadline_seconds, Some(30));
        assert!(config.bundler.strict_markup);
        assert_eq!(config.general.output, "out.json");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[moodle]"));
        assert!(toml_str.contains("[bundler]"));
        assert!(toml_str.contains("[selectors]"));

        assert!(!toml_str.contains("verbose"));

        let round: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(round.selectors, SelectorSet::default());
    }

    #[test]
    fn test_old_verbose_key_is_ignored() {
        let config: Config =
            toml::from_str("[general]\noutput = \"notes.md\"\nverbose = true\n").unwrap();
        assert_eq!(config.general.output, "notes.md");
    }
}
