//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// QuizBundler - collect every Moodle quiz question you have seen
///
/// Logs into a Moodle site, walks the review of every attempt you made at
/// every quiz in a course, and writes the deduplicated questions with their
/// choices, right answers and feedback to a Markdown or JSON study sheet.
///
/// Examples:
///   quizbundler --course 1234 --username alice --password secret
///   MOODLE_TOKEN=abc quizbundler --course 1234 --format json -o quiz.json
///   quizbundler --course 1234 --base-url https://moodle.example.edu --dry-run
///   quizbundler --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Moodle course id to bundle
    #[arg(long, value_name = "ID", required_unless_present = "init_config")]
    pub course: Option<u64>,

    /// Moodle username
    #[arg(short, long, env = "MOODLE_USERNAME")]
    pub username: Option<String>,

    /// Moodle password
    #[arg(short, long, env = "MOODLE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Existing web-service token (skips the login step, wins over --password)
    #[arg(long, env = "MOODLE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Moodle site URL
    ///
    /// Defaults to the value in .quizbundler.toml, or https://my.uopeople.edu.
    #[arg(long, value_name = "URL", env = "MOODLE_URL")]
    pub base_url: Option<String>,

    /// Output file path for the bundle
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .quizbundler.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Pause between attempt reviews in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Abort the whole run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Fail on review markup the HTML parser had to repair
    #[arg(long)]
    pub strict_markup: bool,

    /// Dry run: list quizzes and attempts without fetching reviews
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .quizbundler.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the course id, 0 if not set (should be validated first).
    pub fn course_id(&self) -> u64 {
        self.course.unwrap_or(0)
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.course_id() == 0 {
            return Err("Course id must be a positive integer".to_string());
        }

        if self.token.is_none() {
            match (&self.username, &self.password) {
                (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => {}
                _ => {
                    return Err(
                        "Provide --username and --password, or --token".to_string(),
                    )
                }
            }
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Moodle URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.deadline == Some(0) {
            return Err("Deadline must be at least 1 second".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
