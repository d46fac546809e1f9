//! QuizBundler - Moodle quiz review collector
//!
//! A CLI tool that logs into a Moodle site, walks the review of every quiz
//! attempt in a course, and writes the deduplicated questions to a study sheet.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (login, remote call, unparsable markup, cancellation, etc.)

mod bundler;
mod cli;
mod config;
mod error;
mod extract;
mod models;
mod moodle;
mod report;

use anyhow::{Context, Result};
use bundler::{CancelToken, QuizAggregator};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use extract::{QuestionExtractor, ScraperParser};
use indicatif::{ProgressBar, ProgressStyle};
use models::{BundleReport, ReportMetadata};
use moodle::{MoodleClient, MoodleSession, QuizService};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("QuizBundler v{}", env!("CARGO_PKG_VERSION"));
    debug!("Course: {:?}, dry run: {}", args.course, args.dry_run);

    match run_bundle(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Bundling failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .quizbundler.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE_NAME);
    println!("   Edit it to point at your Moodle site or adjust the selectors.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete bundling workflow. Returns the exit code.
async fn run_bundle(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config
        .selectors
        .validate()
        .context("Invalid selector in configuration")?;

    let course_id = args.course_id();
    let cancel = CancelToken::new();
    watch_ctrl_c(cancel.clone());
    if let Some(deadline) = config.bundler.deadline_seconds {
        info!("Run deadline: {}s", deadline);
        cancel.cancel_after(Duration::from_secs(deadline));
    }

    // Step 1: Authenticate
    println!("🔐 Connecting to {}", config.moodle.base_url);
    let session = open_session(&args, &config, &cancel).await?;

    if args.dry_run {
        return handle_dry_run(&session, course_id, &cancel).await;
    }

    // Step 2: Walk the course
    let extractor = QuestionExtractor::new(
        ScraperParser::new(config.bundler.strict_markup),
        config.selectors.clone(),
    );
    let review_delay = Duration::from_millis(config.bundler.review_delay_ms);
    let mut aggregator = QuizAggregator::new(&session, &extractor, review_delay, cancel.clone());

    println!("📚 Collecting questions from course {}...", course_id);
    let spinner = make_spinner(args.quiet);
    let result = aggregator.aggregate(course_id).await;
    if let Some(ref pb) = spinner {
        pb.finish_and_clear();
    }
    let questions = result.with_context(|| format!("Failed to bundle course {}", course_id))?;

    // Step 3: Build and save the report
    let stats = aggregator.stats().clone();
    let metadata = ReportMetadata {
        base_url: session.base_url().to_string(),
        course_id,
        generated_at: Utc::now(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = BundleReport::new(metadata, questions, stats.clone());

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };
    let output_path = Path::new(&config.general.output);
    report::write_report(&output, output_path)?;

    println!("\n📊 Bundle Summary:");
    println!("   Quizzes: {}", stats.quizzes);
    println!("   Attempts reviewed: {}", stats.attempts);
    if stats.skipped_attempts > 0 {
        println!("   Unfinished attempts skipped: {}", stats.skipped_attempts);
    }
    println!("   Questions seen: {}", stats.fragments);
    println!("   Unique questions: {}", stats.unique_questions);
    if stats.blank_questions > 0 {
        println!(
            "   ⚠️  {} fragments had no question text (merged into one entry)",
            stats.blank_questions
        );
    }
    println!(
        "\n✅ Bundle complete! Saved to: {}",
        output_path.display()
    );

    Ok(0)
}

/// Log in, or reuse a token if one was given.
async fn open_session(args: &Args, config: &Config, cancel: &CancelToken) -> Result<MoodleSession> {
    let client = MoodleClient::new(&config.moodle)?;

    if let Some(ref token) = args.token {
        info!("Using provided web-service token");
        return Ok(MoodleSession::with_token(client, token.clone()));
    }

    let username = args.username.as_deref().unwrap_or_default();
    let password = args.password.as_deref().unwrap_or_default();

    let session = cancel
        .guard(client.login(username, password))
        .await??;
    Ok(session)
}

/// Handle --dry-run: list quizzes and attempts, fetch no reviews.
async fn handle_dry_run(
    service: &impl QuizService,
    course_id: u64,
    cancel: &CancelToken,
) -> Result<i32> {
    println!("\n🔍 Dry run: listing quizzes (no reviews fetched)...\n");

    let quizzes = cancel
        .guard(service.list_quizzes(course_id))
        .await?
        .with_context(|| format!("Failed to list quizzes for course {}", course_id))?;

    if quizzes.is_empty() {
        println!("   No quizzes found in course {}.", course_id);
    }

    let mut total_attempts = 0;
    for quiz in &quizzes {
        let attempts = cancel
            .guard(service.list_attempts(quiz.id))
            .await?
            .with_context(|| format!("Failed to list attempts for quiz {}", quiz.id))?;
        let finished = attempts.iter().filter(|a| a.is_finished()).count();
        total_attempts += finished;
        println!(
            "     📝 {} (id {}): {} attempts, {} finished",
            quiz.name,
            quiz.id,
            attempts.len(),
            finished
        );
    }

    println!(
        "\n   Total: {} quizzes, {} attempts to review",
        quizzes.len(),
        total_attempts
    );
    println!("\n✅ Dry run complete. No reviews were fetched.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Cancel the run on Ctrl-C.
fn watch_ctrl_c(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            cancel.cancel();
        }
    });
}

fn make_spinner(quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Reviewing attempts...");
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}
