//! Bundle report generation.
//!
//! This module renders a finished bundle as a Markdown study sheet or as
//! pretty-printed JSON.

use crate::models::{BundleReport, BundleStats, Question, ReportMetadata};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &BundleReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Quiz Bundle: Course {}\n\n",
        report.metadata.course_id
    ));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.stats));
    output.push_str(&generate_questions_section(&report.questions));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Site:** {}\n", metadata.base_url));
    section.push_str(&format!("- **Course:** {}\n", metadata.course_id));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

/// Generate the summary table.
fn generate_summary_section(stats: &BundleStats) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Quizzes | Attempts | Questions Seen | Unique Questions |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        stats.quizzes, stats.attempts, stats.fragments, stats.unique_questions
    ));

    if stats.blank_questions > 0 {
        section.push_str(&format!(
            "> {} review fragments had no question text and were merged into one entry.\n\n",
            stats.blank_questions
        ));
    }

    if stats.skipped_attempts > 0 {
        section.push_str(&format!(
            "> {} unfinished attempts were skipped.\n\n",
            stats.skipped_attempts
        ));
    }

    section
}

/// Generate the questions section.
fn generate_questions_section(questions: &[Question]) -> String {
    let mut section = String::new();

    section.push_str("## Questions\n\n");

    if questions.is_empty() {
        section.push_str("No reviewed questions were found for this course.\n\n");
        return section;
    }

    for (i, question) in questions.iter().enumerate() {
        section.push_str(&generate_question_block(i + 1, question));
    }

    section
}

/// Generate a single question block.
fn generate_question_block(number: usize, question: &Question) -> String {
    let mut block = String::new();

    let title = if question.question_text.is_empty() {
        "*(no question text)*"
    } else {
        question.question_text.as_str()
    };
    block.push_str(&format!("### {}. {}\n\n", number, title));

    if !question.prompt.is_empty() {
        block.push_str(&format!("*{}*\n\n", question.prompt));
    }

    for choice in &question.choices {
        let mark = if question.is_right_choice(choice) { "x" } else { " " };
        block.push_str(&format!("- [{}] {}\n", mark, choice));
    }
    if !question.choices.is_empty() {
        block.push('\n');
    }

    if !question.right_answer.is_empty() {
        block.push_str(&format!("**Answer:** {}\n\n", question.right_answer));
    }

    if !question.specific_feedback.is_empty() {
        block.push_str(&format!("> {}\n\n", question.specific_feedback));
    }

    if !question.general_feedback.is_empty() {
        block.push_str(&format!("> {}\n\n", question.general_feedback));
    }

    block.push_str("---\n\n");

    block
}

/// Generate the report footer.
fn generate_footer() -> String {
    "*Bundle generated by QuizBundler*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &BundleReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
