//! Data models for the quiz bundler.
//!
//! This module contains the records that flow through a bundling run:
//! references returned by the quiz service, the extracted questions,
//! and the report written at the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One extracted quiz question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question body. Also the deduplication key.
    pub question_text: String,
    /// Supplementary instructional text ("Select one:").
    pub prompt: String,
    /// Answer options in document order.
    pub choices: Vec<String>,
    /// Feedback tied to the answer that was given.
    pub specific_feedback: String,
    /// Feedback shown regardless of the answer.
    pub general_feedback: String,
    /// Disclosed correct answer text.
    pub right_answer: String,
}

/// Lead-ins Moodle puts in front of the disclosed answer.
const RIGHT_ANSWER_PREFIXES: [&str; 2] = ["The correct answer is:", "The correct answers are:"];

impl Question {
    /// The disclosed correct answers, without Moodle's lead-in.
    pub fn right_answers(&self) -> Vec<&str> {
        let answer = self.right_answer.trim();
        let answer = RIGHT_ANSWER_PREFIXES
            .iter()
            .find_map(|prefix| answer.strip_prefix(prefix))
            .unwrap_or(answer);

        answer
            .split(", ")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect()
    }

    /// Returns true if this choice is one of the disclosed correct answers.
    pub fn is_right_choice(&self, choice: &str) -> bool {
        let choice = choice.trim();
        if choice.is_empty() {
            return false;
        }

        let answers = self.right_answers();
        let whole = answers.join(", ");
        whole == choice || answers.contains(&choice)
    }
}

/// Deduplicated questions keyed by question text.
pub type QuestionMap = HashMap<String, Question>;

/// A quiz belonging to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRef {
    pub id: u64,
    #[serde(default)]
    pub course: u64,
    #[serde(default)]
    pub name: String,
}

/// One attempt the current user made at a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRef {
    pub id: u64,
    #[serde(default)]
    pub quiz: u64,
    /// Attempt number within the quiz (1-indexed).
    #[serde(default)]
    pub attempt: u32,
    /// Moodle attempt state ("finished", "inprogress", ...).
    #[serde(default)]
    pub state: String,
}

impl AttemptRef {
    /// Only finished attempts can be reviewed.
    pub fn is_finished(&self) -> bool {
        self.state == "finished"
    }
}

/// One question as rendered in an attempt review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewQuestion {
    #[serde(default)]
    pub slot: u32,
    /// Server-rendered HTML for the question.
    #[serde(default)]
    pub html: String,
}

/// Counters collected during a bundling run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleStats {
    /// Quizzes listed for the course.
    pub quizzes: usize,
    /// Attempts whose review was fetched.
    pub attempts: usize,
    /// HTML fragments parsed.
    pub fragments: usize,
    /// Entries in the final map.
    pub unique_questions: usize,
    /// Fragments whose question text came out empty.
    pub blank_questions: usize,
    /// Attempts not reviewed because they were not finished.
    #[serde(default)]
    pub skipped_attempts: usize,
}

/// Metadata about the written report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Moodle site the questions came from.
    pub base_url: String,
    /// Course that was bundled.
    pub course_id: u64,
    /// Date and time of the run.
    pub generated_at: DateTime<Utc>,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete question bundle report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleReport {
    pub metadata: ReportMetadata,
    pub stats: BundleStats,
    /// Questions sorted by question text.
    pub questions: Vec<Question>,
}

impl BundleReport {
    /// Build a report from the questions and counters of a finished run.
    pub fn new(metadata: ReportMetadata, questions: QuestionMap, stats: BundleStats) -> Self {
        let mut questions: Vec<Question> = questions.into_values().collect();
        questions.sort_by(|a, b| a.question_text.cmp(&b.question_text));

        Self {
            metadata,
            stats,
            questions,
        }
    }
}
