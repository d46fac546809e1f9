//! Moodle web-service access.
//!
//! `QuizService` is the capability the bundler consumes. `MoodleSession`
//! implements it over Moodle's REST endpoint; tests substitute scripted
//! implementations.

pub mod client;
mod types;

pub use client::{MoodleClient, MoodleSession};

use crate::error::ServiceError;
use crate::models::{AttemptRef, QuizRef, ReviewQuestion};
use async_trait::async_trait;

pub const FN_QUIZZES_BY_COURSES: &str = "mod_quiz_get_quizzes_by_courses";
pub const FN_USER_ATTEMPTS: &str = "mod_quiz_get_user_attempts";
pub const FN_ATTEMPT_REVIEW: &str = "mod_quiz_get_attempt_review";

/// Quiz listing and review calls made on behalf of an authenticated user.
#[async_trait]
pub trait QuizService: Send + Sync {
    /// Quizzes in a course, in the order the site returns them.
    async fn list_quizzes(&self, course_id: u64) -> Result<Vec<QuizRef>, ServiceError>;

    /// The current user's attempts at a quiz.
    async fn list_attempts(&self, quiz_id: u64) -> Result<Vec<AttemptRef>, ServiceError>;

    /// Per-question review markup for a finished attempt.
    async fn attempt_review(&self, attempt_id: u64) -> Result<Vec<ReviewQuestion>, ServiceError>;
}
