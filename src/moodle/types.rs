//! Moodle wire envelopes.

use crate::models::{AttemptRef, QuizRef, ReviewQuestion};
use serde::Deserialize;

/// `login/token.php` response. Either `token` or `error` is set.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub errorcode: Option<String>,
}

/// Exception payload returned with HTTP 200 by `webservice/rest/server.php`.
/// The `exception` class name is only used to detect the payload.
#[derive(Debug, Deserialize)]
pub(crate) struct MoodleException {
    #[serde(default)]
    pub errorcode: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuizzesResponse {
    #[serde(default)]
    pub quizzes: Vec<QuizRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptsResponse {
    #[serde(default)]
    pub attempts: Vec<AttemptRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptReviewResponse {
    #[serde(default)]
    pub questions: Vec<ReviewQuestion>,
}
