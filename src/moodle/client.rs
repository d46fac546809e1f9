//! Moodle REST client.
//!
//! Logs in through `login/token.php` and calls web-service functions on
//! `webservice/rest/server.php` with the JSON response format.

use super::types::{
    AttemptReviewResponse, AttemptsResponse, MoodleException, QuizzesResponse, TokenResponse,
};
use super::{QuizService, FN_ATTEMPT_REVIEW, FN_QUIZZES_BY_COURSES, FN_USER_ATTEMPTS};
use crate::config::MoodleConfig;
use crate::error::ServiceError;
use crate::models::{AttemptRef, QuizRef, ReviewQuestion};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

const TOKEN_PATH: &str = "/login/token.php";
const REST_PATH: &str = "/webservice/rest/server.php";

/// Unauthenticated client for a Moodle site.
#[derive(Debug, Clone)]
pub struct MoodleClient {
    base_url: String,
    service: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl MoodleClient {
    pub fn new(config: &MoodleConfig) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ServiceError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service: config.service.clone(),
            timeout_seconds: config.timeout_seconds,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange credentials for a web-service token.
    #[instrument(skip(self, password), fields(site = %self.base_url))]
    pub async fn login(self, username: &str, password: &str) -> Result<MoodleSession, ServiceError> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let form = [
            ("username", username),
            ("password", password),
            ("service", self.service.as_str()),
        ];

        let response = self
            .http_client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body = self.read_body(response).await?;
        let reply: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::MalformedResponse(format!("login reply: {e}")))?;

        match reply {
            TokenResponse {
                token: Some(token), ..
            } if !token.is_empty() => {
                info!("Logged in as {}", username);
                Ok(MoodleSession::with_token(self, token))
            }
            TokenResponse {
                error, errorcode, ..
            } => {
                let message = error.unwrap_or_else(|| "no token in login reply".to_string());
                Err(ServiceError::AuthenticationFailed(match errorcode {
                    Some(code) => format!("{message} ({code})"),
                    None => message,
                }))
            }
        }
    }

    /// Read a response body, turning non-success statuses into `ServiceError::Http`.
    async fn read_body(&self, response: reqwest::Response) -> Result<String, ServiceError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(ServiceError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }

    fn transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout(self.timeout_seconds)
        } else if e.is_connect() {
            ServiceError::Network(format!("cannot connect to Moodle at {}", self.base_url))
        } else {
            ServiceError::Network(e.to_string())
        }
    }
}

/// An authenticated Moodle session.
#[derive(Debug, Clone)]
pub struct MoodleSession {
    client: MoodleClient,
    token: String,
}

impl MoodleSession {
    /// Use an existing web-service token instead of logging in.
    pub fn with_token(client: MoodleClient, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Call a web-service function and decode its JSON reply.
    async fn call<T: DeserializeOwned>(
        &self,
        function: &str,
        params: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let url = format!("{}{}", self.client.base_url, REST_PATH);

        let mut form: Vec<(&str, &str)> = vec![
            ("wstoken", self.token.as_str()),
            ("wsfunction", function),
            ("moodlewsrestformat", "json"),
        ];
        form.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        debug!("Calling {}", function);

        let response = self
            .client
            .http_client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.client.transport_error(e))?;

        let body = self.client.read_body(response).await?;

        decode_reply(function, &body)
    }
}

/// Decode a web-service reply, surfacing Moodle exception payloads.
fn decode_reply<T: DeserializeOwned>(function: &str, body: &str) -> Result<T, ServiceError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedResponse(format!("{function}: {e}")))?;

    if value.get("exception").is_some() {
        let exception: MoodleException = serde_json::from_value(value)
            .map_err(|e| ServiceError::MalformedResponse(format!("{function}: {e}")))?;
        return Err(ServiceError::Remote {
            errorcode: exception.errorcode,
            message: exception.message,
        });
    }

    serde_json::from_value(value)
        .map_err(|e| ServiceError::MalformedResponse(format!("{function}: {e}")))
}

#[async_trait]
impl QuizService for MoodleSession {
    #[instrument(skip(self))]
    async fn list_quizzes(&self, course_id: u64) -> Result<Vec<QuizRef>, ServiceError> {
        let reply: QuizzesResponse = self
            .call(
                FN_QUIZZES_BY_COURSES,
                &[("courseids[0]", course_id.to_string())],
            )
            .await?;
        Ok(reply.quizzes)
    }

    #[instrument(skip(self))]
    async fn list_attempts(&self, quiz_id: u64) -> Result<Vec<AttemptRef>, ServiceError> {
        let reply: AttemptsResponse = self
            .call(
                FN_USER_ATTEMPTS,
                &[("quizid", quiz_id.to_string()), ("status", "finished".to_string())],
            )
            .await?;
        Ok(reply.attempts)
    }

    #[instrument(skip(self))]
    async fn attempt_review(&self, attempt_id: u64) -> Result<Vec<ReviewQuestion>, ServiceError> {
        let reply: AttemptReviewResponse = self
            .call(FN_ATTEMPT_REVIEW, &[("attemptid", attempt_id.to_string())])
            .await?;
        Ok(reply.questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{CancelToken, QuizAggregator};
    use crate::extract::QuestionExtractor;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MoodleClient {
        let config = MoodleConfig {
            base_url: server.uri(),
            timeout_seconds: 5,
            ..MoodleConfig::default()
        };
        MoodleClient::new(&config).unwrap()
    }

    async fn mount_ws(server: &MockServer, function: &str, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(REST_PATH))
            .and(body_string_contains(format!("wsfunction={function}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_login_and_list_quizzes() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("username=alice"))
            .and(body_string_contains("service=moodle_mobile_app"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"token": "tok123", "privatetoken": null})),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(REST_PATH))
            .and(body_string_contains("wstoken=tok123"))
            .and(body_string_contains("courseids%5B0%5D=7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "quizzes": [
                    {"id": 3, "course": 7, "coursemodule": 90, "name": "Unit 1 Quiz", "intro": ""},
                    {"id": 4, "course": 7, "coursemodule": 91, "name": "Unit 2 Quiz", "intro": ""}
                ],
                "warnings": []
            })))
            .mount(&server)
            .await;

        let session = client_for(&server).login("alice", "secret").await.unwrap();
        let quizzes = session.list_quizzes(7).await.unwrap();

        assert_eq!(quizzes.len(), 2);
        assert_eq!(quizzes[0].id, 3);
        assert_eq!(quizzes[1].name, "Unit 2 Quiz");
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "Invalid login, please try again",
                "errorcode": "invalidlogin"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).login("alice", "wrong").await.unwrap_err();
        match err {
            ServiceError::AuthenticationFailed(message) => {
                assert!(message.contains("invalidlogin"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exception_payload_becomes_remote_error() {
        let server = MockServer::start().await;
        mount_ws(
            &server,
            FN_USER_ATTEMPTS,
            serde_json::json!({
                "exception": "moodle_exception",
                "errorcode": "invalidtoken",
                "message": "Invalid token - token not found"
            }),
        )
        .await;

        let session = MoodleSession::with_token(client_for(&server), "stale");
        let err = session.list_attempts(3).await.unwrap_err();
        match err {
            ServiceError::Remote { errorcode, .. } => assert_eq!(errorcode, "invalidtoken"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(REST_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let session = MoodleSession::with_token(client_for(&server), "tok");
        let err = session.list_quizzes(1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(REST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login page</html>"))
            .mount(&server)
            .await;

        let session = MoodleSession::with_token(client_for(&server), "tok");
        let err = session.attempt_review(9).await.unwrap_err();
        assert!(matches!(err, ServiceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_attempt_review_decoding() {
        let server = MockServer::start().await;
        mount_ws(
            &server,
            FN_ATTEMPT_REVIEW,
            serde_json::json!({
                "grade": "8.00",
                "attempt": {"id": 21, "quiz": 3, "state": "finished"},
                "additionaldata": [],
                "questions": [
                    {"slot": 1, "type": "multichoice", "page": 0, "html": "<div class=\"qtext\">One</div>"},
                    {"slot": 2, "type": "truefalse", "page": 0, "html": "<div class=\"qtext\">Two</div>"}
                ],
                "warnings": []
            }),
        )
        .await;

        let session = MoodleSession::with_token(client_for(&server), "tok");
        let questions = session.attempt_review(21).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].slot, 2);
        assert!(questions[0].html.contains("One"));
    }

    #[tokio::test]
    async fn test_bundle_course_over_http() {
        let server = MockServer::start().await;
        mount_ws(
            &server,
            FN_QUIZZES_BY_COURSES,
            serde_json::json!({"quizzes": [{"id": 3, "course": 7, "name": "Quiz"}]}),
        )
        .await;
        mount_ws(
            &server,
            FN_USER_ATTEMPTS,
            serde_json::json!({"attempts": [
                {"id": 21, "quiz": 3, "attempt": 1, "state": "finished"},
                {"id": 22, "quiz": 3, "attempt": 2, "state": "finished"}
            ]}),
        )
        .await;
        mount_ws(
            &server,
            FN_ATTEMPT_REVIEW,
            serde_json::json!({"questions": [
                {"slot": 1, "html": "<div class=\"qtext\">Capital of France?</div><div class=\"rightanswer\">Paris</div>"}
            ]}),
        )
        .await;

        let session = MoodleSession::with_token(client_for(&server), "tok");
        let extractor = QuestionExtractor::default();
        let mut aggregator =
            QuizAggregator::new(&session, &extractor, Duration::ZERO, CancelToken::new());

        let questions = aggregator.aggregate(7).await.unwrap();
        assert_eq!(aggregator.stats().attempts, 2);
        assert_eq!(aggregator.stats().fragments, 2);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions["Capital of France?"].right_answer, "Paris");
    }

    #[tokio::test]
    async fn test_in_progress_attempt_is_not_reviewed() {
        let server = MockServer::start().await;
        mount_ws(
            &server,
            FN_QUIZZES_BY_COURSES,
            serde_json::json!({"quizzes": [{"id": 3, "course": 7, "name": "Quiz"}]}),
        )
        .await;

        Mock::given(method("POST"))
            .and(path(REST_PATH))
            .and(body_string_contains(format!("wsfunction={FN_USER_ATTEMPTS}")))
            .and(body_string_contains("status=finished"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"attempts": [
                {"id": 21, "quiz": 3, "attempt": 1, "state": "finished"},
                {"id": 22, "quiz": 3, "attempt": 2, "state": "inprogress"}
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(REST_PATH))
            .and(body_string_contains(format!("wsfunction={FN_ATTEMPT_REVIEW}")))
            .and(body_string_contains("attemptid=21"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"questions": [
                {"slot": 1, "html": "<div class=\"qtext\">Capital of Peru?</div><div class=\"rightanswer\">Lima</div>"}
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(REST_PATH))
            .and(body_string_contains(format!("wsfunction={FN_ATTEMPT_REVIEW}")))
            .and(body_string_contains("attemptid=22"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "exception": "moodle_exception",
                "errorcode": "noreviewattempt",
                "message": "You are not allowed to review this attempt."
            })))
            .expect(0)
            .mount(&server)
            .await;

        let session = MoodleSession::with_token(client_for(&server), "tok");
        let extractor = QuestionExtractor::default();
        let mut aggregator =
            QuizAggregator::new(&session, &extractor, Duration::ZERO, CancelToken::new());

        let questions = aggregator.aggregate(7).await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions["Capital of Peru?"].right_answer, "Lima");
        assert_eq!(aggregator.stats().attempts, 1);
        assert_eq!(aggregator.stats().skipped_attempts, 1);
        server.verify().await;
    }
}
