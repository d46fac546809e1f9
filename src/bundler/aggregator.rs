//! Course-wide question aggregation.
//!
//! Walks quizzes, then attempts, then the review of each finished attempt,
//! strictly in the order the service returns them. Every extracted question is stored
//! under its question text, so a question seen again later replaces the
//! earlier copy. The first error ends the run and nothing collected so far
//! is returned.

use super::cancel::CancelToken;
use crate::error::BundleError;
use crate::extract::{DocumentParser, QuestionExtractor};
use crate::models::{BundleStats, QuestionMap};
use crate::moodle::{QuizService, FN_ATTEMPT_REVIEW, FN_QUIZZES_BY_COURSES, FN_USER_ATTEMPTS};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct QuizAggregator<'a, S: ?Sized, P> {
    service: &'a S,
    extractor: &'a QuestionExtractor<P>,
    review_delay: Duration,
    cancel: CancelToken,
    stats: BundleStats,
}

impl<'a, S, P> QuizAggregator<'a, S, P>
where
    S: QuizService + ?Sized,
    P: DocumentParser,
{
    pub fn new(
        service: &'a S,
        extractor: &'a QuestionExtractor<P>,
        review_delay: Duration,
        cancel: CancelToken,
    ) -> Self {
        Self {
            service,
            extractor,
            review_delay,
            cancel,
            stats: BundleStats::default(),
        }
    }

    /// Counters from the most recent `aggregate` call.
    pub fn stats(&self) -> &BundleStats {
        &self.stats
    }

    /// Collect every question shown in any attempt of any quiz in the course.
    pub async fn aggregate(&mut self, course_id: u64) -> Result<QuestionMap, BundleError> {
        let mut questions = QuestionMap::new();
        let mut first_review = true;
        self.stats = BundleStats::default();

        let quizzes = self
            .cancel
            .guard(self.service.list_quizzes(course_id))
            .await?
            .map_err(|e| {
                BundleError::service(format!("{FN_QUIZZES_BY_COURSES}(course {course_id})"), e)
            })?;
        self.stats.quizzes = quizzes.len();
        info!("Course {} has {} quizzes", course_id, quizzes.len());

        for quiz in &quizzes {
            let attempts = self
                .cancel
                .guard(self.service.list_attempts(quiz.id))
                .await?
                .map_err(|e| BundleError::service(format!("{FN_USER_ATTEMPTS}(quiz {})", quiz.id), e))?;
            debug!("Quiz {} ({}) has {} attempts", quiz.id, quiz.name, attempts.len());

            for attempt in &attempts {
                if !attempt.is_finished() {
                    debug!(
                        "Skipping attempt {} of quiz {} in state {:?}",
                        attempt.id, quiz.id, attempt.state
                    );
                    self.stats.skipped_attempts += 1;
                    continue;
                }

                if !first_review {
                    self.cancel.sleep(self.review_delay).await?;
                }
                first_review = false;

                let review = self
                    .cancel
                    .guard(self.service.attempt_review(attempt.id))
                    .await?
                    .map_err(|e| {
                        BundleError::service(format!("{FN_ATTEMPT_REVIEW}(attempt {})", attempt.id), e)
                    })?;
                self.stats.attempts += 1;

                for fragment in &review {
                    let question = self.extractor.extract(&fragment.html).map_err(|source| {
                        BundleError::Parse {
                            attempt_id: attempt.id,
                            slot: fragment.slot,
                            source,
                        }
                    })?;
                    self.stats.fragments += 1;

                    if question.question_text.is_empty() {
                        self.stats.blank_questions += 1;
                        warn!(
                            "Blank question text in slot {} of attempt {}; blank questions share one entry",
                            fragment.slot, attempt.id
                        );
                    }

                    questions.insert(question.question_text.clone(), question);
                }

                debug!(
                    "Attempt {} reviewed: {} questions, {} unique so far",
                    attempt.id,
                    review.len(),
                    questions.len()
                );
            }
        }

        self.stats.unique_questions = questions.len();
        info!(
            "Collected {} unique questions from {} attempts",
            self.stats.unique_questions, self.stats.attempts
        );

        Ok(questions)
    }
}
