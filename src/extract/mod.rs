//! Question extraction from attempt review markup.
//!
//! Each review fragment is one question as Moodle rendered it. The
//! extractor runs a fixed set of selector lookups against it; lookups that
//! match nothing are normal (ungraded attempts have no right answer, true/false
//! questions have no prompt) and produce empty text.

pub mod markup;

pub use markup::{DocumentParser, MarkupDocument, ScraperParser};

use crate::error::ParseError;
use crate::models::Question;
use serde::{Deserialize, Serialize};

/// CSS selectors for each question field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    #[serde(default = "default_question_text")]
    pub question_text: String,

    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Matched with "all", every other selector with "first".
    #[serde(default = "default_choices")]
    pub choices: String,

    #[serde(default = "default_specific_feedback")]
    pub specific_feedback: String,

    #[serde(default = "default_general_feedback")]
    pub general_feedback: String,

    #[serde(default = "default_right_answer")]
    pub right_answer: String,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            question_text: default_question_text(),
            prompt: default_prompt(),
            choices: default_choices(),
            specific_feedback: default_specific_feedback(),
            general_feedback: default_general_feedback(),
            right_answer: default_right_answer(),
        }
    }
}

fn default_question_text() -> String {
    "div.qtext".to_string()
}

fn default_prompt() -> String {
    "div.prompt".to_string()
}

fn default_choices() -> String {
    "label.ml-1".to_string()
}

fn default_specific_feedback() -> String {
    "div.specificfeedback".to_string()
}

fn default_general_feedback() -> String {
    "div.generalfeedback".to_string()
}

fn default_right_answer() -> String {
    "div.rightanswer".to_string()
}

impl SelectorSet {
    /// Check that every selector compiles.
    pub fn validate(&self) -> Result<(), ParseError> {
        for selector in [
            &self.question_text,
            &self.prompt,
            &self.choices,
            &self.specific_feedback,
            &self.general_feedback,
            &self.right_answer,
        ] {
            markup::compile(selector)?;
        }
        Ok(())
    }
}

/// Turns one review fragment into a `Question`.
pub struct QuestionExtractor<P> {
    parser: P,
    selectors: SelectorSet,
}

impl<P: DocumentParser> QuestionExtractor<P> {
    pub fn new(parser: P, selectors: SelectorSet) -> Self {
        Self { parser, selectors }
    }

    /// Extract a question from an HTML fragment.
    ///
    /// Fails only if the parser rejects the fragment or a selector is
    /// invalid. An empty question text is returned as-is.
    pub fn extract(&self, html: &str) -> Result<Question, ParseError> {
        let doc = self.parser.parse(html)?;
        let s = &self.selectors;

        Ok(Question {
            question_text: doc.first_text(&s.question_text)?,
            prompt: doc.first_text(&s.prompt)?,
            choices: doc.all_texts(&s.choices)?,
            specific_feedback: doc.first_text(&s.specific_feedback)?,
            general_feedback: doc.first_text(&s.general_feedback)?,
            right_answer: doc.first_text(&s.right_answer)?,
        })
    }
}

impl Default for QuestionExtractor<ScraperParser> {
    fn default() -> Self {
        Self::new(ScraperParser::default(), SelectorSet::default())
    }
}
