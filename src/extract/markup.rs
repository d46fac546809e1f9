//! Markup querying.
//!
//! `DocumentParser` turns an HTML fragment into something that can answer
//! selector lookups. The default implementation uses the `scraper` crate,
//! which recovers from almost any input; `strict` mode instead rejects
//! fragments that html5ever had to repair.

use crate::error::ParseError;
use scraper::{Html, Selector};

/// A parsed document that answers selector lookups.
pub trait MarkupDocument {
    /// Trimmed text of the first element matching `selector`, or `""`.
    fn first_text(&self, selector: &str) -> Result<String, ParseError>;

    /// Trimmed text of every element matching `selector`, in document order.
    fn all_texts(&self, selector: &str) -> Result<Vec<String>, ParseError>;
}

/// Parses HTML fragments into queryable documents.
pub trait DocumentParser {
    fn parse(&self, html: &str) -> Result<Box<dyn MarkupDocument>, ParseError>;
}

/// `scraper`-backed parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperParser {
    strict: bool,
}

impl ScraperParser {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

impl DocumentParser for ScraperParser {
    fn parse(&self, html: &str) -> Result<Box<dyn MarkupDocument>, ParseError> {
        let document = Html::parse_fragment(html);

        if self.strict && !document.errors.is_empty() {
            let reasons: Vec<&str> = document.errors.iter().map(|e| e.as_ref()).collect();
            return Err(ParseError::Markup(reasons.join("; ")));
        }

        Ok(Box::new(ScraperDocument { html: document }))
    }
}

struct ScraperDocument {
    html: Html,
}

impl MarkupDocument for ScraperDocument {
    fn first_text(&self, selector: &str) -> Result<String, ParseError> {
        let selector = compile(selector)?;
        Ok(self
            .html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default())
    }

    fn all_texts(&self, selector: &str) -> Result<Vec<String>, ParseError> {
        let selector = compile(selector)?;
        Ok(self
            .html
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect())
    }
}

/// Compile a CSS selector, mapping failures to `ParseError::Selector`.
pub fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
