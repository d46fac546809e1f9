//! Question bundling.
//!
//! This module drives a single sequential pass over a course's quiz history.

pub mod aggregator;
pub mod cancel;

pub use aggregator::QuizAggregator;
pub use cancel::CancelToken;
