//! Proposal feedback: submission, correlated answers and the console reviewer.

mod channel;
mod console;

pub use channel::{FeedbackChannel, FeedbackRegistry, FeedbackResponse, Proposal};
pub use console::{ConsoleReviewer, format_proposal};
