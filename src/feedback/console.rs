//! Interactive reviewer that answers proposals from a line-oriented input.

use std::sync::Arc;

use colored::*;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::channel::{FeedbackRegistry, Proposal};
use crate::error::Result;

/// Prompts for each proposal and resolves it in the registry.
pub struct ConsoleReviewer {
    registry: Arc<FeedbackRegistry>,
    proposals: mpsc::Receiver<Proposal>,
}

/// What a line of reviewer input means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Accept,
    Reject,
    Unclear,
}

fn parse_answer(line: &str) -> Answer {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "a" | "accept" => Answer::Accept,
        "n" | "no" | "r" | "reject" => Answer::Reject,
        _ => Answer::Unclear,
    }
}

/// Render a proposal for the terminal.
pub fn format_proposal(proposal: &Proposal) -> String {
    let imp = &proposal.improvement;
    let score = imp.score.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "-".to_string());
    let location = imp.target_location.as_deref().unwrap_or("(project)");

    format!(
        "{} {}\n  {} {}  {} {}  {} {}  {} {}\n  {} {}\n  {}\n",
        "Proposal".green().bold(),
        proposal.id,
        "category:".cyan(),
        imp.category,
        "impact:".cyan(),
        imp.impact,
        "effort:".cyan(),
        imp.effort,
        "score:".cyan(),
        score,
        "at:".cyan(),
        location,
        imp.description,
    )
}

impl ConsoleReviewer {
    pub fn new(registry: Arc<FeedbackRegistry>, proposals: mpsc::Receiver<Proposal>) -> Self {
        Self { registry, proposals }
    }

    /// Serve proposals until the queue closes, input ends, or `cancel` fires.
    /// Returns the number of proposals answered.
    pub async fn run<R, W>(mut self, input: R, mut output: W, cancel: CancellationToken) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut answered = 0;

        loop {
            let proposal = tokio::select! {
                _ = cancel.cancelled() => break,
                next = self.proposals.recv() => match next {
                    Some(p) => p,
                    None => break,
                },
            };

            output.write_all(format_proposal(&proposal).as_bytes()).await?;

            loop {
                output.write_all(format!("{} ", "Accept? [y/n]".yellow()).as_bytes()).await?;
                output.flush().await?;

                let line = tokio::select! {
                    _ = cancel.cancelled() => return Ok(answered),
                    line = lines.next_line() => line?,
                };
                let Some(line) = line else {
                    log::info!("Reviewer input closed; proposal {} left unanswered", proposal.id);
                    return Ok(answered);
                };

                let accepted = match parse_answer(&line) {
                    Answer::Accept => true,
                    Answer::Reject => false,
                    Answer::Unclear => continue,
                };
                if self.registry.resolve(&proposal.id, accepted) {
                    answered += 1;
                } else {
                    output
                        .write_all(format!("{}\n", "Proposal expired before the answer arrived".red()).as_bytes())
                        .await?;
                }
                break;
            }
        }

        Ok(answered)
    }
}
