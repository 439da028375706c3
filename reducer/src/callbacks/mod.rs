use crate::types::SummaryOutcome;
use std::time::Duration;

mod logger;
pub use logger::EventLogger;

/// Progress of a single reduction, in emission order.
#[derive(Clone, Debug)]
pub enum ReductionEvent {
    RoundStarted {
        round: usize,
        chunks: usize,
        input_chars: usize,
    },
    ChunkSummarized {
        round: usize,
        source: usize,
        index: usize,
        input_chars: usize,
        output_chars: usize,
        outcome: SummaryOutcome,
        elapsed: Duration,
    },
    RoundFinished {
        round: usize,
        output_chars: usize,
        elapsed: Duration,
    },
    DeadlineExceeded {
        elapsed: Duration,
    },
    Truncated {
        from_chars: usize,
        to_chars: usize,
    },
}

impl std::fmt::Display for ReductionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReductionEvent::RoundStarted {
                round,
                chunks,
                input_chars,
            } => write!(
                f,
                "### Round {}\n{} chunks, {} chars in\n",
                round, chunks, input_chars
            ),
            ReductionEvent::ChunkSummarized {
                source,
                index,
                input_chars,
                output_chars,
                outcome,
                elapsed,
                ..
            } => write!(
                f,
                "- source {} chunk {}: {} -> {} chars ({}, {:.2}s)\n",
                source,
                index,
                input_chars,
                output_chars,
                outcome,
                elapsed.as_secs_f64()
            ),
            ReductionEvent::RoundFinished {
                round,
                output_chars,
                elapsed,
            } => write!(
                f,
                "round {} done: {} chars out in {:.2}s\n---\n",
                round,
                output_chars,
                elapsed.as_secs_f64()
            ),
            ReductionEvent::DeadlineExceeded { elapsed } => write!(
                f,
                "## [DEADLINE EXCEEDED after {:.2}s]\n",
                elapsed.as_secs_f64()
            ),
            ReductionEvent::Truncated {
                from_chars,
                to_chars,
            } => write!(f, "## [TRUNCATED {} -> {} chars]\n", from_chars, to_chars),
        }
    }
}

/// Observer for reduction progress. Called inline from the reducer, so
/// implementations should return quickly.
pub trait Callback {
    fn on_event(&self, event: &ReductionEvent);
}
