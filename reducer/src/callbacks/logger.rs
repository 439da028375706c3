use crate::Result;
use crate::callbacks::{Callback, ReductionEvent};
use std::io::Write;
use std::sync::Mutex;

/// Writes a Markdown trace of every reduction to `writer`.
pub struct EventLogger<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> EventLogger<W> {
    pub fn new(name: &str, mut writer: W) -> Result<Box<Self>> {
        write!(writer, "## {}\n\n", name)?;

        Ok(Box::new(Self {
            writer: Mutex::new(writer),
        }))
    }

    fn write_event(&self, event: &ReductionEvent) -> std::io::Result<()> {
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        write!(writer, "{}", event)?;
        writer.flush()
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> Callback for EventLogger<W> {
    fn on_event(&self, event: &ReductionEvent) {
        if let Err(e) = self.write_event(event) {
            tracing::warn!(error = %e, "failed to write reduction event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EventLogger;
    use crate::Result;
    use crate::callbacks::{Callback, ReductionEvent};
    use crate::types::SummaryOutcome;
    use std::time::Duration;

    #[test]
    fn test_writes_markdown_trace() -> Result<()> {
        let logger = *EventLogger::new("reduce", Vec::new())?;

        logger.on_event(&ReductionEvent::RoundStarted {
            round: 1,
            chunks: 2,
            input_chars: 5000,
        });
        logger.on_event(&ReductionEvent::ChunkSummarized {
            round: 1,
            source: 0,
            index: 1,
            input_chars: 2500,
            output_chars: 400,
            outcome: SummaryOutcome::Summarized,
            elapsed: Duration::from_millis(1500),
        });
        logger.on_event(&ReductionEvent::Truncated {
            from_chars: 3000,
            to_chars: 2500,
        });

        let out = String::from_utf8(logger.into_inner()).unwrap();
        assert!(out.starts_with("## reduce\n\n### Round 1\n2 chunks, 5000 chars in\n"));
        assert!(out.contains("- source 0 chunk 1: 2500 -> 400 chars (summarized, 1.50s)\n"));
        assert!(out.ends_with("## [TRUNCATED 3000 -> 2500 chars]\n"));
        Ok(())
    }
}
