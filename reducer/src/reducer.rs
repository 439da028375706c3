use crate::callbacks::{Callback, ReductionEvent};
use crate::chunker::{Chunk, Chunker, PARAGRAPH_SEPARATOR};
use crate::config::ReducerConfig;
use crate::llm;
use crate::retry::RetryPolicy;
use crate::summarizer::ChunkSummarizer;
use crate::truncate::{char_len, truncate};
use crate::types::{
    ReductionRequest, ReductionResult, RoundReport, SOURCE_SEPARATOR, Summary, SummaryOutcome,
};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

type CallbackBox = Box<dyn Callback + Send + Sync>;

/// Map-reduce text reducer: chunk, summarize each chunk, recombine, repeat
/// until the output fits, then truncate as a last resort.
///
/// A `Reducer` holds no per-call state; one instance can serve concurrent
/// `reduce` calls.
pub struct Reducer {
    summarizer: Arc<ChunkSummarizer>,
    config: ReducerConfig,
    retry: RetryPolicy,
    callbacks: Vec<CallbackBox>,
}

impl Reducer {
    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    /// Request for `texts` using the configured sizes and model.
    pub fn request(&self, texts: Vec<String>) -> ReductionRequest {
        ReductionRequest::from_config(texts, &self.config)
    }

    pub async fn reduce_texts(
        &self,
        texts: Vec<String>,
        max_output_size: usize,
        chunk_size: usize,
        model: &str,
    ) -> Result<String> {
        let request = ReductionRequest::new(texts, max_output_size, chunk_size, model)
            .allow_truncation(self.config.allow_truncation);
        Ok(self.reduce(request).await?.text)
    }

    /// Reduces `request.texts` to at most `request.max_output_size` chars.
    ///
    /// Only an invalid request is an error. Summarizer failures, timeouts and
    /// misbehaving output degrade the result instead, which is flagged in the
    /// returned diagnostics.
    pub async fn reduce(&self, request: ReductionRequest) -> Result<ReductionResult> {
        request.validate()?;

        let started = Instant::now();
        let deadline = started + self.config.overall_timeout();
        let max = request.max_output_size;

        let mut result = ReductionResult {
            input_chars: request.input_chars(),
            ..Default::default()
        };

        if request.texts.is_empty() {
            return Ok(finish(result, String::new(), started));
        }

        let mut combined = request.texts.join(SOURCE_SEPARATOR);
        let mut combined_len = char_len(&combined);
        if combined_len <= max {
            tracing::debug!(chars = combined_len, max, "input already fits");
            return Ok(finish(result, combined, started));
        }

        let mut sources = request.texts.clone();

        for round in 1..=self.config.max_rounds {
            if Instant::now() >= deadline {
                self.deadline_exceeded(&mut result, started);
                break;
            }

            let (next, report) = self.run_round(round, &sources, &request, deadline).await;
            let next_len = char_len(&next);

            result.summarizer_calls += report.summarizer_calls;
            result.failed_calls += report.failures;
            result.fallbacks += report.fallbacks;
            result.rounds.push(report);

            if next_len >= combined_len {
                tracing::warn!(round, chars = next_len, "round did not shrink the text");
                break;
            }

            combined = next;
            combined_len = next_len;

            if combined_len <= max {
                break;
            }
            sources = vec![combined.clone()];
        }

        if combined_len > max && !request.allow_truncation {
            if Instant::now() >= deadline {
                self.deadline_exceeded(&mut result, started);
            } else {
                result.strict_pass = true;
                result.summarizer_calls += 1;
                match self.strict_pass(&combined, &request, deadline).await {
                    Some(strict) => {
                        combined_len = char_len(&strict);
                        combined = strict;
                    }
                    None => result.fallbacks += 1,
                }
            }
        }

        if combined_len > max {
            let cut = truncate(&combined, max);
            tracing::warn!(from = combined_len, to = char_len(&cut), max, "truncating reduced text");
            self.emit(&ReductionEvent::Truncated {
                from_chars: combined_len,
                to_chars: char_len(&cut),
            });
            result.truncated = true;
            combined = cut;
        }

        let result = finish(result, combined, started);
        tracing::info!(
            input_chars = result.input_chars,
            output_chars = result.output_chars,
            rounds = result.rounds.len(),
            truncated = result.truncated,
            elapsed_ms = result.elapsed_ms,
            "reduction finished"
        );
        Ok(result)
    }

    /// One split, summarize, recombine cycle over `sources`.
    async fn run_round(
        &self,
        round: usize,
        sources: &[String],
        request: &ReductionRequest,
        deadline: Instant,
    ) -> (String, RoundReport) {
        let started = Instant::now();
        let chunker = Chunker::new(request.chunk_size)
            .slice_oversized_words(self.config.slice_oversized_words);

        let chunks = sources
            .iter()
            .enumerate()
            .flat_map(|(source, text)| chunker.chunk_source(source, text))
            .collect::<Vec<_>>();

        let input_chars = chunks.iter().map(Chunk::len).sum::<usize>();
        let shares = self.shares(&chunks, sources.len(), request.max_output_size);

        tracing::info!(round, chunks = chunks.len(), input_chars, "reduction round started");
        self.emit(&ReductionEvent::RoundStarted {
            round,
            chunks: chunks.len(),
            input_chars,
        });

        let chunk_count = chunks.len();
        let summaries = self
            .summarize_all(chunks.into_iter().zip(shares).collect(), request, deadline)
            .await;

        let mut per_source = vec![Vec::new(); sources.len()];
        let mut report = RoundReport {
            round,
            chunks: chunk_count,
            input_chars,
            ..Default::default()
        };

        for summary in summaries {
            if summary.outcome != SummaryOutcome::Passthrough {
                report.summarizer_calls += 1;
            }
            if summary.outcome.is_fallback() {
                report.fallbacks += 1;
            }
            if matches!(summary.outcome, SummaryOutcome::Failed(_)) {
                report.failures += 1;
            }
            self.emit(&ReductionEvent::ChunkSummarized {
                round,
                source: summary.source,
                index: summary.index,
                input_chars: summary.input_chars,
                output_chars: char_len(&summary.text),
                outcome: summary.outcome.clone(),
                elapsed: summary.elapsed,
            });
            per_source[summary.source].push(summary.text);
        }

        let combined = per_source
            .into_iter()
            .filter(|parts| !parts.is_empty())
            .map(|parts| parts.join(PARAGRAPH_SEPARATOR))
            .collect::<Vec<_>>()
            .join(SOURCE_SEPARATOR);

        report.output_chars = char_len(&combined);
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            round,
            output_chars = report.output_chars,
            fallbacks = report.fallbacks,
            "reduction round finished"
        );
        self.emit(&ReductionEvent::RoundFinished {
            round,
            output_chars: report.output_chars,
            elapsed: started.elapsed(),
        });

        (combined, report)
    }

    /// Each chunk's share of the output budget, proportional to its share of
    /// the input.
    fn shares(&self, chunks: &[Chunk], sources: usize, max_output_size: usize) -> Vec<usize> {
        let total = chunks.iter().map(Chunk::len).sum::<usize>().max(1);
        let overhead = sources.saturating_sub(1) * char_len(SOURCE_SEPARATOR)
            + chunks.len().saturating_sub(sources) * char_len(PARAGRAPH_SEPARATOR);
        let available = max_output_size.saturating_sub(overhead).max(1);

        chunks
            .iter()
            .map(|chunk| (available as u128 * chunk.len() as u128 / total as u128) as usize)
            .collect()
    }

    /// Length asked of the summarizer. The floor keeps tiny shares from
    /// producing degenerate prompts.
    fn target(&self, share: usize) -> usize {
        share.max(self.config.min_summary_chars)
    }

    /// Summarizes chunks concurrently, at most `config.concurrency` at a time,
    /// and returns the summaries in chunk order. Only chunks already within
    /// their share skip the summarizer.
    async fn summarize_all(
        &self,
        planned: Vec<(Chunk, usize)>,
        request: &ReductionRequest,
        deadline: Instant,
    ) -> Vec<Summary> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut set = JoinSet::new();
        let mut slots: Vec<Option<Summary>> = vec![None; planned.len()];
        let mut positions = HashMap::new();

        for (pos, (chunk, share)) in planned.iter().cloned().enumerate() {
            if chunk.len() <= share {
                slots[pos] = Some(Summary {
                    source: chunk.source,
                    index: chunk.index,
                    input_chars: chunk.len(),
                    text: chunk.text,
                    outcome: SummaryOutcome::Passthrough,
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            let target = self.target(share);
            let summarizer = self.summarizer.clone();
            let semaphore = semaphore.clone();
            let retry = self.retry.clone();
            let model = request.model.clone();
            let temperature = self.config.temperature;
            let call_timeout = self.config.call_timeout();

            let handle = set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let started = Instant::now();
                let timeout = call_timeout.min(deadline.saturating_duration_since(started));

                tracing::debug!(
                    source = chunk.source,
                    index = chunk.index,
                    chars = chunk.len(),
                    target,
                    "summarizing chunk"
                );

                let res = tokio::time::timeout(
                    timeout,
                    retry.run(|| summarizer.summarize_chunk(&chunk.text, target, &model, temperature)),
                )
                .await
                .unwrap_or(Err(Error::GenerationTimeout(timeout)));

                (pos, settle(&chunk, target, res, started.elapsed()))
            });
            positions.insert(handle.id(), pos);
        }

        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, (pos, summary))) => slots[pos] = Some(summary),
                Err(e) => {
                    tracing::warn!(error = %e, "summarizer task failed");
                    if let Some(&pos) = positions.get(&e.id()) {
                        let (chunk, share) = &planned[pos];
                        let summary = settle(
                            chunk,
                            self.target(*share),
                            Err(Error::TaskJoinError(e)),
                            Duration::ZERO,
                        );
                        slots[pos] = Some(summary);
                    }
                }
            }
        }

        slots
            .into_iter()
            .zip(planned)
            .map(|(slot, (chunk, share))| {
                slot.unwrap_or_else(|| {
                    settle(
                        &chunk,
                        self.target(share),
                        Err(Error::LLMResponseError("summarizer task lost".to_string())),
                        Duration::ZERO,
                    )
                })
            })
            .collect()
    }

    /// One strict whole-text compression attempt. Returns the new text only
    /// when it is shorter than the input.
    async fn strict_pass(
        &self,
        text: &str,
        request: &ReductionRequest,
        deadline: Instant,
    ) -> Option<String> {
        let timeout = self
            .config
            .call_timeout()
            .min(deadline.saturating_duration_since(Instant::now()));

        let res = tokio::time::timeout(
            timeout,
            self.retry.run(|| {
                self.summarizer.compress_strict(
                    text,
                    request.max_output_size,
                    &request.model,
                    self.config.temperature,
                )
            }),
        )
        .await
        .unwrap_or(Err(Error::GenerationTimeout(timeout)));

        match res {
            Ok(out) if !out.is_empty() && char_len(&out) < char_len(text) => Some(out),
            Ok(_) => {
                tracing::warn!("strict compression did not shrink the text");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "strict compression failed");
                None
            }
        }
    }

    fn deadline_exceeded(&self, result: &mut ReductionResult, started: Instant) {
        tracing::warn!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reduction deadline exceeded, using partial result"
        );
        result.deadline_exceeded = true;
        self.emit(&ReductionEvent::DeadlineExceeded {
            elapsed: started.elapsed(),
        });
    }

    fn emit(&self, event: &ReductionEvent) {
        for callback in &self.callbacks {
            callback.on_event(event);
        }
    }
}

/// Turns a summarizer outcome into a chunk summary that is never longer than
/// the chunk: failures and non-shrinking output fall back to truncation.
fn settle(chunk: &Chunk, target: usize, res: Result<String>, elapsed: Duration) -> Summary {
    let input_chars = chunk.len();

    let (text, outcome) = match res {
        Ok(text) if !text.is_empty() && char_len(&text) < input_chars => {
            (text, SummaryOutcome::Summarized)
        }
        Ok(_) => {
            tracing::warn!(
                source = chunk.source,
                index = chunk.index,
                "summary not shorter than chunk, truncating instead"
            );
            (truncate(&chunk.text, target), SummaryOutcome::NotShorter)
        }
        Err(e) => {
            tracing::warn!(
                source = chunk.source,
                index = chunk.index,
                error = %e,
                "chunk summarization failed, truncating instead"
            );
            (truncate(&chunk.text, target), SummaryOutcome::Failed(e.to_string()))
        }
    };

    Summary {
        source: chunk.source,
        index: chunk.index,
        input_chars,
        text,
        outcome,
        elapsed,
    }
}

fn finish(mut result: ReductionResult, text: String, started: Instant) -> ReductionResult {
    result.output_chars = char_len(&text);
    result.text = text;
    result.elapsed_ms = started.elapsed().as_millis() as u64;
    result
}

pub struct ReducerBuilder {
    llm: Option<Arc<dyn llm::LLM + Send + Sync>>,
    config: ReducerConfig,
    retry: Option<RetryPolicy>,
    callbacks: Vec<CallbackBox>,
}

impl ReducerBuilder {
    pub fn new() -> Self {
        Self {
            llm: None,
            config: ReducerConfig::default(),
            retry: None,
            callbacks: Vec::new(),
        }
    }

    pub fn llm(mut self, llm: Arc<dyn llm::LLM + Send + Sync>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn config(mut self, config: ReducerConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the policy derived from `config.retry`.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn callback(mut self, callback: CallbackBox) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn build(self) -> Result<Reducer> {
        self.config.validate()?;

        let llm = self
            .llm
            .ok_or(Error::MissingArg("llm is required for reducer".to_string()))?;

        Ok(Reducer {
            summarizer: Arc::new(ChunkSummarizer::new(llm)),
            retry: self
                .retry
                .unwrap_or_else(|| RetryPolicy::from(&self.config.retry)),
            config: self.config,
            callbacks: self.callbacks,
        })
    }
}

impl Default for ReducerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
