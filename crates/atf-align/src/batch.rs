use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use atf_codec::Transliterator;
use atf_types::WordPair;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::corpus::CorpusError;
use crate::filter::{CleaningFilter, FilterCounts, KeptPair};

pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error("failed to write kept pairs: {0}")]
    Sink(#[source] io::Error),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("chunk size must be positive")]
    ZeroChunkSize,
}

/// Cooperative cancellation flag, checked between chunks.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    pub chunk_size: usize,
    /// Worker threads; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Stop after this many pairs have been classified.
    pub max_rows: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            threads: None,
            max_rows: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub counts: FilterCounts,
    /// Rows rejected before classification (missing or blank cells).
    pub empty_column: usize,
    pub chunks: usize,
    pub cancelled: bool,
}

/// Runs a [`CleaningFilter`] over a pair stream in fixed-size chunks.
pub struct BatchRunner<'f, T> {
    filter: &'f CleaningFilter<T>,
    config: BatchConfig,
    cancel: CancelToken,
}

impl<'f, T: Transliterator + Sync> BatchRunner<'f, T> {
    pub fn new(filter: &'f CleaningFilter<T>, config: BatchConfig) -> Self {
        Self {
            filter,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Classify every row and hand kept pairs to `sink` in input order.
    ///
    /// Row-level reader errors are counted as `empty_column` and skipped;
    /// other reader errors and sink errors stop the run.
    pub fn run<I, S>(&self, rows: I, mut sink: S) -> Result<BatchSummary, BatchError>
    where
        I: IntoIterator<Item = Result<WordPair, CorpusError>>,
        S: FnMut(KeptPair) -> io::Result<()>,
    {
        if self.config.chunk_size == 0 {
            return Err(BatchError::ZeroChunkSize);
        }
        let pool = match self.config.threads {
            Some(n) => Some(rayon::ThreadPoolBuilder::new().num_threads(n).build()?),
            None => None,
        };

        let mut rows = rows.into_iter();
        let mut summary = BatchSummary::default();
        let mut next_index = 0usize;
        let started = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                warn!(
                    "cancelled after {} chunks ({} pairs)",
                    summary.chunks, summary.counts.total
                );
                summary.cancelled = true;
                break;
            }

            let budget = match self.config.max_rows {
                Some(max) => self.config.chunk_size.min(max - summary.counts.total),
                None => self.config.chunk_size,
            };
            if budget == 0 {
                break;
            }

            let mut chunk = Vec::with_capacity(budget);
            let mut exhausted = false;
            while chunk.len() < budget {
                match rows.next() {
                    Some(Ok(pair)) => chunk.push(pair),
                    Some(Err(err)) if err.is_row_level() => {
                        debug!("skipping row: {err}");
                        summary.empty_column += 1;
                    }
                    Some(Err(err)) => return Err(err.into()),
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }
            if chunk.is_empty() {
                break;
            }

            let chunk_started = Instant::now();
            let verdicts = match &pool {
                Some(pool) => pool.install(|| self.filter.verdicts_par(&chunk)),
                None => self.filter.verdicts_par(&chunk),
            };

            let mut chunk_counts = FilterCounts::default();
            for (pair, verdict) in chunk.into_iter().zip(verdicts) {
                let index = next_index;
                next_index += 1;
                chunk_counts.record(&verdict);
                if !verdict.is_kept() {
                    continue;
                }
                if let Some(classification) = verdict.classification().copied() {
                    sink(KeptPair {
                        index,
                        pair,
                        classification,
                    })
                    .map_err(BatchError::Sink)?;
                }
            }

            summary.chunks += 1;
            summary.counts.merge(&chunk_counts);
            info!(
                "chunk {}: {} pairs, kept {}, dropped {} ({:.2?}, {} total in {:.2?})",
                summary.chunks,
                chunk_counts.total,
                chunk_counts.kept,
                chunk_counts.dropped(),
                chunk_started.elapsed(),
                summary.counts.total,
                started.elapsed()
            );

            if exhausted {
                break;
            }
        }

        Ok(summary)
    }
}
