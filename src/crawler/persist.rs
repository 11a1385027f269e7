//! Deduplication and persistence
//!
//! A candidate is novel only if neither its listing URL nor its
//! (title, company, location) triple is already stored. Duplicates are dropped
//! before any detail fetch; novel candidates are enriched, merged and inserted
//! one at a time, in input order.

use crate::crawler::enricher::DetailEnricher;
use crate::session::BrowserSession;
use crate::storage::{JobRecord, JobStore, ListingCandidate, StorageResult};
use std::time::Duration;

/// Per-batch (or per-run) persistence counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub saved: u32,
    pub duplicates: u32,
    pub errors: u32,
}

impl PersistStats {
    pub fn absorb(&mut self, other: PersistStats) {
        self.saved += other.saved;
        self.duplicates += other.duplicates;
        self.errors += other.errors;
    }

    pub fn processed(&self) -> u32 {
        self.saved + self.duplicates + self.errors
    }
}

/// Outcome of one batch
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Records committed by this batch, in input order
    pub saved: Vec<JobRecord>,
    pub stats: PersistStats,
}

/// Why a candidate was judged a duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicate {
    Url,
    Details,
}

/// Checks novelty as `exists(url) OR exists_by_triple(title, company, location)`
pub fn find_duplicate<St: JobStore>(
    store: &St,
    candidate: &ListingCandidate,
) -> StorageResult<Option<Duplicate>> {
    if store.exists(&candidate.url)? {
        return Ok(Some(Duplicate::Url));
    }
    if store.exists_by_triple(&candidate.title, &candidate.company, &candidate.location)? {
        return Ok(Some(Duplicate::Details));
    }
    Ok(None)
}

/// Persists batches of candidates through a store
#[derive(Debug, Clone)]
pub struct Persister {
    enricher: DetailEnricher,
    request_delay: Duration,
}

impl Persister {
    /// # Arguments
    ///
    /// * `enricher` - Detail fetcher used for novel candidates only
    /// * `request_delay` - Courtesy wait after each novel candidate
    pub fn new(enricher: DetailEnricher, request_delay: Duration) -> Self {
        Self {
            enricher,
            request_delay,
        }
    }

    /// Processes a batch in input order
    ///
    /// A failing novelty check or insert is counted as an error and the batch
    /// carries on. The number of committed records, not the batch size, is
    /// what counts toward a quota.
    pub async fn process<S, St>(
        &self,
        session: &mut S,
        store: &mut St,
        candidates: Vec<ListingCandidate>,
    ) -> BatchResult
    where
        S: BrowserSession,
        St: JobStore,
    {
        let mut result = BatchResult::default();
        let total = candidates.len();

        tracing::info!("Attempting to save {} jobs...", total);

        for (i, mut candidate) in candidates.into_iter().enumerate() {
            tracing::debug!(
                "Processing job {}/{}: {} at {} ({})",
                i + 1,
                total,
                candidate.title,
                candidate.company,
                candidate.url
            );

            match find_duplicate(store, &candidate) {
                Ok(Some(reason)) => {
                    result.stats.duplicates += 1;
                    tracing::debug!(
                        "Duplicate ({:?}): {} at {}",
                        reason,
                        candidate.title,
                        candidate.company
                    );
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    result.stats.errors += 1;
                    tracing::warn!("Novelty check failed for {}: {}", candidate.url, e);
                    continue;
                }
            }

            let details = self.enricher.enrich(session, &candidate.url).await;
            details.merge_into(&mut candidate);

            match store.insert(&candidate) {
                Ok(Some(record)) => {
                    result.stats.saved += 1;
                    tracing::info!(
                        "Saved job {}: {} at {}",
                        result.stats.saved,
                        record.title,
                        record.company
                    );
                    result.saved.push(record);
                }
                Ok(None) => {
                    result.stats.errors += 1;
                    tracing::warn!("Failed to save {}: listing URL already stored", candidate.title);
                }
                Err(e) => {
                    result.stats.errors += 1;
                    tracing::warn!("Failed to save {}: {}", candidate.title, e);
                }
            }

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        tracing::info!(
            "Save summary: {} processed, {} saved, {} duplicates, {} errors",
            total,
            result.stats.saved,
            result.stats.duplicates,
            result.stats.errors
        );

        result
    }
}

/// Removes all but the lowest-ID record of every duplicated triple
pub fn compact_duplicates<St: JobStore>(store: &mut St) -> StorageResult<usize> {
    let removed = store.compact_duplicates()?;
    tracing::info!("Removed {} duplicate jobs", removed);
    Ok(removed)
}
