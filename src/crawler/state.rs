//! Frontier item and section state tracking
//!
//! A frontier item moves `Pending -> Fetching -> Parsed | FetchFailed`. A
//! section ends in exactly one of `Persisted`, `Skipped` or `ExtractFailed`;
//! a section whose batch fails enrichment or insertion is counted as
//! `ExtractFailed` too, since it is dropped with the batch.

use crate::HarvestError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle of one frontier item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Waiting in the frontier
    Pending,

    /// Listing pages are being fetched
    Fetching,

    // ===== Terminal States =====
    /// Listing fetched and its sections handed to extraction
    Parsed,

    /// Listing could not be fetched; logged and abandoned
    FetchFailed,
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Parsed | Self::FetchFailed)
    }

    pub fn can_transition_to(&self, next: ItemState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Parsed)
                | (Self::Fetching, Self::FetchFailed)
        )
    }

    /// Moves to `next`, refusing anything the lifecycle does not allow
    pub fn transition(self, next: ItemState) -> Result<ItemState, HarvestError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(HarvestError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Parsed => "parsed",
            Self::FetchFailed => "fetch_failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionState {
    /// Fields extracted, waiting in a batch
    Extracted,

    /// Vector attached by the embedding service
    Enriched,

    /// Inserted into storage
    Persisted,

    /// No usable permalink, or already collected
    Skipped,

    /// Dropped after a logged failure
    ExtractFailed,
}

/// Run-wide outcome counters, updated by every worker
#[derive(Debug, Default)]
pub struct CrawlCounters {
    items_parsed: AtomicU64,
    items_failed: AtomicU64,
    sections_persisted: AtomicU64,
    sections_skipped: AtomicU64,
    sections_failed: AtomicU64,
}

impl CrawlCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts an item reaching a terminal state
    pub fn record_item(&self, state: ItemState) {
        match state {
            ItemState::Parsed => self.items_parsed.fetch_add(1, Ordering::Relaxed),
            ItemState::FetchFailed => self.items_failed.fetch_add(1, Ordering::Relaxed),
            ItemState::Pending | ItemState::Fetching => return,
        };
    }

    /// Counts `count` sections reaching `state`
    pub fn record_sections(&self, state: SectionState, count: u64) {
        let counter = match state {
            SectionState::Persisted => &self.sections_persisted,
            SectionState::Skipped => &self.sections_skipped,
            SectionState::ExtractFailed => &self.sections_failed,
            SectionState::Extracted | SectionState::Enriched => return,
        };
        counter.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            items_parsed: self.items_parsed.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            sections_persisted: self.sections_persisted.load(Ordering::Relaxed),
            sections_skipped: self.sections_skipped.load(Ordering::Relaxed),
            sections_failed: self.sections_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CrawlCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub items_parsed: u64,
    pub items_failed: u64,
    pub sections_persisted: u64,
    pub sections_skipped: u64,
    pub sections_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_lifecycle() {
        let state = ItemState::Pending.transition(ItemState::Fetching).unwrap();
        let state = state.transition(ItemState::Parsed).unwrap();
        assert!(state.is_terminal());
        assert!(ItemState::Fetching.can_transition_to(ItemState::FetchFailed));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!ItemState::Pending.can_transition_to(ItemState::Parsed));
        assert!(!ItemState::FetchFailed.can_transition_to(ItemState::Fetching));

        let err = ItemState::Parsed.transition(ItemState::Pending).unwrap_err();
        assert!(matches!(
            err,
            HarvestError::InvalidTransition {
                from: ItemState::Parsed,
                to: ItemState::Pending
            }
        ));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ItemState::FetchFailed.to_string(), "fetch_failed");
        assert_eq!(ItemState::Pending.to_string(), "pending");
    }

    #[test]
    fn test_counters() {
        let counters = CrawlCounters::new();
        counters.record_item(ItemState::Parsed);
        counters.record_item(ItemState::FetchFailed);
        counters.record_item(ItemState::Fetching);
        counters.record_sections(SectionState::Persisted, 31);
        counters.record_sections(SectionState::ExtractFailed, 1);
        counters.record_sections(SectionState::Enriched, 5);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.items_parsed, 1);
        assert_eq!(snapshot.items_failed, 1);
        assert_eq!(snapshot.sections_persisted, 31);
        assert_eq!(snapshot.sections_failed, 1);
        assert_eq!(snapshot.sections_skipped, 0);
    }
}
