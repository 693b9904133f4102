//! Frontier building and the shared work queue
//!
//! The frontier is materialized once, before any worker starts: one listing
//! URL per distinct formatted date per archive, newest first, interleaved
//! round-robin across archives so every archive shows progress early.

use crate::adapter::SiteAdapter;
use crate::HarvestError;
use chrono::NaiveDate;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// Inclusive date range of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlWindow {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl CrawlWindow {
    pub fn new(begin: NaiveDate, end: NaiveDate) -> Result<Self, HarvestError> {
        if begin > end {
            return Err(HarvestError::InvalidWindow { begin, end });
        }
        Ok(Self { begin, end })
    }

    /// The window restricted to dates on or after `min_date`
    ///
    /// `None` when the whole window predates `min_date`.
    pub fn clipped(&self, min_date: NaiveDate) -> Option<CrawlWindow> {
        let begin = self.begin.max(min_date);
        (begin <= self.end).then_some(CrawlWindow {
            begin,
            end: self.end,
        })
    }

    /// Every date of the window, oldest first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.begin.iter_days().take_while(move |day| *day <= end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.begin <= date && date <= self.end
    }
}

/// One unit of work: the listing of one archive for one date
///
/// `url` still carries `{page}`; pagination resolves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub date: NaiveDate,
    pub url: String,
}

/// Listing URLs of one archive over `window`, newest first
///
/// Dates sharing a formatted URL (monthly archives) collapse onto the first
/// of them. With `done_dates`, dates that already have stored records are
/// left out.
pub fn build_adapter_frontier(
    adapter: &dyn SiteAdapter,
    window: &CrawlWindow,
    done_dates: Option<&HashSet<NaiveDate>>,
) -> Vec<FrontierItem> {
    let Some(window) = window.clipped(adapter.min_date()) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut items: Vec<FrontierItem> = window
        .days()
        .filter(|day| done_dates.map_or(true, |done| !done.contains(day)))
        .filter_map(|date| {
            let url = adapter.format_listing_url(date);
            seen.insert(url.clone()).then_some(FrontierItem { date, url })
        })
        .collect();

    items.reverse();
    items
}

/// Merges per-archive lists one item per archive per round
pub fn interleave(lists: Vec<Vec<FrontierItem>>) -> Vec<FrontierItem> {
    let total = lists.iter().map(Vec::len).sum();
    let mut iters: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();
    let mut merged = Vec::with_capacity(total);

    while merged.len() < total {
        for iter in iters.iter_mut() {
            if let Some(item) = iter.next() {
                merged.push(item);
            }
        }
    }
    merged
}

/// Interleaved frontier over several archives
pub fn build_frontier(
    adapters: &[&dyn SiteAdapter],
    window: &CrawlWindow,
) -> Vec<FrontierItem> {
    interleave(
        adapters
            .iter()
            .map(|adapter| build_adapter_frontier(*adapter, window, None))
            .collect(),
    )
}

/// Work queue shared by the workers
///
/// Items come out in frontier order; nothing is ever pushed back.
pub struct Frontier {
    queue: Mutex<VecDeque<FrontierItem>>,
    total: usize,
}

impl Frontier {
    pub fn new(items: Vec<FrontierItem>) -> Self {
        let total = items.len();
        Self {
            queue: Mutex::new(items.into()),
            total,
        }
    }

    /// Takes the next item, `None` once the frontier is drained
    pub fn next(&self) -> Option<FrontierItem> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Number of items the frontier was built with
    pub fn total(&self) -> usize {
        self.total
    }
}
