//! End-of-run reporting
//!
//! Per-archive record counts before and after a run, plus the outcome
//! counters collected by the workers. Observability only: nothing reads a
//! report back.

use crate::adapter::ArchiveId;
use crate::crawler::CounterSnapshot;
use std::time::Duration;

/// Record counts of one archive around a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCount {
    pub archive: ArchiveId,
    pub before: u64,
    pub after: u64,
}

impl ArchiveCount {
    /// Records added during the run
    pub fn added(&self) -> u64 {
        self.after.saturating_sub(self.before)
    }
}

/// Summary of one orchestrator run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Per-archive counts, in frontier order
    pub archives: Vec<ArchiveCount>,

    /// Listing pages in the frontier
    pub frontier_size: usize,

    /// Item and section outcomes
    pub counters: CounterSnapshot,

    pub elapsed: Duration,

    /// Whether the run stopped on request before draining the frontier
    pub cancelled: bool,
}

impl RunReport {
    pub fn total_added(&self) -> u64 {
        self.archives.iter().map(ArchiveCount::added).sum()
    }

    /// Count entry for `archive`, if it took part in the run
    pub fn archive(&self, archive: &str) -> Option<&ArchiveCount> {
        self.archives
            .iter()
            .find(|count| count.archive.as_str() == archive)
    }
}

/// Prints a report to stdout
pub fn print_report(report: &RunReport) {
    println!("=== Collection Report ===\n");

    println!(
        "Run {} in {:.1} minutes",
        if report.cancelled { "cancelled" } else { "completed" },
        report.elapsed.as_secs_f64() / 60.0
    );
    println!();

    println!("Listing pages:");
    println!("  In frontier: {}", report.frontier_size);
    println!("  Parsed: {}", report.counters.items_parsed);
    println!("  Failed: {}", report.counters.items_failed);
    println!();

    println!("Articles:");
    println!("  Persisted: {}", report.counters.sections_persisted);
    println!("  Skipped: {}", report.counters.sections_skipped);
    println!("  Dropped: {}", report.counters.sections_failed);
    println!();

    println!("Archives:");
    let width = report
        .archives
        .iter()
        .map(|count| count.archive.as_str().len())
        .max()
        .unwrap_or(0);
    for count in &report.archives {
        println!(
            "  {:<width$}  {} -> {} (+{})",
            count.archive.as_str(),
            count.before,
            count.after,
            count.added(),
            width = width
        );
    }
    println!();
    println!("Total new records: {}", report.total_added());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(name: &str, before: u64, after: u64) -> ArchiveCount {
        ArchiveCount {
            archive: ArchiveId::new(name),
            before,
            after,
        }
    }

    #[test]
    fn test_totals() {
        let report = RunReport {
            archives: vec![count("lemonde", 10, 25), count("lepoint", 4, 4)],
            ..RunReport::default()
        };
        assert_eq!(report.total_added(), 15);
        assert_eq!(report.archive("lepoint").map(ArchiveCount::added), Some(0));
        assert!(report.archive("lefigaro").is_none());
    }

    #[test]
    fn test_added_never_underflows() {
        assert_eq!(count("lemonde", 5, 3).added(), 0);
    }

    #[test]
    fn test_print_report_does_not_panic() {
        let report = RunReport {
            archives: vec![count("lemonde", 0, 3)],
            frontier_size: 2,
            cancelled: true,
            ..RunReport::default()
        };
        print_report(&report);
    }
}
