//! Collection jobs
//!
//! Runs collections in the background and tracks them by handle. Archive
//! names and the date window are checked when a job is started, so a bad
//! request fails immediately instead of producing a failed job.

use crate::adapter::Registry;
use crate::config::{validate, Config};
use crate::crawler::{crawl, CrawlWindow, StopSignal};
use crate::report::RunReport;
use crate::HarvestError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Identifies one started job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(u64);

impl JobHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Where a job stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Succeeded,
    /// The run could not start or its task died; carries the reason
    Failed(String),
    /// Stopped on request before the frontier was drained
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

struct Job {
    stop: StopSignal,
    status: watch::Sender<JobStatus>,
    report: Mutex<Option<RunReport>>,
}

impl Job {
    fn finish(&self, handle: JobHandle, outcome: Result<RunReport, String>) {
        let status = match outcome {
            Ok(report) => {
                let status = if report.cancelled {
                    JobStatus::Cancelled
                } else {
                    JobStatus::Succeeded
                };
                info!("{} finished ({:?}): {} new records", handle, status, report.total_added());
                *self.report.lock().unwrap_or_else(|p| p.into_inner()) = Some(report);
                status
            }
            Err(reason) => {
                error!("{} failed: {}", handle, reason);
                JobStatus::Failed(reason)
            }
        };
        self.status.send_replace(status);
    }
}

/// Starts, stops and tracks collection jobs
///
/// Jobs run on the ambient Tokio runtime; [`JobManager::start`] must be
/// called from within one.
pub struct JobManager {
    base: Config,
    registry: Arc<Registry>,
    jobs: Mutex<HashMap<u64, Arc<Job>>>,
    next_id: AtomicU64,
}

impl JobManager {
    /// A manager over the built-in archives
    ///
    /// `base` supplies everything a job request does not: storage, fetch
    /// and embedding settings.
    pub fn new(base: Config) -> Self {
        Self::with_registry(base, Registry::with_builtin_sites())
    }

    pub fn with_registry(base: Config, registry: Registry) -> Self {
        Self {
            base,
            registry: Arc::new(registry),
            jobs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Starts collecting `archives` over `[begin, end]`
    ///
    /// An empty `archives` selects every registered archive. `timeout` is
    /// the per-request fetch timeout.
    pub fn start(
        &self,
        archives: &[String],
        begin: NaiveDate,
        end: NaiveDate,
        timeout: Duration,
    ) -> Result<JobHandle, HarvestError> {
        self.registry.validate_names(archives)?;
        CrawlWindow::new(begin, end)?;

        let mut config = self.base.clone();
        config.crawl.archives = archives.to_vec();
        config.crawl.begin_date = Some(begin);
        config.crawl.end_date = Some(end);
        config.crawl.timeout = timeout.as_secs_f64();
        validate(&config)?;

        let handle = JobHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let stop = StopSignal::new();
        let (status, _) = watch::channel(JobStatus::Running);
        let job = Arc::new(Job {
            stop: stop.clone(),
            status,
            report: Mutex::new(None),
        });
        self.lock_jobs().insert(handle.0, job.clone());

        let registry = self.registry.clone();
        let run = tokio::spawn(async move { crawl(&config, &registry, stop).await });
        tokio::spawn(async move {
            let outcome = match run.await {
                Ok(Ok(report)) => Ok(report),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("collection task ended abnormally: {}", e)),
            };
            job.finish(handle, outcome);
        });

        info!(
            "Started {} for {} archives from {} to {}",
            handle,
            if archives.is_empty() {
                self.registry.len()
            } else {
                archives.len()
            },
            begin,
            end
        );
        Ok(handle)
    }

    /// Asks a job to stop; in-flight listing pages are finished first
    pub fn stop(&self, handle: JobHandle) -> Result<(), HarvestError> {
        let job = self.job(handle)?;
        if !job.status.borrow().is_finished() {
            info!("Stop requested for {}", handle);
            job.stop.stop();
        }
        Ok(())
    }

    pub fn status(&self, handle: JobHandle) -> Result<JobStatus, HarvestError> {
        Ok(self.job(handle)?.status.borrow().clone())
    }

    /// Waits for a job to finish and returns its final status
    pub async fn wait(&self, handle: JobHandle) -> Result<JobStatus, HarvestError> {
        let job = self.job(handle)?;
        let mut status = job.status.subscribe();
        let finished = match status.wait_for(JobStatus::is_finished).await {
            Ok(current) => current.clone(),
            Err(_) => job.status.borrow().clone(),
        };
        Ok(finished)
    }

    /// The report of a finished job, `None` while running or after a failure
    pub fn report(&self, handle: JobHandle) -> Result<Option<RunReport>, HarvestError> {
        let job = self.job(handle)?;
        let report = job
            .report
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        Ok(report)
    }

    fn job(&self, handle: JobHandle) -> Result<Arc<Job>, HarvestError> {
        self.lock_jobs()
            .get(&handle.0)
            .cloned()
            .ok_or(HarvestError::JobNotFound(handle.0))
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Arc<Job>>> {
        self.jobs.lock().unwrap_or_else(|p| p.into_inner())
    }
}
