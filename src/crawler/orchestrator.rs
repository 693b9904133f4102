//! Crawl orchestrator - turns a date window into persisted records
//!
//! This module contains the main collection loop:
//! - Building the interleaved frontier from the selected archives
//! - Draining it with a pool of workers, one listing page at a time
//! - Extracting, enriching and persisting records in batches
//! - Honoring an external stop request between items
//! - Reporting per-archive counts at the end

use crate::adapter::{AdapterContext, ArchiveId, Registry, Section, SiteAdapter};
use crate::config::Config;
use crate::crawler::batch::{flush_batch, PendingBatch};
use crate::crawler::frontier::{build_adapter_frontier, interleave, CrawlWindow, Frontier, FrontierItem};
use crate::crawler::state::{CrawlCounters, ItemState, SectionState};
use crate::embedding::{Embedder, HttpEmbedder};
use crate::fetch::{FetchError, Fetcher, PageFetcher, StrategyKind};
use crate::report::{ArchiveCount, RunReport};
use crate::storage::{ArticleRecord, ImageRef, ImageStore, SqliteStorage, Storage};
use crate::HarvestError;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Default number of records per enrichment and insert call
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Cooperative stop request shared with a running orchestrator
///
/// Workers finish the item they are on, then take no new ones.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives one collection run
pub struct Orchestrator {
    adapters: Vec<Arc<dyn SiteAdapter>>,
    storage: Arc<dyn Storage>,
    fetcher: Arc<dyn PageFetcher>,
    embedder: Option<Arc<dyn Embedder>>,
    images: ImageStore,
    window: CrawlWindow,
    workers: Option<usize>,
    batch_size: usize,
    skip_done_dates: bool,
    stop: StopSignal,
}

impl Orchestrator {
    /// Creates an orchestrator over already-decorated adapters
    pub fn new(
        adapters: Vec<Arc<dyn SiteAdapter>>,
        storage: Arc<dyn Storage>,
        fetcher: Arc<dyn PageFetcher>,
        window: CrawlWindow,
    ) -> Self {
        Self {
            adapters,
            storage,
            fetcher,
            embedder: None,
            images: ImageStore::new("images"),
            window,
            workers: None,
            batch_size: DEFAULT_BATCH_SIZE,
            skip_done_dates: false,
            stop: StopSignal::new(),
        }
    }

    /// Builds everything a run needs from configuration
    ///
    /// Archive names and the date window are checked before any connection
    /// is opened; an empty archive list selects every registered archive.
    pub fn from_config(config: &Config, registry: &Registry) -> Result<Self, HarvestError> {
        let names: Vec<String> = if config.crawl.archives.is_empty() {
            registry.names().into_iter().map(str::to_string).collect()
        } else {
            config.crawl.archives.clone()
        };
        if names.is_empty() {
            return Err(HarvestError::NoArchives);
        }
        registry.validate_names(&names)?;

        let today = chrono::Local::now().date_naive();
        let window = CrawlWindow::new(
            config.crawl.begin_date.unwrap_or(today),
            config.crawl.end_date.unwrap_or(today),
        )?;

        let workers = config.crawl.workers.unwrap_or(2 * names.len()).max(1);
        let pool_size = config.storage.pool_size.max(workers);
        let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::open(
            Path::new(&config.storage.database_path),
            pool_size,
        )?);

        let context = AdapterContext {
            storage: storage.clone(),
            window,
        };
        let adapters = registry.create_list(&names, &context)?;

        let fetcher = Arc::new(Fetcher::new(&config.fetch, config.crawl.request_timeout())?);

        let mut orchestrator = Self::new(adapters, storage, fetcher, window)
            .with_workers(workers)
            .with_batch_size(config.crawl.batch_size)
            .with_skip_done_dates(config.crawl.skip_done_dates)
            .with_image_store(ImageStore::new(config.storage.image_root.clone()));

        if let Some(url) = &config.embedding.url {
            let embedder = HttpEmbedder::new(url.clone(), config.embedding.timeout())?;
            orchestrator = orchestrator.with_embedder(Arc::new(embedder));
        }

        Ok(orchestrator)
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_image_store(mut self, images: ImageStore) -> Self {
        self.images = images;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_skip_done_dates(mut self, skip: bool) -> Self {
        self.skip_done_dates = skip;
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Handle for requesting a stop from another task
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn window(&self) -> CrawlWindow {
        self.window
    }

    /// Workers to spawn: twice the archive count unless set explicitly
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or(2 * self.adapters.len())
            .max(1)
    }

    /// Runs the collection to completion or until stopped
    ///
    /// Only storage setup failures are returned as errors; failures of
    /// individual pages, sections or batches are logged and counted.
    pub async fn run(&self) -> Result<RunReport, HarvestError> {
        let started = Instant::now();
        self.storage.create_table()?;

        let before = self.count_archives();
        let frontier = Arc::new(Frontier::new(self.build_frontier()));
        let workers = self.worker_count();
        info!(
            "Collecting {} listing pages across {} archives with {} workers ({} to {})",
            frontier.total(),
            self.adapters.len(),
            workers,
            self.window.begin,
            self.window.end
        );

        let shared = Arc::new(Shared {
            adapters: self.adapters.clone(),
            storage: self.storage.clone(),
            fetcher: self.fetcher.clone(),
            embedder: self.embedder.clone(),
            images: self.images.clone(),
            batch_size: self.batch_size.max(1),
            frontier: frontier.clone(),
            counters: CrawlCounters::new(),
            stop: self.stop.clone(),
        });

        let mut pool = JoinSet::new();
        for id in 0..workers {
            let shared = shared.clone();
            pool.spawn(async move { shared.work(id).await });
        }
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!("Worker task ended abnormally: {}", e);
            }
        }

        self.fetcher.shutdown().await;

        let cancelled = self.stop.is_stopped();
        if cancelled {
            info!(
                "Collection stopped on request with {} listing pages left",
                frontier.remaining()
            );
        }

        let after = self.count_archives();
        let archives = before
            .into_iter()
            .zip(after)
            .map(|((archive, before), (_, after))| ArchiveCount {
                archive,
                before,
                after,
            })
            .collect();

        let report = RunReport {
            archives,
            frontier_size: frontier.total(),
            counters: shared.counters.snapshot(),
            elapsed: started.elapsed(),
            cancelled,
        };
        info!(
            "Collection finished in {:.1} minutes: {} new records",
            report.elapsed.as_secs_f64() / 60.0,
            report.total_added()
        );
        Ok(report)
    }

    fn build_frontier(&self) -> Vec<FrontierItem> {
        let lists = self
            .adapters
            .iter()
            .map(|adapter| {
                let done = if self.skip_done_dates {
                    self.storage
                        .get_done_dates(adapter.archive(), &self.window)
                        .map_err(|e| {
                            warn!("{}: could not load done dates: {}", adapter.archive(), e)
                        })
                        .ok()
                } else {
                    None
                };
                let items = build_adapter_frontier(adapter.as_ref(), &self.window, done.as_ref());
                debug!("{}: {} listing pages", adapter.archive(), items.len());
                items
            })
            .collect();
        interleave(lists)
    }

    fn count_archives(&self) -> Vec<(ArchiveId, u64)> {
        self.adapters
            .iter()
            .map(|adapter| {
                let archive = adapter.archive().clone();
                let count = self.storage.count_archive(&archive).unwrap_or_else(|e| {
                    warn!("{}: could not count records: {}", archive, e);
                    0
                });
                (archive, count)
            })
            .collect()
    }
}

/// State shared by the workers of one run
struct Shared {
    adapters: Vec<Arc<dyn SiteAdapter>>,
    storage: Arc<dyn Storage>,
    fetcher: Arc<dyn PageFetcher>,
    embedder: Option<Arc<dyn Embedder>>,
    images: ImageStore,
    batch_size: usize,
    frontier: Arc<Frontier>,
    counters: CrawlCounters,
    stop: StopSignal,
}

impl Shared {
    async fn work(&self, id: usize) {
        let mut handled = 0usize;
        loop {
            if self.stop.is_stopped() {
                debug!("Worker {} stopping on request", id);
                break;
            }
            let Some(item) = self.frontier.next() else {
                break;
            };

            let Some(adapter) = self.route(&item.url) else {
                warn!("No archive matches {}; skipping", item.url);
                continue;
            };

            let span = info_span!("item", archive = %adapter.archive(), url = %item.url);
            match self.process_item(adapter.as_ref(), &item).instrument(span).await {
                Ok(state) => self.counters.record_item(state),
                Err(e) => error!("{}: {}", item.url, e),
            }
            handled += 1;
        }
        debug!("Worker {} done after {} listing pages", id, handled);
    }

    fn route(&self, url: &str) -> Option<Arc<dyn SiteAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.matches_url(url))
            .cloned()
    }

    /// Fetches one listing and collects every usable section on it
    async fn process_item(
        &self,
        adapter: &dyn SiteAdapter,
        item: &FrontierItem,
    ) -> Result<ItemState, HarvestError> {
        let state = ItemState::Pending.transition(ItemState::Fetching)?;

        let sections = match adapter.fetch_sections(self.fetcher.as_ref(), &item.url).await {
            Ok(sections) => sections,
            Err(e) => {
                warn!("Listing fetch failed: {}", e);
                return state.transition(ItemState::FetchFailed);
            }
        };
        let state = state.transition(ItemState::Parsed)?;
        debug!("{} sections", sections.len());

        let mut batch = PendingBatch::new(self.batch_size);
        for section in &sections {
            let Some(permalink) = adapter.extract_permalink(section) else {
                self.counters.record_sections(SectionState::Skipped, 1);
                continue;
            };

            match self.collect(adapter, item.date, section, &permalink).await {
                Ok(record) => {
                    if batch.push(record) {
                        self.flush(&mut batch).await;
                    }
                }
                Err(e) => {
                    warn!("Dropping {}: {}", permalink, e);
                    self.counters.record_sections(SectionState::ExtractFailed, 1);
                }
            }
        }
        self.flush(&mut batch).await;

        Ok(state)
    }

    /// Builds the record for one section, image included
    async fn collect(
        &self,
        adapter: &dyn SiteAdapter,
        date: NaiveDate,
        section: &Section,
        permalink: &str,
    ) -> Result<ArticleRecord, FetchError> {
        let fields = adapter
            .fetch_record(self.fetcher.as_ref(), section, permalink)
            .await?;

        let mut record = ArticleRecord::new(date, adapter.archive().clone(), permalink);
        record.title = fields.title;
        record.content = fields.content;
        record.tag = fields.tag;
        if let Some(image_url) = fields.image_url {
            record.image = self.download_image(date, permalink, &image_url).await;
        }
        Ok(record)
    }

    /// A missing image degrades the record, it never drops it
    async fn download_image(&self, date: NaiveDate, link: &str, image_url: &str) -> Option<ImageRef> {
        match self.fetcher.get(StrategyKind::Static, image_url).await {
            Ok(bytes) => {
                let path = self.images.image_path(date, link, image_url);
                Some(self.images.save_image(&path, bytes))
            }
            Err(e) => {
                debug!("Image unavailable for {}: {}", link, e);
                None
            }
        }
    }

    async fn flush(&self, batch: &mut PendingBatch) {
        if batch.is_empty() {
            return;
        }
        let records = batch.take();
        let total = records.len() as u64;

        match flush_batch(records, self.embedder.as_deref(), self.storage.as_ref()).await {
            Ok(inserted) => {
                let inserted = inserted as u64;
                self.counters
                    .record_sections(SectionState::Persisted, inserted);
                self.counters
                    .record_sections(SectionState::Skipped, total.saturating_sub(inserted));
            }
            Err(e) => {
                error!("Dropping batch of {} records: {}", total, e);
                self.counters
                    .record_sections(SectionState::ExtractFailed, total);
            }
        }
    }
}
