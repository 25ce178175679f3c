use crate::export::{write_index, INDEX_FILE};
use crate::history::HistorySet;
use crate::models::{ListingSummary, ResolvedSearch};
use crate::observer::CrawlObserver;
use crate::reconcile::{OutputLayout, Reconciler, SearchOutcome};
use crate::store::ListingStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Source of search results, listing pages and image bytes.
pub trait PageFetcher {
    fn fetch_search_results(&self, search_url: &str) -> Result<Vec<ListingSummary>>;
    fn fetch_listing_page(&self, url: &str) -> Result<String>;
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Where new-listing alerts go. Errors are reported, never fatal.
pub trait Notifier {
    fn notify(&self, title: &str, message: &str, url: &str) -> Result<()>;
}

/// Notifier used when alerts are switched off.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _title: &str, _message: &str, _url: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CrawlPaths {
    pub output_dir: PathBuf,
    pub history_dir: PathBuf,
}

impl CrawlPaths {
    pub fn index_file(&self) -> PathBuf {
        self.output_dir.join(INDEX_FILE)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub searches_completed: usize,
    pub searches_failed: usize,
    pub new_listings: usize,
    pub updated_listings: usize,
    pub total_listings: usize,
}

pub struct Crawler<'a> {
    fetcher: &'a dyn PageFetcher,
    notifier: &'a dyn Notifier,
    observer: &'a dyn CrawlObserver,
    paths: CrawlPaths,
}

impl<'a> Crawler<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        notifier: &'a dyn Notifier,
        observer: &'a dyn CrawlObserver,
        paths: CrawlPaths,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            observer,
            paths,
        }
    }

    /// One full crawl: every search in order, then a single export.
    ///
    /// A search that cannot load its history or fetch its results is skipped.
    /// Failing to load or export the listing store fails the run, and then no
    /// history file is touched. History files are written after the export.
    pub fn run(&self, searches: &[ResolvedSearch], now: DateTime<Local>) -> Result<CrawlSummary> {
        let index_path = self.paths.index_file();
        let mut store = ListingStore::load(&index_path).context("loading listing store")?;
        let reconciler = Reconciler::new(
            self.fetcher,
            self.notifier,
            self.observer,
            OutputLayout::new(&self.paths.output_dir),
            now,
        );

        let mut summary = CrawlSummary::default();
        let mut pending_histories = Vec::new();
        for search in searches {
            self.observer.search_started(search, store.len());

            let outcome = match self.run_search(&reconciler, search, &store) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.observer.search_failed(search, &err);
                    summary.searches_failed += 1;
                    continue;
                }
            };

            let stats = outcome.stats;
            pending_histories.push((search, outcome.apply_to(&mut store)));

            summary.searches_completed += 1;
            summary.new_listings += stats.new;
            summary.updated_listings += stats.updated;
            self.observer.search_finished(search, stats);
        }

        // history only moves forward once the listings it covers are exported
        write_index(&store, &index_path).context("exporting listing store")?;
        for (search, history) in pending_histories {
            let history_path = HistorySet::path_for(&self.paths.history_dir, &search.url);
            if let Err(err) = history.save(&history_path) {
                self.observer.history_save_failed(search, &anyhow::Error::new(err));
            }
        }

        summary.total_listings = store.len();
        self.observer.run_finished(store.len());
        Ok(summary)
    }

    fn run_search(
        &self,
        reconciler: &Reconciler,
        search: &ResolvedSearch,
        store: &ListingStore,
    ) -> Result<SearchOutcome> {
        let history_path = HistorySet::path_for(&self.paths.history_dir, &search.url);
        let history = HistorySet::load(&history_path).context("loading search history")?;

        let batch = self
            .fetcher
            .fetch_search_results(&search.url)
            .context("fetching search results")?;

        Ok(reconciler.reconcile(search, batch, history, store))
    }
}
