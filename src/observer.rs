use crate::models::{Classification, ListingSummary, ResolvedSearch};
use tracing::{debug, error, info, warn};

/// Per-search tallies reported when a search completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub found: usize,
    pub new: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Receives everything a crawl run decides or trips over.
///
/// Components get a `&dyn CrawlObserver` instead of reaching for a global
/// logger. All methods default to doing nothing.
pub trait CrawlObserver {
    fn search_started(&self, _search: &ResolvedSearch, _known_listings: usize) {}
    fn search_failed(&self, _search: &ResolvedSearch, _error: &anyhow::Error) {}
    fn listing_classified(&self, _summary: &ListingSummary, _classification: Classification) {}
    fn listing_committed(&self, _url: &str, _classification: Classification, _image_count: usize) {}
    fn detail_failed(&self, _url: &str, _error: &anyhow::Error) {}
    fn image_failed(&self, _image_url: &str, _error: &anyhow::Error) {}
    fn page_write_failed(&self, _url: &str, _error: &anyhow::Error) {}
    fn notification_failed(&self, _url: &str, _error: &anyhow::Error) {}
    fn history_save_failed(&self, _search: &ResolvedSearch, _error: &anyhow::Error) {}
    fn search_finished(&self, _search: &ResolvedSearch, _stats: SearchStats) {}
    fn run_finished(&self, _total_listings: usize) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl CrawlObserver for NoopObserver {}

/// Forwards events to `tracing` at a severity matching the event.
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn search_started(&self, search: &ResolvedSearch, known_listings: usize) {
        info!(
            "Searching for '{}' in category '{}' with price range {}-{}€ ({} known listings)",
            search.query(),
            search.category,
            search.definition.price_floor,
            search.definition.price_ceiling,
            known_listings
        );
        debug!("Search URL: {}", search.url);
    }

    fn search_failed(&self, search: &ResolvedSearch, error: &anyhow::Error) {
        error!("Search '{}' abandoned: {:#}", search.query(), error);
    }

    fn listing_classified(&self, summary: &ListingSummary, classification: Classification) {
        match classification {
            Classification::New => info!("New listing: '{}' - {} ({})", summary.title, summary.price, summary.url),
            Classification::Update => info!("Updating existing listing: '{}'", summary.title),
            Classification::Skip(_) => debug!("{}: '{}' {}", classification, summary.title, summary.url),
        }
    }

    fn listing_committed(&self, url: &str, classification: Classification, image_count: usize) {
        debug!("Committed {} listing {} with {} images", classification, url, image_count);
    }

    fn detail_failed(&self, url: &str, error: &anyhow::Error) {
        warn!("Failed to fetch listing details from {}: {:#}", url, error);
    }

    fn image_failed(&self, image_url: &str, error: &anyhow::Error) {
        warn!("Failed to download image {}: {:#}", image_url, error);
    }

    fn page_write_failed(&self, url: &str, error: &anyhow::Error) {
        error!("Failed to write rendered page for {}: {:#}", url, error);
    }

    fn notification_failed(&self, url: &str, error: &anyhow::Error) {
        warn!("Failed to send notification for {}: {:#}", url, error);
    }

    fn history_save_failed(&self, search: &ResolvedSearch, error: &anyhow::Error) {
        error!("Failed to save history for '{}': {:#}", search.query(), error);
    }

    fn search_finished(&self, search: &ResolvedSearch, stats: SearchStats) {
        info!(
            "Found {} listings, processed {} new, updated {} existing, skipped {} for query '{}'",
            stats.found,
            stats.new,
            stats.updated,
            stats.skipped,
            search.query()
        );
    }

    fn run_finished(&self, total_listings: usize) {
        info!("Crawler finished. Total listings: {}", total_listings);
    }
}
