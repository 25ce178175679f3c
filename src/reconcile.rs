//! Classifies scraped listings against what earlier runs stored, and turns
//! each decision into a new or refreshed [`ListingRecord`].

use crate::crawler::{Notifier, PageFetcher};
use crate::enricher::DetailEnricher;
use crate::history::HistorySet;
use crate::identity::content_id;
use crate::models::{
    Classification, ListingRecord, ListingSummary, RecordRefresh, ResolvedSearch, SkipReason,
};
use crate::observer::{CrawlObserver, SearchStats};
use crate::parser::{cutoff_date, normalize_posted_date};
use crate::render::{render_listing_page, PageContent};
use crate::store::ListingStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Decides what to do with one scraped listing.
///
/// A stored record always wins, even over the history set and the age
/// cutoff. The cutoff is inclusive: a listing posted exactly on `cutoff`
/// still counts.
pub fn classify(
    url: &str,
    posted: NaiveDate,
    cutoff: NaiveDate,
    history: &HistorySet,
    store: &ListingStore,
) -> Classification {
    if store.contains(url) {
        return Classification::Update;
    }
    if history.contains(url) {
        return Classification::Skip(SkipReason::AlreadyProcessed);
    }
    if posted < cutoff {
        return Classification::Skip(SkipReason::TooOld);
    }
    Classification::New
}

/// Applies a fresh scrape to a stored record.
pub fn merge_record(old: ListingRecord, refresh: RecordRefresh) -> ListingRecord {
    let mut merged = old;

    // always replaced
    merged.price = refresh.price;
    merged.location = refresh.location;
    merged.view_count = refresh.view_count;
    merged.description = refresh.description;
    merged.contact = refresh.contact;
    merged.is_available = refresh.is_available;
    merged.last_updated = refresh.updated_at.max(merged.found_at);

    // replaced only when the new scrape produced something
    if !refresh.images.is_empty() {
        merged.images = refresh.images;
    }
    if !refresh.html_path.is_empty() {
        merged.html_path = refresh.html_path;
    }

    // id, url, title, date, found_at, query and category stay as first stored
    merged
}

/// Where rendered pages and images go, relative to the output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

/// One directory name that always stays inside the output directory.
fn path_segment(text: &str) -> String {
    let segment: String = text
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match segment.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => segment,
    }
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{query}/{YYYY-MM-DD}/{id}.html`
    pub fn page_path(&self, query: &str, date: NaiveDate, id: &str) -> String {
        format!("{}/{}/{}.html", path_segment(query), date.format("%Y-%m-%d"), id)
    }

    /// A listing's images live in a directory named like its page, minus `.html`.
    pub fn asset_dir(page_path: &str) -> String {
        page_path.strip_suffix(".html").unwrap_or(page_path).to_string()
    }

    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Image reference as seen from the rendered page's directory.
fn page_relative(image: &str, page_path: &str) -> String {
    let page_dir = Path::new(page_path).parent().unwrap_or_else(|| Path::new(""));
    Path::new(image)
        .strip_prefix(page_dir)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| image.to_string())
}

/// Result of reconciling one search's batch; the caller commits it.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub new_records: Vec<ListingRecord>,
    pub updated_records: Vec<ListingRecord>,
    pub history: HistorySet,
    pub stats: SearchStats,
}

impl SearchOutcome {
    pub fn apply_to(self, store: &mut ListingStore) -> HistorySet {
        for record in self.new_records.into_iter().chain(self.updated_records) {
            store.upsert(record);
        }
        self.history
    }
}

pub struct Reconciler<'a> {
    enricher: DetailEnricher<'a>,
    notifier: &'a dyn Notifier,
    observer: &'a dyn CrawlObserver,
    layout: OutputLayout,
    now: DateTime<Local>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        notifier: &'a dyn Notifier,
        observer: &'a dyn CrawlObserver,
        layout: OutputLayout,
        now: DateTime<Local>,
    ) -> Self {
        Self {
            enricher: DetailEnricher::new(fetcher, observer),
            notifier,
            observer,
            layout,
            now,
        }
    }

    /// Runs one search's scraped batch against its history and the store.
    ///
    /// The store is only read; new and refreshed records come back in the
    /// outcome together with the grown history set.
    pub fn reconcile(
        &self,
        search: &ResolvedSearch,
        batch: Vec<ListingSummary>,
        mut history: HistorySet,
        store: &ListingStore,
    ) -> SearchOutcome {
        let today = self.now.date_naive();
        let cutoff = cutoff_date(today, search.definition.max_age_days);

        let mut stats = SearchStats {
            found: batch.len(),
            ..SearchStats::default()
        };
        let mut new_records = Vec::new();
        let mut updated_records = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for summary in batch {
            let posted = normalize_posted_date(&summary.date_text, today);
            let classification = if seen.insert(summary.url.clone()) {
                classify(&summary.url, posted, cutoff, &history, store)
            } else {
                Classification::Skip(SkipReason::DuplicateInBatch)
            };
            self.observer.listing_classified(&summary, classification);

            match classification {
                Classification::New => {
                    let record = self.create_record(search, &summary, posted);
                    history.insert(summary.url.clone());
                    self.observer
                        .listing_committed(&record.url, classification, record.images.len());
                    new_records.push(record);
                    stats.new += 1;
                }
                Classification::Update => {
                    let Some(existing) = store.get(&summary.url) else {
                        continue;
                    };
                    let record = self.refresh_record(existing, &summary);
                    history.insert(summary.url.clone());
                    self.observer
                        .listing_committed(&record.url, classification, record.images.len());
                    updated_records.push(record);
                    stats.updated += 1;
                }
                Classification::Skip(_) => stats.skipped += 1,
            }
        }

        SearchOutcome {
            new_records,
            updated_records,
            history,
            stats,
        }
    }

    fn create_record(&self, search: &ResolvedSearch, summary: &ListingSummary, posted: NaiveDate) -> ListingRecord {
        let id = content_id(&summary.url);
        let page_path = self.layout.page_path(search.query(), posted, &id);
        let asset_dir = OutputLayout::asset_dir(&page_path);

        let detail = self.enricher.enrich(&summary.url, &self.layout.absolute(&asset_dir));
        let images: Vec<String> = detail
            .images
            .iter()
            .map(|name| format!("{}/{}", asset_dir, name))
            .collect();

        let mut record = ListingRecord {
            id,
            title: summary.title.clone(),
            price: summary.price.clone(),
            date: posted,
            found_at: self.now,
            last_updated: self.now,
            query: search.query().to_string(),
            url: summary.url.clone(),
            images,
            html_path: page_path,
            description: detail.description,
            contact: detail.contact,
            location: summary.location.clone(),
            view_count: summary.view_count.clone(),
            category: search.category.clone(),
            is_available: detail.is_available,
            extra: Default::default(),
        };

        if let Err(err) = self.write_page(&record) {
            self.observer.page_write_failed(&record.url, &err);
            record.html_path.clear();
        }

        if let Err(err) = self.notifier.notify(&record.title, &record.price, &record.url) {
            self.observer.notification_failed(&record.url, &err);
        }

        record
    }

    fn refresh_record(&self, existing: &ListingRecord, summary: &ListingSummary) -> ListingRecord {
        let page_path = if existing.html_path.is_empty() {
            self.layout.page_path(&existing.query, existing.date, &existing.id)
        } else {
            existing.html_path.clone()
        };
        let asset_dir = OutputLayout::asset_dir(&page_path);

        let detail = self.enricher.enrich(&summary.url, &self.layout.absolute(&asset_dir));
        let refresh = RecordRefresh {
            price: summary.price.clone(),
            location: summary.location.clone(),
            view_count: summary.view_count.clone(),
            description: detail.description,
            contact: detail.contact,
            is_available: detail.is_available,
            images: detail
                .images
                .iter()
                .map(|name| format!("{}/{}", asset_dir, name))
                .collect(),
            html_path: page_path,
            updated_at: self.now,
        };

        let mut merged = merge_record(existing.clone(), refresh);
        if let Err(err) = self.write_page(&merged) {
            self.observer.page_write_failed(&merged.url, &err);
            merged.html_path = existing.html_path.clone();
        }
        merged
    }

    fn write_page(&self, record: &ListingRecord) -> Result<()> {
        let images: Vec<String> = record
            .images
            .iter()
            .map(|image| page_relative(image, &record.html_path))
            .collect();
        let date = record.date.format("%Y-%m-%d").to_string();

        let html = render_listing_page(&PageContent {
            title: &record.title,
            date: &date,
            price: &record.price,
            url: &record.url,
            images: &images,
            description: &record.description,
            contact: &record.contact,
        });

        let path = self.layout.absolute(&record.html_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&path, html).with_context(|| format!("writing {}", path.display()))
    }
}
