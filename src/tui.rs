use crate::models::{Classification, ListingSummary, ResolvedSearch};
use crate::observer::{CrawlObserver, SearchStats};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::cell::Cell;
use std::io;

/// Coloured terminal report of a crawl run, one line per listing decision.
pub struct ConsoleTUI {
    show_skipped: bool,
    new_count: Cell<usize>,
    updated_count: Cell<usize>,
    skipped_count: Cell<usize>,
    failed_searches: Cell<usize>,
}

impl ConsoleTUI {
    pub fn new(show_skipped: bool) -> Self {
        Self {
            show_skipped,
            new_count: Cell::new(0),
            updated_count: Cell::new(0),
            skipped_count: Cell::new(0),
            failed_searches: Cell::new(0),
        }
    }

    fn line(&self, color: Color, text: String) {
        // stdout errors are ignored
        let _ = execute!(
            io::stdout(),
            SetForegroundColor(color),
            Print(text),
            Print("\n"),
            ResetColor
        );
    }

    fn truncate(text: &str, max: usize) -> String {
        if text.chars().count() > max {
            let cut: String = text.chars().take(max.saturating_sub(3)).collect();
            format!("{}...", cut)
        } else {
            text.to_string()
        }
    }

    fn bump(counter: &Cell<usize>) {
        counter.set(counter.get() + 1);
    }
}

impl Default for ConsoleTUI {
    fn default() -> Self {
        Self::new(false)
    }
}

impl CrawlObserver for ConsoleTUI {
    fn search_started(&self, search: &ResolvedSearch, known_listings: usize) {
        self.line(
            Color::White,
            format!(
                "🔍 {} [{}] {}-{}€, max {} days ({} listings known)",
                search.query(),
                search.category,
                search.definition.price_floor,
                search.definition.price_ceiling,
                search.definition.max_age_days,
                known_listings
            ),
        );
    }

    fn search_failed(&self, search: &ResolvedSearch, error: &anyhow::Error) {
        Self::bump(&self.failed_searches);
        self.line(Color::Red, format!("❌ {}: {:#}", search.query(), error));
    }

    fn listing_classified(&self, summary: &ListingSummary, classification: Classification) {
        let title = Self::truncate(&summary.title, 60);
        match classification {
            Classification::New => {
                Self::bump(&self.new_count);
                self.line(Color::Green, format!("  ✅ new     {} - {}", title, summary.price));
            }
            Classification::Update => {
                Self::bump(&self.updated_count);
                self.line(Color::Cyan, format!("  🔄 update  {} - {}", title, summary.price));
            }
            Classification::Skip(_) => {
                Self::bump(&self.skipped_count);
                if self.show_skipped {
                    self.line(Color::DarkGrey, format!("  ⏭  {}  {}", classification, title));
                }
            }
        }
    }

    fn detail_failed(&self, url: &str, error: &anyhow::Error) {
        self.line(
            Color::Yellow,
            format!("  ⚠ details unavailable for {}: {:#}", Self::truncate(url, 80), error),
        );
    }

    fn image_failed(&self, image_url: &str, _error: &anyhow::Error) {
        self.line(Color::DarkGrey, format!("  ⚠ image skipped {}", Self::truncate(image_url, 80)));
    }

    fn page_write_failed(&self, url: &str, error: &anyhow::Error) {
        self.line(Color::Red, format!("  ❌ page not written for {}: {:#}", Self::truncate(url, 80), error));
    }

    fn notification_failed(&self, url: &str, error: &anyhow::Error) {
        self.line(
            Color::Yellow,
            format!("  ⚠ notification failed for {}: {:#}", Self::truncate(url, 80), error),
        );
    }

    fn history_save_failed(&self, search: &ResolvedSearch, error: &anyhow::Error) {
        self.line(Color::Red, format!("❌ history not saved for {}: {:#}", search.query(), error));
    }

    fn search_finished(&self, _search: &ResolvedSearch, stats: SearchStats) {
        self.line(
            Color::DarkGrey,
            format!(
                "✓ {} found, {} new, {} updated, {} skipped",
                stats.found, stats.new, stats.updated, stats.skipped
            ),
        );
    }

    fn run_finished(&self, total_listings: usize) {
        let _ = execute!(
            io::stdout(),
            Print("─".repeat(80)),
            Print("\n"),
            SetForegroundColor(Color::Green),
            Print(format!(
                "✅ Crawl completed: {} new, {} updated, {} skipped",
                self.new_count.get(),
                self.updated_count.get(),
                self.skipped_count.get()
            )),
            ResetColor
        );
        if self.failed_searches.get() > 0 {
            let _ = execute!(
                io::stdout(),
                SetForegroundColor(Color::Red),
                Print(format!(", {} searches failed", self.failed_searches.get())),
                ResetColor
            );
        }
        let _ = execute!(
            io::stdout(),
            SetForegroundColor(Color::DarkGrey),
            Print(format!(" | DB: {} total\n", total_listings)),
            ResetColor
        );
    }
}
