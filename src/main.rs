use anyhow::Result;
use bazosfinder::bazos::BazosFetcher;
use bazosfinder::config::{CrawlerConfig, NotificationCredentials};
use bazosfinder::crawler::{CrawlPaths, Crawler, Notifier, SilentNotifier};
use bazosfinder::notify::PushoverNotifier;
use bazosfinder::observer::{CrawlObserver, TracingObserver};
use bazosfinder::tui::ConsoleTUI;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Bazosfinder - saved-search crawler for bazos.sk")]
struct Args {
    /// YAML file with searches and categories (built-in searches if missing)
    #[clap(short, long, default_value = "searches.yaml")]
    config: PathBuf,

    /// Directory for index.json, rendered pages and images
    #[clap(short, long, default_value = "data/found_items")]
    output_dir: PathBuf,

    /// Directory for per-search history files
    #[clap(long, default_value = "data/history")]
    history_dir: PathBuf,

    /// Only run searches whose query contains this text
    #[clap(short, long)]
    query: Option<String>,

    /// Do not send Pushover notifications
    #[clap(long)]
    no_notify: bool,

    /// Plain log output instead of the coloured listing report
    #[clap(long)]
    plain: bool,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::INFO })
        .init();

    info!("Bazosfinder - saved-search crawler for bazos.sk");

    let config = CrawlerConfig::load(&args.config)?;
    let searches = config.resolved_searches(args.query.as_deref())?;
    if searches.is_empty() {
        warn!("No searches to run");
        return Ok(());
    }

    let fetcher = BazosFetcher::new()?;

    let pushover;
    let notifier: &dyn Notifier = if args.no_notify {
        &SilentNotifier
    } else {
        pushover = PushoverNotifier::new(NotificationCredentials::from_env())?;
        if !pushover.is_enabled() {
            info!("PUSHOVER_USER/PUSHOVER_TOKEN not set, notifications disabled");
        }
        &pushover
    };

    let console = ConsoleTUI::new(args.debug);
    let observer: &dyn CrawlObserver = if args.plain { &TracingObserver } else { &console };

    let paths = CrawlPaths {
        output_dir: args.output_dir,
        history_dir: args.history_dir,
    };
    let index_file = paths.index_file();

    let crawler = Crawler::new(&fetcher, notifier, observer, paths);
    let summary = crawler.run(&searches, Local::now())?;

    info!(
        "{} searches completed ({} failed), {} new, {} updated, {} listings saved to {}",
        summary.searches_completed,
        summary.searches_failed,
        summary.new_listings,
        summary.updated_listings,
        summary.total_listings,
        index_file.display()
    );

    Ok(())
}
