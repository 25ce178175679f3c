use crate::crawler::PageFetcher;
use crate::models::{ListingSummary, SearchDefinition};
use crate::parser::clean_text;
use anyhow::{anyhow, Context, Result};
use rand::seq::SliceRandom;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://bazos.sk";
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Builds the first results page URL for a search in a category subdomain.
pub fn search_url(search: &SearchDefinition, category_slug: &str) -> String {
    format!(
        "https://{}.bazos.sk/?hledat={}&rubriky=www&hlokalita=&humkreis=25&cenaod={}&cenado={}&submit=H%C4%BEada%C5%A5&order=nejnovejsi",
        category_slug,
        urlencoding::encode(&search.query),
        search.price_floor,
        search.price_ceiling
    )
}

/// Makes a marketplace link absolute.
pub fn resolve_url(href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if href.starts_with('/') {
        format!("{}{}", BASE_URL, href)
    } else {
        format!("{}/{}", BASE_URL, href)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Failed to parse selector {}: {:?}", css, e))
}

fn element_text(element: ElementRef) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn first_text(row: ElementRef, selector: &Selector) -> String {
    row.select(selector).next().map(element_text).unwrap_or_default()
}

/// Extracts the result rows of a search page. Rows without a title link are ignored.
pub fn parse_search_results(html: &str) -> Result<Vec<ListingSummary>> {
    let document = Html::parse_document(html);

    let row_selector = selector("div.inzeraty.inzeratyflex")?;
    let link_selector = selector("div.inzeratynadpis h2.nadpis a")?;
    let price_selector = selector("div.inzeratycena")?;
    let date_selector = selector("div.inzeratynadpis span.velikost10")?;
    let location_selector = selector("div.inzeratylok")?;
    let view_selector = selector("div.inzeratyview")?;

    let mut summaries = Vec::new();
    for row in document.select(&row_selector) {
        let Some(link) = row.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        summaries.push(ListingSummary {
            url: resolve_url(href),
            title: element_text(link),
            price: first_text(row, &price_selector),
            date_text: first_text(row, &date_selector),
            location: first_text(row, &location_selector),
            view_count: first_text(row, &view_selector),
        });
    }

    debug!("Found {} listings on results page", summaries.len());
    Ok(summaries)
}

/// The parts of a listing page the enricher needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub description: String,
    pub contact: String,
    pub image_urls: Vec<String>,
    /// All visible text, used to look for removal notices.
    pub text: String,
}

fn block_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_listing_image(src: &str) -> bool {
    src.contains("/img/") && !src.ends_with("t.jpg")
}

pub fn parse_listing_page(html: &str) -> Result<ListingPage> {
    let document = Html::parse_document(html);

    let description = document
        .select(&selector("div.popisdetail")?)
        .next()
        .map(block_text)
        .unwrap_or_default();

    let contact = document
        .select(&selector("div#left div.inzeratydetdetail")?)
        .next()
        .map(block_text)
        .unwrap_or_default();

    let mut image_urls: Vec<String> = Vec::new();
    for img in document.select(&selector("img")?) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        if !is_listing_image(src) {
            continue;
        }
        let url = resolve_url(src);
        if !image_urls.contains(&url) {
            image_urls.push(url);
        }
    }

    let text = document.root_element().text().collect::<Vec<_>>().join(" ");

    Ok(ListingPage {
        description,
        contact,
        image_urls,
        text,
    })
}

/// Page fetcher for bazos.sk over a blocking HTTP client.
pub struct BazosFetcher {
    client: Client,
}

impl BazosFetcher {
    pub fn new() -> Result<Self> {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let response = self
            .client
            .get(url)
            .header("Accept-Language", "sk,cs;q=0.8,en;q=0.6")
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to fetch {}: HTTP {}", url, response.status()));
        }
        Ok(response)
    }
}

impl PageFetcher for BazosFetcher {
    fn fetch_search_results(&self, search_url: &str) -> Result<Vec<ListingSummary>> {
        debug!("Fetching search results from: {}", search_url);
        let body = self.get(search_url)?.text().context("Failed to read response body")?;
        parse_search_results(&body)
    }

    fn fetch_listing_page(&self, url: &str) -> Result<String> {
        debug!("Fetching listing page: {}", url);
        self.get(url)?.text().context("Failed to read response body")
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.get(url)?.bytes().context("Failed to read image body")?;
        Ok(bytes.to_vec())
    }
}
