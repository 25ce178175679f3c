use crate::bazos::parse_listing_page;
use crate::crawler::PageFetcher;
use crate::models::ListingDetail;
use crate::observer::CrawlObserver;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Lowercase phrases bazos shows on a listing that has been taken down.
pub const UNAVAILABLE_MARKERS: &[&str] = &[
    "inzerát bol vymazaný",
    "inzerát už nie je dostupný",
    "inzerát bol stiahnutý",
    "inzerát neexistuje",
];

pub fn is_available(page_text: &str) -> bool {
    let text = page_text.to_lowercase();
    !UNAVAILABLE_MARKERS.iter().any(|marker| text.contains(marker))
}

/// File name for the `index`-th discovered image (1-based): `01.jpg`, `02.png`, ...
pub fn image_file_name(index: usize, image_url: &str) -> String {
    let path = image_url.split(['?', '#']).next().unwrap_or(image_url);
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    let ext = Path::new(last_segment)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or("jpg");
    format!("{:02}.{}", index, ext)
}

/// Fetches a listing's own page and downloads its images.
pub struct DetailEnricher<'a> {
    fetcher: &'a dyn PageFetcher,
    observer: &'a dyn CrawlObserver,
}

impl<'a> DetailEnricher<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, observer: &'a dyn CrawlObserver) -> Self {
        Self { fetcher, observer }
    }

    /// Never fails: an unreachable page yields [`ListingDetail::unavailable`],
    /// a failed image is left out of the result.
    pub fn enrich(&self, url: &str, target_dir: &Path) -> ListingDetail {
        let page = match self
            .fetcher
            .fetch_listing_page(url)
            .and_then(|html| parse_listing_page(&html))
        {
            Ok(page) => page,
            Err(err) => {
                self.observer.detail_failed(url, &err);
                return ListingDetail::unavailable();
            }
        };

        let mut images = Vec::new();
        for (i, image_url) in page.image_urls.iter().enumerate() {
            let file_name = image_file_name(i + 1, image_url);
            match self.download_image(image_url, &target_dir.join(&file_name)) {
                Ok(()) => images.push(file_name),
                Err(err) => self.observer.image_failed(image_url, &err),
            }
        }

        ListingDetail {
            description: page.description,
            images,
            contact: page.contact,
            is_available: is_available(&page.text),
        }
    }

    fn download_image(&self, image_url: &str, path: &Path) -> Result<()> {
        let bytes = self.fetcher.fetch_bytes(image_url)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create image directory {}", parent.display()))?;
        }
        fs::write(path, bytes).with_context(|| format!("Failed to write image {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingSummary;
    use anyhow::anyhow;
    use std::cell::RefCell;
    use tempfile::tempdir;

    struct PageFixture {
        page: Option<String>,
        broken_images: Vec<String>,
        requested: RefCell<Vec<String>>,
    }

    impl PageFetcher for PageFixture {
        fn fetch_search_results(&self, _search_url: &str) -> Result<Vec<ListingSummary>> {
            Ok(Vec::new())
        }

        fn fetch_listing_page(&self, url: &str) -> Result<String> {
            self.page.clone().ok_or_else(|| anyhow!("timeout fetching {}", url))
        }

        fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
            self.requested.borrow_mut().push(url.to_string());
            if self.broken_images.iter().any(|u| u == url) {
                return Err(anyhow!("HTTP 404"));
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    struct CountingObserver {
        image_failures: RefCell<usize>,
        detail_failures: RefCell<usize>,
    }

    impl CrawlObserver for CountingObserver {
        fn image_failed(&self, _image_url: &str, _error: &anyhow::Error) {
            *self.image_failures.borrow_mut() += 1;
        }

        fn detail_failed(&self, _url: &str, _error: &anyhow::Error) {
            *self.detail_failures.borrow_mut() += 1;
        }
    }

    fn observer() -> CountingObserver {
        CountingObserver {
            image_failures: RefCell::new(0),
            detail_failures: RefCell::new(0),
        }
    }

    #[test]
    fn numbers_images_by_discovery_and_skips_failures() {
        let dir = tempdir().expect("tempdir");
        let fetcher = PageFixture {
            page: Some(
                r#"<div class="popisdetail">Pekný stav</div>
                   <img src="/img/1/1/1.jpg"><img src="/img/2/1/1.png"><img src="/img/3/1/1.jpg">"#
                    .to_string(),
            ),
            broken_images: vec!["https://bazos.sk/img/2/1/1.png".to_string()],
            requested: RefCell::new(Vec::new()),
        };
        let observer = observer();

        let detail = DetailEnricher::new(&fetcher, &observer).enrich("https://bazos.sk/inzerat/1/a.php", dir.path());

        assert_eq!(detail.images, vec!["01.jpg".to_string(), "03.jpg".to_string()]);
        assert!(dir.path().join("01.jpg").exists());
        assert!(!dir.path().join("02.png").exists());
        assert_eq!(detail.description, "Pekný stav");
        assert!(detail.is_available);
        assert_eq!(*observer.image_failures.borrow(), 1);
        assert_eq!(fetcher.requested.borrow().len(), 3);
    }

    #[test]
    fn removal_notice_marks_listing_unavailable() {
        let dir = tempdir().expect("tempdir");
        let fetcher = PageFixture {
            page: Some("<h1>Inzerát bol vymazaný</h1>".to_string()),
            broken_images: Vec::new(),
            requested: RefCell::new(Vec::new()),
        };
        let observer = observer();

        let detail = DetailEnricher::new(&fetcher, &observer).enrich("https://bazos.sk/inzerat/1/a.php", dir.path());

        assert!(!detail.is_available);
        assert!(detail.images.is_empty());
    }

    #[test]
    fn unreachable_page_degrades_to_unavailable() {
        let dir = tempdir().expect("tempdir");
        let fetcher = PageFixture {
            page: None,
            broken_images: Vec::new(),
            requested: RefCell::new(Vec::new()),
        };
        let observer = observer();

        let detail = DetailEnricher::new(&fetcher, &observer).enrich("https://bazos.sk/inzerat/1/a.php", dir.path());

        assert_eq!(detail, ListingDetail::unavailable());
        assert_eq!(*observer.detail_failures.borrow(), 1);
    }

    #[test]
    fn image_names_keep_extension() {
        assert_eq!(image_file_name(1, "https://bazos.sk/img/1/1/1.jpg?t=99"), "01.jpg");
        assert_eq!(image_file_name(12, "https://bazos.sk/img/1/1/1.webp"), "12.webp");
        assert_eq!(image_file_name(3, "https://bazos.sk/img/1/1/raw"), "03.jpg");
    }
}
