use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One saved search as it appears in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDefinition {
    pub query: String,
    pub price_floor: u32,
    pub price_ceiling: u32,
    pub max_age_days: u32,
    pub category_id: u32,
}

/// A search joined with its category slug and the URL it is crawled from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSearch {
    pub definition: SearchDefinition,
    pub category: String,
    pub url: String,
}

impl ResolvedSearch {
    pub fn query(&self) -> &str {
        &self.definition.query
    }
}

/// A single row of a search results page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingSummary {
    pub url: String,
    pub title: String,
    pub price: String,
    pub date_text: String,
    pub location: String,
    pub view_count: String,
}

/// Data taken from a listing's own page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDetail {
    pub description: String,
    /// Image file names inside the target directory, in discovery order.
    pub images: Vec<String>,
    pub contact: String,
    pub is_available: bool,
}

impl ListingDetail {
    /// What a listing degrades to when its page could not be fetched.
    pub fn unavailable() -> Self {
        Self {
            description: String::new(),
            images: Vec::new(),
            contact: String::new(),
            is_available: false,
        }
    }
}

fn default_available() -> bool {
    true
}

fn epoch() -> DateTime<Local> {
    DateTime::<chrono::Utc>::UNIX_EPOCH.with_timezone(&Local)
}

/// The persisted unit of the listing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: String,
    pub title: String,
    pub price: String,
    pub date: NaiveDate,
    #[serde(default = "epoch")]
    pub found_at: DateTime<Local>,
    #[serde(default = "epoch")]
    pub last_updated: DateTime<Local>,
    pub query: String,
    pub url: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(rename = "htmlPath", default)]
    pub html_path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub view_count: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_available")]
    pub is_available: bool,
    /// Fields written by other tools, carried through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields a fresh scrape supplies for an already stored listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRefresh {
    pub price: String,
    pub location: String,
    pub view_count: String,
    pub description: String,
    pub contact: String,
    pub is_available: bool,
    /// Image references relative to the output directory.
    pub images: Vec<String>,
    pub html_path: String,
    pub updated_at: DateTime<Local>,
}

/// Why a summary produced no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyProcessed,
    TooOld,
    DuplicateInBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    New,
    Update,
    Skip(SkipReason),
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Classification::New => write!(f, "new"),
            Classification::Update => write!(f, "update"),
            Classification::Skip(SkipReason::AlreadyProcessed) => write!(f, "skip (already processed)"),
            Classification::Skip(SkipReason::TooOld) => write!(f, "skip (too old)"),
            Classification::Skip(SkipReason::DuplicateInBatch) => write!(f, "skip (duplicate)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_record_without_timestamps_loads_with_defaults() {
        let json = r#"{
            "id": "abc",
            "title": "Yaesu FT-817",
            "price": "450 €",
            "date": "2024-03-15",
            "query": "Yaesu",
            "url": "https://bazos.sk/inzerat/1/yaesu.php",
            "images": ["Yaesu/2024-03-15/01.jpg"],
            "htmlPath": "Yaesu/2024-03-15/abc.html",
            "description": "ok"
        }"#;

        let record: ListingRecord = serde_json::from_str(json).expect("legacy record");
        assert_eq!(record.found_at, epoch());
        assert!(record.is_available);
        assert!(record.location.is_empty());
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn record_uses_export_field_names() {
        let record = ListingRecord {
            id: "id".into(),
            title: "t".into(),
            price: "1 €".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            found_at: epoch(),
            last_updated: epoch(),
            query: "q".into(),
            url: "u".into(),
            images: vec![],
            html_path: "q/2024-01-02/id.html".into(),
            description: String::new(),
            contact: String::new(),
            location: String::new(),
            view_count: String::new(),
            category: "pc".into(),
            is_available: true,
            extra: Default::default(),
        };

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["htmlPath"], "q/2024-01-02/id.html");
        assert_eq!(value["date"], "2024-01-02");
        assert!(value.get("is_available").is_some());
        assert!(value.get("view_count").is_some());
    }

    #[test]
    fn unknown_fields_survive_a_reexport() {
        let json = r#"{"id":"a","title":"t","price":"1 €","date":"2024-03-15","query":"q",
            "url":"https://pc.bazos.sk/inzerat/1/x.php","seller_info":{"name":"Peter","phone":"0900"}}"#;
        let record: ListingRecord = serde_json::from_str(json).expect("legacy record");
        assert_eq!(record.extra["seller_info"]["name"], "Peter");
        assert!(!record.extra.contains_key("title"));

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["seller_info"]["phone"], "0900");
        assert_eq!(value["title"], "t");
    }
}
