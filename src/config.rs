use crate::bazos::search_url;
use crate::models::{ResolvedSearch, SearchDefinition};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Saved searches and the category-id → subdomain map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlerConfig {
    pub searches: Vec<SearchDefinition>,
    pub categories: BTreeMap<u32, String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        let searches = vec![
            SearchDefinition {
                query: "Macbook Pro M4".to_string(),
                price_floor: 1500,
                price_ceiling: 4000,
                max_age_days: 14,
                category_id: 801,
            },
            SearchDefinition {
                query: "Yaesu".to_string(),
                price_floor: 30,
                price_ceiling: 2000,
                max_age_days: 14,
                category_id: 807,
            },
        ];

        let categories = [
            (807, "elektro"),
            (1, "auto"),
            (801, "pc"),
            (813, "mobil"),
            (82, "reality"),
            (85, "zahrada"),
        ]
        .into_iter()
        .map(|(id, slug)| (id, slug.to_string()))
        .collect();

        Self { searches, categories }
    }
}

impl CrawlerConfig {
    /// Reads a YAML config, or falls back to the built-in searches when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}, using built-in searches", path.display());
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        info!("Loaded {} searches from {}", config.searches.len(), path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for search in &self.searches {
            if search.query.trim().is_empty() {
                bail!("search with empty query");
            }
            if search.price_floor > search.price_ceiling {
                bail!(
                    "search '{}' has price floor {} above ceiling {}",
                    search.query,
                    search.price_floor,
                    search.price_ceiling
                );
            }
            if !self.categories.contains_key(&search.category_id) {
                bail!("search '{}' uses unknown category {}", search.query, search.category_id);
            }
        }
        Ok(())
    }

    pub fn resolve(&self, search: &SearchDefinition) -> Result<ResolvedSearch> {
        let category = self
            .categories
            .get(&search.category_id)
            .ok_or_else(|| anyhow!("unknown category {}", search.category_id))?;

        Ok(ResolvedSearch {
            definition: search.clone(),
            category: category.clone(),
            url: search_url(search, category),
        })
    }

    /// Searches to run, optionally narrowed to queries matching `filter`.
    pub fn resolved_searches(&self, filter: Option<&str>) -> Result<Vec<ResolvedSearch>> {
        let filter = filter.map(str::to_lowercase);
        self.searches
            .iter()
            .filter(|s| match &filter {
                Some(f) => s.query.to_lowercase().contains(f.as_str()),
                None => true,
            })
            .map(|s| self.resolve(s))
            .collect()
    }
}

/// Pushover user and application token.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationCredentials {
    pub user: String,
    pub token: String,
}

impl NotificationCredentials {
    /// Both `PUSHOVER_USER` and `PUSHOVER_TOKEN` must be set and non-empty.
    pub fn from_env() -> Option<Self> {
        Self::from_values(std::env::var("PUSHOVER_USER").ok(), std::env::var("PUSHOVER_TOKEN").ok())
    }

    fn from_values(user: Option<String>, token: Option<String>) -> Option<Self> {
        match (user, token) {
            (Some(user), Some(token)) if !user.is_empty() && !token.is_empty() => Some(Self { user, token }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        let config = CrawlerConfig::default();
        config.validate().expect("valid");
        let searches = config.resolved_searches(None).expect("resolve");
        assert_eq!(searches.len(), 2);
        assert_eq!(searches[0].category, "pc");
        assert!(searches[1].url.starts_with("https://elektro.bazos.sk/"));
    }

    #[test]
    fn loads_yaml_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("searches.yaml");
        fs::write(
            &path,
            "searches:\n  - query: osciloskop\n    price_floor: 50\n    price_ceiling: 200\n    max_age_days: 3\n    category_id: 807\ncategories:\n  807: elektro\n",
        )
        .expect("write");

        let config = CrawlerConfig::load(&path).expect("load");
        assert_eq!(config.searches.len(), 1);
        assert_eq!(config.searches[0].max_age_days, 3);
        assert_eq!(config.categories.get(&807).map(String::as_str), Some("elektro"));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mut config = CrawlerConfig::default();
        config.searches[0].category_id = 9999;
        assert!(config.validate().is_err());
    }

    #[test]
    fn query_filter_is_case_insensitive() {
        let config = CrawlerConfig::default();
        let searches = config.resolved_searches(Some("yaesu")).expect("resolve");
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].query(), "Yaesu");
    }

    #[test]
    fn credentials_need_both_values() {
        assert!(NotificationCredentials::from_values(Some("u".into()), None).is_none());
        assert!(NotificationCredentials::from_values(Some("u".into()), Some(String::new())).is_none());
        assert_eq!(
            NotificationCredentials::from_values(Some("u".into()), Some("t".into())),
            Some(NotificationCredentials {
                user: "u".into(),
                token: "t".into()
            })
        );
    }
}
