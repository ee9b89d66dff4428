pub mod miclub;
pub mod quick18;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use scraper::ElementRef;

use crate::errors::{FinderError, Result};
use crate::net::Fetcher;
use crate::slots::TimeSlot;

/// Raw game label → access URL, as found on a booking calendar page.
pub type Offerings = HashMap<String, String>;
/// Raw layout or column label → slots listed under it.
pub type RawTimes = HashMap<String, Vec<TimeSlot>>;

/// Booking platforms a course can be hosted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebsiteType {
    MiClub,
    Quick18,
}

impl FromStr for WebsiteType {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "miclub" => Ok(WebsiteType::MiClub),
            "quick18" => Ok(WebsiteType::Quick18),
            other => Err(FinderError::Validation(format!(
                "unknown website type '{}' (expected MiClub or Quick18)",
                other
            ))),
        }
    }
}

impl fmt::Display for WebsiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebsiteType::MiClub => f.write_str("MiClub"),
            WebsiteType::Quick18 => f.write_str("Quick18"),
        }
    }
}

/// One booking platform's scraping capability.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Games bookable on `date`, keyed by the site's own label.
    async fn scrape_dates(&self, base_url: &str, date: NaiveDate) -> Result<Offerings>;

    /// Slots behind an access URL returned by `scrape_dates`.
    async fn scrape_times(&self, access_url: &str) -> Result<RawTimes>;

    /// True when `scrape_times` returns every game column on the page rather
    /// than just the one the access URL was issued for.
    fn lists_all_columns(&self) -> bool {
        false
    }
}

/// Lookup from platform tag to adapter.
pub trait AdapterSet: Send + Sync {
    fn adapter(&self, site: WebsiteType) -> &dyn SiteAdapter;
}

/// The live adapters, sharing one rate-limited fetcher.
pub struct Sites {
    miclub: miclub::MiClub,
    quick18: quick18::Quick18,
}

impl Sites {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            miclub: miclub::MiClub::new(fetcher.clone()),
            quick18: quick18::Quick18::new(fetcher),
        }
    }
}

impl AdapterSet for Sites {
    fn adapter(&self, site: WebsiteType) -> &dyn SiteAdapter {
        match site {
            WebsiteType::MiClub => &self.miclub,
            WebsiteType::Quick18 => &self.quick18,
        }
    }
}

/// Replace (or add) query parameters on a URL, keeping the others in place.
pub(crate) fn with_query(base: &str, params: &[(&str, &str)]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| FinderError::fetch(base, format!("invalid URL: {}", e)))?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !params.iter().any(|(name, _)| name == k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .extend_pairs(params.iter().copied());
    Ok(url)
}

/// Whitespace-collapsed text content of an element.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
