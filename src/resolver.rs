use std::collections::HashMap;
use std::sync::Arc;

use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, WORKERS};
use crate::config::CourseConfig;
use crate::errors::{FinderError, Result};
use crate::normalize::{normalize, Category};
use crate::sites::{AdapterSet, RawTimes, WebsiteType};
use crate::slots::{filter_and_sort, Bucket, FilterCriteria};

/// When slots get fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A filter is active: every pair was fetched and filtered up front.
    Eager,
    /// No filter: slots are fetched only for the pair the user picks.
    Lazy,
}

type PairKey = (Category, String);

/// The catalog after resolution plus whatever slots were already fetched.
pub struct Availability {
    catalog: Catalog,
    criteria: FilterCriteria,
    mode: Mode,
    sites: HashMap<String, WebsiteType>,
    adapters: Arc<dyn AdapterSet>,
    prefetched: HashMap<PairKey, Vec<Bucket>>,
}

impl Availability {
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Filtered, sorted slot buckets for one pair.
    ///
    /// Eager mode answers from the prefetched results; lazy mode fetches now.
    pub async fn slots_for(&self, category: &Category, course: &str) -> Result<Vec<Bucket>> {
        if self.mode == Mode::Eager {
            let key = (category.clone(), course.to_string());
            return Ok(self.prefetched.get(&key).cloned().unwrap_or_default());
        }

        let url = self.catalog.access_url(category, course).ok_or_else(|| {
            FinderError::Validation(format!("'{}' is not offered at '{}'", category, course))
        })?;
        let site = self.sites.get(course).copied().ok_or_else(|| {
            FinderError::Config(format!("no known website type for course '{}'", course))
        })?;

        let raw = fetch_pair(self.adapters.as_ref(), site, category, url).await?;
        Ok(filter_and_sort(raw, &self.criteria))
    }
}

/// Fetch one pair's slots. Matrix pages carry every game column, so only the
/// columns that normalise to `category` are kept.
async fn fetch_pair(
    adapters: &dyn AdapterSet,
    site: WebsiteType,
    category: &Category,
    access_url: &str,
) -> Result<RawTimes> {
    let adapter = adapters.adapter(site);
    let mut raw = adapter.scrape_times(access_url).await?;
    if adapter.lists_all_columns() {
        raw.retain(|label, _| normalize(label) == *category);
    }
    Ok(raw)
}

/// Decide between eager and lazy fetching and, when eager, prune the catalog
/// down to pairs with at least one qualifying slot.
pub async fn resolve(
    adapters: Arc<dyn AdapterSet>,
    mut catalog: Catalog,
    criteria: FilterCriteria,
    courses: &[CourseConfig],
    progress: &ProgressBar,
) -> Availability {
    let sites: HashMap<String, WebsiteType> = courses
        .iter()
        .filter_map(|c| Some((c.name.clone(), c.website_type.parse::<WebsiteType>().ok()?)))
        .collect();

    if !criteria.is_active() {
        debug!("No filters active: slots will be fetched on selection");
        return Availability {
            catalog,
            criteria,
            mode: Mode::Lazy,
            sites,
            adapters,
            prefetched: HashMap::new(),
        };
    }

    let prefetched = prefetch(&adapters, &catalog, &criteria, &sites, progress).await;
    catalog.retain_pairs(|category, course| {
        prefetched.contains_key(&(category.clone(), course.to_string()))
    });
    info!(
        "After filtering: {} categories, {} course offerings",
        catalog.categories().count(),
        catalog.len()
    );

    Availability {
        catalog,
        criteria,
        mode: Mode::Eager,
        sites,
        adapters,
        prefetched,
    }
}

/// Fetch and filter every pair. Only pairs with qualifying slots are returned.
async fn prefetch(
    adapters: &Arc<dyn AdapterSet>,
    catalog: &Catalog,
    criteria: &FilterCriteria,
    sites: &HashMap<String, WebsiteType>,
    progress: &ProgressBar,
) -> HashMap<PairKey, Vec<Bucket>> {
    let semaphore = Arc::new(Semaphore::new(WORKERS));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<(PairKey, Result<RawTimes>)>(WORKERS * 2);

    for (category, course, url) in catalog.pairs() {
        let Some(site) = sites.get(&course).copied() else {
            warn!("No known website type for course '{}'. Skipping.", course);
            progress.inc(1);
            continue;
        };

        let adapters = Arc::clone(adapters);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            debug!("Pre-fetching '{}' at '{}': {}", category, course, url);
            let result = fetch_pair(adapters.as_ref(), site, &category, &url).await;
            let _ = tx.send(((category, course), result)).await;
        });
    }

    drop(tx);

    let mut prefetched = HashMap::new();
    while let Some((key, result)) = rx.recv().await {
        match result {
            Ok(raw) => {
                let buckets = filter_and_sort(raw, criteria);
                if buckets.is_empty() {
                    debug!("'{}' at '{}': nothing matches the filters", key.0, key.1);
                } else {
                    prefetched.insert(key, buckets);
                }
            }
            Err(e) => warn!("Failed to fetch times for '{}' at '{}': {}", key.0, key.1, e),
        }
        progress.inc(1);
    }
    prefetched
}
