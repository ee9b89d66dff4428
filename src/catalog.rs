use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::CourseConfig;
use crate::errors::Result;
use crate::normalize::{normalize, Category};
use crate::sites::{AdapterSet, Offerings, WebsiteType};

/// Courses fetched at the same time while building or resolving.
pub const WORKERS: usize = 4;

/// Course name → access URL.
pub type CourseUrls = BTreeMap<String, String>;

/// Every bookable game for the run's date: category → course → access URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    games: BTreeMap<Category, CourseUrls>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one pair; an existing (category, course) pair gets the new URL.
    pub fn insert(&mut self, category: Category, course: &str, url: &str) {
        self.games
            .entry(category)
            .or_default()
            .insert(course.to_string(), url.to_string());
    }

    /// Normalise a course's raw labels and fold them in, in label order.
    pub fn add_offerings(&mut self, course: &str, offerings: Offerings) {
        let mut offerings: Vec<(String, String)> = offerings.into_iter().collect();
        offerings.sort();
        for (raw, url) in offerings {
            let category = normalize(&raw);
            debug!("{}: '{}' -> {}", course, raw, category);
            self.insert(category, course, &url);
        }
    }

    pub fn courses(&self, category: &Category) -> Option<&CourseUrls> {
        self.games.get(category)
    }

    pub fn access_url(&self, category: &Category, course: &str) -> Option<&str> {
        self.games.get(category)?.get(course).map(String::as_str)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.games.keys()
    }

    pub fn standard(&self) -> impl Iterator<Item = &Category> {
        self.games.keys().filter(|c| c.is_standard())
    }

    pub fn promos(&self) -> impl Iterator<Item = &Category> {
        self.games.keys().filter(|c| !c.is_standard())
    }

    /// (category, course, access URL) for every entry.
    pub fn pairs(&self) -> Vec<(Category, String, String)> {
        self.games
            .iter()
            .flat_map(|(cat, courses)| {
                courses
                    .iter()
                    .map(move |(course, url)| (cat.clone(), course.clone(), url.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.games.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Keep only the pairs `keep` accepts; categories left without courses disappear.
    pub fn retain_pairs(&mut self, mut keep: impl FnMut(&Category, &str) -> bool) {
        self.games.retain(|category, courses| {
            courses.retain(|course, _| {
                let kept = keep(category, course);
                if !kept {
                    debug!("Dropping '{}' at '{}': no qualifying times", category, course);
                }
                kept
            });
            if courses.is_empty() {
                debug!("Dropping '{}' entirely: no courses left", category);
            }
            !courses.is_empty()
        });
    }
}

/// Scrape every course's calendar for `date` and fold the results into a catalog.
///
/// One unit of work per course. A failing course is logged and contributes
/// nothing; the bar ticks once per finished course either way.
pub async fn build(
    adapters: Arc<dyn AdapterSet>,
    courses: &[CourseConfig],
    date: NaiveDate,
    progress: &ProgressBar,
) -> Catalog {
    let semaphore = Arc::new(Semaphore::new(WORKERS));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<(String, Result<Offerings>)>(WORKERS * 2);

    for course in courses {
        let site = match course.website_type.parse::<WebsiteType>() {
            Ok(site) => site,
            Err(_) => {
                warn!(
                    "Unknown website type '{}' for course '{}'. Skipping.",
                    course.website_type, course.name
                );
                progress.inc(1);
                continue;
            }
        };

        let adapters = Arc::clone(&adapters);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let name = course.name.clone();
        let url = course.url.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            debug!("Scraping {} ({}): {}", name, site, url);
            let result = adapters.adapter(site).scrape_dates(&url, date).await;
            let _ = tx.send((name, result)).await;
        });
    }

    // rx closes once every spawned task has dropped its sender
    drop(tx);

    let mut catalog = Catalog::new();
    let mut failed = 0usize;
    while let Some((course, result)) = rx.recv().await {
        match result {
            Ok(offerings) => {
                debug!("{}: {} game(s) on offer", course, offerings.len());
                catalog.add_offerings(&course, offerings);
            }
            Err(e) => {
                failed += 1;
                warn!("Failed to scrape {}: {}", course, e);
            }
        }
        progress.inc(1);
    }

    info!(
        "Catalog built: {} categories, {} course offerings ({} course(s) failed)",
        catalog.categories().count(),
        catalog.len(),
        failed
    );
    catalog
}
