use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime, Timelike};
use regex::Regex;
use tracing::debug;

static GLUED_MERIDIEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,2}:\d{2})\s*(AM|PM)\b").unwrap());

/// Minutes either side of the requested tee time.
pub const WINDOW_HALF_WIDTH: u32 = 60;

/// One bookable tee time as listed by a booking site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlot {
    pub time: String,
    pub available_spots: u32,
}

impl TimeSlot {
    pub fn new(time: impl Into<String>, available_spots: u32) -> Self {
        Self {
            time: time.into(),
            available_spots,
        }
    }

    /// "1:30PM" → "1:30 PM"
    pub fn display_time(&self) -> String {
        GLUED_MERIDIEM_RE
            .replace_all(self.time.trim(), |caps: &regex::Captures| {
                format!("{} {}", &caps[1], caps[2].to_uppercase())
            })
            .into_owned()
    }
}

/// Parse a site time label ("8:00 AM", "08:00PM", "2:30 pm", "14:05") into minutes after midnight.
pub fn minute_of_day(label: &str) -> Option<u32> {
    let cleaned = label.trim().to_uppercase();
    let spaced = GLUED_MERIDIEM_RE.replace_all(&cleaned, "$1 $2");

    let parsed = NaiveTime::parse_from_str(&spaced, "%I:%M %p")
        .or_else(|_| NaiveTime::parse_from_str(&spaced, "%H:%M"))
        .ok()?;
    Some(parsed.hour() * 60 + parsed.minute())
}

/// Inclusive minute-of-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: u32,
    pub end: u32,
}

impl TimeWindow {
    pub fn around(center: u32) -> Self {
        Self {
            start: center.saturating_sub(WINDOW_HALF_WIDTH),
            end: center + WINDOW_HALF_WIDTH,
        }
    }

    pub fn contains(&self, minute: u32) -> bool {
        self.start <= minute && minute <= self.end
    }
}

/// What the user asked for. Built once per run and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub date: NaiveDate,
    pub window: Option<TimeWindow>,
    pub min_spots: Option<u32>,
}

impl FilterCriteria {
    pub fn new(date: NaiveDate, center: Option<u32>, min_spots: Option<u32>) -> Self {
        Self {
            date,
            window: center.map(TimeWindow::around),
            min_spots: min_spots.filter(|&s| s > 0),
        }
    }

    /// Any filter switches the resolver into eager mode.
    pub fn is_active(&self) -> bool {
        self.window.is_some() || self.min_spots.is_some()
    }

    fn admits(&self, minute: u32, slot: &TimeSlot) -> bool {
        if let Some(window) = self.window {
            if !window.contains(minute) {
                return false;
            }
        }
        if let Some(min) = self.min_spots {
            if slot.available_spots < min {
                return false;
            }
        }
        true
    }
}

/// Slots for one course layout (MiClub) or matrix column (Quick18).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub slots: Vec<TimeSlot>,
}

impl Bucket {
    fn earliest(&self) -> u32 {
        self.slots
            .first()
            .and_then(|s| minute_of_day(&s.time))
            .unwrap_or(u32::MAX)
    }
}

/// Filter one list of slots and sort it by time of day.
pub fn filter_slots(slots: &[TimeSlot], criteria: &FilterCriteria) -> Vec<TimeSlot> {
    let mut kept: Vec<(u32, TimeSlot)> = slots
        .iter()
        .filter_map(|slot| match minute_of_day(&slot.time) {
            Some(minute) => Some((minute, slot)),
            None => {
                debug!("Dropping unparseable time '{}'", slot.time);
                None
            }
        })
        .filter(|(minute, slot)| criteria.admits(*minute, slot))
        .map(|(minute, slot)| (minute, slot.clone()))
        .collect();

    kept.sort_by_key(|(minute, _)| *minute);
    kept.into_iter().map(|(_, slot)| slot).collect()
}

/// Filter every bucket, drop the empty ones, order the rest by their earliest slot.
pub fn filter_and_sort(
    raw: HashMap<String, Vec<TimeSlot>>,
    criteria: &FilterCriteria,
) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = raw
        .into_iter()
        .map(|(label, slots)| Bucket {
            slots: filter_slots(&slots, criteria),
            label,
        })
        .filter(|b| !b.slots.is_empty())
        .collect();

    buckets.sort_by(|a, b| a.earliest().cmp(&b.earliest()).then_with(|| a.label.cmp(&b.label)));
    buckets
}
