//! MiClub public booking calendars: one `feeGroupRow` per game, one
//! `row-time` per tee time on the timesheet page.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::debug;

use super::{element_text, with_query, Offerings, RawTimes, SiteAdapter};
use crate::errors::Result;
use crate::net::Fetcher;
use crate::slots::TimeSlot;

const TIMESHEET_PATH: &str = "/guests/bookings/ViewPublicTimesheet.msp";
const UNAVAILABLE_MARKERS: &[&str] = &["not available", "no bookings available"];

static FEE_GROUP_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.feeGroupRow").unwrap());
static ROW_HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.row-heading > h3").unwrap());
static SELECTED_DAY_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.items-wrapper > div.cell[data-date='0']").unwrap());
static TIME_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.row-time").unwrap());
static TIME_HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.time-wrapper > h3").unwrap());
static LAYOUT_HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.time-wrapper > h4").unwrap());
static AVAILABLE_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.cell.cell-available").unwrap());

static REDIRECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"redirectToTimesheet\(\s*'?([^',)]*)'?\s*,\s*'?([^',)]*)'?\s*\)").unwrap()
});

pub struct MiClub {
    fetcher: Fetcher,
}

impl MiClub {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl SiteAdapter for MiClub {
    async fn scrape_dates(&self, base_url: &str, date: NaiveDate) -> Result<Offerings> {
        let day = date.format("%Y-%m-%d").to_string();
        let page_url = with_query(base_url, &[("selectedDate", &day), ("weekends", "false")])?;
        let html = self.fetcher.get_text(page_url.as_str()).await?;
        Ok(parse_calendar(&html, &page_url))
    }

    async fn scrape_times(&self, access_url: &str) -> Result<RawTimes> {
        let html = self.fetcher.get_text(access_url).await?;
        Ok(parse_timesheet(&html))
    }
}

/// Fee-group rows that are bookable on the selected day.
pub fn parse_calendar(html: &str, page_url: &Url) -> Offerings {
    let doc = Html::parse_document(html);
    let mut offerings = Offerings::new();

    for row in doc.select(&FEE_GROUP_ROW) {
        let Some(heading) = row.select(&ROW_HEADING).next().map(element_text) else {
            continue;
        };
        if heading.is_empty() {
            continue;
        }

        let Some(cell) = row.select(&SELECTED_DAY_CELL).next() else {
            debug!("MiClub: no cell for selected day in '{}'", heading);
            continue;
        };

        let text = element_text(cell).to_lowercase();
        if text.is_empty() || UNAVAILABLE_MARKERS.iter().any(|m| text.contains(m)) {
            continue;
        }

        let timesheet = cell
            .value()
            .attr("onclick")
            .and_then(|onclick| timesheet_url(page_url, onclick));
        if let Some(url) = timesheet {
            offerings.insert(heading, url);
        }
    }

    offerings
}

/// Build the timesheet URL from `redirectToTimesheet('<feeGroupId>','<date>')`.
fn timesheet_url(page_url: &Url, onclick: &str) -> Option<String> {
    let caps = REDIRECT_RE.captures(onclick)?;
    let fee_group = caps[1].trim();
    let date = caps[2].trim();
    if fee_group.is_empty() || date.is_empty() {
        return None;
    }

    let mut url = with_query(
        page_url.as_str(),
        &[("feeGroupId", fee_group), ("selectedDate", date), ("weekends", "false")],
    )
    .ok()?;
    url.set_path(TIMESHEET_PATH);
    Some(url.to_string())
}

/// Timesheet rows grouped by course layout; rows with no free cell are skipped.
pub fn parse_timesheet(html: &str) -> RawTimes {
    let doc = Html::parse_document(html);
    let mut times = RawTimes::new();

    for row in doc.select(&TIME_ROW) {
        let time = row.select(&TIME_HEADING).next().map(element_text).unwrap_or_default();
        let layout = row.select(&LAYOUT_HEADING).next().map(element_text).unwrap_or_default();
        if time.is_empty() || layout.is_empty() {
            continue;
        }

        let spots = row.select(&AVAILABLE_CELL).count() as u32;
        if spots == 0 {
            continue;
        }
        times.entry(layout).or_default().push(TimeSlot::new(time, spots));
    }

    times
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALENDAR: &str = r#"
<html><body>
  <div class="feeGroupRow">
    <div class="row-heading"><h3> 18 Holes (Walking) </h3></div>
    <div class="items-wrapper">
      <div class="cell" data-date="0" onclick="javascript:redirectToTimesheet('101527','2030-03-14');">12 available</div>
      <div class="cell" data-date="1" onclick="javascript:redirectToTimesheet('101527','2030-03-15');">3 available</div>
    </div>
  </div>
  <div class="feeGroupRow">
    <div class="row-heading"><h3>9 Holes</h3></div>
    <div class="items-wrapper">
      <div class="cell" data-date="0">Not Available</div>
    </div>
  </div>
  <div class="feeGroupRow">
    <div class="row-heading"><h3>Twilight</h3></div>
    <div class="items-wrapper">
      <div class="cell" data-date="0" onclick="redirectToTimesheet('2002', '2030-03-14')">4 available</div>
    </div>
  </div>
  <div class="feeGroupRow">
    <div class="row-heading"><h3></h3></div>
    <div class="items-wrapper">
      <div class="cell" data-date="0" onclick="redirectToTimesheet('9','2030-03-14')">1 available</div>
    </div>
  </div>
  <div class="feeGroupRow">
    <div class="row-heading"><h3>Members Comp</h3></div>
    <div class="items-wrapper">
      <div class="cell" data-date="0">No bookings available</div>
    </div>
  </div>
</body></html>"#;

    const TIMESHEET: &str = r#"
<html><body>
  <div class="row-time">
    <div class="time-wrapper"><h3>7:30 am</h3><h4>Front 9</h4></div>
    <div class="cell cell-available"></div><div class="cell cell-available"></div><div class="cell"></div>
  </div>
  <div class="row-time">
    <div class="time-wrapper"><h3>7:00 am</h3><h4>Front 9</h4></div>
    <div class="cell cell-available"></div>
  </div>
  <div class="row-time">
    <div class="time-wrapper"><h3>8:00 am</h3><h4>Back 9</h4></div>
    <div class="cell"></div><div class="cell"></div>
  </div>
  <div class="row-time">
    <div class="time-wrapper"><h3>8:10 am</h3><h4>Back 9</h4></div>
    <div class="cell cell-available"></div><div class="cell cell-available"></div>
    <div class="cell cell-available"></div><div class="cell cell-available"></div>
  </div>
  <div class="row-time">
    <div class="time-wrapper"><h3>9:00 am</h3></div>
    <div class="cell cell-available"></div>
  </div>
</body></html>"#;

    fn page_url() -> Url {
        Url::parse(
            "https://club.example.com/guests/bookings/ViewPublicCalendar.msp?booking_resource_id=3000000&selectedDate=2030-03-14&weekends=false",
        )
        .unwrap()
    }

    #[test]
    fn calendar_keeps_only_bookable_rows() {
        let offerings = parse_calendar(CALENDAR, &page_url());
        assert_eq!(offerings.len(), 2);
        assert!(offerings.contains_key("18 Holes (Walking)"));
        assert!(offerings.contains_key("Twilight"));
        assert!(!offerings.contains_key("9 Holes"));
        assert!(!offerings.contains_key("Members Comp"));
    }

    #[test]
    fn calendar_builds_timesheet_url() {
        let offerings = parse_calendar(CALENDAR, &page_url());
        let url = Url::parse(&offerings["18 Holes (Walking)"]).unwrap();
        assert_eq!(url.path(), TIMESHEET_PATH);
        let q: std::collections::HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(q["feeGroupId"], "101527");
        assert_eq!(q["selectedDate"], "2030-03-14");
        assert_eq!(q["weekends"], "false");
        assert_eq!(q["booking_resource_id"], "3000000");
    }

    #[test]
    fn onclick_without_redirect_is_ignored() {
        assert_eq!(timesheet_url(&page_url(), "javascript:void(0)"), None);
        assert_eq!(timesheet_url(&page_url(), "redirectToTimesheet('','')"), None);
    }

    #[test]
    fn timesheet_groups_by_layout() {
        let times = parse_timesheet(TIMESHEET);
        assert_eq!(times.len(), 2);
        assert_eq!(
            times["Front 9"],
            vec![TimeSlot::new("7:30 am", 2), TimeSlot::new("7:00 am", 1)]
        );
        assert_eq!(times["Back 9"], vec![TimeSlot::new("8:10 am", 4)]);
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(parse_calendar("<html></html>", &page_url()).is_empty());
        assert!(parse_timesheet("").is_empty());
    }
}
