//! Quick18 search matrix: one column per game type, one row per tee time.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{element_text, with_query, Offerings, RawTimes, SiteAdapter};
use crate::errors::Result;
use crate::net::Fetcher;
use crate::slots::TimeSlot;

/// Label used when a matrix page has no per-game column headers.
pub const ALL_TEE_TIMES: &str = "All Tee Times";

static HEADER_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.matrixTable thead tr th.matrixHdrSched").unwrap());
static BODY_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table.matrixTable tbody tr").unwrap());
static SCHED_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.matrixsched").unwrap());
static SELECT_BUTTON: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.sexybutton.teebutton").unwrap());
static TIME_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.mtrxTeeTimes").unwrap());
static PLAYERS_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.matrixPlayers").unwrap());

static TRAILING_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*$").unwrap());

pub struct Quick18 {
    fetcher: Fetcher,
}

impl Quick18 {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl SiteAdapter for Quick18 {
    async fn scrape_dates(&self, base_url: &str, date: NaiveDate) -> Result<Offerings> {
        let tee_date = date.format("%Y%m%d").to_string();
        let page_url = with_query(base_url, &[("teedate", &tee_date)])?;
        let html = self.fetcher.get_text(page_url.as_str()).await?;
        Ok(parse_matrix_columns(&html, page_url.as_str()))
    }

    async fn scrape_times(&self, access_url: &str) -> Result<RawTimes> {
        let html = self.fetcher.get_text(access_url).await?;
        Ok(parse_matrix_times(&html))
    }

    fn lists_all_columns(&self) -> bool {
        true
    }
}

fn column_headers(doc: &Html) -> Vec<String> {
    doc.select(&HEADER_CELL)
        .map(element_text)
        .filter(|h| !h.is_empty())
        .collect()
}

/// A matrix cell is bookable when it is active and carries a Select button.
fn is_bookable(cell: ElementRef<'_>) -> bool {
    let inactive = cell.value().classes().any(|c| c == "mtrxInactive");
    !inactive && cell.select(&SELECT_BUTTON).next().is_some()
}

/// Game columns with at least one bookable slot. Every game shares the page URL.
pub fn parse_matrix_columns(html: &str, page_url: &str) -> Offerings {
    let doc = Html::parse_document(html);
    let headers = column_headers(&doc);
    let mut offerings = Offerings::new();

    if headers.is_empty() {
        offerings.insert(ALL_TEE_TIMES.to_string(), page_url.to_string());
        return offerings;
    }

    let mut available = vec![false; headers.len()];
    for row in doc.select(&BODY_ROW) {
        for (i, cell) in row.select(&SCHED_CELL).enumerate() {
            if i < available.len() && is_bookable(cell) {
                available[i] = true;
            }
        }
    }

    for (header, open) in headers.into_iter().zip(available) {
        if open {
            offerings.insert(header, page_url.to_string());
        }
    }
    offerings
}

/// Every bookable slot on the page, keyed by raw column header.
pub fn parse_matrix_times(html: &str) -> RawTimes {
    let doc = Html::parse_document(html);
    let headers = column_headers(&doc);
    let mut times = RawTimes::new();

    for row in doc.select(&BODY_ROW) {
        let time = row.select(&TIME_CELL).next().map(element_text).unwrap_or_default();
        if time.is_empty() {
            continue;
        }
        let spots = row
            .select(&PLAYERS_CELL)
            .next()
            .map(|c| parse_players(&element_text(c)))
            .unwrap_or(1);

        for (i, cell) in row.select(&SCHED_CELL).enumerate() {
            if !is_bookable(cell) {
                continue;
            }
            let label = match headers.get(i) {
                Some(h) => h.clone(),
                None if headers.is_empty() => ALL_TEE_TIMES.to_string(),
                None => continue,
            };
            times.entry(label).or_default().push(TimeSlot::new(time.clone(), spots));
        }
    }

    times
}

/// "1 to 4 players" → 4, "1 player" → 1. Anything unreadable counts as one spot.
fn parse_players(cell: &str) -> u32 {
    let lowered = cell.to_lowercase().replace("players", "").replace("player", "");
    TRAILING_NUMBER_RE
        .captures(lowered.trim_end())
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATRIX: &str = r##"
<html><body>
<table class="matrixTable">
  <thead><tr>
    <th>Time</th><th>Players</th>
    <th class="matrixHdrSched">9 Holes</th>
    <th class="matrixHdrSched">18 Holes</th>
    <th class="matrixHdrSched">Twilight Special</th>
  </tr></thead>
  <tbody>
    <tr>
      <td class="mtrxTeeTimes">6:30<div>AM</div></td>
      <td class="matrixPlayers">1 to 4 players</td>
      <td class="matrixsched"><a class="sexybutton teebutton" href="#">Select</a></td>
      <td class="matrixsched mtrxInactive"><a class="sexybutton teebutton" href="#">Select</a></td>
      <td class="matrixsched"></td>
    </tr>
    <tr>
      <td class="mtrxTeeTimes">2:30
PM</td>
      <td class="matrixPlayers">1 player</td>
      <td class="matrixsched"><a class="sexybutton teebutton" href="#">Select</a></td>
      <td class="matrixsched"><a class="sexybutton teebutton" href="#">Select</a></td>
      <td class="matrixsched mtrxInactive"></td>
    </tr>
  </tbody>
</table>
</body></html>"##;

    const PAGE: &str = "https://springs.example.com/teetimes/searchmatrix?teedate=20300314";

    #[test]
    fn columns_with_a_select_button_are_offered() {
        let offerings = parse_matrix_columns(MATRIX, PAGE);
        let mut keys: Vec<&String> = offerings.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["18 Holes", "9 Holes"]);
        assert!(offerings.values().all(|u| u == PAGE));
    }

    #[test]
    fn headerless_matrix_falls_back_to_all_tee_times() {
        let offerings = parse_matrix_columns("<table class='matrixTable'></table>", PAGE);
        assert_eq!(offerings.len(), 1);
        assert_eq!(offerings[ALL_TEE_TIMES], PAGE);
    }

    #[test]
    fn times_are_keyed_by_column() {
        let times = parse_matrix_times(MATRIX);
        assert_eq!(
            times["9 Holes"],
            vec![TimeSlot::new("6:30 AM", 4), TimeSlot::new("2:30 PM", 1)]
        );
        assert_eq!(times["18 Holes"], vec![TimeSlot::new("2:30 PM", 1)]);
        assert!(!times.contains_key("Twilight Special"));
    }

    #[test]
    fn player_counts() {
        assert_eq!(parse_players("1 to 4 players"), 4);
        assert_eq!(parse_players("1 player"), 1);
        assert_eq!(parse_players("2 - 3 Players"), 3);
        assert_eq!(parse_players(""), 1);
        assert_eq!(parse_players("0 players"), 1);
    }
}
