use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use tracing::debug;

use crate::errors::{FinderError, Result};
use crate::flow::Prompter;
use crate::slots::FilterCriteria;

const DATE_FORMAT: &str = "%d-%m-%Y";
const MAX_SPOTS: u32 = 4;

/// `dialoguer` menus on the controlling terminal. Esc or q cancels a menu.
pub struct TermPrompter {
    theme: ColorfulTheme,
}

impl TermPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Prompter for TermPrompter {
    fn select(&mut self, title: &str, items: &[String]) -> anyhow::Result<Option<usize>> {
        Ok(Select::with_theme(&self.theme)
            .with_prompt(title)
            .items(items)
            .default(0)
            .interact_opt()?)
    }

    fn ask(&mut self, question: &str) -> anyhow::Result<String> {
        Ok(Input::<String>::with_theme(&self.theme)
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()?)
    }

    fn say(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Search parameters as typed, before validation.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub date: Option<String>,
    pub time: Option<String>,
    pub spots: Option<u32>,
    pub courses: Vec<String>,
}

/// Validated search: the run's filter plus which courses to search
/// (empty = every course that is not blacklisted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub criteria: FilterCriteria,
    pub course_names: Vec<String>,
}

impl SearchArgs {
    /// A missing date or time opens the start-up form.
    pub fn needs_prompt(&self) -> bool {
        self.date.is_none() || self.time.is_none()
    }

    /// Ask for every field the flags left out. Answers are re-asked until valid.
    pub fn fill_missing(&mut self, known_courses: &[String], now: NaiveDateTime) -> anyhow::Result<()> {
        let theme = ColorfulTheme::default();
        let today = now.date();

        if self.courses.is_empty() {
            println!("Courses: {}", known_courses.join(", "));
            let typed: String = Input::with_theme(&theme)
                .with_prompt("Courses to search (comma separated, blank for all)")
                .allow_empty(true)
                .interact_text()?;
            self.courses = split_names(&typed);
        }

        let date = match self.date.clone() {
            Some(d) => parse_date(&d, today)?,
            None => {
                let typed: String = Input::with_theme(&theme)
                    .with_prompt("Date (DD-MM-YYYY)")
                    .validate_with(|input: &String| parse_date(input, today).map(|_| ()))
                    .interact_text()?;
                let date = parse_date(&typed, today)?;
                self.date = Some(typed);
                date
            }
        };

        if self.time.is_none() {
            let typed: String = Input::with_theme(&theme)
                .with_prompt("Tee time (HH:MM, blank for any)")
                .allow_empty(true)
                .validate_with(|input: &String| parse_time(input, date, now).map(|_| ()))
                .interact_text()?;
            self.time = Some(typed);
        }

        if self.spots.is_none() {
            let typed: String = Input::with_theme(&theme)
                .with_prompt("Minimum spots (1-4, blank for any)")
                .allow_empty(true)
                .validate_with(|input: &String| parse_spots(input).map(|_| ()))
                .interact_text()?;
            self.spots = parse_spots(&typed)?;
        }

        Ok(())
    }

    /// Validate everything against the current local time.
    pub fn into_request(self, now: NaiveDateTime) -> Result<SearchRequest> {
        let date_text = self
            .date
            .ok_or_else(|| FinderError::Validation("Date is required (DD-MM-YYYY)".into()))?;
        let date = parse_date(&date_text, now.date())?;
        let center = match &self.time {
            Some(t) => parse_time(t, date, now)?,
            None => None,
        };
        let spots = check_spots(self.spots)?;
        debug!("Search: date={} center={:?} spots={:?}", date, center, spots);

        Ok(SearchRequest {
            criteria: FilterCriteria::new(date, center, spots),
            course_names: self.courses,
        })
    }
}

/// DD-MM-YYYY, not before `today`.
pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let input = input.trim();
    let date = NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| {
        FinderError::Validation(format!("Invalid date '{}', use DD-MM-YYYY", input))
    })?;
    if date < today {
        return Err(FinderError::Validation("Selected date is in the past".into()));
    }
    Ok(date)
}

/// 24h HH:MM as minutes after midnight; blank means no time filter.
/// On `now`'s own date the time may not already have passed.
pub fn parse_time(input: &str, date: NaiveDate, now: NaiveDateTime) -> Result<Option<u32>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let time = NaiveTime::parse_from_str(input, "%H:%M").map_err(|_| {
        FinderError::Validation(format!("Invalid time '{}', use HH:MM (24-hour)", input))
    })?;
    let minute = time.hour() * 60 + time.minute();

    let now_minute = now.hour() * 60 + now.minute();
    if date == now.date() && minute < now_minute {
        return Err(FinderError::Validation(format!(
            "Specified time {} is already in the past",
            input
        )));
    }
    Ok(Some(minute))
}

/// Blank or 0 means no spots filter; otherwise 1 to 4.
pub fn parse_spots(input: &str) -> Result<Option<u32>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let n = input
        .parse::<u32>()
        .map_err(|_| FinderError::Validation(format!("Invalid number of spots '{}'", input)))?;
    check_spots(Some(n))
}

fn check_spots(spots: Option<u32>) -> Result<Option<u32>> {
    match spots {
        None | Some(0) => Ok(None),
        Some(n) if n <= MAX_SPOTS => Ok(Some(n)),
        Some(_) => Err(FinderError::Validation("Spots must be between 1 and 4".into())),
    }
}

fn split_names(typed: &str) -> Vec<String> {
    typed
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .collect()
}
