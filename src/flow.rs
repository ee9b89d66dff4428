use anyhow::Result;
use tracing::{debug, warn};

use crate::normalize::Category;
use crate::resolver::Availability;
use crate::slots::Bucket;

/// Menu entry that opens the promo sub-menu.
pub const PROMOS: &str = "Promos";

/// Terminal interaction used by the selection loop.
pub trait Prompter {
    /// Pick one of `items`. `None` means the user cancelled.
    fn select(&mut self, title: &str, items: &[String]) -> Result<Option<usize>>;

    /// Free-text answer to a question.
    fn ask(&mut self, question: &str) -> Result<String>;

    /// One line of output.
    fn say(&mut self, line: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    SelectCategory,
    SelectCourse(Category),
    ShowSlots(Category, String),
    ConfirmBooking(Category, String),
    Done,
}

/// Run the category → course → slots → booking loop until the user cancels.
///
/// The catalog is never rebuilt: every pass through the loop reads the same
/// `Availability`.
pub async fn run(availability: &Availability, prompter: &mut dyn Prompter) -> Result<()> {
    let mut step = Step::SelectCategory;
    loop {
        debug!("Selection step: {:?}", step);
        step = match step {
            Step::SelectCategory => select_category(availability, prompter)?,
            Step::SelectCourse(category) => select_course(availability, prompter, category)?,
            Step::ShowSlots(category, course) => {
                show_slots(availability, prompter, &category, &course).await;
                Step::ConfirmBooking(category, course)
            }
            Step::ConfirmBooking(category, course) => {
                confirm_booking(availability, prompter, &category, &course)?
            }
            Step::Done => return Ok(()),
        };
    }
}

fn select_category(availability: &Availability, prompter: &mut dyn Prompter) -> Result<Step> {
    let catalog = availability.catalog();
    let standard: Vec<&Category> = catalog.standard().collect();
    let promos: Vec<&Category> = catalog.promos().collect();

    if standard.is_empty() && promos.is_empty() {
        prompter.say("No games left to choose from.");
        return Ok(Step::Done);
    }

    let mut items: Vec<String> = standard.iter().map(|c| c.to_string()).collect();
    if !promos.is_empty() {
        items.push(PROMOS.to_string());
    }

    let Some(choice) = prompter.select("Select what game you want to play", &items)? else {
        return Ok(Step::Done);
    };
    if let Some(category) = standard.get(choice) {
        return Ok(Step::SelectCourse((*category).clone()));
    }

    let promo_items: Vec<String> = promos.iter().map(|c| c.to_string()).collect();
    match prompter.select("Select a promotional game", &promo_items)? {
        Some(i) => Ok(promos
            .get(i)
            .map(|c| Step::SelectCourse((*c).clone()))
            .unwrap_or(Step::Done)),
        None => Ok(Step::Done),
    }
}

fn select_course(
    availability: &Availability,
    prompter: &mut dyn Prompter,
    category: Category,
) -> Result<Step> {
    let Some(courses) = availability.catalog().courses(&category) else {
        return Ok(Step::Done);
    };
    let names: Vec<String> = courses.keys().cloned().collect();

    let title = format!("Select a course that offers {}", category);
    Ok(match prompter.select(&title, &names)? {
        Some(i) => names
            .get(i)
            .map(|name| Step::ShowSlots(category, name.clone()))
            .unwrap_or(Step::Done),
        None => Step::Done,
    })
}

async fn show_slots(
    availability: &Availability,
    prompter: &mut dyn Prompter,
    category: &Category,
    course: &str,
) {
    let buckets = match availability.slots_for(category, course).await {
        Ok(buckets) => buckets,
        Err(e) => {
            warn!("Failed to fetch times for '{}' at '{}': {}", category, course, e);
            prompter.say(&format!("Could not load times for {} at {}.", category, course));
            Vec::new()
        }
    };

    if buckets.is_empty() {
        prompter.say(&format!("No qualifying times for {} at {}.", category, course));
        return;
    }
    for line in render_buckets(&buckets) {
        prompter.say(&line);
    }
}

/// "Available times:" then each layout with one line per slot.
pub fn render_buckets(buckets: &[Bucket]) -> Vec<String> {
    let mut lines = vec!["Available times:".to_string()];
    for bucket in buckets {
        lines.push(String::new());
        lines.push(format!("{}:", bucket.label));
        for slot in &bucket.slots {
            lines.push(format!(
                "{}: {} spots available",
                slot.display_time(),
                slot.available_spots
            ));
        }
    }
    lines
}

fn confirm_booking(
    availability: &Availability,
    prompter: &mut dyn Prompter,
    category: &Category,
    course: &str,
) -> Result<Step> {
    let answer = prompter.ask("Would you like to book a game at this course? (yes/no)")?;
    if is_yes(&answer) {
        if let Some(url) = availability.catalog().access_url(category, course) {
            prompter.say(&format!("Here is the URL for this game: {}", url));
        }
    } else {
        prompter.say("Returning to game selection...");
    }
    Ok(Step::SelectCategory)
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}
