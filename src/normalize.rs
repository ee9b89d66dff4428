use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static NINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b9\s*holes?\b").unwrap());
static EIGHTEEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b18\s*holes?\b").unwrap());

/// Words that may sit next to a hole count without turning the game into a promo.
/// Course names that show up in their own fee-group headings belong here too.
const FILLER_WORDS: &[&str] = &["walking", "midweek", "carts", "can", "be", "added", "maylands"];

/// Canonical game type. Standard games sort before promos.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    NineHoles,
    EighteenHoles,
    Twilight,
    Promo(String),
}

impl Category {
    pub fn is_standard(&self) -> bool {
        !matches!(self, Category::Promo(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Category::NineHoles => "9 Holes",
            Category::EighteenHoles => "18 Holes",
            Category::Twilight => "Twilight",
            Category::Promo(title) => title,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Collapse a raw site label ("9 Holes (Walking)", "18 HOLES Midweek", ...) into a category.
pub fn normalize(raw: &str) -> Category {
    let lowered = raw.trim().to_lowercase();
    let stripped = PAREN_RE.replace_all(&lowered, "");
    let name = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if name == "twilight" {
        return Category::Twilight;
    }

    let has_nine = NINE_RE.is_match(&name);
    let has_eighteen = EIGHTEEN_RE.is_match(&name);
    if !has_nine && !has_eighteen {
        return Category::Promo(title_case(&name));
    }

    let canonical = NINE_RE.replace_all(&name, "9 holes");
    let canonical = EIGHTEEN_RE.replace_all(&canonical, "18 holes").into_owned();

    let words: Vec<&str> = canonical.split_whitespace().collect();
    let mut residual = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let w = words[i];
        if (w == "9" || w == "18") && words.get(i + 1) == Some(&"holes") {
            i += 2;
            continue;
        }
        if !FILLER_WORDS.contains(&w) {
            residual.push(w);
        }
        i += 1;
    }

    let category = match (residual.is_empty(), has_eighteen) {
        (true, true) => Category::EighteenHoles,
        (true, false) => Category::NineHoles,
        (false, _) => Category::Promo(title_case(&canonical)),
    };
    debug!("Normalised '{}' -> '{}'", raw, category);
    category
}

/// Uppercase the first letter of each word. A letter whose uppercase form is
/// more than one char ("ß" → "SS") is left alone so titles re-normalise unchanged.
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut upper = first.to_uppercase();
                    let head = match (upper.next(), upper.next()) {
                        (Some(u), None) => u,
                        _ => first,
                    };
                    std::iter::once(head).chain(chars).collect()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walking_nine_is_standard() {
        assert_eq!(normalize("9 Holes (Walking)"), Category::NineHoles);
        assert_eq!(normalize("9 hole Midweek"), Category::NineHoles);
        assert_eq!(normalize("  9 HOLES  "), Category::NineHoles);
    }

    #[test]
    fn course_name_filler() {
        assert_eq!(normalize("Maylands 9 Holes"), Category::NineHoles);
        assert_eq!(normalize("18 Holes Walking (Carts can be added)"), Category::EighteenHoles);
    }

    #[test]
    fn singular_and_glued_tokens() {
        assert_eq!(normalize("18 hole"), Category::EighteenHoles);
        assert_eq!(normalize("18holes"), Category::EighteenHoles);
    }

    #[test]
    fn both_tokens_prefer_eighteen() {
        assert_eq!(normalize("9 Holes 18 Holes"), Category::EighteenHoles);
    }

    #[test]
    fn extra_word_makes_promo() {
        assert_eq!(
            normalize("18 HOLES Twilight Special"),
            Category::Promo("18 Holes Twilight Special".into())
        );
        assert_eq!(normalize("9 Hole Seniors"), Category::Promo("9 Holes Seniors".into()));
    }

    #[test]
    fn no_hole_count_is_promo() {
        assert_eq!(normalize("Early Bird Special"), Category::Promo("Early Bird Special".into()));
        assert_eq!(normalize("early   bird (members)"), Category::Promo("Early Bird".into()));
    }

    #[test]
    fn nineteen_is_not_nine() {
        assert_eq!(normalize("19 holes"), Category::Promo("19 Holes".into()));
    }

    #[test]
    fn twilight_literal() {
        assert_eq!(normalize("Twilight"), Category::Twilight);
        assert_eq!(normalize(" TWILIGHT (Walking) "), Category::Twilight);
        assert!(normalize("Twilight Golf").label() == "Twilight Golf");
    }

    #[test]
    fn idempotent_over_canonical_labels() {
        let samples = [
            "9 Holes (Walking)",
            "9 hole Midweek",
            "Maylands 9 Holes",
            "18 HOLES Twilight Special",
            "Early Bird Special",
            "twilight",
            "18holes walking",
            "Super   Saver (online only)",
            "ßpecial deal",
            "Émeraude 18 Holes",
        ];
        for raw in samples {
            let first = normalize(raw);
            assert_eq!(normalize(&first.to_string()), first, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn title_case_keeps_one_char_per_letter() {
        assert_eq!(normalize("ßpecial deal"), Category::Promo("ßpecial Deal".into()));
        assert_eq!(normalize("émeraude deal"), Category::Promo("Émeraude Deal".into()));
    }

    #[test]
    fn standard_sorts_before_promo() {
        let mut cats = vec![
            Category::Promo("Aardvark".into()),
            Category::Twilight,
            Category::EighteenHoles,
            Category::NineHoles,
        ];
        cats.sort();
        assert_eq!(cats[0], Category::NineHoles);
        assert_eq!(cats[3], Category::Promo("Aardvark".into()));
        assert!(cats[2].is_standard());
        assert!(!cats[3].is_standard());
    }
}
