use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{FinderError, Result};

const APP_DIR: &str = "tee_finder";
const CONFIG_FILE: &str = "config.txt";

/// One golf course from the config file. `name` is the unique key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseConfig {
    pub name: String,
    pub url: String,
    pub website_type: String,
    pub blacklisted: bool,
}

impl CourseConfig {
    fn to_line(&self) -> String {
        format!("{},{},{},{}", self.name, self.url, self.website_type, self.blacklisted)
    }
}

/// `~/.config/tee_finder/config.txt` (platform config dir), unless overridden.
pub fn default_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or_else(|| FinderError::Config("could not determine the user config directory".into()))
}

/// Parse `name,url,websiteType[,blacklisted]`. Lines with fewer than three fields yield `None`;
/// fields past the fourth are ignored.
pub fn parse_line(line: &str) -> Option<CourseConfig> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }
    Some(CourseConfig {
        name: parts[0].to_string(),
        url: parts[1].to_string(),
        website_type: parts[2].to_string(),
        blacklisted: parts.get(3).is_some_and(|b| b.eq_ignore_ascii_case("true")),
    })
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| FinderError::Config(format!("failed to read {}: {}", path.display(), e)))
}

/// Courses keyed by name. A missing or unreadable file is a config error.
pub fn load_courses(path: &Path) -> Result<BTreeMap<String, CourseConfig>> {
    let text = read_config(path)?;
    let courses: BTreeMap<String, CourseConfig> = text
        .lines()
        .filter_map(parse_line)
        .map(|c| (c.name.clone(), c))
        .collect();
    debug!("Loaded {} courses from {}", courses.len(), path.display());
    Ok(courses)
}

/// Courses keyed by URL: a later line with the same URL replaces the earlier one.
pub fn load_by_url(path: &Path) -> Result<BTreeMap<String, CourseConfig>> {
    let text = read_config(path)?;
    Ok(text
        .lines()
        .filter_map(parse_line)
        .map(|c| (c.url.clone(), c))
        .collect())
}

/// Courses in file order, de-duplicated by URL, sorted by name for display and editing.
pub fn load_sorted(path: &Path) -> Result<Vec<CourseConfig>> {
    let mut courses: Vec<CourseConfig> = load_by_url(path)?.into_values().collect();
    courses.sort_by_key(|c| c.name.to_lowercase());
    Ok(courses)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn append_courses(path: &Path, courses: &[CourseConfig]) -> Result<()> {
    ensure_parent(path)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for course in courses {
        writeln!(file, "{}", course.to_line())?;
    }
    info!("Appended {} course(s) to {}", courses.len(), path.display());
    Ok(())
}

pub fn overwrite_courses(path: &Path, courses: &[CourseConfig]) -> Result<()> {
    ensure_parent(path)?;
    let body: String = courses.iter().map(|c| c.to_line() + "\n").collect();
    fs::write(path, body)?;
    info!("Wrote {} course(s) to {}", courses.len(), path.display());
    Ok(())
}

/// Case-insensitive lookup of a typed course name; returns the configured spelling.
pub fn find_course<'a>(courses: &'a BTreeMap<String, CourseConfig>, typed: &str) -> Option<&'a str> {
    let wanted = typed.trim().to_lowercase();
    courses
        .keys()
        .find(|name| name.to_lowercase() == wanted)
        .map(String::as_str)
}

/// Courses to search this run.
///
/// With no names: every course that is not blacklisted. With names: exactly
/// those courses, blacklisted or not. An unknown name is a validation error.
pub fn select_courses(
    courses: &BTreeMap<String, CourseConfig>,
    names: &[String],
) -> Result<Vec<CourseConfig>> {
    let named: Vec<&String> = names.iter().filter(|n| !n.trim().is_empty()).collect();

    if named.is_empty() {
        return Ok(courses
            .values()
            .filter(|c| {
                if c.blacklisted {
                    debug!("Skipping blacklisted course: {}", c.name);
                }
                !c.blacklisted
            })
            .cloned()
            .collect());
    }

    let mut selected: BTreeMap<&str, &CourseConfig> = BTreeMap::new();
    for typed in named {
        let canon = find_course(courses, typed).ok_or_else(|| {
            FinderError::Validation(format!("course '{}' does not exist in config", typed.trim()))
        })?;
        selected.insert(canon, &courses[canon]);
    }
    Ok(selected.into_values().cloned().collect())
}

/// Flip the blacklist flag of one course, returning its new state.
pub fn toggle_blacklist(path: &Path, name: &str) -> Result<bool> {
    let mut courses = load_sorted(path)?;
    let wanted = name.trim().to_lowercase();
    let course = courses
        .iter_mut()
        .find(|c| c.name.to_lowercase() == wanted)
        .ok_or_else(|| FinderError::Validation(format!("course '{}' does not exist in config", name)))?;
    course.blacklisted = !course.blacklisted;
    let state = course.blacklisted;
    overwrite_courses(path, &courses)?;
    Ok(state)
}

/// Remove courses by name (case-insensitive). Returns how many were removed.
pub fn delete_courses(path: &Path, names: &[String]) -> Result<usize> {
    let courses = load_sorted(path)?;
    let wanted: Vec<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();
    let before = courses.len();
    let remaining: Vec<CourseConfig> = courses
        .into_iter()
        .filter(|c| !wanted.contains(&c.name.to_lowercase()))
        .collect();
    let removed = before - remaining.len();
    if removed > 0 {
        overwrite_courses(path, &remaining)?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Collier Park Golf Course,https://bookings.collierparkgolf.com.au/guests/bookings/ViewPublicCalendar.msp?booking_resource_id=3000000,miclub,TRUE
Hamersley Golf Course,https://hamersley.quick18.com/teetimes/searchmatrix,Quick18

broken line,with-two-fields
Fremantle Golf Course,https://fremantlepublic.miclub.com.au/guests/bookings/ViewPublicCalendar.msp,miclub,false
Fremantle Again,https://fremantlepublic.miclub.com.au/guests/bookings/ViewPublicCalendar.msp,miclub,nope
";

    fn write_sample(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("config.txt");
        fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn parse_line_defaults_blacklist_to_false() {
        let c = parse_line("A, https://a.example ,quick18").unwrap();
        assert_eq!(c.name, "A");
        assert_eq!(c.url, "https://a.example");
        assert_eq!(c.website_type, "quick18");
        assert!(!c.blacklisted);
        assert!(parse_line("A,https://a.example,miclub,True").unwrap().blacklisted);
        assert!(!parse_line("A,https://a.example,miclub,yes").unwrap().blacklisted);
        assert!(parse_line("only,two").is_none());
        assert!(parse_line("a,https://a.example,miclub,true,extra").unwrap().blacklisted);
        assert_eq!(parse_line("a,https://a.example,miclub,false,x").unwrap().website_type, "miclub");
        assert!(parse_line("   ").is_none());
    }

    #[test]
    fn load_by_name_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let courses = load_courses(&write_sample(&dir)).unwrap();
        assert_eq!(courses.len(), 4);
        assert!(courses["Collier Park Golf Course"].blacklisted);
        assert_eq!(courses["Hamersley Golf Course"].website_type, "Quick18");
        assert!(!courses["Hamersley Golf Course"].blacklisted);
    }

    #[test]
    fn load_by_url_later_duplicate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let by_url = load_by_url(&write_sample(&dir)).unwrap();
        assert_eq!(by_url.len(), 3);
        let freo = &by_url["https://fremantlepublic.miclub.com.au/guests/bookings/ViewPublicCalendar.msp"];
        assert_eq!(freo.name, "Fremantle Again");
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_courses(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, FinderError::Config(_)));
    }

    #[test]
    fn append_then_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.txt");
        let a = parse_line("Fremantle Golf Course,https://f.example,miclub").unwrap();
        let b = parse_line("The Springs Golf Course,https://s.example,Quick18").unwrap();

        append_courses(&path, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Fremantle Golf Course,https://f.example,miclub,false\nThe Springs Golf Course,https://s.example,Quick18,false\n"
        );

        overwrite_courses(&path, &[b]).unwrap();
        let reloaded = load_courses(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains_key("The Springs Golf Course"));
    }

    #[test]
    fn select_courses_honours_blacklist_unless_named() {
        let dir = tempfile::tempdir().unwrap();
        let courses = load_courses(&write_sample(&dir)).unwrap();

        let all = select_courses(&courses, &[]).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|c| !c.blacklisted));

        let named = select_courses(&courses, &["collier park golf course".into(), " HAMERSLEY golf course ".into()]).unwrap();
        let names: Vec<&str> = named.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Collier Park Golf Course", "Hamersley Golf Course"]);

        let err = select_courses(&courses, &["Augusta".into()]).unwrap_err();
        assert!(matches!(err, FinderError::Validation(_)));
    }

    #[test]
    fn toggle_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir);

        assert!(toggle_blacklist(&path, "hamersley golf course").unwrap());
        assert!(load_courses(&path).unwrap()["Hamersley Golf Course"].blacklisted);
        assert!(!toggle_blacklist(&path, "Hamersley Golf Course").unwrap());

        assert_eq!(delete_courses(&path, &["Fremantle Again".into(), "Nowhere".into()]).unwrap(), 1);
        let left = load_courses(&path).unwrap();
        assert_eq!(left.len(), 2);
        assert!(!left.contains_key("Fremantle Again"));
    }
}
