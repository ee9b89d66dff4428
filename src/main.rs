mod catalog;
mod config;
mod errors;
mod flow;
mod net;
mod normalize;
mod prompt;
mod resolver;
mod sites;
mod slots;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::CourseConfig;
use crate::errors::FinderError;
use crate::net::Fetcher;
use crate::prompt::{SearchArgs, TermPrompter};
use crate::resolver::Mode;
use crate::sites::{AdapterSet, Sites, WebsiteType};

#[derive(Parser)]
#[command(
    name = "tee_finder",
    about = "Find open golf tee times across MiClub and Quick18 booking sites",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Date to search (DD-MM-YYYY)
    #[arg(short, long)]
    date: Option<String>,
    /// Preferred tee time (HH:MM, 24-hour); searches an hour either side
    #[arg(short, long)]
    time: Option<String>,
    /// Minimum open spots (1-4)
    #[arg(short, long)]
    spots: Option<u32>,
    /// Only search these courses (repeatable, case-insensitive)
    #[arg(short, long = "courses")]
    courses: Vec<String>,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Config file (default: <config dir>/tee_finder/config.txt)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configured golf courses
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Print version info
    Version,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Add a course
    Add {
        name: String,
        url: String,
        /// MiClub or Quick18
        website_type: String,
        #[arg(long)]
        blacklisted: bool,
        /// Replace the whole config with this course
        #[arg(short, long)]
        overwrite: bool,
    },
    /// Show all configured courses
    Show,
    /// Toggle whether a course is skipped by default
    Blacklist { name: String },
    /// Remove courses
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info,tee_finder=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = || match &cli.config {
        Some(path) => Ok(path.clone()),
        None => config::default_path(),
    };

    match cli.command {
        Some(Commands::Version) => {
            println!("{:<10} {}", "Name:", env!("CARGO_PKG_NAME"));
            println!("{:<10} {}", "Version:", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Config { action }) => run_config(action, &config_path()?),
        None => {
            let path = config_path()?;
            let args = SearchArgs {
                date: cli.date,
                time: cli.time,
                spots: cli.spots,
                courses: cli.courses,
            };
            search(args, &path).await
        }
    }
}

async fn search(mut args: SearchArgs, config_path: &Path) -> anyhow::Result<()> {
    let courses = config::load_courses(config_path)?;
    if courses.is_empty() {
        println!("No courses configured. Add some with `tee_finder config add`.");
        return Ok(());
    }

    let now = Local::now().naive_local();
    if args.needs_prompt() {
        let names: Vec<String> = courses.keys().cloned().collect();
        args.fill_missing(&names, now)?;
    }
    let request = args.into_request(now)?;
    let selected = config::select_courses(&courses, &request.course_names)?;
    if selected.is_empty() {
        println!("Every configured course is blacklisted. Name one with -c to search it anyway.");
        return Ok(());
    }

    let t0 = Instant::now();
    let fetcher = Fetcher::new().context("setting up the HTTP client")?;
    let adapters: Arc<dyn AdapterSet> = Arc::new(Sites::new(fetcher));

    println!(
        "Searching {} course(s) for {}...",
        selected.len(),
        request.criteria.date.format("%d-%m-%Y")
    );
    let pb = progress_bar(selected.len() as u64)?;
    let catalog = catalog::build(Arc::clone(&adapters), &selected, request.criteria.date, &pb).await;
    pb.finish_and_clear();

    if catalog.is_empty() {
        println!("{}", FinderError::NoAvailability("No available games found on the selected date.".into()));
        return Ok(());
    }

    let pb = if request.criteria.is_active() {
        println!("Checking {} game(s) against your filters...", catalog.len());
        progress_bar(catalog.len() as u64)?
    } else {
        ProgressBar::hidden()
    };
    let availability =
        resolver::resolve(adapters, catalog, request.criteria, &selected, &pb).await;
    pb.finish_and_clear();

    if availability.mode() == Mode::Eager && availability.catalog().is_empty() {
        println!(
            "{}",
            FinderError::NoAvailability("No available games found for the specified time range.".into())
        );
        return Ok(());
    }

    let elapsed = t0.elapsed();
    println!(
        "Found {} game(s) across {} categories in {}\n",
        availability.catalog().len(),
        availability.catalog().categories().count(),
        format_duration(elapsed)
    );

    let mut prompter = TermPrompter::new();
    flow::run(&availability, &mut prompter).await
}

fn run_config(action: ConfigCommand, path: &Path) -> anyhow::Result<()> {
    match action {
        ConfigCommand::Add {
            name,
            url,
            website_type,
            blacklisted,
            overwrite,
        } => {
            let site: WebsiteType = website_type.parse()?;
            let course = CourseConfig {
                name: name.trim().to_string(),
                url: url.trim().to_string(),
                website_type: site.to_string(),
                blacklisted,
            };
            if overwrite {
                config::overwrite_courses(path, &[course])?;
            } else {
                config::append_courses(path, &[course])?;
            }
            println!("Configuration saved!");
        }
        ConfigCommand::Show => {
            if !path.exists() {
                println!("No config file found. Add courses with `tee_finder config add`.");
                return Ok(());
            }
            let courses = config::load_sorted(path)?;
            if courses.is_empty() {
                println!("No courses found in the config.");
                return Ok(());
            }

            println!("{:>3} | {:<32} | {:<8} | {:<11} | {}", "#", "Course", "Type", "Blacklisted", "URL");
            println!("{}", "-".repeat(90));
            for (i, c) in courses.iter().enumerate() {
                println!(
                    "{:>3} | {:<32} | {:<8} | {:<11} | {}",
                    i + 1,
                    truncate(&c.name, 32),
                    c.website_type,
                    if c.blacklisted { "yes" } else { "" },
                    c.url
                );
            }
            println!("\n{} courses | {}", courses.len(), path.display());
        }
        ConfigCommand::Blacklist { name } => {
            if config::toggle_blacklist(path, &name)? {
                println!("'{}' is now blacklisted.", name);
            } else {
                println!("'{}' is no longer blacklisted.", name);
            }
        }
        ConfigCommand::Delete { names } => {
            let removed = config::delete_courses(path, &names)?;
            if removed == 0 {
                println!("No matching courses found.");
            } else {
                println!("Deleted {} course(s).", removed);
            }
        }
    }
    Ok(())
}

fn progress_bar(len: u64) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
