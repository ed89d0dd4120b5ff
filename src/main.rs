use std::cell::RefCell;
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use timetally::aggregate::{
    DateRange, EntryFilter, filter_entries, group_by_day, group_by_project, total_duration,
};
use timetally::auth::UserSession;
use timetally::domain::{Project, format_clock, format_duration, round_minutes};
use timetally::paths::resolve_workspace_path;
use timetally::session::Tracker;
use timetally::storage::JsonStore;
use timetally::validator::{ManualEntryDraft, OverlapPolicy, validate};

#[derive(Debug, Parser)]
#[command(name = "timetally", about = "Project time tracking from the terminal")]
struct Cli {
    /// Workspace file (defaults to TIMETALLY_DATA or the platform data dir)
    #[arg(long)]
    data: Option<PathBuf>,
    /// Owner scope for every query and mutation
    #[arg(long, default_value = "local")]
    user: String,
    #[arg(long, short)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    AddProject {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "#3B82F6")]
        color: String,
    },
    Projects,
    Pin {
        project: String,
    },
    Unpin {
        project: String,
    },
    RemoveProject {
        project: String,
    },
    Start {
        project: String,
    },
    Stop,
    Switch {
        project: String,
    },
    Status,
    Describe {
        text: String,
    },
    Log {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Reject the entry when it overlaps an existing one
        #[arg(long)]
        strict_overlap: bool,
    },
    Entries {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        day: Option<String>,
    },
    Summary {
        #[arg(long)]
        day: Option<String>,
        /// Per-day totals for the trailing week instead of one day
        #[arg(long)]
        week: bool,
    },
    Retime {
        entry: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    RemoveEntry {
        entry: String,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    setup_logger(cli.verbose)?;

    let path = resolve_workspace_path(cli.data);
    let store = Rc::new(RefCell::new(JsonStore::open(&path)?));
    let session = UserSession::new(cli.user.clone(), format!("{}@localhost", cli.user));
    let mut tracker = Tracker::new(store, session)?;

    match cli.command {
        Command::AddProject { name, color } => {
            let project = tracker.create_project(&name, &color)?;
            println!("created project {} ({})", project.name, project.id);
        }
        Command::Projects => {
            print_projects(&tracker)?;
        }
        Command::Pin { project } => {
            let id = resolve_project(&tracker, &project)?;
            tracker.set_pinned(&id, true)?;
            println!("pinned {project}");
        }
        Command::Unpin { project } => {
            let id = resolve_project(&tracker, &project)?;
            tracker.set_pinned(&id, false)?;
            println!("unpinned {project}");
        }
        Command::RemoveProject { project } => {
            let id = resolve_project(&tracker, &project)?;
            tracker.delete_project(&id)?;
            println!("removed project {project}");
        }
        Command::Start { project } => {
            let id = resolve_project(&tracker, &project)?;
            let entry = tracker.start_tracking(&id, Utc::now())?;
            println!(
                "tracking {} since {}",
                project,
                entry.start_time.with_timezone(&Local).format("%H:%M:%S")
            );
        }
        Command::Stop => {
            let entry = tracker.stop_tracking(Utc::now())?;
            let minutes = round_minutes(entry.duration_ms(Utc::now()));
            println!("stopped after {}", format_duration(minutes));
        }
        Command::Switch { project } => {
            let id = resolve_project(&tracker, &project)?;
            tracker.switch_tracking(&id, Utc::now())?;
            println!("now tracking {project}");
        }
        Command::Status => {
            print_status(&tracker)?;
        }
        Command::Describe { text } => {
            tracker.update_active_description(&text)?;
            println!("description updated");
        }
        Command::Log {
            project,
            start,
            end,
            description,
            strict_overlap,
        } => {
            let project_id = match &project {
                Some(reference) => Some(resolve_project(&tracker, reference)?),
                None => None,
            };
            let draft = ManualEntryDraft {
                project_id,
                start_time: start.as_deref().map(parse_datetime).transpose()?,
                end_time: end.as_deref().map(parse_datetime).transpose()?,
                description,
            };
            let policy = if strict_overlap {
                OverlapPolicy::Reject
            } else {
                OverlapPolicy::Allow
            };
            let now = Utc::now();
            let owner = tracker.session().user_id.clone();
            let projects = tracker.projects()?;
            let entries = tracker.entries();
            match validate(&draft, &owner, &projects, &entries, policy, now) {
                Ok(shaped) => {
                    let entry = tracker.log_entry(shaped)?;
                    let minutes = round_minutes(entry.duration_ms(now));
                    println!("recorded {}", format_duration(minutes));
                }
                Err(errors) => {
                    for error in &errors {
                        eprintln!("  - {error}");
                    }
                    return Err("manual entry is invalid".into());
                }
            }
        }
        Command::Entries {
            search,
            project,
            day,
        } => {
            let project_id = match &project {
                Some(reference) => Some(resolve_project(&tracker, reference)?),
                None => None,
            };
            let filter = EntryFilter {
                search_term: search,
                project_id,
                range: day.as_deref().map(parse_day).transpose()?.map(DateRange::day),
            };
            print_entries(&tracker, &filter)?;
        }
        Command::Summary { day, week } => {
            if week {
                print_week_summary(&tracker)?;
            } else {
                let day = match day.as_deref() {
                    Some(raw) => parse_day(raw)?,
                    None => Local::now().date_naive(),
                };
                print_day_summary(&tracker, day)?;
            }
        }
        Command::Retime { entry, start, end } => {
            if start.is_none() && end.is_none() {
                return Err("pass --start and/or --end".into());
            }
            let start = start.as_deref().map(parse_datetime).transpose()?;
            let end = end.as_deref().map(parse_datetime).transpose()?;
            tracker.retime_entry(&entry, start, end, Utc::now())?;
            println!("entry re-timed");
        }
        Command::RemoveEntry { entry } => {
            tracker.delete_entry(&entry)?;
            println!("removed entry {entry}");
        }
    }

    Ok(())
}

fn setup_logger(verbose: bool) -> Result<(), log::SetLoggerError> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{} {}] {message}", record.level(), record.target()))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

/// Accepts a project id or a (case-insensitive) project name.
fn resolve_project(
    tracker: &Tracker<JsonStore>,
    reference: &str,
) -> Result<String, Box<dyn Error>> {
    let projects = tracker.projects()?;
    if let Some(project) = projects.iter().find(|project| project.id == reference) {
        return Ok(project.id.clone());
    }
    if let Some(project) = projects
        .iter()
        .find(|project| project.name.eq_ignore_ascii_case(reference))
    {
        return Ok(project.id.clone());
    }
    Err(format!("no project matches '{reference}'").into())
}

fn print_projects(tracker: &Tracker<JsonStore>) -> Result<(), Box<dyn Error>> {
    let projects = tracker.projects()?;
    if projects.is_empty() {
        println!("no projects yet");
        return Ok(());
    }
    for project in &projects {
        let pin = if project.is_pinned { "*" } else { " " };
        println!("{pin} {} | {} | {}", project.id, project.color, project.name);
    }
    Ok(())
}

fn print_status(tracker: &Tracker<JsonStore>) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    match tracker.active_entry() {
        Some(entry) => {
            let project_name = project_name(&tracker.projects()?, &entry.project_id);
            let elapsed = tracker.elapsed(now).unwrap_or_default();
            println!("tracking {project_name} for {elapsed}");
            println!(
                "  started {} ({})",
                entry.start_time.with_timezone(&Local).format("%H:%M:%S"),
                format_clock(entry.effective_end(now) - entry.start_time)
            );
            if let Some(description) = &entry.description {
                println!("  note: {description}");
            }
        }
        None => println!("no session running"),
    }
    Ok(())
}

fn print_entries(
    tracker: &Tracker<JsonStore>,
    filter: &EntryFilter,
) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    let projects = tracker.projects()?;
    let entries = tracker.entries();
    let matched = filter_entries(&entries, &projects, filter, now);
    if matched.is_empty() {
        println!("no entries");
        return Ok(());
    }

    for entry in &matched {
        let start = entry.start_time.with_timezone(&Local).format("%m-%d %H:%M");
        let end = match entry.end_time {
            Some(end) => end.with_timezone(&Local).format("%H:%M").to_string(),
            None => "now".to_string(),
        };
        let minutes = round_minutes(entry.duration_ms(now).max(0));
        println!(
            "{} | {} ~ {} | {} | {}{}",
            entry.id,
            start,
            end,
            format_duration(minutes),
            project_name(&projects, &entry.project_id),
            entry
                .description
                .as_deref()
                .map(|text| format!(" | {text}"))
                .unwrap_or_default()
        );
    }
    println!(
        "total: {}",
        format_duration(round_minutes(total_duration(&matched, now)))
    );
    Ok(())
}

fn print_day_summary(tracker: &Tracker<JsonStore>, day: NaiveDate) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    let projects = tracker.projects()?;
    let entries = tracker.entries();
    let filter = EntryFilter {
        range: Some(DateRange::day(day)),
        ..EntryFilter::default()
    };
    let for_day = filter_entries(&entries, &projects, &filter, now);

    println!("summary for {}", day.format("%Y-%m-%d"));
    if for_day.is_empty() {
        println!("no tracked time");
        return Ok(());
    }

    let mut rows: Vec<(String, i64)> = group_by_project(&for_day, now)
        .into_iter()
        .map(|(project_id, minutes)| (project_name(&projects, &project_id), minutes))
        .collect();
    rows.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
    for (name, minutes) in rows {
        println!("{:>8} | {}", format_duration(minutes), name);
    }
    println!(
        "{:>8} | total",
        format_duration(round_minutes(total_duration(&for_day, now)))
    );
    Ok(())
}

fn print_week_summary(tracker: &Tracker<JsonStore>) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    let projects = tracker.projects()?;
    let entries = tracker.entries();
    let days = group_by_day(&entries, &projects, now);

    let today = Local::now().date_naive();
    let mut cursor = today - chrono::Duration::days(6);
    while cursor <= today {
        match days.get(&cursor) {
            Some(total) => println!(
                "{} | {:>8} | {}",
                cursor.format("%a %m-%d"),
                format_duration(round_minutes(total.total_ms)),
                total.project_colors.join(" ")
            ),
            None => println!("{} | {:>8} |", cursor.format("%a %m-%d"), "0m"),
        }
        cursor = cursor.succ_opt().expect("next day should exist");
    }
    Ok(())
}

fn project_name(projects: &[Project], project_id: &str) -> String {
    projects
        .iter()
        .find(|project| project.id == project_id)
        .map(|project| project.name.clone())
        .unwrap_or_else(|| "Unknown project".to_string())
}

fn parse_datetime(input: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
    Ok(DateTime::parse_from_rfc3339(input)?.with_timezone(&Utc))
}

fn parse_day(input: &str) -> Result<NaiveDate, Box<dyn Error>> {
    Ok(NaiveDate::parse_from_str(input, "%Y-%m-%d")?)
}
