use std::fmt;

use chrono::{DateTime, Utc};
use course_core::model::{CourseId, LearnerId, NodeId};
use storage::repository::{ProgressRecordRow, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    learner: String,
    course: String,
    leaves: Vec<String>,
    visited: Option<String>,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    EmptyLeaves,
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::EmptyLeaves => write!(f, "--leaves requires at least one id"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("COURSE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut learner =
            std::env::var("COURSE_LEARNER").unwrap_or_else(|_| "demo-learner".into());
        let mut course = std::env::var("COURSE_ID").unwrap_or_else(|_| "ap-statistics".into());
        let mut leaves: Vec<String> = vec!["1.1".into(), "1.2".into(), "1.3".into()];
        let mut visited = None;
        let mut now = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => db_url = require_value(&mut args, "--db")?,
                "--learner" => learner = require_value(&mut args, "--learner")?,
                "--course" => course = require_value(&mut args, "--course")?,
                "--leaves" => {
                    let value = require_value(&mut args, "--leaves")?;
                    leaves = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                        .collect();
                    if leaves.is_empty() {
                        return Err(ArgsError::EmptyLeaves);
                    }
                }
                "--visited" => visited = Some(require_value(&mut args, "--visited")?),
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            learner,
            course,
            leaves,
            visited,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --learner <id>        Learner id to seed (default: demo-learner)");
    eprintln!("  --course <id>         Course id to seed (default: ap-statistics)");
    eprintln!("  --leaves <a,b,c>      Comma-separated completed leaf ids (default: 1.1,1.2,1.3)");
    eprintln!("  --visited <id>        Last-visited leaf id (default: last of --leaves)");
    eprintln!("  --now <rfc3339>       Fixed timestamp for deterministic seeding");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  COURSE_DB_URL, COURSE_LEARNER, COURSE_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let visited = args
        .visited
        .clone()
        .or_else(|| args.leaves.last().cloned());

    let row = ProgressRecordRow {
        learner_id: LearnerId::new(args.learner.clone()),
        course_id: CourseId::new(args.course.clone()),
        completed_leaf_ids: args.leaves.iter().map(|s| NodeId::new(s.as_str())).collect(),
        last_visited_id: visited.map(NodeId::new),
        updated_at: now,
    };
    storage.progress.upsert(row).await?;

    println!(
        "Seeded progress for learner {} on course {} ({} completed leaves) into {}",
        args.learner,
        args.course,
        args.leaves.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
