use std::fmt;

use chrono::{DateTime, Duration, Utc};

use storage::repository::{
    ProgressRepository, ReviewLogRecord, ReviewPersistence, SettingsRepository, Storage,
};
use vocab_core::model::{CardId, ReviewQuality, StudyDirection, StudySettings};
use vocab_core::scheduler::Scheduler;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    cards: u32,
    reviewed: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCards { raw: String },
    InvalidReviewed { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCards { raw } => write!(f, "invalid --cards value: {raw}"),
            ArgsError::InvalidReviewed { raw } => write!(f, "invalid --reviewed value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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
            std::env::var("VOCAB_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut cards = std::env::var("VOCAB_CARDS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(20);
        let mut reviewed = std::env::var("VOCAB_REVIEWED")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(5);
        let mut now = None;

        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--db" => {
                    let raw = require_value(&mut iter, "--db")?;
                    if !raw.starts_with("sqlite:") {
                        return Err(ArgsError::InvalidDbUrl { raw });
                    }
                    db_url = raw;
                }
                "--cards" => {
                    let raw = require_value(&mut iter, "--cards")?;
                    cards = raw
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidCards { raw })?;
                }
                "--reviewed" => {
                    let raw = require_value(&mut iter, "--reviewed")?;
                    reviewed = raw
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidReviewed { raw })?;
                }
                "--now" => {
                    let raw = require_value(&mut iter, "--now")?;
                    now = Some(
                        DateTime::parse_from_rfc3339(&raw)
                            .map(|t| t.with_timezone(&Utc))
                            .map_err(|_| ArgsError::InvalidNow { raw })?,
                    );
                }
                "-h" | "--help" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => return Err(ArgsError::UnknownArg(other.to_string())),
            }
        }

        Ok(Self {
            db_url,
            cards,
            reviewed,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage: seed [--db sqlite:URL] [--cards N] [--reviewed N] [--now RFC3339]");
    eprintln!();
    eprintln!("Seeds a development database with progress records.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db sqlite:URL     Database URL (default sqlite:dev.sqlite3)");
    eprintln!("  --cards N           Number of learning-phase records (default 20)");
    eprintln!("  --reviewed N        How many of them are graduated and overdue (default 5)");
    eprintln!("  --now RFC3339       Seed relative to this timestamp instead of now");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  VOCAB_DB_URL, VOCAB_CARDS, VOCAB_REVIEWED");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let scheduler = Scheduler::new();

    storage
        .settings
        .save_settings(&StudySettings::default())
        .await?;

    let mut position = 0_u32;
    for i in 0..args.cards {
        let card_id = CardId::new(u64::from(i + 1));
        let direction = if i % 2 == 0 {
            StudyDirection::Forward
        } else {
            StudyDirection::Reverse
        };

        if i < args.reviewed {
            // Graduate with three Easy responses a few days back so the
            // record shows up as an overdue review.
            let mut at = now - Duration::days(3);
            let mut progress = scheduler.synthesize(card_id, direction, position, at);
            for _ in 0..3 {
                let applied = scheduler.apply_review(&progress, ReviewQuality::Easy, position, at);
                let log = ReviewLogRecord::from_applied(ReviewQuality::Easy, &applied, at);
                storage.reviews.apply_review(&applied.progress, log).await?;
                progress = applied.progress;
                at += Duration::hours(1);
            }
        } else {
            position += 1;
            let progress = scheduler.synthesize(card_id, direction, position - 1, now);
            storage.progress.upsert_progress(&progress).await?;
        }
    }

    println!(
        "Seeded {} records ({} graduated) into {}",
        args.cards, args.reviewed, args.db_url
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
