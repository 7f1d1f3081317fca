mod config;
mod db;
mod dedupe;
mod error;
mod import;
mod models;
mod scoring;
mod selector;
mod session;
mod startup;
mod tui;

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

use config::Config;
use error::retry_once;
use models::{Card, CardFilter, CreateOutcome, FilterMode, JsonOutput, NewCard, Topic};

#[derive(Parser)]
#[command(name = "cardhub")]
#[command(about = "Flashcard study hub with shuffled, filtered study sessions")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the card store (runs legacy migration and duplicate cleanup)
    Init,

    /// Add a single card
    Add {
        /// Topic (Physics, Chemistry, Biology, Higher Math, General Math, English, ICT, BGS)
        topic: String,

        /// Subtopic name
        subtopic: String,

        /// Question text
        question: String,

        /// Answer text
        answer: String,
    },

    /// Add many cards from "Question -!- Answer" lines (file or stdin)
    Bulk {
        topic: String,

        subtopic: String,

        /// Read lines from this file instead of stdin
        #[arg(long, short)]
        file: Option<PathBuf>,
    },

    /// Manage subtopics
    #[command(subcommand)]
    Subtopic(SubtopicCommands),

    /// List cards
    List {
        /// Filter by topic
        #[arg(long, short)]
        topic: Option<String>,

        /// Filter by subtopic (requires --topic)
        #[arg(long, short, requires = "topic")]
        subtopic: Option<String>,

        /// Narrow to all/wrong/right/bookmarked cards
        #[arg(long, short, default_value = "all")]
        filter: String,
    },

    /// Show one card
    Show {
        /// Card ID
        id: i64,
    },

    /// List every topic and subtopic with card counts
    Library,

    /// Delete a card by ID
    Delete {
        /// Card ID
        id: i64,
    },

    /// Bookmark a card
    Bookmark {
        /// Card ID
        id: i64,

        /// Remove the bookmark instead
        #[arg(long)]
        clear: bool,
    },

    /// Show bookmarked cards of a subtopic
    Bookmarks { topic: String, subtopic: String },

    /// Collapse cards sharing topic, subtopic and question
    Dedupe {
        /// Only report duplicate groups
        #[arg(long)]
        dry_run: bool,
    },

    /// Migrate a legacy CSV file into the store
    Import {
        /// CSV file with Subject/Topic/Key/Value columns
        path: PathBuf,
    },

    /// Export cards as CSV
    Export {
        #[arg(long, short)]
        topic: Option<String>,

        #[arg(long, short, requires = "topic")]
        subtopic: Option<String>,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Write an edited export back, replacing a subtopic (or everything)
    Apply {
        /// CSV file in the export format; rows without an id get a new one
        file: PathBuf,

        #[arg(long, short, requires = "subtopic", conflicts_with = "all")]
        topic: Option<String>,

        #[arg(long, short, requires = "topic")]
        subtopic: Option<String>,

        /// Replace the whole store with the file's rows
        #[arg(long)]
        all: bool,
    },

    /// Show study statistics
    Stats,

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum SubtopicCommands {
    /// Create a subtopic seeded with a placeholder card
    Add { topic: String, name: String },

    /// Delete every card in a subtopic
    Delete { topic: String, name: String },

    /// Zero the success/failure counters of a subtopic
    Reset { topic: String, name: String },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            let out = JsonOutput::<()>::err(e.to_string());
            println!("{}", serde_json::to_string(&out).unwrap_or_default());
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let startup = startup::initialize(&config)?;
    let db = startup.db;

    match cli.command {
        Commands::Init => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "path": config.db_path(),
                        "duplicates_removed": startup.duplicates_removed,
                        "legacy": startup.legacy,
                        "legacy_error": startup.legacy_error,
                    })))?
                );
            } else {
                println!("Card store initialized at: {}", config.db_path().display());
                if let Some(legacy) = &startup.legacy {
                    println!(
                        "Migrated {} legacy cards ({} skipped); original moved to {}",
                        legacy.migrated,
                        legacy.skipped,
                        legacy.archived_to.display()
                    );
                }
                if let Some(error) = &startup.legacy_error {
                    eprintln!("Warning: legacy CSV not migrated: {}", error);
                }
                if startup.duplicates_removed > 0 {
                    println!("Removed {} duplicate cards.", startup.duplicates_removed);
                }
            }
        }

        Commands::Add {
            topic,
            subtopic,
            question,
            answer,
        } => {
            let card = NewCard::new(Topic::parse(&topic)?, subtopic.trim(), question, answer);
            let outcome = retry_once(|| db.create(&card))?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(outcome))?);
            } else {
                match outcome {
                    CreateOutcome::Added(id) => println!("Added card with ID: {}", id),
                    CreateOutcome::Skipped => println!("Card already exists, skipped."),
                }
            }
        }

        Commands::Bulk {
            topic,
            subtopic,
            file,
        } => {
            let topic = Topic::parse(&topic)?;
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let cards = import::parse_bulk_text(&text, topic, subtopic.trim());
            let outcome = retry_once(|| db.bulk_create(&cards))?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(outcome))?);
            } else {
                println!(
                    "Added {} cards, skipped {} duplicates.",
                    outcome.added, outcome.skipped
                );
            }
        }

        Commands::Subtopic(cmd) => match cmd {
            SubtopicCommands::Add { topic, name } => {
                let topic = Topic::parse(&topic)?;
                let outcome = retry_once(|| db.create_subtopic(topic, name.trim()))?;

                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(outcome))?);
                } else if matches!(outcome, CreateOutcome::Skipped) {
                    println!("Subtopic '{}' already exists.", name.trim());
                } else {
                    println!("Created subtopic '{}' under {}.", name.trim(), topic);
                }
            }

            SubtopicCommands::Delete { topic, name } => {
                let topic = Topic::parse(&topic)?;
                let removed = retry_once(|| db.delete_by_subtopic(topic, &name))?;

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "removed": removed
                        })))?
                    );
                } else {
                    println!("Deleted {} cards from {} / {}.", removed, topic, name);
                }
            }

            SubtopicCommands::Reset { topic, name } => {
                let topic = Topic::parse(&topic)?;
                let reset = retry_once(|| db.reset_counters(topic, &name))?;

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "reset": reset
                        })))?
                    );
                } else {
                    println!("Reset stats for {} cards.", reset);
                }
            }
        },

        Commands::List {
            topic,
            subtopic,
            filter,
        } => {
            let mode = FilterMode::parse(&filter)?;
            let card_filter = build_filter(topic.as_deref(), subtopic)?;
            let cards = selector::filter_cards(db.query(&card_filter)?, mode);

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&cards))?);
            } else if cards.is_empty() {
                println!("No cards found.");
            } else {
                print_cards(&cards);
            }
        }

        Commands::Show { id } => {
            let card = db.get_card(id)?.ok_or(error::Error::NotFound(id))?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&card))?);
            } else {
                println!("=== Card {} ===", card.id);
                println!("Topic: {} / {}", card.topic, card.subtopic);
                println!("Q: {}", card.question);
                println!("A: {}", card.answer);
                println!(
                    "Right: {}  Wrong: {}  Accuracy: {:.0}%",
                    card.success_count,
                    card.failure_count,
                    card.accuracy()
                );
                if card.bookmarked {
                    println!("Bookmarked");
                }
            }
        }

        Commands::Library => {
            let library = db.library()?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&library))?);
            } else if library.is_empty() {
                println!("Library is empty. Add a subtopic first!");
            } else {
                println!(
                    "{:<14} {:<30} {:>6} {:>6} {:>9}",
                    "TOPIC", "SUBTOPIC", "CARDS", "MARKED", "ACCURACY"
                );
                println!("{}", "-".repeat(70));
                for entry in library {
                    println!(
                        "{:<14} {:<30} {:>6} {:>6} {:>8.0}%",
                        entry.topic.as_str(),
                        truncate(&entry.subtopic, 28),
                        entry.card_count,
                        entry.bookmarked_count,
                        entry.accuracy()
                    );
                }
            }
        }

        Commands::Delete { id } => {
            retry_once(|| db.delete_by_id(id))?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Card {} deleted.", id);
            }
        }

        Commands::Bookmark { id, clear } => {
            retry_once(|| db.set_bookmark(id, !clear))?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else if clear {
                println!("Bookmark removed from card {}.", id);
            } else {
                println!("Card {} bookmarked.", id);
            }
        }

        Commands::Bookmarks { topic, subtopic } => {
            let cards = db.bookmarks(Topic::parse(&topic)?, &subtopic)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&cards))?);
            } else if cards.is_empty() {
                println!("No bookmarked cards.");
            } else {
                for card in cards {
                    println!("[{}] {}", card.id, card.question);
                    println!("      {}", card.answer);
                }
            }
        }

        Commands::Dedupe { dry_run } => {
            if dry_run {
                let groups = dedupe::find_duplicates(&db)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&groups))?);
                } else if groups.is_empty() {
                    println!("No duplicate cards.");
                } else {
                    for group in groups {
                        println!(
                            "{} / {} / {}: keep {}, drop {:?}",
                            group.topic,
                            group.subtopic,
                            truncate(&group.question, 40),
                            group.kept_id,
                            group.duplicate_ids
                        );
                    }
                }
            } else {
                let removed = retry_once(|| dedupe::resolve_duplicates(&db))?;
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "removed": removed
                        })))?
                    );
                } else {
                    println!("Removed {} duplicate cards.", removed);
                }
            }
        }

        Commands::Import { path } => {
            let legacy = import::import_legacy_csv(&db, &path)?;
            let removed = retry_once(|| dedupe::resolve_duplicates(&db))?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "import": legacy,
                        "duplicates_removed": removed
                    })))?
                );
            } else {
                println!(
                    "Imported {} cards ({} skipped, {} duplicates removed).",
                    legacy.migrated, legacy.skipped, removed
                );
                println!("Original moved to {}", legacy.archived_to.display());
            }
        }

        Commands::Export {
            topic,
            subtopic,
            output,
        } => {
            let cards = db.query(&build_filter(topic.as_deref(), subtopic)?)?;
            let written = match &output {
                Some(path) => import::export_csv(&cards, std::fs::File::create(path)?)?,
                None => import::export_csv(&cards, std::io::stdout().lock())?,
            };
            if let Some(path) = output {
                eprintln!("Exported {} cards to {}", written, path.display());
            }
        }

        Commands::Apply {
            file,
            topic,
            subtopic,
            all,
        } => {
            let (rows, skipped) = import::read_edited_csv(std::fs::File::open(&file)?)?;
            let written = match (topic, subtopic) {
                (Some(topic), Some(subtopic)) => {
                    let topic = Topic::parse(&topic)?;
                    retry_once(|| db.replace_subtopic(topic, &subtopic, &rows))?
                }
                _ if all => retry_once(|| db.replace_all(&rows))?,
                _ => return Err("pass --topic and --subtopic, or --all".into()),
            };

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "written": written,
                        "skipped": skipped
                    })))?
                );
            } else {
                println!("Wrote {} cards ({} rows skipped).", written, skipped);
            }
        }

        Commands::Stats => {
            let stats = db.stats()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&stats))?);
            } else {
                println!("=== Study Statistics ===");
                println!("Total cards: {}", stats.total_cards);
                println!("Subtopics: {}", stats.total_subtopics);
                println!("Right answers: {}", stats.total_success);
                println!("Wrong answers: {}", stats.total_failure);
                println!(
                    "Accuracy: {:.1}%",
                    scoring::accuracy_percent(
                        stats.total_success as u64,
                        stats.total_failure as u64
                    )
                );
                println!("Bookmarked: {}", stats.bookmarked);
            }
        }

        Commands::Tui => {
            tui::run(db, &config)?;
        }
    }

    Ok(())
}

fn build_filter(topic: Option<&str>, subtopic: Option<String>) -> error::Result<CardFilter> {
    let filter = match (topic.map(Topic::parse).transpose()?, subtopic) {
        (Some(topic), Some(subtopic)) => CardFilter::subtopic(topic, subtopic),
        (Some(topic), None) => CardFilter::topic(topic),
        (None, _) => CardFilter::all(),
    };
    Ok(filter)
}

fn print_cards(cards: &[Card]) {
    println!(
        "{:<5} {:<12} {:<20} {:<36} {:>4} {:>4} {:>5}",
        "ID", "TOPIC", "SUBTOPIC", "QUESTION", "OK", "MISS", "ACC"
    );
    println!("{}", "-".repeat(94));
    for card in cards {
        let marker = if card.bookmarked { "*" } else { " " };
        println!(
            "{:<5} {:<12} {:<20} {:<36} {:>4} {:>4} {:>4.0}%{}",
            card.id,
            card.topic.as_str(),
            truncate(&card.subtopic, 18),
            truncate(&card.question, 34),
            card.success_count,
            card.failure_count,
            card.accuracy(),
            marker
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
