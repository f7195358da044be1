mod db;
mod discord;
mod dropwatch;
mod ingest;
mod matcher;
mod parser;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use parser::extract::Record;

#[derive(Parser)]
#[command(name = "wl_scraper", about = "Wishlist statistics scraper for card-bot embed dumps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest exported message dumps into the queue
    Ingest {
        /// JSON dump files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Classify stored embeds and upsert extracted records
    Process {
        /// Max messages to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Ingest + process in one pipeline
    Run {
        /// JSON dump files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Max messages to process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scan drop announcements through the OCR collaborator
    Drops {
        /// Max announcements to scan
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Get or set per-server configuration
    Config {
        guild_id: String,
        /// Config scope token
        #[arg(long, default_value = "_all")]
        scope: String,
        /// JSON value to store (omit to read)
        #[arg(long)]
        set: Option<String>,
    },
    /// Show ingest/extraction statistics
    Stats,
    /// Top wishlisted cards table
    Overview {
        /// Filter by series (substring match)
        #[arg(short, long)]
        series: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ingest { paths } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let counts = ingest::ingest_files(&conn, &paths)?;
            counts.print();
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let messages = db::fetch_unprocessed(&conn, limit)?;
            if messages.is_empty() {
                println!("No unprocessed messages. Run 'ingest' first.");
                return Ok(());
            }
            println!("Processing {} messages...", messages.len());
            let counts = process_messages(&conn, &messages)?;
            counts.print();
            Ok(())
        }
        Commands::Run { paths, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;

            // Phase 1: Ingest
            let ingested = ingest::ingest_files(&conn, &paths)?;
            ingested.print();

            // Phase 2: Process
            let t_process = Instant::now();
            let messages = db::fetch_unprocessed(&conn, limit)?;
            if messages.is_empty() {
                println!("Nothing to process (no eligible embeds in the dumps).");
                return Ok(());
            }
            println!("Processing {} messages...", messages.len());
            let counts = process_messages(&conn, &messages)?;
            println!("Processed in {:.1}s", t_process.elapsed().as_secs_f64());
            counts.print();
            Ok(())
        }
        Commands::Drops { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pending = db::fetch_pending_drops(&conn, limit)?;
            if pending.is_empty() {
                println!("No pending drop announcements with images.");
                return Ok(());
            }
            println!("Scanning {} drops (streaming to DB)...", pending.len());
            let stats = dropwatch::scan_drops(&conn, pending).await?;
            println!(
                "Done: {} scanned ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Config { guild_id, scope, set } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            match set {
                Some(value) => {
                    // Must be valid JSON before it lands in the store
                    serde_json::from_str::<serde_json::Value>(&value)?;
                    db::set_server_config(&conn, &guild_id, &scope, &value)?;
                    println!("Saved config for {} / {}", guild_id, scope);
                }
                None => match db::get_server_config(&conn, &guild_id, &scope)? {
                    Some(value) => println!("{}", value),
                    None => println!("No config for {} / {}", guild_id, scope),
                },
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Messages:    {}", s.messages);
            println!("Processed:   {}", s.processed);
            println!("Unprocessed: {}", s.unprocessed);
            println!("Cards:       {}", s.cards);
            println!("Series:      {}", s.series);
            println!("Characters:  {}", s.characters);
            println!("Row skips:   {}", s.skips);
            println!("Drops:       {}", s.drops);
            Ok(())
        }
        Commands::Overview { series, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, series.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No cards found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<32} | {:<24} | {:>6}",
                "#", "Card", "Series", "WL"
            );
            println!("{}", "-".repeat(74));
            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<32} | {:<24} | {:>6}",
                    i + 1,
                    truncate(&r.name, 32),
                    truncate(&r.series, 24),
                    r.wishlist
                );
            }
            println!("\n{} cards", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

#[derive(Default)]
struct ProcessCounts {
    cards: usize,
    series: usize,
    characters: usize,
    skips: usize,
    dropped: usize,
    errors: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Upserted {} cards, {} series, {} characters ({} rows skipped, {} truncated records dropped, {} embed errors).",
            self.cards, self.series, self.characters, self.skips, self.dropped, self.errors,
        );
    }
}

fn process_messages(
    conn: &rusqlite::Connection,
    messages: &[db::PendingMessage],
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;
    use tracing::warn;

    let pb = ProgressBar::new(messages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts::default();

    for chunk in messages.chunks(500) {
        // Pure classify+extract in parallel; DB writes stay on this thread.
        let results: Vec<_> = chunk
            .par_iter()
            .map(|m| {
                let extraction = match serde_json::from_str::<discord::Embed>(&m.embed_json) {
                    Ok(embed) => Some(parser::process_document(&embed.to_document())),
                    Err(e) => {
                        warn!("Bad embed JSON for message {}: {}", m.id, e);
                        None
                    }
                };
                (m.id.clone(), extraction)
            })
            .collect();

        let mut done = Vec::with_capacity(results.len());
        for (id, extraction) in results {
            match extraction {
                None => counts.errors += 1,
                Some(ex) => {
                    for record in &ex.records {
                        match record {
                            Record::Card(c) => {
                                if db::upsert_card(conn, c)? {
                                    counts.cards += 1;
                                } else {
                                    counts.dropped += 1;
                                }
                            }
                            Record::Series(s) => {
                                if db::upsert_series(conn, s)? {
                                    counts.series += 1;
                                } else {
                                    counts.dropped += 1;
                                }
                            }
                            Record::Character(c) => {
                                db::upsert_character(conn, c)?;
                                counts.characters += 1;
                            }
                        }
                    }
                    if !ex.skips.is_empty() {
                        db::save_skips(conn, &id, &ex.skips)?;
                        counts.skips += ex.skips.len();
                    }
                }
            }
            done.push(id);
        }
        db::mark_processed(conn, &done)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
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
