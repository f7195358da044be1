//! Drop-announcement handling: trigger detection, the external OCR call,
//! and the streaming scan that matches OCR output against known cards.
//!
//! The bot's drop images are never read here; OCR is a remote collaborator
//! behind `WL_OCR_ENDPOINT`, and this module only drives it.

use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::db::{self, DropMessage};
use crate::matcher::{self, KnownCard};

const CONCURRENCY: usize = 4;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<@!?(\d+)>").unwrap());

/// Whether a message is one of the bot's drop announcements.
pub fn is_drop_trigger(content: &str) -> bool {
    content.ends_with("is dropping the cards") || content == "Your extra drop is being used."
}

/// User id of the dropper, from the first mention in the announcement.
/// Accepts both `<@123>` and `<@!123>` forms.
pub fn dropper_id(content: &str) -> Option<String> {
    MENTION_RE.captures(content).map(|c| c[1].to_string())
}

pub struct DropStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

struct OcrOutcome {
    message_id: String,
    guild_id: Option<String>,
    dropper_id: Option<String>,
    image_url: String,
    text: Option<String>,
    error: Option<String>,
    latency_ms: i64,
}

/// Run every pending drop through the OCR collaborator, saving each result
/// to the DB as it arrives.
pub async fn scan_drops(conn: &Connection, messages: Vec<DropMessage>) -> Result<DropStats> {
    let endpoint = std::env::var("WL_OCR_ENDPOINT")
        .map_err(|_| anyhow::anyhow!("WL_OCR_ENDPOINT environment variable must be set"))?;
    let client = Arc::new(
        reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?,
    );
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total = messages.len();

    let cards: Vec<KnownCard> = db::fetch_known_cards(conn)?
        .into_iter()
        .map(|(name, series)| KnownCard::new(name, series))
        .collect();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send OCR results, main loop matches and saves
    let (tx, mut rx) = tokio::sync::mpsc::channel::<OcrOutcome>(CONCURRENCY * 2);

    for m in messages {
        let client = Arc::clone(&client);
        let sem = Arc::clone(&semaphore);
        let endpoint = endpoint.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let dropper = dropper_id(&m.content);
            let start = Instant::now();
            let outcome = match ocr_with_retry(&client, &endpoint, &m.image_url).await {
                Ok(text) => OcrOutcome {
                    message_id: m.id,
                    guild_id: m.guild_id,
                    dropper_id: dropper,
                    image_url: m.image_url,
                    text: Some(text),
                    error: None,
                    latency_ms: start.elapsed().as_millis() as i64,
                },
                Err(e) => {
                    warn!("OCR failed for message {}: {}", m.id, e);
                    OcrOutcome {
                        message_id: m.id,
                        guild_id: m.guild_id,
                        dropper_id: dropper,
                        image_url: m.image_url,
                        text: None,
                        error: Some(e.to_string()),
                        latency_ms: start.elapsed().as_millis() as i64,
                    }
                }
            };
            let _ = tx.send(outcome).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;

    let mut insert_stmt = conn.prepare(
        "INSERT INTO drops (message_id, dropper_id, image_url, ocr_text, matched, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    let mut update_stmt = conn.prepare("UPDATE messages SET processed = 1 WHERE id = ?1")?;

    while let Some(r) = rx.recv().await {
        if r.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }

        if let Some(guild_id) = r.guild_id.as_deref() {
            let config = db::get_server_config(conn, guild_id, "_all")?;
            debug!(guild_id, found = config.is_some(), "server config lookup");
        }

        let matched = r.text.as_deref().map(|text| {
            let hits = matcher::match_text(&cards, text);
            let names: Vec<String> = hits
                .iter()
                .map(|c| format!("{} ({})", c.name, c.series))
                .collect();
            serde_json::to_string(&names).unwrap_or_default()
        });

        insert_stmt.execute(rusqlite::params![
            r.message_id, r.dropper_id, r.image_url, r.text, matched, r.error, r.latency_ms,
        ])?;
        update_stmt.execute(rusqlite::params![r.message_id])?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(DropStats { total, ok, errors })
}

async fn ocr_with_retry(
    client: &reqwest::Client,
    endpoint: &str,
    image_url: &str,
) -> Result<String> {
    let mut attempt = 0;
    loop {
        match ocr_extract(client, endpoint, image_url).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                let msg = e.to_string();
                let transient = msg.contains("429")
                    || msg.contains("500")
                    || msg.contains("502")
                    || msg.contains("503");
                if !transient || attempt == MAX_RETRIES {
                    return Err(e);
                }
                let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                warn!(
                    "OCR endpoint busy (attempt {}/{}), backing off {:.1}s",
                    attempt + 1,
                    MAX_RETRIES,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

/// POST the image URL to the OCR collaborator. Accepts either a JSON
/// `{"text": ...}` body or a plain-text one.
pub async fn ocr_extract(
    client: &reqwest::Client,
    endpoint: &str,
    image_url: &str,
) -> Result<String> {
    let response = client
        .post(endpoint)
        .json(&serde_json::json!({ "url": image_url }))
        .send()
        .await?
        .error_for_status()?;
    let body = response.text().await?;
    let text = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("text").and_then(|t| t.as_str()).map(str::to_string))
        .unwrap_or(body);
    Ok(text)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_predicates() {
        assert!(is_drop_trigger("<@123> is dropping the cards"));
        assert!(is_drop_trigger("Your extra drop is being used."));
        assert!(!is_drop_trigger("Your extra drop is being used. Enjoy!"));
        assert!(!is_drop_trigger("someone dropped their keys"));
    }

    #[test]
    fn mention_forms_both_resolve() {
        assert_eq!(
            dropper_id("<@123456789> is dropping the cards").as_deref(),
            Some("123456789")
        );
        assert_eq!(
            dropper_id("<@!123456789> is dropping the cards").as_deref(),
            Some("123456789")
        );
        assert_eq!(dropper_id("no mention here"), None);
    }
}
