//! Load exported message dumps and keep only the messages worth processing.
//!
//! The classifier doubles as the ingest gate: a message is stored only if
//! its first embed matches a known layout, or if it is a drop announcement.
//! Everything else never enters the queue.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::db::{self, MessageRow};
use crate::discord::{Dump, Message};
use crate::dropwatch;
use crate::parser::layout::{self, Layout};

#[derive(Default)]
pub struct IngestCounts {
    pub files: usize,
    pub messages: usize,
    pub eligible: usize,
    pub inserted: usize,
}

impl IngestCounts {
    pub fn print(&self) {
        println!(
            "Ingested {} files: {} messages, {} eligible, {} new.",
            self.files, self.messages, self.eligible, self.inserted
        );
    }
}

pub fn ingest_files(conn: &Connection, paths: &[PathBuf]) -> Result<IngestCounts> {
    let mut counts = IngestCounts::default();
    for path in paths {
        let messages =
            load_dump(path).with_context(|| format!("reading dump {}", path.display()))?;
        let rows: Vec<MessageRow> = messages.iter().filter_map(eligible_row).collect();
        info!(
            file = %path.display(),
            messages = messages.len(),
            eligible = rows.len(),
            "loaded dump"
        );
        counts.files += 1;
        counts.messages += messages.len();
        counts.eligible += rows.len();
        counts.inserted += db::insert_messages(conn, &rows)?;
    }
    Ok(counts)
}

pub fn load_dump(path: &Path) -> Result<Vec<Message>> {
    let raw = fs::read_to_string(path)?;
    let dump: Dump = serde_json::from_str(&raw)?;
    Ok(dump.into_messages())
}

fn eligible_row(message: &Message) -> Option<MessageRow> {
    let embed = message.first_embed();
    let layout = embed
        .map(|e| layout::classify(&e.to_document()))
        .unwrap_or(Layout::NoMatch);

    let layout_tag = if layout != Layout::NoMatch {
        layout.as_str()
    } else if dropwatch::is_drop_trigger(&message.content) {
        "drop"
    } else {
        return None;
    };

    let embed_json = if layout != Layout::NoMatch {
        embed.and_then(|e| serde_json::to_string(e).ok())
    } else {
        None
    };

    Some(MessageRow {
        id: message.id.clone(),
        channel_id: message.channel_id.clone(),
        guild_id: message.guild_id.clone(),
        content: message.content.clone(),
        timestamp: message.timestamp.map(|t| t.to_rfc3339()),
        layout: layout_tag.to_string(),
        embed_json,
        attachment_url: message.first_attachment_url().map(str::to_string),
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract::Record;
    use crate::parser::process_document;

    fn fixture(name: &str) -> Vec<Message> {
        load_dump(Path::new(&format!("tests/fixtures/{}.json", name))).unwrap()
    }

    #[test]
    fn wrapped_dump_decodes() {
        let messages = fixture("wishlist_sort");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn bare_array_dump_decodes() {
        let messages = fixture("profile");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn gate_drops_unclassified_messages() {
        let messages = fixture("wishlist_sort");
        let rows: Vec<MessageRow> = messages.iter().filter_map(eligible_row).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].layout, "wishlist_sort");
        assert!(rows[0].embed_json.is_some());
    }

    #[test]
    fn gate_keeps_drop_announcements_without_embeds() {
        let messages = fixture("profile");
        let rows: Vec<MessageRow> = messages.iter().filter_map(eligible_row).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].layout, "character_profile");
        assert_eq!(rows[1].layout, "drop");
        assert!(rows[1].embed_json.is_none());
        assert!(rows[1].attachment_url.is_some());
    }

    #[test]
    fn fixture_end_to_end_extraction() {
        let messages = fixture("wishlist_sort");
        let doc = messages[0].first_embed().unwrap().to_document();
        let out = process_document(&doc);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.skips.len(), 1);
        match &out.records[0] {
            Record::Card(c) => {
                assert_eq!(c.wishlist, 12);
                assert_eq!(c.name, "Aria");
                assert_eq!(c.series, "Skyline");
            }
            other => panic!("expected a card, got {:?}", other),
        }
    }

    #[test]
    fn profile_fixture_yields_one_character() {
        let messages = fixture("profile");
        let doc = messages[0].first_embed().unwrap().to_document();
        let out = process_document(&doc);
        assert_eq!(out.records.len(), 1);
        assert!(matches!(out.records[0], Record::Character(_)));
    }
}
