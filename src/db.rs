use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::parser::extract::{CardRecord, CharacterRecord, RowSkip, SeriesRecord};

const DB_PATH: &str = "data/wl.sqlite";

pub fn connect() -> Result<Connection> {
    std::fs::create_dir_all("data")?;
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id             TEXT PRIMARY KEY,
            channel_id     TEXT,
            guild_id       TEXT,
            content        TEXT NOT NULL DEFAULT '',
            timestamp      TEXT,
            layout         TEXT NOT NULL,
            embed_json     TEXT,
            attachment_url TEXT,
            processed      BOOLEAN NOT NULL DEFAULT 0,
            ingested_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_messages_queue ON messages(processed, layout);

        -- Extracted records
        CREATE TABLE IF NOT EXISTS cards (
            id         INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            series     TEXT NOT NULL,
            wishlist   INTEGER NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(name, series)
        );
        CREATE INDEX IF NOT EXISTS idx_cards_series ON cards(series);
        CREATE INDEX IF NOT EXISTS idx_cards_wishlist ON cards(wishlist);

        CREATE TABLE IF NOT EXISTS series (
            name       TEXT PRIMARY KEY,
            wishlist   INTEGER NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS characters (
            card_id    TEXT PRIMARY KEY,
            name       TEXT NOT NULL,
            series     TEXT NOT NULL,
            category   TEXT NOT NULL,
            wishlist   INTEGER NOT NULL,
            generated  INTEGER NOT NULL,
            burned     INTEGER NOT NULL,
            threed     INTEGER NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Malformed-row diagnostics
        CREATE TABLE IF NOT EXISTS row_skips (
            id         INTEGER PRIMARY KEY,
            message_id TEXT NOT NULL REFERENCES messages(id),
            layout     TEXT NOT NULL,
            row_index  INTEGER NOT NULL,
            field      TEXT NOT NULL,
            line       TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_skips_message ON row_skips(message_id);

        CREATE TABLE IF NOT EXISTS server_config (
            guild_id    TEXT NOT NULL,
            scope       TEXT NOT NULL,
            config_json TEXT NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(guild_id, scope)
        );

        -- Drop-announcement scan results
        CREATE TABLE IF NOT EXISTS drops (
            id         INTEGER PRIMARY KEY,
            message_id TEXT NOT NULL REFERENCES messages(id),
            dropper_id TEXT,
            image_url  TEXT NOT NULL,
            ocr_text   TEXT,
            matched    TEXT,
            error      TEXT,
            latency_ms INTEGER,
            scanned_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_drops_message ON drops(message_id);
        ",
    )?;
    Ok(())
}

// ── Ingest ──

pub struct MessageRow {
    pub id: String,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
    pub content: String,
    pub timestamp: Option<String>,
    pub layout: String,
    pub embed_json: Option<String>,
    pub attachment_url: Option<String>,
}

pub fn insert_messages(conn: &Connection, rows: &[MessageRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO messages
             (id, channel_id, guild_id, content, timestamp, layout, embed_json, attachment_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for r in rows {
            count += stmt.execute(params![
                r.id, r.channel_id, r.guild_id, r.content, r.timestamp,
                r.layout, r.embed_json, r.attachment_url,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Processing ──

pub struct PendingMessage {
    pub id: String,
    pub embed_json: String,
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<PendingMessage>> {
    let sql = format!(
        "SELECT id, embed_json FROM messages
         WHERE processed = 0 AND layout != 'drop' AND embed_json IS NOT NULL
         ORDER BY rowid{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PendingMessage {
                id: row.get(0)?,
                embed_json: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_processed(conn: &Connection, ids: &[String]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare("UPDATE messages SET processed = 1 WHERE id = ?1")?;
        for id in ids {
            stmt.execute(params![id])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Upsert sink ──

/// Upsert one card row. Names the bot truncated with a trailing "..." are
/// resolved against existing rows by prefix; a truncated record that matches
/// nothing is dropped rather than stored as a partial name. Returns whether
/// the record was written.
pub fn upsert_card(conn: &Connection, card: &CardRecord) -> Result<bool> {
    let Some(name) = resolve_field(
        conn,
        "SELECT name FROM cards WHERE name LIKE ?1 ESCAPE '\\' ORDER BY rowid LIMIT 1",
        &card.name,
    )?
    else {
        return Ok(false);
    };
    let Some(series) = resolve_field(
        conn,
        "SELECT series FROM cards WHERE series LIKE ?1 ESCAPE '\\' ORDER BY rowid LIMIT 1",
        &card.series,
    )?
    else {
        return Ok(false);
    };
    conn.execute(
        "INSERT OR REPLACE INTO cards (name, series, wishlist) VALUES (?1, ?2, ?3)",
        params![name, series, card.wishlist],
    )?;
    Ok(true)
}

/// Same truncation handling as [`upsert_card`], keyed by series name.
pub fn upsert_series(conn: &Connection, record: &SeriesRecord) -> Result<bool> {
    let Some(name) = resolve_field(
        conn,
        "SELECT name FROM series WHERE name LIKE ?1 ESCAPE '\\' ORDER BY rowid LIMIT 1",
        &record.series,
    )?
    else {
        return Ok(false);
    };
    conn.execute(
        "INSERT OR REPLACE INTO series (name, wishlist) VALUES (?1, ?2)",
        params![name, record.wishlist],
    )?;
    Ok(true)
}

/// Character profiles carry the exact card id, so no truncation handling.
pub fn upsert_character(conn: &Connection, c: &CharacterRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO characters
         (card_id, name, series, category, wishlist, generated, burned, threed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            c.card_id, c.name, c.series, c.category,
            c.wishlist, c.generated, c.burned, c.threed,
        ],
    )?;
    Ok(())
}

/// Pass non-truncated values through; resolve "..."-truncated ones by
/// prefix against existing rows via the given lookup query.
fn resolve_field(conn: &Connection, sql: &str, value: &str) -> Result<Option<String>> {
    match value.strip_suffix("...") {
        None => Ok(Some(value.to_string())),
        Some(prefix) => {
            let pattern = format!("{}%", like_escape(prefix));
            Ok(conn.query_row(sql, [pattern], |r| r.get(0)).optional()?)
        }
    }
}

fn like_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

// ── Diagnostics ──

pub fn save_skips(conn: &Connection, message_id: &str, skips: &[RowSkip]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO row_skips (message_id, layout, row_index, field, line)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for s in skips {
            stmt.execute(params![
                message_id,
                s.layout.as_str(),
                s.row as i64,
                s.field,
                s.line,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Server config ──

pub fn get_server_config(conn: &Connection, guild_id: &str, scope: &str) -> Result<Option<String>> {
    let row = conn
        .query_row(
            "SELECT config_json FROM server_config WHERE guild_id = ?1 AND scope = ?2",
            params![guild_id, scope],
            |r| r.get(0),
        )
        .optional()?;
    Ok(row)
}

pub fn set_server_config(
    conn: &Connection,
    guild_id: &str,
    scope: &str,
    config_json: &str,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO server_config (guild_id, scope, config_json)
         VALUES (?1, ?2, ?3)",
        params![guild_id, scope, config_json],
    )?;
    Ok(())
}

// ── Drops ──

pub struct DropMessage {
    pub id: String,
    pub guild_id: Option<String>,
    pub content: String,
    pub image_url: String,
}

pub fn fetch_pending_drops(conn: &Connection, limit: Option<usize>) -> Result<Vec<DropMessage>> {
    let sql = format!(
        "SELECT id, guild_id, content, attachment_url FROM messages
         WHERE processed = 0 AND layout = 'drop' AND attachment_url IS NOT NULL
         ORDER BY rowid{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(DropMessage {
                id: row.get(0)?,
                guild_id: row.get(1)?,
                content: row.get(2)?,
                image_url: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Card names + series for OCR matching.
pub fn fetch_known_cards(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT name, series FROM cards ORDER BY rowid")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Overview ──

pub struct OverviewRow {
    pub name: String,
    pub series: String,
    pub wishlist: i64,
}

pub fn fetch_overview(
    conn: &Connection,
    series: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let (where_clause, pattern);
    match series {
        Some(s) => {
            where_clause = " WHERE series LIKE ?1";
            pattern = Some(format!("%{}%", s));
        }
        None => {
            where_clause = "";
            pattern = None;
        }
    }
    let sql = format!(
        "SELECT name, series, wishlist FROM cards{}
         ORDER BY wishlist DESC, name
         LIMIT {}",
        where_clause, limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = match pattern {
        Some(p) => stmt
            .query_map(params![p], map_overview)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([], map_overview)?
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

fn map_overview(row: &rusqlite::Row) -> rusqlite::Result<OverviewRow> {
    Ok(OverviewRow {
        name: row.get(0)?,
        series: row.get(1)?,
        wishlist: row.get(2)?,
    })
}

// ── Stats ──

pub struct Stats {
    pub messages: usize,
    pub processed: usize,
    pub unprocessed: usize,
    pub cards: usize,
    pub series: usize,
    pub characters: usize,
    pub skips: usize,
    pub drops: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> {
        Ok(conn.query_row(sql, [], |r| r.get(0))?)
    };
    let messages = count("SELECT COUNT(*) FROM messages")?;
    let processed = count("SELECT COUNT(*) FROM messages WHERE processed = 1")?;
    Ok(Stats {
        messages,
        processed,
        unprocessed: messages - processed,
        cards: count("SELECT COUNT(*) FROM cards")?,
        series: count("SELECT COUNT(*) FROM series")?,
        characters: count("SELECT COUNT(*) FROM characters")?,
        skips: count("SELECT COUNT(*) FROM row_skips")?,
        drops: count("SELECT COUNT(*) FROM drops")?,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let c = Connection::open_in_memory().unwrap();
        init_schema(&c).unwrap();
        c
    }

    fn card(wishlist: u32, name: &str, series: &str) -> CardRecord {
        CardRecord {
            wishlist,
            name: name.into(),
            series: series.into(),
        }
    }

    #[test]
    fn upsert_card_inserts_then_updates() {
        let c = conn();
        assert!(upsert_card(&c, &card(3, "Nocturne", "Arcview")).unwrap());
        assert!(upsert_card(&c, &card(7, "Nocturne", "Arcview")).unwrap());
        let rows = fetch_overview(&c, None, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].wishlist, 7);
    }

    #[test]
    fn truncated_name_resolves_to_existing_row() {
        let c = conn();
        upsert_card(&c, &card(3, "Nocturne of the Silver Vale", "Arcview")).unwrap();
        assert!(upsert_card(&c, &card(9, "Nocturne of the Si...", "Arcview")).unwrap());
        let rows = fetch_overview(&c, None, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Nocturne of the Silver Vale");
        assert_eq!(rows[0].wishlist, 9);
    }

    #[test]
    fn truncated_name_without_match_is_dropped() {
        let c = conn();
        assert!(!upsert_card(&c, &card(9, "Unknown Someb...", "Arcview")).unwrap());
        assert!(fetch_overview(&c, None, 10).unwrap().is_empty());
    }

    #[test]
    fn like_wildcards_in_names_are_escaped() {
        let c = conn();
        upsert_card(&c, &card(1, "100% Orange", "Arcview")).unwrap();
        upsert_card(&c, &card(2, "100x Orange", "Arcview")).unwrap();
        assert!(upsert_card(&c, &card(5, "100% Ora...", "Arcview")).unwrap());
        let rows = fetch_overview(&c, Some("Arcview"), 10).unwrap();
        let hit = rows.iter().find(|r| r.name == "100% Orange").unwrap();
        assert_eq!(hit.wishlist, 5);
    }

    #[test]
    fn upsert_series_and_character() {
        let c = conn();
        upsert_series(
            &c,
            &SeriesRecord { wishlist: 42, series: "Arcview".into() },
        )
        .unwrap();
        upsert_character(
            &c,
            &CharacterRecord {
                series: "Wander".into(),
                name: "Juno".into(),
                category: "Rare".into(),
                wishlist: 5,
                generated: 100,
                burned: 10,
                threed: 2,
                card_id: "JX-01".into(),
            },
        )
        .unwrap();
        let s = get_stats(&c).unwrap();
        assert_eq!(s.series, 1);
        assert_eq!(s.characters, 1);
    }

    #[test]
    fn server_config_roundtrip() {
        let c = conn();
        assert!(get_server_config(&c, "g1", "_all").unwrap().is_none());
        set_server_config(&c, "g1", "_all", r#"{"enabled":true}"#).unwrap();
        set_server_config(&c, "g1", "_all", r#"{"enabled":false}"#).unwrap();
        assert_eq!(
            get_server_config(&c, "g1", "_all").unwrap().as_deref(),
            Some(r#"{"enabled":false}"#)
        );
    }
}
