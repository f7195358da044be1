//! Per-series collection summary ("Cards Collected:" embeds).
//!
//! Card rows come from the first field block, the shared series name from the
//! embed title, and a single trailing aggregate total from the description.
//! A missing title suppresses only the aggregate record; the card rows keep
//! whatever the bot rendered.

use super::{clean, parse_count, CardRecord, Extraction, Record, SeriesRecord};
use crate::parser::slice::{apply_rules, between, FieldRule};
use crate::parser::Document;

const ROW_RULES: [FieldRule; 2] = [
    FieldRule { field: "wishlist", open: "❤️ `", close: "`" },
    FieldRule { field: "name", open: "**", close: "**" },
];

const TOTAL_MARKER: &str = "*Total Wishlist:*";
const TOTAL_OPEN: &str = "*Total Wishlist:* **";

pub fn extract(doc: &Document, out: &mut Extraction) {
    let series = doc
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(block) = doc.fields.first() {
        for (i, line) in block.value.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let values = match apply_rules(line, &ROW_RULES) {
                Ok(v) => v,
                Err(field) => {
                    out.skip(i, field, line);
                    continue;
                }
            };
            let Some(wishlist) = parse_count(values[0]) else {
                out.skip(i, "wishlist", line);
                continue;
            };
            let Some(name) = clean(values[1]) else {
                out.skip(i, "name", line);
                continue;
            };
            out.records.push(Record::Card(CardRecord {
                wishlist,
                name,
                series: series.unwrap_or("").to_string(),
            }));
        }
    }

    // The aggregate needs the shared series name; without it only the
    // aggregate is suppressed.
    let Some(series) = series else {
        return;
    };
    let Some(description) = doc.description.as_deref() else {
        return;
    };
    let Some((row, line)) = description
        .lines()
        .enumerate()
        .find(|(_, l)| l.contains(TOTAL_MARKER))
    else {
        out.skip(0, "total_wishlist", description.lines().next().unwrap_or(""));
        return;
    };
    match between(line, TOTAL_OPEN, "**").and_then(parse_count) {
        Some(wishlist) => out.records.push(Record::Series(SeriesRecord {
            wishlist,
            series: series.to_string(),
        })),
        None => out.skip(row, "total_wishlist", line),
    }
}

// ── Tests ──
