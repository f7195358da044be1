//! Single character profile ("Card ID:" embeds).
//!
//! Unlike the list layouts this one reads fixed row positions after dropping
//! blank lines: series and category sit after the second `**` of rows 0 and
//! 1, the four counters follow `➜** \``, and the card id lives on the last
//! row. At most one record per document; any missing piece fails the whole
//! record with a single diagnostic.

use super::{clean, parse_count, CharacterRecord, Extraction, Record};
use crate::parser::slice::{between, nth_piece};
use crate::parser::Document;

const COUNT_FIELDS: [&str; 4] = ["wishlist", "generated", "burned", "threed"];

pub fn extract(doc: &Document, out: &mut Extraction) {
    let Some(description) = doc.description.as_deref() else {
        return;
    };
    let rows: Vec<&str> = description
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect();
    if rows.len() < 6 {
        out.skip(0, "rows", rows.first().copied().unwrap_or(""));
        return;
    }

    let Some(name) = doc.title.as_deref().and_then(clean) else {
        out.skip(0, "name", "");
        return;
    };
    let Some(series) = nth_piece(rows[0], "**", 2).and_then(clean) else {
        out.skip(0, "series", rows[0]);
        return;
    };
    let Some(category) = nth_piece(rows[1], "**", 2).and_then(clean) else {
        out.skip(1, "category", rows[1]);
        return;
    };

    let mut counts = [0u32; 4];
    for (k, field) in COUNT_FIELDS.iter().enumerate() {
        let row = rows[2 + k];
        match between(row, "➜** `", "`").and_then(parse_count) {
            Some(n) => counts[k] = n,
            None => {
                out.skip(2 + k, field, row);
                return;
            }
        }
    }

    let last = rows[rows.len() - 1];
    let Some(card_id) = between(last, "** `", "`").and_then(clean) else {
        out.skip(rows.len() - 1, "card_id", last);
        return;
    };

    out.records.push(Record::Character(CharacterRecord {
        series,
        name,
        category,
        wishlist: counts[0],
        generated: counts[1],
        burned: counts[2],
        threed: counts[3],
        card_id,
    }));
}

// ── Tests ──
