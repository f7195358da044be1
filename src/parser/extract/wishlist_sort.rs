//! "(Sort By: Wishlist)" collection listing: one card per description row.
//!
//! Row shape: `> `12` **Aria** •  *Skyline*` (the bullet is followed by two
//! spaces before the series asterisk).

use super::{clean, parse_count, CardRecord, Extraction, Record};
use crate::parser::slice::{apply_rules, FieldRule};
use crate::parser::Document;

const RULES: [FieldRule; 3] = [
    FieldRule { field: "wishlist", open: "> `", close: "`" },
    FieldRule { field: "name", open: "**", close: "**" },
    FieldRule { field: "series", open: "•  *", close: "*" },
];

pub fn extract(doc: &Document, out: &mut Extraction) {
    let Some(description) = doc.description.as_deref() else {
        return;
    };
    for (i, line) in description.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let values = match apply_rules(line, &RULES) {
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
        let Some(series) = clean(values[2]) else {
            out.skip(i, "series", line);
            continue;
        };
        out.records.push(Record::Card(CardRecord { wishlist, name, series }));
    }
}

// ── Tests ──
