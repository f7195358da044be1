//! Wishlist leaderboard embeds, in both variants the bot renders: one for
//! characters (cards) and one for whole series.

use super::{clean, parse_count, CardRecord, Extraction, Record, SeriesRecord};
use crate::parser::slice::{apply_rules, FieldRule};
use crate::parser::Document;

const CHARACTER_RULES: [FieldRule; 3] = [
    FieldRule { field: "wishlist", open: "> `", close: "`" },
    FieldRule { field: "name", open: "` • **", close: "** • *" },
    FieldRule { field: "series", open: "** • *", close: "*" },
];

const SERIES_RULES: [FieldRule; 2] = [
    FieldRule { field: "wishlist", open: "> `", close: "`" },
    FieldRule { field: "series", open: "` • **", close: "**" },
];

/// "WISHLIST LEADERBOARD - CHARACTERS": `> `431` • **Aria** • *Skyline*`.
pub fn characters(doc: &Document, out: &mut Extraction) {
    let Some(description) = doc.description.as_deref() else {
        return;
    };
    for (i, line) in description.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let values = match apply_rules(line, &CHARACTER_RULES) {
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

/// "WISHLIST LEADERBOARD - SERIES": `> `7` • **Arcview**`.
pub fn series(doc: &Document, out: &mut Extraction) {
    let Some(description) = doc.description.as_deref() else {
        return;
    };
    for (i, line) in description.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let values = match apply_rules(line, &SERIES_RULES) {
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
        let Some(series) = clean(values[1]) else {
            out.skip(i, "series", line);
            continue;
        };
        out.records.push(Record::Series(SeriesRecord { wishlist, series }));
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract;
    use crate::parser::layout::Layout;

    fn doc(title: &str, description: &str) -> Document {
        Document {
            title: Some(title.into()),
            description: Some(description.into()),
            fields: Vec::new(),
        }
    }

    #[test]
    fn character_leaderboard_rows() {
        let d = doc(
            "WISHLIST LEADERBOARD - CHARACTERS",
            "> `431` • **Aria** • *Skyline*\n> `98` • **Juno** • *Wander*",
        );
        let out = extract::extract(&d, Layout::CharacterLeaderboard);
        assert_eq!(
            out.records,
            vec![
                Record::Card(CardRecord {
                    wishlist: 431,
                    name: "Aria".into(),
                    series: "Skyline".into(),
                }),
                Record::Card(CardRecord {
                    wishlist: 98,
                    name: "Juno".into(),
                    series: "Wander".into(),
                }),
            ]
        );
    }

    #[test]
    fn series_leaderboard_row() {
        let d = doc("WISHLIST LEADERBOARD - SERIES", "> `7` • **Arcview**");
        let out = extract::extract(&d, Layout::SeriesLeaderboard);
        assert_eq!(
            out.records,
            vec![Record::Series(SeriesRecord {
                wishlist: 7,
                series: "Arcview".into(),
            })]
        );
    }

    #[test]
    fn series_row_missing_name_markers_is_skipped() {
        let d = doc(
            "WISHLIST LEADERBOARD - SERIES",
            "> `7` • **Arcview**\n> `3` • Arcview",
        );
        let out = extract::extract(&d, Layout::SeriesLeaderboard);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.skips.len(), 1);
        assert_eq!(out.skips[0].field, "series");
        assert_eq!(out.skips[0].row, 1);
    }
}
