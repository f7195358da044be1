//! OCR-tolerant card name matching.
//!
//! The bot truncates long names with "..." in its list views, and OCR output
//! confuses visually similar glyphs. Matching therefore works on a reduced
//! lowercase alphanumeric-plus-dot form, treats a trailing "..." as a prefix
//! match, and allows at most one confusable-pair substitution.

use rayon::prelude::*;

/// Glyph pairs OCR output tends to swap.
const CONFUSABLES: &[&[char]] = &[
    &['o', '0'],
    &['l', 'i'],
    &['1', ']'],
    &['y', 'v'],
    &['$', 's'],
    &['i', '!'],
    &['s', '5'],
    &['©', 'o'],
    &['1', 'i'],
    &['a', 'é'],
];

/// A card known to the store, with its matching form precomputed.
pub struct KnownCard {
    pub name: String,
    pub series: String,
    norm_name: String,
}

impl KnownCard {
    pub fn new(name: String, series: String) -> Self {
        let (_, norm_name) = normalize(&name);
        KnownCard { name, series, norm_name }
    }
}

fn reduce(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Reduce to the matching form, flagging a trailing "..." truncation and
/// stripping the dots.
pub fn normalize(s: &str) -> (bool, String) {
    let reduced = reduce(s);
    let truncated = reduced.ends_with("...");
    (truncated, reduced.trim_end_matches('.').to_string())
}

/// Same as [`normalize`] for OCR lines, first repairing the dot runs OCR
/// mangles ("....", "..") back to the canonical "...".
pub fn ocr_normalize(s: &str) -> (bool, String) {
    let mut reduced = reduce(s);
    if reduced.ends_with("....") {
        reduced.truncate(reduced.len() - 1);
    }
    if reduced.ends_with("..") && !reduced.ends_with("...") {
        reduced.push('.');
    }
    let truncated = reduced.ends_with("...");
    (truncated, reduced.trim_end_matches('.').to_string())
}

/// Compare two already-normalized names. `truncated` turns the comparison
/// into a prefix check; either way at most one confusable substitution is
/// tolerated.
pub fn names_match(known: &str, candidate: &str, truncated: bool) -> bool {
    if exact(known, candidate, truncated) {
        return true;
    }
    let k: Vec<char> = known.chars().collect();
    let c: Vec<char> = candidate.chars().collect();
    if truncated {
        if c.len() > k.len() {
            return false;
        }
    } else if k.len() != c.len() {
        return false;
    }
    let mut diffs = 0;
    for (a, b) in k.iter().zip(c.iter()) {
        if a != b {
            diffs += 1;
            if diffs > 1 || !confusable(*a, *b) {
                return false;
            }
        }
    }
    diffs == 1
}

fn exact(known: &str, candidate: &str, truncated: bool) -> bool {
    if truncated {
        known.starts_with(candidate)
    } else {
        known == candidate
    }
}

fn confusable(a: char, b: char) -> bool {
    CONFUSABLES
        .iter()
        .any(|group| group.contains(&a) && group.contains(&b))
}

/// First known card whose name matches an OCR line.
pub fn find_match<'a>(cards: &'a [KnownCard], ocr_line: &str) -> Option<&'a KnownCard> {
    let (truncated, needle) = ocr_normalize(ocr_line);
    if needle.is_empty() {
        return None;
    }
    cards
        .par_iter()
        .find_any(|card| names_match(&card.norm_name, &needle, truncated))
}

/// Match every non-blank line of an OCR dump against the known cards.
pub fn match_text<'a>(cards: &'a [KnownCard], text: &str) -> Vec<&'a KnownCard> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| find_match(cards, l))
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn cards() -> Vec<KnownCard> {
        vec![
            KnownCard::new("Nocturne of the Silver Vale".into(), "Arcview".into()),
            KnownCard::new("Juno".into(), "Wander".into()),
            KnownCard::new("Vesper".into(), "Skyline".into()),
        ]
    }

    #[test]
    fn exact_match() {
        let cards = cards();
        let hit = find_match(&cards, "Juno").unwrap();
        assert_eq!(hit.series, "Wander");
    }

    #[test]
    fn truncated_line_matches_by_prefix() {
        let cards = cards();
        let hit = find_match(&cards, "Nocturne of the Si...").unwrap();
        assert_eq!(hit.name, "Nocturne of the Silver Vale");
    }

    #[test]
    fn ocr_dot_runs_are_repaired() {
        let cards = cards();
        assert!(find_match(&cards, "Nocturne of the Si....").is_some());
        assert!(find_match(&cards, "Nocturne of the Si..").is_some());
    }

    #[test]
    fn one_confusable_substitution_is_tolerated() {
        let cards = cards();
        // '0' for 'o' and '5' for 's' are in the confusable table.
        assert!(find_match(&cards, "Jun0").is_some());
        assert!(find_match(&cards, "Ve5per").is_some());
        assert!(find_match(&cards, "Junx").is_none()); // not a confusable pair
        assert!(find_match(&cards, "Ve5p3r").is_none()); // two substitutions
    }

    #[test]
    fn unknown_line_matches_nothing() {
        let cards = cards();
        assert!(find_match(&cards, "totally different").is_none());
        assert!(find_match(&cards, "   ").is_none());
    }

    #[test]
    fn match_text_walks_lines() {
        let cards = cards();
        let hits = match_text(&cards, "Vesper\n\nnoise line\nJuno\n");
        let names: Vec<&str> = hits.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Vesper", "Juno"]);
    }
}
