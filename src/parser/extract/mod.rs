//! Record types and the per-layout extraction dispatch.
//!
//! Extraction never fails as a whole: a malformed row costs exactly that
//! row, recorded as a [`RowSkip`], and the remaining rows still produce
//! records. The caller drives emission to the sink in row order.

pub mod leaderboard;
pub mod profile;
pub mod series_summary;
pub mod wishlist_sort;

use tracing::warn;

use super::layout::Layout;
use super::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    pub wishlist: u32,
    pub name: String,
    pub series: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRecord {
    pub wishlist: u32,
    pub series: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRecord {
    pub series: String,
    pub name: String,
    pub category: String,
    pub wishlist: u32,
    pub generated: u32,
    pub burned: u32,
    pub threed: u32,
    pub card_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Card(CardRecord),
    Series(SeriesRecord),
    Character(CharacterRecord),
}

/// Diagnostic for a row that failed its grammar and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSkip {
    pub layout: Layout,
    pub row: usize,
    pub field: &'static str,
    pub line: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub layout: Layout,
    pub records: Vec<Record>,
    pub skips: Vec<RowSkip>,
}

impl Extraction {
    fn new(layout: Layout) -> Self {
        Extraction {
            layout,
            records: Vec::new(),
            skips: Vec::new(),
        }
    }

    fn skip(&mut self, row: usize, field: &'static str, line: &str) {
        warn!(
            layout = self.layout.as_str(),
            row, field, "skipping malformed row"
        );
        self.skips.push(RowSkip {
            layout: self.layout,
            row,
            field,
            line: sample(line),
        });
    }
}

/// Run the layout's grammar over the document. `NoMatch` yields an empty
/// extraction; every other tag yields the records its rows produce plus a
/// skip entry per malformed row.
pub fn extract(doc: &Document, layout: Layout) -> Extraction {
    let mut out = Extraction::new(layout);
    match layout {
        Layout::WishlistSort => wishlist_sort::extract(doc, &mut out),
        Layout::CharacterLeaderboard => leaderboard::characters(doc, &mut out),
        Layout::SeriesLeaderboard => leaderboard::series(doc, &mut out),
        Layout::SeriesSummary => series_summary::extract(doc, &mut out),
        Layout::CharacterProfile => profile::extract(doc, &mut out),
        Layout::NoMatch => {}
    }
    out
}

/// Base-10 count; trims first. None for anything non-numeric.
pub(crate) fn parse_count(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}

/// Trimmed, non-empty string or None.
pub(crate) fn clean(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn sample(line: &str) -> String {
    line.chars().take(120).collect()
}

// ── Tests ──
