//! Layout classification: which of the bot's display formats an embed uses.

use super::Document;

/// One recognized rendering format of the bot's embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Collection listing sorted by wishlist count.
    WishlistSort,
    /// Global character wishlist leaderboard.
    CharacterLeaderboard,
    /// Global series wishlist leaderboard.
    SeriesLeaderboard,
    /// Per-series collection summary with a wishlist total.
    SeriesSummary,
    /// Single character profile lookup.
    CharacterProfile,
    /// No known layout matched; never extracted.
    NoMatch,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::WishlistSort => "wishlist_sort",
            Layout::CharacterLeaderboard => "character_leaderboard",
            Layout::SeriesLeaderboard => "series_leaderboard",
            Layout::SeriesSummary => "series_summary",
            Layout::CharacterProfile => "character_profile",
            Layout::NoMatch => "none",
        }
    }
}

/// Match a document against the known layouts.
///
/// The rules are not mutually exclusive; they are evaluated in this fixed
/// order and the first hit wins. The same rule set doubles as the ingest
/// eligibility gate: a `NoMatch` document is never stored for extraction.
pub fn classify(doc: &Document) -> Layout {
    let title = doc.title.as_deref().unwrap_or("");
    let description = doc.description.as_deref().unwrap_or("");

    if title.contains("(Sort By: Wishlist)") {
        Layout::WishlistSort
    } else if title == "WISHLIST LEADERBOARD - CHARACTERS" {
        Layout::CharacterLeaderboard
    } else if title == "WISHLIST LEADERBOARD - SERIES" {
        Layout::SeriesLeaderboard
    } else if description.contains("Cards Collected:") {
        Layout::SeriesSummary
    } else if description.contains("Card ID:") {
        Layout::CharacterProfile
    } else {
        Layout::NoMatch
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: Option<&str>, description: Option<&str>) -> Document {
        Document {
            title: title.map(str::to_string),
            description: description.map(str::to_string),
            fields: Vec::new(),
        }
    }

    #[test]
    fn each_rule_matches() {
        assert_eq!(
            classify(&doc(Some("Mira's Collection (Sort By: Wishlist)"), None)),
            Layout::WishlistSort
        );
        assert_eq!(
            classify(&doc(Some("WISHLIST LEADERBOARD - CHARACTERS"), None)),
            Layout::CharacterLeaderboard
        );
        assert_eq!(
            classify(&doc(Some("WISHLIST LEADERBOARD - SERIES"), None)),
            Layout::SeriesLeaderboard
        );
        assert_eq!(
            classify(&doc(Some("Arcview"), Some("Cards Collected: 12"))),
            Layout::SeriesSummary
        );
        assert_eq!(
            classify(&doc(Some("Juno"), Some("**Card ID:** `JX-01`"))),
            Layout::CharacterProfile
        );
    }

    #[test]
    fn leaderboard_titles_must_match_exactly() {
        assert_eq!(
            classify(&doc(Some("WISHLIST LEADERBOARD - CHARACTERS (page 2)"), None)),
            Layout::NoMatch
        );
    }

    #[test]
    fn sort_by_wishlist_beats_card_id() {
        let d = doc(
            Some("Collection (Sort By: Wishlist)"),
            Some("something with Card ID: inside"),
        );
        assert_eq!(classify(&d), Layout::WishlistSort);
    }

    #[test]
    fn summary_beats_profile() {
        let d = doc(Some("Arcview"), Some("Cards Collected: 3\nCard ID: `X`"));
        assert_eq!(classify(&d), Layout::SeriesSummary);
    }

    #[test]
    fn empty_document_is_no_match() {
        assert_eq!(classify(&doc(None, None)), Layout::NoMatch);
    }
}
