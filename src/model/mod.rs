//! Core track data model.
//!
//! A [`RawTrack`] is built fresh per request from either a free-text
//! suggestion line or a structured library record; an [`EnrichedTrack`] is
//! produced once per enrichment pass and handed back to the caller. Neither
//! is persisted by this crate.

use crate::mood::Mood;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

/// Ticks per second in library run-time durations.
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Normalized track metadata before enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTrack {
    /// The original input this track was parsed from.
    pub raw: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Year as found in the source; may be empty or unparseable.
    pub year: String,
    pub genres: Vec<String>,
    pub lyrics: Option<String>,
    /// Tempo from a library `tempo:` tag.
    pub tempo: Option<u32>,
    pub run_time_ticks: u64,
    /// Library play count. `None` means the track is not in the library;
    /// `Some(0)` means it is in the library but never played.
    pub play_count: Option<u64>,
}

impl RawTrack {
    /// Parse a suggestion-style line: `"Title - Artist - Album - Year"`.
    /// Missing trailing fields are left empty; title/artist validity is
    /// checked by the enricher, not here.
    pub fn from_suggestion_line(line: &str) -> Self {
        let parts: Vec<&str> = line.split(" - ").map(str::trim).collect();
        let field = |i: usize| parts.get(i).copied().unwrap_or("").to_string();
        Self {
            raw: line.trim().to_string(),
            title: field(0),
            artist: field(1),
            album: field(2),
            year: field(3),
            ..Default::default()
        }
    }
}

/// Audio features from the BPM service. All fields are optional; the mood
/// rules treat an absent danceability/acousticness as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub bpm: Option<u32>,
    /// Musical key, e.g. "C", "Am". A key containing `m` is minor.
    pub key: Option<String>,
    pub danceability: Option<u32>,
    pub acousticness: Option<u32>,
    pub year: Option<i32>,
    /// Duration in seconds.
    pub duration: Option<u64>,
}

impl AudioFeatures {
    /// Whether the key reads as minor. An absent key counts as major.
    pub fn has_minor_key(&self) -> bool {
        self.key
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .contains('m')
    }
}

/// A track after the enrichment pass.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedTrack {
    pub raw: String,
    pub title: String,
    pub artist: String,
    /// Resolved album: tag-service album, else streaming catalog, else empty.
    pub album: String,
    /// Year string as it came from the source, unresolved.
    pub year: String,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    /// Tag-service tags, most relevant first.
    pub tags: Vec<String>,
    pub genre: String,
    #[serde(serialize_with = "serialize_mood")]
    pub mood: Option<Mood>,
    pub mood_confidence: f64,
    /// Resolved tempo: BPM service, else library tag.
    pub tempo: Option<u32>,
    pub decade: String,
    /// Duration in seconds.
    pub duration: u64,
    /// Raw listener count from the tag/listener service (0 when absent).
    pub popularity: u64,
    pub jellyfin_play_count: Option<u64>,
    /// Human-readable note when sources disagree on the year by more than
    /// one; empty otherwise.
    pub year_flag: String,
    /// Cross-source popularity on a 0-100 scale; `None` when no popularity
    /// signal exists at all. Never coerce this to 0 in aggregates.
    pub combined_popularity: Option<f64>,
    pub final_year: Option<i32>,
}

fn serialize_mood<S: Serializer>(mood: &Option<Mood>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(mood.map(Mood::as_str).unwrap_or("unknown"))
}

/// Decade label for a resolved year, e.g. `Some(1994)` -> `"1990s"`.
pub fn decade_for_year(year: Option<i32>) -> String {
    match year {
        Some(y) => format!("{}s", y / 10 * 10),
        None => "Unknown".to_string(),
    }
}

/// Decade label for a year string; unparseable input yields `"Unknown"`.
pub fn infer_decade(year_str: &str) -> String {
    decade_for_year(year_str.trim().parse().ok())
}

lazy_static! {
    static ref YEAR_IN_STRING: Regex = Regex::new(r"\b(19|20)\d{2}\b").unwrap();
}

/// Extract a 4-digit year from a free-form release date string.
pub fn extract_year_from_string(release_date: &str) -> Option<i32> {
    YEAR_IN_STRING
        .find(release_date)
        .and_then(|m| m.as_str().parse().ok())
}

/// Look for a `"{prefix}:value"` tag and return the value part, e.g.
/// `extract_tag_value(&tags, "tempo")` for a `"tempo:105"` tag.
pub fn extract_tag_value<'a>(tags: &'a [String], prefix: &str) -> Option<&'a str> {
    let wanted = format!("{}:", prefix);
    tags.iter()
        .find(|t| t.starts_with(&wanted))
        .map(|t| &t[wanted.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_suggestion_line_full() {
        let t = RawTrack::from_suggestion_line("Halo - Beyoncé - I Am... Sasha Fierce - 2008");
        assert_eq!(t.title, "Halo");
        assert_eq!(t.artist, "Beyoncé");
        assert_eq!(t.album, "I Am... Sasha Fierce");
        assert_eq!(t.year, "2008");
    }

    #[test]
    fn test_from_suggestion_line_partial() {
        let t = RawTrack::from_suggestion_line("Halo - Beyoncé");
        assert_eq!(t.title, "Halo");
        assert_eq!(t.artist, "Beyoncé");
        assert_eq!(t.album, "");
        assert_eq!(t.year, "");
    }

    #[test]
    fn test_infer_decade() {
        assert_eq!(infer_decade("1994"), "1990s");
        assert_eq!(infer_decade("2008"), "2000s");
        assert_eq!(infer_decade("not a year"), "Unknown");
        assert_eq!(infer_decade(""), "Unknown");
    }

    #[test]
    fn test_extract_year_from_string() {
        assert_eq!(extract_year_from_string("12 Mar 2004, 00:00"), Some(2004));
        assert_eq!(extract_year_from_string("1969-07-20"), Some(1969));
        assert_eq!(extract_year_from_string("someday"), None);
        // A 4-digit number outside the 19xx/20xx range is not a year.
        assert_eq!(extract_year_from_string("catalog 1234"), None);
    }

    #[test]
    fn test_extract_tag_value() {
        let tags = vec!["mood:uplifting".to_string(), "tempo:105".to_string()];
        assert_eq!(extract_tag_value(&tags, "tempo"), Some("105"));
        assert_eq!(extract_tag_value(&tags, "bpm"), None);
    }

    #[test]
    fn test_minor_key_detection() {
        let mut f = AudioFeatures::default();
        assert!(!f.has_minor_key());
        f.key = Some("Am".to_string());
        assert!(f.has_minor_key());
        f.key = Some("C".to_string());
        assert!(!f.has_minor_key());
    }
}
