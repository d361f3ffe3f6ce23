//! Genre resolution.
//!
//! Library genre fields and tag-service tags are both noisy; a genre is
//! accepted only when its synonym-normalized form is on the known-genre
//! allowlist. Library genres win over tags.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// Canonical names for common genre spellings and subgenre aliases.
    static ref GENRE_SYNONYMS: HashMap<&'static str, &'static str> = HashMap::from([
        // Hip hop & R&B
        ("hip-hop", "hip hop"),
        ("rap", "hip hop"),
        ("trap", "hip hop"),
        ("rnb", "r&b"),
        ("rhythm and blues", "r&b"),
        // Rock
        ("alt rock", "alternative"),
        ("alternative rock", "alternative"),
        ("classic rock", "rock"),
        ("hard rock", "rock"),
        ("indie rock", "indie"),
        ("indie pop", "indie"),
        ("garage rock", "rock"),
        ("post-punk", "punk"),
        // Electronic
        ("electronica", "edm"),
        ("electronic", "edm"),
        ("dance", "edm"),
        ("house", "edm"),
        ("techno", "edm"),
        ("trance", "edm"),
        ("dnb", "drum and bass"),
        ("drum & bass", "drum and bass"),
        ("breakbeats", "breakbeat"),
        ("dub", "dubstep"),
        ("britpop", "pop"),
        ("lofi", "lo-fi"),
        ("lo-fi hip hop", "lo-fi"),
        // Other
        ("soundtrack", "ost"),
        ("original soundtrack", "ost"),
        ("musicals", "musical"),
        ("broadway", "musical"),
        ("latin pop", "latin"),
        ("salsa", "latin"),
        ("kpop", "k-pop"),
        ("jpop", "j-pop"),
        ("afrobeats", "afrobeat"),
        ("synth pop", "synthpop"),
        ("ambient music", "ambient"),
    ]);

    /// Genres this pipeline considers real genres rather than mood or
    /// culture tags.
    static ref KNOWN_GENRES: HashSet<&'static str> = HashSet::from([
        "rock", "pop", "hip hop", "rap", "r&b", "jazz", "blues", "metal",
        "punk", "edm", "electronic", "folk", "classical", "indie",
        "alternative", "reggae", "country", "techno", "trance", "house",
        "ambient", "soul", "funk", "grunge", "ska", "emo", "drum and bass",
        "breakbeat", "dubstep", "trap", "lo-fi", "garage", "k-pop", "j-pop",
        "afrobeat", "new wave", "grime", "chillout", "chillwave", "synthpop",
        "industrial", "world", "latin", "reggaeton", "opera", "musical",
        "post-rock", "ost",
    ]);
}

/// Map a raw genre string to its canonical lowercase name.
pub fn normalize_genre(raw: &str) -> String {
    let cleaned = raw.trim().to_lowercase();
    match GENRE_SYNONYMS.get(cleaned.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => cleaned,
    }
}

/// First entry whose normalized form is a known genre, canonicalized.
pub fn first_valid_genre(candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|c| normalize_genre(c))
        .find(|normalized| KNOWN_GENRES.contains(normalized.as_str()))
}

/// Choose a genre: library genres first, tag-service tags as fallback.
/// `None` when neither side has an allowlisted genre.
pub fn select_genre(library_genres: &[String], tags: &[String]) -> Option<String> {
    first_valid_genre(library_genres).or_else(|| first_valid_genre(tags))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_genre_synonyms() {
        assert_eq!(normalize_genre("Hip-Hop"), "hip hop");
        assert_eq!(normalize_genre("  Classic Rock "), "rock");
        assert_eq!(normalize_genre("electronica"), "edm");
        assert_eq!(normalize_genre("shoegaze"), "shoegaze");
    }

    #[test]
    fn test_first_valid_genre_skips_mood_tags() {
        let tags = owned(&["female vocalists", "seen live", "Indie Rock", "upbeat"]);
        assert_eq!(first_valid_genre(&tags), Some("indie".to_string()));
        assert_eq!(first_valid_genre(&owned(&["catchy", "favorite"])), None);
    }

    #[test]
    fn test_select_genre_prefers_library() {
        let library = owned(&["Jazz"]);
        let tags = owned(&["rock"]);
        assert_eq!(select_genre(&library, &tags), Some("jazz".to_string()));
        assert_eq!(select_genre(&[], &tags), Some("rock".to_string()));
        assert_eq!(select_genre(&[], &[]), None);
    }

    #[test]
    fn test_select_genre_falls_through_unknown_library_genre() {
        // A library genre that is not allowlisted falls back to the tags.
        let library = owned(&["Vocal Trance Anthems 2009"]);
        let tags = owned(&["trance"]);
        assert_eq!(select_genre(&library, &tags), Some("edm".to_string()));
    }
}
