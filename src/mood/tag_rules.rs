//! Mood scoring from tag-service tags.

use super::{Mood, MoodScores};
use lazy_static::lazy_static;
use regex::Regex;

/// Keyword sets per mood, checked in canonical mood order. A keyword
/// matches as a substring of the cleaned tag, except for `party` whose
/// keywords are too generic for substring matching ("club" would fire on
/// "clubbed to death") and require the whole tag.
const TAG_KEYWORDS: [(Mood, &[&str]); 9] = [
    (Mood::Happy, &["happy", "fun", "cheerful", "feel good", "sunny"]),
    (Mood::Sad, &["sad", "melancholy", "emotional", "heartbreak", "blue"]),
    (Mood::Chill, &["chill", "relaxing", "calm", "downtempo", "smooth"]),
    (
        Mood::Intense,
        &["aggressive", "intense", "dark", "heavy", "angry", "epic"],
    ),
    (Mood::Romantic, &["romantic", "love", "sensual"]),
    (Mood::Dark, &["dark", "gothic", "ominous"]),
    (
        Mood::Uplifting,
        &["uplifting", "inspiring", "empowering", "anthem"],
    ),
    (Mood::Nostalgic, &["nostalgic", "retro", "vintage"]),
    (Mood::Party, &["party", "club", "dance"]),
];

lazy_static! {
    static ref TAG_NOISE: Regex = Regex::new(r"[^a-z0-9\s\-]").unwrap();
}

/// Score moods from an ordered tag list. Each tag contributes 1.0 to the
/// first mood it matches and is then spent; a tag can never feed two moods.
pub fn tag_scores(tags: &[String]) -> MoodScores {
    let mut scores = MoodScores::default();

    for tag in tags {
        let lowered = tag.to_lowercase();
        let cleaned = TAG_NOISE.replace_all(lowered.trim(), "");

        'moods: for (mood, keywords) in TAG_KEYWORDS {
            for keyword in keywords {
                let matched = if mood == Mood::Party {
                    cleaned == *keyword
                } else {
                    cleaned.contains(*keyword)
                };
                if matched {
                    scores.add(mood, 1.0);
                    break 'moods;
                }
            }
        }
    }

    scores
}
