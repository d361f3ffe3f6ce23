//! Mood scoring from BPM-service audio features.
//!
//! The rule set is a static table so it can be inspected and tested as
//! data. Rules are independent and additive: a track satisfying several
//! rules accumulates all of their weights, which is deliberate — agreement
//! between heuristics is a stronger signal than any single one.

use super::{Mood, MoodScores};
use crate::model::AudioFeatures;

/// Weight of a high-confidence primary rule (BPM plus co-conditions).
const PRIMARY: f64 = 1.0;
/// Weight of a low-confidence single-condition fallback rule.
const FALLBACK: f64 = 0.5;

pub struct BpmRule {
    pub moods: &'static [Mood],
    pub weight: f64,
    pub applies: fn(&AudioFeatures) -> bool,
}

fn bpm_over(f: &AudioFeatures, threshold: u32) -> bool {
    f.bpm.is_some_and(|b| b > threshold)
}

fn bpm_under(f: &AudioFeatures, threshold: u32) -> bool {
    f.bpm.is_some_and(|b| b > 0 && b < threshold)
}

fn bpm_between(f: &AudioFeatures, lo: u32, hi: u32) -> bool {
    f.bpm.is_some_and(|b| (lo..=hi).contains(&b))
}

fn dance(f: &AudioFeatures) -> u32 {
    f.danceability.unwrap_or(0)
}

fn acoustic(f: &AudioFeatures) -> u32 {
    f.acousticness.unwrap_or(0)
}

pub static BPM_RULES: &[BpmRule] = &[
    // Primary rules.
    BpmRule {
        moods: &[Mood::Party],
        weight: PRIMARY,
        applies: |f| bpm_between(f, 110, 140) && dance(f) > 65 && acoustic(f) < 40,
    },
    BpmRule {
        moods: &[Mood::Chill],
        weight: PRIMARY,
        applies: |f| bpm_under(f, 95) && acoustic(f) > 50 && dance(f) < 55,
    },
    BpmRule {
        moods: &[Mood::Intense],
        weight: PRIMARY,
        applies: |f| bpm_over(f, 125) && acoustic(f) < 30 && dance(f) > 55,
    },
    BpmRule {
        moods: &[Mood::Romantic],
        weight: PRIMARY,
        applies: |f| bpm_under(f, 95) && acoustic(f) > 55 && !f.has_minor_key(),
    },
    BpmRule {
        moods: &[Mood::Uplifting],
        weight: PRIMARY,
        applies: |f| {
            bpm_over(f, 95) && !f.has_minor_key() && acoustic(f) < 50 && dance(f) > 55
        },
    },
    BpmRule {
        moods: &[Mood::Nostalgic],
        weight: PRIMARY,
        applies: |f| {
            f.year.is_some_and(|y| y < 2005) && acoustic(f) > 45 && bpm_under(f, 105)
        },
    },
    BpmRule {
        moods: &[Mood::Dark],
        weight: PRIMARY,
        applies: |f| bpm_under(f, 115) && f.has_minor_key() && acoustic(f) < 40,
    },
    BpmRule {
        moods: &[Mood::Happy],
        weight: PRIMARY,
        applies: |f| bpm_over(f, 105) && !f.has_minor_key() && dance(f) > 55,
    },
    BpmRule {
        moods: &[Mood::Sad],
        weight: PRIMARY,
        applies: |f| bpm_under(f, 90) && f.has_minor_key() && dance(f) < 55,
    },
    // Fallback tempo tiers.
    BpmRule {
        moods: &[Mood::Intense],
        weight: FALLBACK,
        applies: |f| bpm_over(f, 130),
    },
    BpmRule {
        moods: &[Mood::Happy],
        weight: FALLBACK,
        applies: |f| bpm_over(f, 110),
    },
    BpmRule {
        moods: &[Mood::Uplifting],
        weight: FALLBACK,
        applies: |f| bpm_between(f, 90, 110),
    },
    BpmRule {
        moods: &[Mood::Chill],
        weight: FALLBACK,
        applies: |f| bpm_under(f, 90),
    },
    BpmRule {
        moods: &[Mood::Sad],
        weight: FALLBACK,
        applies: |f| bpm_under(f, 80),
    },
    // Fallback acousticness extremes (mutually exclusive predicates).
    BpmRule {
        moods: &[Mood::Chill, Mood::Romantic],
        weight: FALLBACK,
        applies: |f| acoustic(f) > 60,
    },
    BpmRule {
        moods: &[Mood::Intense],
        weight: FALLBACK,
        applies: |f| acoustic(f) < 20,
    },
    // Fallback danceability extremes (mutually exclusive predicates).
    BpmRule {
        moods: &[Mood::Party, Mood::Happy],
        weight: FALLBACK,
        applies: |f| dance(f) > 70,
    },
    BpmRule {
        moods: &[Mood::Sad, Mood::Chill],
        weight: FALLBACK,
        applies: |f| dance(f) < 30,
    },
];

/// Accumulate the weights of every rule the features satisfy.
pub fn bpm_scores(features: &AudioFeatures) -> MoodScores {
    let mut scores = MoodScores::default();
    for rule in BPM_RULES {
        if (rule.applies)(features) {
            for mood in rule.moods {
                scores.add(*mood, rule.weight);
            }
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(bpm: u32, key: &str, dance: u32, acoustic: u32) -> AudioFeatures {
        AudioFeatures {
            bpm: Some(bpm),
            key: Some(key.to_string()),
            danceability: Some(dance),
            acousticness: Some(acoustic),
            ..Default::default()
        }
    }

    #[test]
    fn test_bpm_scores_worked_example() {
        // bpm 120, C major, danceable, synthetic: party primary + dance
        // fallback, happy primary + two fallbacks, uplifting primary.
        let scores = bpm_scores(&features(120, "C", 80, 20));
        assert_eq!(scores.get(Mood::Party), 1.5);
        assert_eq!(scores.get(Mood::Happy), 2.0);
        assert_eq!(scores.get(Mood::Uplifting), 1.0);
        assert_eq!(scores.get(Mood::Intense), 0.0);
        assert_eq!(scores.get(Mood::Chill), 0.0);
    }

    #[test]
    fn test_slow_acoustic_minor_track() {
        let scores = bpm_scores(&features(75, "Am", 25, 70));
        // sad primary (slow, minor, low dance) + bpm<90 and bpm<80 tiers
        // + dance<30 tier.
        assert_eq!(scores.get(Mood::Sad), 2.0);
        // chill primary + bpm<90 tier + acoustic>60 tier + dance<30 tier.
        assert_eq!(scores.get(Mood::Chill), 2.5);
        // acoustic>60 also nudges romantic, but minor key blocks the
        // romantic primary rule.
        assert_eq!(scores.get(Mood::Romantic), 0.5);
    }

    #[test]
    fn test_nostalgic_requires_year() {
        let mut f = features(95, "C", 40, 60);
        assert_eq!(bpm_scores(&f).get(Mood::Nostalgic), 0.0);
        f.year = Some(1998);
        assert_eq!(bpm_scores(&f).get(Mood::Nostalgic), 1.0);
        f.year = Some(2010);
        assert_eq!(bpm_scores(&f).get(Mood::Nostalgic), 0.0);
    }

    #[test]
    fn test_missing_bpm_skips_tempo_rules() {
        let f = AudioFeatures {
            danceability: Some(80),
            acousticness: Some(10),
            ..Default::default()
        };
        let scores = bpm_scores(&f);
        // Only the acoustic<20 and dance>70 fallbacks can fire.
        assert_eq!(scores.get(Mood::Intense), 0.5);
        assert_eq!(scores.get(Mood::Party), 0.5);
        assert_eq!(scores.get(Mood::Happy), 0.5);
        assert_eq!(scores.total(), 1.5);
    }

    #[test]
    fn test_empty_features_score_nothing_on_tempo_moods() {
        // All-absent features still trip the "low acousticness/danceability"
        // fallbacks since absent values read as 0; tempo rules stay silent.
        let scores = bpm_scores(&AudioFeatures::default());
        assert_eq!(scores.get(Mood::Intense), 0.5);
        assert_eq!(scores.get(Mood::Sad), 0.5);
        assert_eq!(scores.get(Mood::Chill), 0.5);
        assert_eq!(scores.total(), 1.5);
    }
}
