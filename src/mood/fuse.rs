//! Fusion of tag, BPM and lyrics mood scores into a single label.

use super::{Mood, MoodScores, MoodWeights};

/// Minimum weighted top score; anything below reads as "no signal".
const MIN_SIGNAL: f64 = 0.3;
/// Multiplier applied to a source when it is the only one with signal.
const LONE_SOURCE_BOOST: f64 = 1.5;
/// Confidence floor when the top mood dominates the runner-up by >= 1.5x.
const DOMINANCE_FLOOR: f64 = 0.6;

/// Ties on the final weighted score resolve in this order. Rarer, more
/// specific moods come first so that generic ones cannot win a tie.
const TIE_PREFERENCE: [Mood; 9] = [
    Mood::Romantic,
    Mood::Chill,
    Mood::Uplifting,
    Mood::Party,
    Mood::Happy,
    Mood::Nostalgic,
    Mood::Sad,
    Mood::Dark,
    Mood::Intense,
];

/// Per-mood multiplier applied after source weighting: common/generic moods
/// are nudged down, specific ones up, so they cannot dominate every tie.
fn mood_multiplier(mood: Mood) -> f64 {
    match mood {
        Mood::Happy => 0.9,
        Mood::Sad | Mood::Chill | Mood::Intense => 1.0,
        Mood::Romantic | Mood::Dark => 1.2,
        Mood::Uplifting | Mood::Nostalgic | Mood::Party => 1.3,
    }
}

/// Synonym table from the classifier's free-text mood word to the
/// canonical vocabulary.
fn canonical_mood(word: &str) -> Option<Mood> {
    match word.trim().to_lowercase().as_str() {
        "happy" => Some(Mood::Happy),
        "sad" | "melancholy" => Some(Mood::Sad),
        "chill" | "relaxing" | "calm" => Some(Mood::Chill),
        "angry" | "aggressive" | "intense" => Some(Mood::Intense),
        "romantic" => Some(Mood::Romantic),
        "dark" => Some(Mood::Dark),
        "uplifting" | "hopeful" => Some(Mood::Uplifting),
        "nostalgic" => Some(Mood::Nostalgic),
        "party" => Some(Mood::Party),
        _ => None,
    }
}

/// Score table for a classifier mood word: 1.0 on the mapped mood, zero
/// elsewhere. An unmapped word yields an all-zero table, which contributes
/// nothing to fusion — the source is effectively absent.
pub fn lyrics_scores(mood_word: &str) -> MoodScores {
    match canonical_mood(mood_word) {
        Some(mood) => MoodScores::single(mood, 1.0),
        None => MoodScores::default(),
    }
}

/// Fuse per-source mood scores into `(mood, confidence)`.
///
/// A lone source with signal is boosted x1.5 (nothing corroborates it, but
/// nothing dilutes it either); sources are then weighted, each mood gets
/// its multiplier, and the top three compete under a softmax. Returns
/// `(None, 0.0)` when even the best weighted score is below 0.3.
pub fn combine_mood_scores(
    tag_scores: &MoodScores,
    bpm_scores: &MoodScores,
    lyrics_scores: Option<&MoodScores>,
    weights: &MoodWeights,
) -> (Option<Mood>, f64) {
    let tag_sum = tag_scores.total();
    let bpm_sum = bpm_scores.total();
    let lyrics_sum = lyrics_scores.map(MoodScores::total).unwrap_or(0.0);

    let lone = |own: f64, other_a: f64, other_b: f64| {
        if own > 0.0 && other_a == 0.0 && other_b == 0.0 {
            LONE_SOURCE_BOOST
        } else {
            1.0
        }
    };
    let tag_boost = lone(tag_sum, bpm_sum, lyrics_sum);
    let bpm_boost = lone(bpm_sum, tag_sum, lyrics_sum);
    let lyrics_boost = lone(lyrics_sum, tag_sum, bpm_sum);

    let mut combined: Vec<(Mood, f64)> = Mood::ALL
        .iter()
        .map(|&mood| {
            let score = weights.tags * tag_scores.get(mood) * tag_boost
                + weights.bpm * bpm_scores.get(mood) * bpm_boost
                + weights.lyrics
                    * lyrics_scores.map(|s| s.get(mood)).unwrap_or(0.0)
                    * lyrics_boost;
            (mood, score * mood_multiplier(mood))
        })
        .collect();

    // Sort by score, canonical order deciding equal scores, and keep the
    // top three contenders for the softmax.
    combined.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    combined.truncate(3);

    let top_score = combined[0].1;
    if top_score < MIN_SIGNAL {
        return (None, 0.0);
    }

    let total_exp: f64 = combined.iter().map(|(_, s)| s.exp()).sum();
    let mut confidence = top_score.exp() / total_exp;

    if top_score >= 1.5 * combined[1].1 && confidence < DOMINANCE_FLOOR {
        confidence = DOMINANCE_FLOOR;
    }

    let best = TIE_PREFERENCE
        .iter()
        .copied()
        .find(|m| combined.iter().any(|(mood, s)| mood == m && *s == top_score))
        .unwrap_or(combined[0].0);

    (Some(best), (confidence * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::super::{bpm_scores, tag_scores};
    use super::*;
    use crate::model::AudioFeatures;

    fn owned(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_all_zero_sources_yield_unknown() {
        let zero = MoodScores::default();
        let (mood, confidence) =
            combine_mood_scores(&zero, &zero, None, &MoodWeights::default());
        assert_eq!(mood, None);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_worked_example_fuses_to_party() {
        let tags = tag_scores(&owned(&["Happy", "Dance", "Party", "Dark vibe"]));
        let features = AudioFeatures {
            bpm: Some(120),
            key: Some("C".to_string()),
            danceability: Some(80),
            acousticness: Some(20),
            ..Default::default()
        };
        let bpm = bpm_scores(&features);

        let (mood, confidence) =
            combine_mood_scores(&tags, &bpm, None, &MoodWeights::default());
        assert_eq!(mood, Some(Mood::Party));
        assert!(
            confidence > 0.7 && confidence < 0.8,
            "confidence was {confidence}"
        );
    }

    #[test]
    fn test_lone_source_is_boosted() {
        // A single strong tag source should clear the signal threshold on
        // its own: 1.0 * 0.7 (weight) * 1.5 (boost) * 1.0 = 1.05.
        let tags = MoodScores::single(Mood::Chill, 1.0);
        let zero = MoodScores::default();
        let (mood, confidence) =
            combine_mood_scores(&tags, &zero, None, &MoodWeights::default());
        assert_eq!(mood, Some(Mood::Chill));
        assert!(confidence >= 0.6);
    }

    #[test]
    fn test_weak_signal_is_unknown() {
        // One fallback-grade bpm hit: 0.5 * 1.0 * 1.5 * 0.9 = 0.675 for
        // happy would pass, but 0.2 raw stays under the threshold.
        let bpm = MoodScores::single(Mood::Happy, 0.2);
        let zero = MoodScores::default();
        let (mood, confidence) =
            combine_mood_scores(&zero, &bpm, None, &MoodWeights::default());
        assert_eq!(mood, None);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_exact_tie_breaks_by_preference() {
        // Same raw score on sad and chill from the same source; the
        // per-mood multipliers are equal (1.0) so the weighted scores tie,
        // and chill precedes sad in the preference order.
        let mut tags = MoodScores::default();
        tags.add(Mood::Sad, 2.0);
        tags.add(Mood::Chill, 2.0);
        let zero = MoodScores::default();
        let (mood, _) = combine_mood_scores(&tags, &zero, None, &MoodWeights::default());
        assert_eq!(mood, Some(Mood::Chill));
    }

    #[test]
    fn test_lyrics_outvote_tags() {
        // Lyrics carry the highest source weight: a romantic lyrics verdict
        // beats a single happy tag.
        let tags = MoodScores::single(Mood::Happy, 1.0);
        let lyrics = lyrics_scores("romantic");
        let zero = MoodScores::default();
        let (mood, _) =
            combine_mood_scores(&tags, &zero, Some(&lyrics), &MoodWeights::default());
        assert_eq!(mood, Some(Mood::Romantic));
    }

    #[test]
    fn test_lyrics_synonyms_map_to_vocabulary() {
        assert_eq!(lyrics_scores("Melancholy").get(Mood::Sad), 1.0);
        assert_eq!(lyrics_scores("hopeful").get(Mood::Uplifting), 1.0);
        assert!(lyrics_scores("confused").is_zero());
    }

    #[test]
    fn test_dominance_floors_confidence() {
        // Three close-but-dominated moods: top = 2x second, softmax alone
        // would sit below 0.6 only for small scores; use small ones.
        let mut tags = MoodScores::default();
        tags.add(Mood::Chill, 1.0);
        tags.add(Mood::Sad, 0.5);
        tags.add(Mood::Dark, 0.5);
        let zero = MoodScores::default();
        let (mood, confidence) =
            combine_mood_scores(&tags, &zero, None, &MoodWeights::default());
        assert_eq!(mood, Some(Mood::Chill));
        assert!(confidence >= 0.6);
    }
}
