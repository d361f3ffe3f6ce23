//! Mood vocabulary and scoring.
//!
//! Three independent sources produce per-mood scores — tag keywords
//! ([`tag_scores`]), BPM audio-feature rules ([`bpm_scores`]) and the
//! lyrics classifier ([`lyrics_scores`]) — which are fused into a single
//! mood label plus a confidence by [`combine_mood_scores`].

mod bpm_rules;
mod fuse;
mod tag_rules;

pub use bpm_rules::bpm_scores;
pub use fuse::{combine_mood_scores, lyrics_scores};
pub use tag_rules::tag_scores;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed mood vocabulary. The declaration order is canonical: tag
/// matching stops at the first matching mood in this order, and score ties
/// at the top-3 cut resolve by it, keeping fusion independent of any map
/// iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Chill,
    Intense,
    Romantic,
    Dark,
    Uplifting,
    Nostalgic,
    Party,
}

impl Mood {
    pub const ALL: [Mood; 9] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Chill,
        Mood::Intense,
        Mood::Romantic,
        Mood::Dark,
        Mood::Uplifting,
        Mood::Nostalgic,
        Mood::Party,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Chill => "chill",
            Mood::Intense => "intense",
            Mood::Romantic => "romantic",
            Mood::Dark => "dark",
            Mood::Uplifting => "uplifting",
            Mood::Nostalgic => "nostalgic",
            Mood::Party => "party",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|m| *m == self).unwrap()
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-mood score accumulator, dense over the whole vocabulary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoodScores([f64; 9]);

impl MoodScores {
    pub fn get(&self, mood: Mood) -> f64 {
        self.0[mood.index()]
    }

    pub fn add(&mut self, mood: Mood, amount: f64) {
        self.0[mood.index()] += amount;
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0.0
    }

    /// Scores in canonical mood order.
    pub fn iter(&self) -> impl Iterator<Item = (Mood, f64)> + '_ {
        Mood::ALL.iter().map(move |m| (*m, self.get(*m)))
    }

    /// A single-mood score table, as produced by the lyrics source.
    pub fn single(mood: Mood, score: f64) -> Self {
        let mut scores = Self::default();
        scores.add(mood, score);
        scores
    }
}

/// Relative weight of each scoring source during fusion. Lyrics weigh
/// highest: they are the most semantically direct signal.
#[derive(Debug, Clone)]
pub struct MoodWeights {
    pub tags: f64,
    pub bpm: f64,
    pub lyrics: f64,
}

impl Default for MoodWeights {
    fn default() -> Self {
        Self {
            tags: 0.7,
            bpm: 1.0,
            lyrics: 1.5,
        }
    }
}
