//! Batch summary statistics and outlier detection over enriched tracks.

use crate::model::EnrichedTrack;
use serde::Serialize;
use std::collections::BTreeMap;

/// Confidence below which a mood is treated as missing.
const LOW_MOOD_CONFIDENCE: f64 = 0.3;
/// Tempo distance from the batch average that flags a track.
const TEMPO_OUTLIER_BPM: f64 = 40.0;
/// Fraction of the average listener count below which a track is obscure
/// relative to its batch.
const POPULARITY_OUTLIER_RATIO: f64 = 0.05;
const MAX_OUTLIERS: usize = 5;

/// Summary of an enriched batch, for the UI/summary collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub dominant_genre: String,
    /// Percentage (floor) of tracks per mood label.
    pub mood_profile: BTreeMap<String, u8>,
    pub genre_distribution: BTreeMap<String, u8>,
    pub decades: BTreeMap<String, u8>,
    /// Rounded average tempo over tracks that have one; 0 when none do.
    pub tempo_avg: u32,
    /// Average duration in seconds.
    pub avg_duration: u64,
    /// Normalized Shannon entropy over genres: 0 when uniform or fewer
    /// than two distinct genres, 1 when maximally diverse.
    pub genre_diversity_score: f64,
    pub tempo_ranges: BTreeMap<String, u8>,
    /// Mean raw listener count (absent counts read as 0).
    pub avg_listeners: f64,
    /// Mean combined popularity over tracks that have one; `None` when no
    /// track has a popularity signal. Nulls are excluded, never counted
    /// as 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_popularity: Option<f64>,
    pub outliers: Vec<Outlier>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Outlier {
    pub title: String,
    pub reasons: Vec<OutlierReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierReason {
    Tempo,
    Genre,
    Mood,
    Popularity,
    Year,
}

/// Most common value, `"Unknown"` for an empty input. Ties go to the value
/// seen first.
pub fn most_common(values: &[String]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|entry| entry.0 == value.as_str()) {
            Some(entry) => entry.1 += 1,
            None => counts.push((value, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        // Strictly greater keeps the first-seen value on ties.
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Value -> floor percentage of occurrences.
pub fn percent_distribution(values: &[String]) -> BTreeMap<String, u8> {
    let total = values.len();
    if total == 0 {
        return BTreeMap::new();
    }
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value.clone()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(value, count)| (value, (count * 100 / total) as u8))
        .collect()
}

/// Normalized Shannon entropy of the value distribution, rounded to two
/// decimals. Zero when fewer than two distinct values exist — maximum
/// entropy is undefined there.
pub fn normalized_entropy(values: &[String]) -> f64 {
    let total = values.len();
    if total == 0 {
        return 0.0;
    }
    let mut counts: BTreeMap<&String, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    if counts.len() < 2 {
        return 0.0;
    }
    let entropy: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    let max_entropy = (counts.len() as f64).log2();
    ((entropy / max_entropy) * 100.0).round() / 100.0
}

/// Rounded mean tempo over tracks that have one; 0 when none do.
pub fn average_tempo(tracks: &[EnrichedTrack]) -> u32 {
    let tempos: Vec<u32> = tracks.iter().filter_map(|t| t.tempo).collect();
    if tempos.is_empty() {
        return 0;
    }
    (tempos.iter().map(|&t| t as f64).sum::<f64>() / tempos.len() as f64).round() as u32
}

fn average_duration(tracks: &[EnrichedTrack]) -> u64 {
    if tracks.is_empty() {
        return 0;
    }
    let total: u64 = tracks.iter().map(|t| t.duration).sum();
    (total as f64 / tracks.len() as f64).round() as u64
}

/// Bucket tempos into broad BPM ranges.
pub fn classify_tempo_ranges(tracks: &[EnrichedTrack]) -> BTreeMap<String, u8> {
    let ranges: Vec<String> = tracks
        .iter()
        .filter_map(|t| t.tempo)
        .map(|tempo| {
            if tempo < 90 {
                "<90 BPM"
            } else if tempo <= 120 {
                "90-120 BPM"
            } else {
                ">120 BPM"
            }
            .to_string()
        })
        .collect();
    percent_distribution(&ranges)
}

/// Summarize an enriched batch: distributions, averages, diversity and the
/// top outliers.
pub fn summarize(tracks: &[EnrichedTrack]) -> BatchSummary {
    let genres: Vec<String> = tracks
        .iter()
        .filter(|t| !t.genre.is_empty())
        .map(|t| t.genre.clone())
        .collect();
    let moods: Vec<String> = tracks
        .iter()
        .map(|t| t.mood.map(|m| m.to_string()).unwrap_or_else(|| "unknown".to_string()))
        .collect();
    let decades: Vec<String> = tracks
        .iter()
        .filter(|t| !t.decade.is_empty())
        .map(|t| t.decade.clone())
        .collect();

    let avg_listeners = if tracks.is_empty() {
        0.0
    } else {
        tracks.iter().map(|t| t.popularity as f64).sum::<f64>() / tracks.len() as f64
    };

    let popularity_values: Vec<f64> =
        tracks.iter().filter_map(|t| t.combined_popularity).collect();
    let avg_popularity = if popularity_values.is_empty() {
        None
    } else {
        Some(popularity_values.iter().sum::<f64>() / popularity_values.len() as f64)
    };

    let mut summary = BatchSummary {
        dominant_genre: most_common(&genres),
        mood_profile: percent_distribution(&moods),
        genre_distribution: percent_distribution(&genres),
        decades: percent_distribution(&decades),
        tempo_avg: average_tempo(tracks),
        avg_duration: average_duration(tracks),
        genre_diversity_score: normalized_entropy(&genres),
        tempo_ranges: classify_tempo_ranges(tracks),
        avg_listeners,
        avg_popularity,
        outliers: Vec::new(),
    };
    summary.outliers = detect_outliers(tracks, &summary);
    summary
}

/// Flag tracks that deviate strongly from the batch: up to five of them,
/// most reasons first.
pub fn detect_outliers(tracks: &[EnrichedTrack], summary: &BatchSummary) -> Vec<Outlier> {
    let avg_tempo = summary.tempo_avg as f64;
    let dominant = summary.dominant_genre.to_lowercase();
    let dominant_known = dominant != "unknown";

    let mut outliers: Vec<Outlier> = tracks
        .iter()
        .filter_map(|track| {
            let mut reasons = Vec::new();

            if let Some(tempo) = track.tempo {
                if (tempo as f64 - avg_tempo).abs() > TEMPO_OUTLIER_BPM {
                    reasons.push(OutlierReason::Tempo);
                }
            }
            if dominant_known
                && !track.genre.is_empty()
                && track.genre.to_lowercase() != dominant
            {
                reasons.push(OutlierReason::Genre);
            }
            if track.mood.is_none() || track.mood_confidence < LOW_MOOD_CONFIDENCE {
                reasons.push(OutlierReason::Mood);
            }
            if (track.popularity as f64) < summary.avg_listeners * POPULARITY_OUTLIER_RATIO {
                reasons.push(OutlierReason::Popularity);
            }
            if !track.year_flag.is_empty() {
                reasons.push(OutlierReason::Year);
            }

            if reasons.is_empty() {
                None
            } else {
                Some(Outlier {
                    title: track.title.clone(),
                    reasons,
                })
            }
        })
        .collect();

    outliers.sort_by(|a, b| b.reasons.len().cmp(&a.reasons.len()));
    outliers.truncate(MAX_OUTLIERS);
    outliers
}
