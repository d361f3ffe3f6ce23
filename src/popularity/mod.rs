//! Popularity normalization and cross-source fusion.
//!
//! Listener counts from the tag service span orders of magnitude, so they
//! are normalized on a log scale against fixed global bounds; library play
//! counts live in a small batch-local range and are normalized linearly
//! against the batch min/max. The two signals are then fused with the
//! library side weighted higher — plays in *this* library say more about
//! this user than global fame does.

use crate::model::EnrichedTrack;
use tracing::debug;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Batch-relative popularity weights and global listener bounds.
#[derive(Debug, Clone)]
pub struct PopularityConfig {
    /// Listener count below which a track reads as fully obscure.
    pub global_min_listeners: u64,
    /// Listener count of a globally huge hit; saturates the scale.
    pub global_max_listeners: u64,
    pub listeners_weight: f64,
    pub play_count_weight: f64,
}

impl Default for PopularityConfig {
    fn default() -> Self {
        Self {
            global_min_listeners: 10_000,
            global_max_listeners: 15_000_000,
            listeners_weight: 0.3,
            play_count_weight: 0.7,
        }
    }
}

/// Linear 0-100 normalization. A degenerate range (`min == max`) carries no
/// signal and maps everything to 0 rather than dividing by zero.
pub fn normalize_linear(value: f64, min: f64, max: f64) -> f64 {
    if min == max {
        return 0.0;
    }
    round2(100.0 * (value - min) / (max - min))
}

/// Logarithmic 0-100 normalization for values spanning orders of
/// magnitude. Returns 0 for non-positive values, a non-positive minimum
/// (log undefined) or a degenerate range; otherwise clamps to [0, 100].
pub fn normalize_log(value: f64, min: f64, max: f64) -> f64 {
    if value <= 0.0 || min <= 0.0 || min == max {
        return 0.0;
    }
    let score = 100.0 * (value.log10() - min.log10()) / (max.log10() - min.log10());
    round2(score.clamp(0.0, 100.0))
}

/// Fuse two normalized popularity signals.
///
/// Both present: weighted average. Exactly one present — where "present but
/// zero" counts as absent, a product decision since zero is
/// indistinguishable from "no data" here — that one wins unscaled. Neither:
/// `None`, which must propagate as null and never silently become 0.
pub fn fuse_popularity(
    source_a: Option<f64>,
    source_b: Option<f64>,
    weight_a: f64,
    weight_b: f64,
) -> Option<f64> {
    match (source_a, source_b) {
        (Some(a), Some(b)) if a != 0.0 && b != 0.0 => {
            Some(round2((a * weight_a + b * weight_b) / (weight_a + weight_b)))
        }
        (Some(a), _) if a != 0.0 => Some(round2(a)),
        (_, Some(b)) if b != 0.0 => Some(round2(b)),
        (Some(a), _) => Some(round2(a)),
        (_, Some(b)) => Some(round2(b)),
        (None, None) => None,
    }
}

/// The batch-local play-count range. `Some(0)` play counts participate;
/// tracks outside the library (`None`) do not.
pub fn play_count_range<'a>(
    tracks: impl Iterator<Item = &'a EnrichedTrack>,
) -> (u64, u64) {
    let mut counts = tracks.filter_map(|t| t.jellyfin_play_count);
    match counts.next() {
        None => (0, 0),
        Some(first) => counts.fold((first, first), |(lo, hi), c| (lo.min(c), hi.max(c))),
    }
}

/// Compute one track's combined popularity against the batch play-count
/// range. A source weighted 0 is disabled outright — it must not leak back
/// in through the single-source fallback.
pub fn apply_combined_popularity(
    track: &mut EnrichedTrack,
    range: (u64, u64),
    config: &PopularityConfig,
) {
    let norm_listeners = if track.popularity > 0 && config.listeners_weight > 0.0 {
        Some(normalize_log(
            track.popularity as f64,
            config.global_min_listeners as f64,
            config.global_max_listeners as f64,
        ))
    } else {
        None
    };

    let norm_plays = if config.play_count_weight > 0.0 {
        track
            .jellyfin_play_count
            .map(|c| normalize_linear(c as f64, range.0 as f64, range.1 as f64))
    } else {
        None
    };

    track.combined_popularity = fuse_popularity(
        norm_listeners,
        norm_plays,
        config.listeners_weight,
        config.play_count_weight,
    );

    debug!(
        title = %track.title,
        listeners = track.popularity,
        norm_listeners = ?norm_listeners,
        plays = ?track.jellyfin_play_count,
        norm_plays = ?norm_plays,
        combined = ?track.combined_popularity,
        "combined popularity"
    );
}

/// Two-pass batch scoring: the play-count min/max must be known before any
/// track can be normalized, so this never streams.
pub fn score_batch(tracks: &mut [EnrichedTrack], config: &PopularityConfig) {
    let range = play_count_range(tracks.iter());
    for track in tracks.iter_mut() {
        apply_combined_popularity(track, range, config);
    }
}
