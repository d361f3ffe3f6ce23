//! Per-track enrichment orchestration.
//!
//! One pass per track: validate, fan out to the sources, resolve the
//! conflicting pieces, fuse the mood, assemble. The only error that can
//! escape is [`EnrichError::MissingMetadata`]; everything an adapter fails
//! to deliver degrades to an absent field.

use crate::config::AppConfig;
use crate::genre::select_genre;
use crate::model::{decade_for_year, EnrichedTrack, RawTrack, TICKS_PER_SECOND};
use crate::mood::{bpm_scores, combine_mood_scores, lyrics_scores, tag_scores, MoodScores};
use crate::popularity::score_batch;
use crate::sources::{
    AudioFeatureService, CatalogTrack, MoodClassifier, StreamingCatalog, TagService,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EnrichError {
    /// Title or artist missing: the track cannot be looked up anywhere.
    /// Batch callers skip the track and keep going.
    #[error("Missing required track metadata (title/artist) for '{raw}'")]
    MissingMetadata { raw: String },
}

pub struct TrackEnricher {
    config: Arc<AppConfig>,
    tags: Arc<dyn TagService>,
    features: Arc<dyn AudioFeatureService>,
    classifier: Arc<dyn MoodClassifier>,
    /// Streaming catalogs in priority order; the first hit wins.
    catalogs: Vec<Arc<dyn StreamingCatalog>>,
}

impl TrackEnricher {
    pub fn new(
        config: Arc<AppConfig>,
        tags: Arc<dyn TagService>,
        features: Arc<dyn AudioFeatureService>,
        classifier: Arc<dyn MoodClassifier>,
        catalogs: Vec<Arc<dyn StreamingCatalog>>,
    ) -> Self {
        Self {
            config,
            tags,
            features,
            classifier,
            catalogs,
        }
    }

    /// First catalog that knows the track, tried in priority order.
    async fn first_catalog_hit(&self, title: &str, artist: &str) -> Option<CatalogTrack> {
        for catalog in &self.catalogs {
            if let Some(track) = catalog.lookup(title, artist).await.found() {
                debug!(catalog = catalog.name(), title, artist, "catalog hit");
                return Some(track);
            }
        }
        None
    }

    async fn lyrics_mood(&self, raw: &RawTrack) -> Option<MoodScores> {
        if !self.config.lyrics_enabled {
            return None;
        }
        let lyrics = raw.lyrics.as_deref()?.trim();
        if lyrics.is_empty() {
            return None;
        }
        let word = self.classifier.classify(lyrics).await.found()?;
        Some(lyrics_scores(&word))
    }

    /// Enrich one track. Fails only on missing title/artist.
    pub async fn enrich_track(&self, raw: &RawTrack) -> Result<EnrichedTrack, EnrichError> {
        if raw.title.trim().is_empty() || raw.artist.trim().is_empty() {
            return Err(EnrichError::MissingMetadata {
                raw: raw.raw.clone(),
            });
        }
        let title = raw.title.as_str();
        let artist = raw.artist.as_str();
        debug!(title, artist, "enriching track");

        let (tag_data, feature_lookup, catalog) = tokio::join!(
            self.tags.enrich(title, artist),
            self.features.lookup(title, artist),
            self.first_catalog_hit(title, artist),
        );
        let features = feature_lookup.found().unwrap_or_default();

        let genre = select_genre(&raw.genres, &tag_data.tags);

        let tempo = features.bpm.or(raw.tempo);

        let duration = if raw.run_time_ticks > 0 {
            raw.run_time_ticks / TICKS_PER_SECOND
        } else if let Some(seconds) = features.duration {
            seconds
        } else {
            catalog
                .as_ref()
                .and_then(|c| c.duration_ms)
                .map(|ms| ms / 1000)
                .unwrap_or(0)
        };

        let library_year: Option<i32> = raw.year.trim().parse().ok();
        let final_year = features
            .year
            .or(library_year)
            .or(catalog.as_ref().and_then(|c| c.year));
        let year_flag = match (features.year, library_year) {
            (Some(bpm_year), Some(lib_year)) if (bpm_year - lib_year).abs() > 1 => {
                format!("SongBPM year {} vs Jellyfin year {}", bpm_year, lib_year)
            }
            _ => String::new(),
        };

        let tag_mood = tag_scores(&tag_data.tags);
        let bpm_mood = bpm_scores(&features);
        let lyrics_mood = self.lyrics_mood(raw).await;
        let (mood, mood_confidence) = combine_mood_scores(
            &tag_mood,
            &bpm_mood,
            lyrics_mood.as_ref(),
            &self.config.mood_weights,
        );

        let album = tag_data
            .album
            .clone()
            .or_else(|| catalog.as_ref().and_then(|c| c.album.clone()))
            .unwrap_or_default();

        Ok(EnrichedTrack {
            raw: raw.raw.clone(),
            title: raw.title.clone(),
            artist: raw.artist.clone(),
            album,
            year: raw.year.clone(),
            genres: raw.genres.clone(),
            lyrics: raw.lyrics.clone(),
            tags: tag_data.tags,
            genre: genre.unwrap_or_else(|| "Unknown".to_string()),
            mood,
            mood_confidence,
            tempo,
            decade: decade_for_year(final_year),
            duration,
            popularity: tag_data.listeners,
            jellyfin_play_count: raw.play_count,
            year_flag,
            combined_popularity: None,
            final_year,
        })
    }

    /// Enrich a batch with bounded concurrency, preserving input order.
    /// Tracks failing validation are skipped, not fatal; the survivors get
    /// their combined popularity scored against the batch.
    pub async fn enrich_batch(&self, raws: &[RawTrack]) -> Vec<EnrichedTrack> {
        let mut enriched: Vec<EnrichedTrack> = stream::iter(raws)
            .map(|raw| async move {
                match self.enrich_track(raw).await {
                    Ok(track) => Some(track),
                    Err(e) => {
                        warn!(raw = %raw.raw, error = %e, "skipping track");
                        None
                    }
                }
            })
            .buffered(self.config.enrich_concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        score_batch(&mut enriched, &self.config.popularity);
        info!(
            requested = raws.len(),
            enriched = enriched.len(),
            "batch enrichment complete"
        );
        enriched
    }
}
