//! LLM suggestion handling: output-contract parsing, validation against
//! the tag service, and enrichment into scored suggestions.
//!
//! The prompt side of the LLM collaborator is not this crate's concern;
//! only its output contract is: one suggestion per line, formatted as
//! `"Title - Artist - Album - Year - Reason"`.

use crate::config::AppConfig;
use crate::enrichment::TrackEnricher;
use crate::model::{EnrichedTrack, RawTrack};
use crate::popularity::{apply_combined_popularity, play_count_range};
use crate::sources::{Lookup, MusicLibrary, TagService};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq)]
pub enum SuggestionError {
    #[error("Incomplete suggestion line: '{0}'")]
    IncompleteLine(String),
}

/// Split a full suggestion line into the 4-field track text and the
/// trailing reason. Lines with fewer than five ` - ` fields are rejected.
pub fn parse_suggestion_line(line: &str) -> Result<(String, String), SuggestionError> {
    let parts: Vec<&str> = line.splitn(5, " - ").map(str::trim).collect();
    if parts.len() < 5 {
        return Err(SuggestionError::IncompleteLine(line.to_string()));
    }
    Ok((parts[..4].join(" - "), parts[4].to_string()))
}

/// Pull `(title, artist)` out of a suggestion line; `None` when even those
/// two fields are missing.
pub fn parse_candidate(line: &str) -> Option<(String, String)> {
    let mut parts = line.split(" - ").map(str::trim);
    let title = parts.next().filter(|t| !t.is_empty())?;
    let artist = parts.next().filter(|a| !a.is_empty())?;
    Some((title.to_string(), artist.to_string()))
}

/// Human-friendly label for a 0-100 popularity score.
pub fn describe_popularity(score: f64) -> &'static str {
    if score >= 90.0 {
        "Global smash hit"
    } else if score >= 70.0 {
        "Mainstream favorite"
    } else if score >= 50.0 {
        "Moderately mainstream"
    } else if score >= 30.0 {
        "Niche appeal"
    } else {
        "Obscure or local"
    }
}

/// A suggestion line that survived parsing and tag-service validation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub title: String,
    pub artist: String,
    /// The full original line, reason included.
    pub text: String,
    /// Listener count recorded at validation time.
    pub popularity: u64,
}

/// A fully enriched, popularity-scored suggestion.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredSuggestion {
    /// The 4-field track text, reason stripped.
    pub text: String,
    pub reason: String,
    pub in_library: bool,
    pub track: EnrichedTrack,
}

pub struct SuggestionPipeline {
    config: Arc<AppConfig>,
    tags: Arc<dyn TagService>,
    library: Arc<dyn MusicLibrary>,
    enricher: Arc<TrackEnricher>,
}

impl SuggestionPipeline {
    pub fn new(
        config: Arc<AppConfig>,
        tags: Arc<dyn TagService>,
        library: Arc<dyn MusicLibrary>,
        enricher: Arc<TrackEnricher>,
    ) -> Self {
        Self {
            config,
            tags,
            library,
            enricher,
        }
    }

    /// Validate raw suggestion lines: parseable, not among the seed
    /// tracks, and known to the tag service. At most `count` survivors, in
    /// input order.
    ///
    /// A confirmed-unknown track is dropped — the LLM likely invented it.
    /// A failed lookup keeps the candidate with zero popularity; a flaky
    /// tag service should not throw suggestions away.
    pub async fn validate(
        &self,
        lines: &[String],
        exclude: &HashSet<(String, String)>,
        count: usize,
    ) -> Vec<Candidate> {
        let parsed: Vec<(String, String, String)> = lines
            .iter()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    return None;
                }
                let (title, artist) = parse_candidate(line)?;
                if exclude.contains(&(title.clone(), artist.clone())) {
                    debug!(title, artist, "suggestion already in seed set");
                    return None;
                }
                Some((title, artist, line.to_string()))
            })
            .collect();

        let mut candidates: Vec<Candidate> = stream::iter(parsed)
            .map(|(title, artist, text)| async move {
                match self.tags.track_info(&title, &artist).await {
                    Lookup::Found(info) => Some(Candidate {
                        title,
                        artist,
                        text,
                        popularity: info.listeners,
                    }),
                    Lookup::Absent => {
                        debug!(title, artist, "dropping unverifiable suggestion");
                        None
                    }
                    Lookup::Failed => Some(Candidate {
                        title,
                        artist,
                        text,
                        popularity: 0,
                    }),
                }
            })
            .buffered(self.config.enrich_concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        info!(
            submitted = lines.len(),
            valid = candidates.len(),
            "validated suggestions"
        );
        candidates.truncate(count);
        candidates
    }

    async fn enrich_one(&self, candidate: Candidate) -> Option<ScoredSuggestion> {
        let (text, reason) = match parse_suggestion_line(&candidate.text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "skipping suggestion");
                return None;
            }
        };

        let library_track = self
            .library
            .find_track(&candidate.title, &candidate.artist)
            .await
            .found();
        let in_library = library_track.is_some();

        let raw = match &library_track {
            Some(found) => RawTrack {
                raw: candidate.text.clone(),
                title: candidate.title.clone(),
                artist: candidate.artist.clone(),
                genres: found.genres.clone(),
                run_time_ticks: found.run_time_ticks,
                play_count: Some(found.play_count),
                ..Default::default()
            },
            None => RawTrack {
                raw: candidate.text.clone(),
                title: candidate.title.clone(),
                artist: candidate.artist.clone(),
                ..Default::default()
            },
        };

        match self.enricher.enrich_track(&raw).await {
            Ok(track) => Some(ScoredSuggestion {
                text,
                reason,
                in_library,
                track,
            }),
            Err(e) => {
                warn!(raw = %candidate.text, error = %e, "skipping suggestion");
                None
            }
        }
    }

    /// Enrich validated candidates, sort library members first and score
    /// the batch's combined popularity.
    pub async fn enrich(&self, candidates: Vec<Candidate>) -> Vec<ScoredSuggestion> {
        let mut suggestions: Vec<ScoredSuggestion> = stream::iter(candidates)
            .map(|candidate| self.enrich_one(candidate))
            .buffered(self.config.enrich_concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        suggestions.sort_by_key(|s| !s.in_library);

        let range = play_count_range(suggestions.iter().map(|s| &s.track));
        for suggestion in &mut suggestions {
            apply_combined_popularity(&mut suggestion.track, range, &self.config.popularity);
        }
        suggestions
    }

    /// Full pipeline: validate then enrich.
    pub async fn run(
        &self,
        lines: &[String],
        exclude: &HashSet<(String, String)>,
        count: usize,
    ) -> Vec<ScoredSuggestion> {
        let candidates = self.validate(lines, exclude, count).await;
        self.enrich(candidates).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suggestion_line_contract() {
        let (text, reason) = parse_suggestion_line(
            "Halo - Beyoncé - I Am... Sasha Fierce - 2008 - Soaring pop ballad",
        )
        .unwrap();
        assert_eq!(text, "Halo - Beyoncé - I Am... Sasha Fierce - 2008");
        assert_eq!(reason, "Soaring pop ballad");
    }

    #[test]
    fn test_parse_suggestion_line_keeps_extra_separators_in_reason() {
        let (text, reason) =
            parse_suggestion_line("A - B - C - 1999 - moody - with dashes").unwrap();
        assert_eq!(text, "A - B - C - 1999");
        assert_eq!(reason, "moody - with dashes");
    }

    #[test]
    fn test_parse_suggestion_line_rejects_short_lines() {
        let result = parse_suggestion_line("Halo - Beyoncé");
        assert_eq!(
            result,
            Err(SuggestionError::IncompleteLine("Halo - Beyoncé".to_string()))
        );
    }

    #[test]
    fn test_parse_candidate() {
        assert_eq!(
            parse_candidate("Halo - Beyoncé - whatever"),
            Some(("Halo".to_string(), "Beyoncé".to_string()))
        );
        assert_eq!(parse_candidate("Just a title"), None);
        assert_eq!(parse_candidate("Title -  "), None);
    }

    #[test]
    fn test_describe_popularity_bands() {
        assert_eq!(describe_popularity(95.0), "Global smash hit");
        assert_eq!(describe_popularity(70.0), "Mainstream favorite");
        assert_eq!(describe_popularity(55.5), "Moderately mainstream");
        assert_eq!(describe_popularity(30.0), "Niche appeal");
        assert_eq!(describe_popularity(2.0), "Obscure or local");
    }
}
