//! BPM/audio-feature service client (GetSongBPM API shape).
//!
//! The service is optional: without an API key the adapter short-circuits
//! to absent. Numeric fields arrive as strings or numbers depending on the
//! endpoint mood, so parsing goes through `serde_json::Value`.

use super::{cached_lookup, AudioFeatureService, Lookup};
use crate::cache::{lookup_key, TtlCache};
use crate::config::{CacheTtls, HttpTimeouts};
use crate::model::AudioFeatures;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const SONGBPM_API_BASE: &str = "https://api.getsongbpm.com/search/";

pub struct SongBpmClient {
    client: Client,
    api_key: Option<String>,
    timeouts: HttpTimeouts,
    cache: TtlCache<Lookup<AudioFeatures>>,
}

#[derive(Deserialize)]
struct SearchResponse {
    /// A list on hits; an error object when the query matched nothing.
    #[serde(default)]
    search: Value,
}

fn value_as_u32(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().map(|n| n as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_i32(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Number(n) => n.as_i64().map(|n| n as i32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a `"m:ss"` duration into seconds.
fn parse_duration(raw: &str) -> Option<u64> {
    let (minutes, seconds) = raw.trim().split_once(':')?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    Some(minutes * 60 + seconds)
}

impl SongBpmClient {
    pub fn new(api_key: Option<String>, timeouts: HttpTimeouts, ttls: &CacheTtls) -> Self {
        Self {
            client: Client::new(),
            api_key,
            timeouts,
            cache: TtlCache::new(ttls.bpm),
        }
    }

    async fn fetch(&self, title: &str, artist: &str, api_key: &str) -> Lookup<AudioFeatures> {
        let query = format!("song:{} artist:{}", title, artist);
        let url = format!(
            "{}?api_key={}&type=both&lookup={}",
            SONGBPM_API_BASE,
            api_key,
            urlencoding::encode(&query)
        );

        let response = match self.client.get(&url).timeout(self.timeouts.short).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(title, artist, error = %e, "bpm lookup failed");
                return Lookup::Failed;
            }
        };
        if !response.status().is_success() {
            warn!(title, artist, status = %response.status(), "bpm lookup failed");
            return Lookup::Failed;
        }

        let body: SearchResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(title, artist, error = %e, "bpm response parse failed");
                return Lookup::Failed;
            }
        };

        let song = match body.search.as_array().and_then(|songs| songs.first()) {
            Some(song) => song,
            None => {
                debug!(title, artist, "no bpm data for track");
                return Lookup::Absent;
            }
        };

        let features = AudioFeatures {
            bpm: value_as_u32(song.get("tempo")),
            key: song
                .get("key_of")
                .and_then(Value::as_str)
                .map(str::to_string),
            danceability: value_as_u32(song.get("danceability")),
            acousticness: value_as_u32(song.get("acousticness")),
            year: value_as_i32(song.get("album").and_then(|a| a.get("year"))),
            duration: song
                .get("duration")
                .and_then(Value::as_str)
                .and_then(parse_duration),
        };
        debug!(title, artist, ?features, "fetched audio features");
        Lookup::Found(features)
    }
}

#[async_trait]
impl AudioFeatureService for SongBpmClient {
    async fn lookup(&self, title: &str, artist: &str) -> Lookup<AudioFeatures> {
        let api_key = match &self.api_key {
            Some(key) => key.clone(),
            None => {
                debug!("bpm service not configured; skipping");
                return Lookup::Absent;
            }
        };
        let key = lookup_key(title, artist);
        cached_lookup(&self.cache, &key, || self.fetch(title, artist, &api_key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("3:45"), Some(225));
        assert_eq!(parse_duration(" 0:59 "), Some(59));
        assert_eq!(parse_duration("245"), None);
        assert_eq!(parse_duration("x:yz"), None);
    }

    #[test]
    fn test_features_from_stringly_typed_response() {
        let song: Value = serde_json::json!({
            "tempo": "128",
            "key_of": "Am",
            "danceability": 73,
            "acousticness": "12",
            "album": {"year": "2011"},
            "duration": "4:02"
        });
        let features = AudioFeatures {
            bpm: value_as_u32(song.get("tempo")),
            key: song.get("key_of").and_then(Value::as_str).map(str::to_string),
            danceability: value_as_u32(song.get("danceability")),
            acousticness: value_as_u32(song.get("acousticness")),
            year: value_as_i32(song.get("album").and_then(|a| a.get("year"))),
            duration: song.get("duration").and_then(Value::as_str).and_then(parse_duration),
        };
        assert_eq!(features.bpm, Some(128));
        assert_eq!(features.key.as_deref(), Some("Am"));
        assert_eq!(features.danceability, Some(73));
        assert_eq!(features.acousticness, Some(12));
        assert_eq!(features.year, Some(2011));
        assert_eq!(features.duration, Some(242));
    }

    #[test]
    fn test_error_shaped_search_field_reads_as_absent() {
        // The service returns {"search": {"error": "..."}} for no matches;
        // as_array() on a non-array yields nothing to work with.
        let body: SearchResponse =
            serde_json::from_str(r#"{"search": {"error": "no result"}}"#).unwrap();
        assert!(body.search.as_array().is_none());
    }
}
