//! Tag/listener service client (Last.fm API shape).

use super::{cached_lookup, Lookup, TagService, TrackInfo};
use crate::cache::{lookup_key, TtlCache};
use crate::config::{CacheTtls, HttpTimeouts};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

pub struct LastfmClient {
    client: Client,
    api_key: String,
    timeouts: HttpTimeouts,
    tags_cache: TtlCache<Lookup<Vec<String>>>,
    info_cache: TtlCache<Lookup<TrackInfo>>,
}

#[derive(Deserialize)]
struct TopTagsResponse {
    toptags: Option<TopTagsContainer>,
}

#[derive(Deserialize)]
struct TopTagsContainer {
    #[serde(default)]
    tag: Vec<LastfmTag>,
}

#[derive(Deserialize)]
struct LastfmTag {
    name: Option<String>,
}

#[derive(Deserialize)]
struct TrackInfoResponse {
    track: Option<LastfmTrack>,
}

#[derive(Deserialize)]
struct LastfmTrack {
    name: Option<String>,
    artist: Option<serde_json::Value>,
    listeners: Option<String>,
    album: Option<LastfmAlbum>,
}

#[derive(Deserialize)]
struct LastfmAlbum {
    title: Option<String>,
    #[serde(default)]
    releasedate: String,
}

impl LastfmClient {
    pub fn new(api_key: String, timeouts: HttpTimeouts, ttls: &CacheTtls) -> Self {
        Self {
            client: Client::new(),
            api_key,
            timeouts,
            tags_cache: TtlCache::new(ttls.tags),
            info_cache: TtlCache::new(ttls.track_info),
        }
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn fetch_top_tags(&self, title: &str, artist: &str) -> Lookup<Vec<String>> {
        let request = self
            .client
            .get(LASTFM_API_BASE)
            .query(&[
                ("method", "track.getTopTags"),
                ("api_key", self.api_key.as_str()),
                ("artist", artist),
                ("track", title),
                ("format", "json"),
            ])
            .timeout(self.timeouts.short);

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(title, artist, error = %e, "tag fetch failed");
                return Lookup::Failed;
            }
        };
        if !response.status().is_success() {
            warn!(title, artist, status = %response.status(), "tag fetch failed");
            return Lookup::Failed;
        }

        let body: TopTagsResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(title, artist, error = %e, "tag response parse failed");
                return Lookup::Failed;
            }
        };

        let tags: Vec<String> = body
            .toptags
            .map(|t| t.tag)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| t.name)
            .collect();
        debug!(title, artist, count = tags.len(), "fetched tags");
        Lookup::Found(tags)
    }

    async fn fetch_track_info(&self, title: &str, artist: &str) -> Lookup<TrackInfo> {
        let request = self
            .client
            .get(LASTFM_API_BASE)
            .query(&[
                ("method", "track.getInfo"),
                ("api_key", self.api_key.as_str()),
                ("artist", artist),
                ("track", title),
                ("format", "json"),
            ])
            .timeout(self.timeouts.long);

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(title, artist, error = %e, "track info fetch failed");
                return Lookup::Failed;
            }
        };
        if !response.status().is_success() {
            warn!(title, artist, status = %response.status(), "track info fetch failed");
            return Lookup::Failed;
        }

        let body: TrackInfoResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(title, artist, error = %e, "track info parse failed");
                return Lookup::Failed;
            }
        };

        // A response without a named track is the service's way of saying
        // "never heard of it" - a confirmed absence, not a failure.
        match body.track {
            Some(track) if track.name.is_some() && track.artist.is_some() => {
                let listeners = track
                    .listeners
                    .as_deref()
                    .and_then(|l| l.parse().ok())
                    .unwrap_or(0);
                let (album, release_date) = match track.album {
                    Some(album) => (album.title, album.releasedate),
                    None => (None, String::new()),
                };
                Lookup::Found(TrackInfo {
                    listeners,
                    album,
                    release_date,
                })
            }
            _ => {
                debug!(title, artist, "track unknown to tag service");
                Lookup::Absent
            }
        }
    }
}

#[async_trait]
impl TagService for LastfmClient {
    async fn top_tags(&self, title: &str, artist: &str) -> Lookup<Vec<String>> {
        if !self.is_configured() {
            debug!("tag service not configured; skipping");
            return Lookup::Absent;
        }
        let key = format!("tags:{}", lookup_key(title, artist));
        cached_lookup(&self.tags_cache, &key, || self.fetch_top_tags(title, artist)).await
    }

    async fn track_info(&self, title: &str, artist: &str) -> Lookup<TrackInfo> {
        if !self.is_configured() {
            debug!("tag service not configured; skipping");
            return Lookup::Absent;
        }
        let key = format!("info:{}", lookup_key(title, artist));
        cached_lookup(&self.info_cache, &key, || self.fetch_track_info(title, artist)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_info_parsing() {
        let body: TrackInfoResponse = serde_json::from_str(
            r#"{
                "track": {
                    "name": "Halo",
                    "artist": {"name": "Beyoncé"},
                    "listeners": "1523412",
                    "album": {"title": "I Am... Sasha Fierce", "releasedate": "14 Nov 2008"}
                }
            }"#,
        )
        .unwrap();
        let track = body.track.unwrap();
        assert_eq!(track.listeners.as_deref(), Some("1523412"));
        assert_eq!(track.album.as_ref().unwrap().title.as_deref(), Some("I Am... Sasha Fierce"));
    }

    #[test]
    fn test_top_tags_parsing_tolerates_missing_fields() {
        let body: TopTagsResponse =
            serde_json::from_str(r#"{"toptags": {"tag": [{"name": "pop"}, {}]}}"#).unwrap();
        let tags: Vec<String> = body
            .toptags
            .map(|t| t.tag)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| t.name)
            .collect();
        assert_eq!(tags, vec!["pop"]);

        let empty: TopTagsResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(empty.toptags.is_none());
    }
}
