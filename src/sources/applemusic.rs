//! Streaming catalog client (Apple Music API shape).
//!
//! Same contract as the Spotify client: client-credential token acquired
//! once per process, search used only to fill album/year/duration gaps.

use super::{cached_lookup, CatalogTrack, Lookup, StreamingCatalog};
use crate::cache::{lookup_key, TtlCache};
use crate::config::{CacheTtls, CatalogCredentials, HttpTimeouts};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const TOKEN_URL: &str = "https://apple.music.com/api/token";
const SEARCH_URL: &str = "https://api.music.apple.com/v1/catalog/us/search";

pub struct AppleMusicClient {
    client: Client,
    credentials: Option<CatalogCredentials>,
    timeouts: HttpTimeouts,
    token: Mutex<Option<String>>,
    cache: TtlCache<Lookup<CatalogTrack>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Option<SearchResults>,
}

#[derive(Deserialize)]
struct SearchResults {
    songs: Option<SongPage>,
}

#[derive(Deserialize)]
struct SongPage {
    #[serde(default)]
    data: Vec<Song>,
}

#[derive(Deserialize)]
struct Song {
    attributes: Option<SongAttributes>,
}

#[derive(Deserialize)]
struct SongAttributes {
    #[serde(rename = "albumName")]
    album_name: Option<String>,
    #[serde(rename = "releaseDate", default)]
    release_date: String,
    #[serde(rename = "durationInMillis")]
    duration_in_millis: Option<u64>,
}

impl AppleMusicClient {
    pub fn new(
        credentials: Option<CatalogCredentials>,
        timeouts: HttpTimeouts,
        ttls: &CacheTtls,
    ) -> Self {
        Self {
            client: Client::new(),
            credentials,
            timeouts,
            token: Mutex::new(None),
            cache: TtlCache::new(ttls.catalog),
        }
    }

    async fn bearer_token(&self, credentials: &CatalogCredentials) -> Result<String, ()> {
        let mut token = self.token.lock().await;
        if let Some(existing) = token.as_ref() {
            return Ok(existing.clone());
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[("grant_type", "client_credentials")])
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .timeout(self.timeouts.short)
            .send()
            .await
            .map_err(|e| warn!(error = %e, "catalog token fetch failed"))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "catalog token fetch rejected");
            return Err(());
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| warn!(error = %e, "catalog token parse failed"))?;

        match body.access_token {
            Some(fresh) => {
                debug!("acquired catalog bearer token");
                *token = Some(fresh.clone());
                Ok(fresh)
            }
            None => {
                warn!("catalog token response had no access_token");
                Err(())
            }
        }
    }

    async fn search(&self, title: &str, artist: &str, token: &str) -> Lookup<CatalogTrack> {
        let term = format!("{} {}", title, artist);
        let request = self
            .client
            .get(SEARCH_URL)
            .query(&[("term", term.as_str()), ("types", "songs"), ("limit", "1")])
            .bearer_auth(token)
            .timeout(self.timeouts.short);

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(title, artist, error = %e, "catalog search failed");
                return Lookup::Failed;
            }
        };
        if !response.status().is_success() {
            warn!(title, artist, status = %response.status(), "catalog search failed");
            return Lookup::Failed;
        }

        let body: SearchResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(title, artist, error = %e, "catalog response parse failed");
                return Lookup::Failed;
            }
        };

        let attributes = body
            .results
            .and_then(|r| r.songs)
            .map(|s| s.data)
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|song| song.attributes);

        match attributes {
            Some(attributes) => {
                let year = attributes
                    .release_date
                    .chars()
                    .take(4)
                    .collect::<String>()
                    .parse()
                    .ok();
                Lookup::Found(CatalogTrack {
                    album: attributes.album_name,
                    year,
                    duration_ms: attributes.duration_in_millis,
                })
            }
            None => {
                debug!(title, artist, "track not in catalog");
                Lookup::Absent
            }
        }
    }
}

#[async_trait]
impl StreamingCatalog for AppleMusicClient {
    fn name(&self) -> &'static str {
        "apple_music"
    }

    async fn lookup(&self, title: &str, artist: &str) -> Lookup<CatalogTrack> {
        let credentials = match &self.credentials {
            Some(c) => c,
            None => {
                debug!("catalog credentials not configured; skipping");
                return Lookup::Absent;
            }
        };
        let key = lookup_key(title, artist);
        cached_lookup(&self.cache, &key, || async {
            match self.bearer_token(credentials).await {
                Ok(token) => self.search(title, artist, &token).await,
                Err(()) => Lookup::Failed,
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parsing() {
        let body: SearchResponse = serde_json::from_str(
            r#"{
                "results": {
                    "songs": {
                        "data": [{
                            "attributes": {
                                "albumName": "Random Access Memories",
                                "releaseDate": "2013-05-17",
                                "durationInMillis": 369000
                            }
                        }]
                    }
                }
            }"#,
        )
        .unwrap();
        let attributes = body
            .results
            .unwrap()
            .songs
            .unwrap()
            .data
            .into_iter()
            .next()
            .unwrap()
            .attributes
            .unwrap();
        assert_eq!(attributes.album_name.as_deref(), Some("Random Access Memories"));
        assert_eq!(attributes.duration_in_millis, Some(369000));
    }

    #[tokio::test]
    async fn test_lookup_without_credentials_is_absent() {
        let client = AppleMusicClient::new(None, HttpTimeouts::default(), &CacheTtls::default());
        assert_eq!(client.lookup("a", "b").await, Lookup::Absent);
    }
}
