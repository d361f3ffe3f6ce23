//! Streaming catalog client (Spotify API shape).
//!
//! The bearer token comes from a client-credentials grant, fetched once and
//! reused for the process lifetime; tokens are service-level state, not
//! per-track, so the TTL cache machinery would be overkill.

use super::{cached_lookup, CatalogTrack, Lookup, StreamingCatalog};
use crate::cache::{lookup_key, TtlCache};
use crate::config::{CacheTtls, CatalogCredentials, HttpTimeouts};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

pub struct SpotifyClient {
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
    tracks: Option<TrackPage>,
}

#[derive(Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    album: Option<SpotifyAlbum>,
    duration_ms: Option<u64>,
}

#[derive(Deserialize)]
struct SpotifyAlbum {
    name: Option<String>,
    #[serde(default)]
    release_date: String,
}

impl SpotifyClient {
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

    /// The process-lifetime bearer token, fetching it on first use.
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
        let query = format!("track:{} artist:{}", title, artist);
        let request = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", "1")])
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

        let track = match body.tracks.map(|t| t.items).unwrap_or_default().into_iter().next() {
            Some(track) => track,
            None => {
                debug!(title, artist, "track not in catalog");
                return Lookup::Absent;
            }
        };

        let (album, year) = match track.album {
            Some(album) => {
                let year = album.release_date.chars().take(4).collect::<String>().parse().ok();
                (album.name, year)
            }
            None => (None, None),
        };
        Lookup::Found(CatalogTrack {
            album,
            year,
            duration_ms: track.duration_ms,
        })
    }
}

#[async_trait]
impl StreamingCatalog for SpotifyClient {
    fn name(&self) -> &'static str {
        "spotify"
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
