//! Media library client (Jellyfin API shape).
//!
//! Searches are by title only; the artist is confirmed afterwards by fuzzy
//! containment against the item's artist list, since library search engines
//! are unreliable on combined queries. Lyrics come from an adjacent `.lrc`
//! file when the item carries a filesystem path, falling back to the
//! structured lyrics endpoint.

use super::{cached_lookup, Lookup, MusicLibrary};
use crate::cache::{lookup_key, TtlCache};
use crate::config::{CacheTtls, HttpTimeouts, LibrarySettings};
use crate::model::{extract_tag_value, RawTrack};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Fields requested on every item search; everything enrichment consumes.
const ITEM_FIELDS: &str = "Name,AlbumArtist,Artists,Album,ProductionYear,PremiereDate,\
                           Genres,RunTimeTicks,UserData,HasLyrics,Path,Tags";

/// A track as the library knows it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryTrack {
    pub item_id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    /// Production year as a string; empty when the library has none.
    pub production_year: String,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub run_time_ticks: u64,
    pub play_count: u64,
    pub has_lyrics: bool,
    pub path: Option<String>,
}

impl From<&LibraryTrack> for RawTrack {
    fn from(track: &LibraryTrack) -> Self {
        RawTrack {
            raw: track.name.clone(),
            title: track.name.clone(),
            artist: track.artists.first().cloned().unwrap_or_default(),
            album: track.album.clone(),
            year: track.production_year.clone(),
            genres: track.genres.clone(),
            lyrics: None,
            tempo: extract_tag_value(&track.tags, "tempo").and_then(|v| v.parse().ok()),
            run_time_ticks: track.run_time_ticks,
            play_count: Some(track.play_count),
        }
    }
}

/// Replace smart quotes with their plain variants before searching; the
/// library stores plain quotes, suggestion text often does not.
pub fn normalize_search_term(term: &str) -> String {
    term.replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201c}', '\u{201d}'], "\"")
}

lazy_static! {
    static ref LRC_TIMECODE: Regex = Regex::new(r"\[[^\]\n]*\]").unwrap();
}

/// Remove `[mm:ss.xx]` style timecodes (and other bracketed LRC metadata)
/// from LRC file contents.
pub fn strip_lrc_timecodes(lrc_text: &str) -> String {
    LRC_TIMECODE.replace_all(lrc_text, "").trim().to_string()
}

pub struct JellyfinClient {
    client: Client,
    settings: LibrarySettings,
    timeouts: HttpTimeouts,
    lyrics_enabled: bool,
    cache: TtlCache<Lookup<LibraryTrack>>,
}

#[derive(Deserialize)]
struct ItemsResponse {
    #[serde(rename = "Items", default)]
    items: Vec<JellyfinItem>,
}

#[derive(Deserialize)]
struct JellyfinItem {
    #[serde(rename = "Id")]
    id: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "AlbumArtist")]
    album_artist: Option<String>,
    #[serde(rename = "Artists", default)]
    artists: Vec<String>,
    #[serde(rename = "Album")]
    album: Option<String>,
    #[serde(rename = "ProductionYear")]
    production_year: Option<i32>,
    #[serde(rename = "PremiereDate")]
    premiere_date: Option<String>,
    #[serde(rename = "Genres", default)]
    genres: Vec<String>,
    #[serde(rename = "Tags", default)]
    tags: Vec<String>,
    #[serde(rename = "RunTimeTicks")]
    run_time_ticks: Option<u64>,
    #[serde(rename = "UserData")]
    user_data: Option<UserData>,
    #[serde(rename = "HasLyrics")]
    has_lyrics: Option<bool>,
    #[serde(rename = "Path")]
    path: Option<String>,
}

#[derive(Deserialize)]
struct UserData {
    #[serde(rename = "PlayCount")]
    play_count: Option<u64>,
}

#[derive(Deserialize)]
struct LyricsResponse {
    #[serde(rename = "Lyrics", default)]
    lyrics: Vec<LyricLine>,
}

#[derive(Deserialize)]
struct LyricLine {
    #[serde(rename = "Text")]
    text: Option<String>,
}

impl JellyfinItem {
    /// Production year, falling back to the first 4 chars of the premiere
    /// date.
    fn year_string(&self) -> String {
        match self.production_year {
            Some(year) => year.to_string(),
            None => self
                .premiere_date
                .as_deref()
                .map(|d| d.chars().take(4).collect())
                .unwrap_or_default(),
        }
    }

    fn into_library_track(self) -> LibraryTrack {
        let year = self.year_string();
        let mut artists = self.artists;
        if let Some(album_artist) = self.album_artist {
            if !artists.contains(&album_artist) {
                artists.insert(0, album_artist);
            }
        }
        LibraryTrack {
            item_id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            artists,
            album: self.album.unwrap_or_default(),
            production_year: year,
            genres: self.genres,
            tags: self.tags,
            run_time_ticks: self.run_time_ticks.unwrap_or(0),
            play_count: self
                .user_data
                .and_then(|u| u.play_count)
                .unwrap_or(0),
            has_lyrics: self.has_lyrics.unwrap_or(false),
            path: self.path,
        }
    }
}

impl JellyfinClient {
    pub fn new(
        settings: LibrarySettings,
        timeouts: HttpTimeouts,
        ttls: &CacheTtls,
        lyrics_enabled: bool,
    ) -> Self {
        Self {
            client: Client::new(),
            settings,
            timeouts,
            lyrics_enabled,
            cache: TtlCache::new(ttls.library),
        }
    }

    async fn search(&self, title: &str, artist: &str) -> Lookup<LibraryTrack> {
        let title_cleaned = normalize_search_term(title);
        let artist_cleaned = normalize_search_term(artist).to_lowercase();
        let url = format!("{}/Items", self.settings.url);

        let request = self
            .client
            .get(&url)
            .query(&[
                ("IncludeItemTypes", "Audio"),
                ("Recursive", "true"),
                ("SearchTerm", title_cleaned.as_str()),
                ("Fields", ITEM_FIELDS),
                ("api_key", self.settings.api_key.as_str()),
                ("userId", self.settings.user_id.as_str()),
            ])
            .timeout(self.timeouts.long);

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(title, artist, error = %e, "library search failed");
                return Lookup::Failed;
            }
        };
        if !response.status().is_success() {
            warn!(title, artist, status = %response.status(), "library search failed");
            return Lookup::Failed;
        }

        let body: ItemsResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(title, artist, error = %e, "library response parse failed");
                return Lookup::Failed;
            }
        };
        debug!(title, artist, candidates = body.items.len(), "library search");

        let title_lower = title_cleaned.to_lowercase();
        for item in body.items {
            let name = normalize_search_term(item.name.as_deref().unwrap_or(""));
            let artist_match = item.artists.iter().chain(item.album_artist.iter()).any(|a| {
                normalize_search_term(a)
                    .to_lowercase()
                    .contains(&artist_cleaned)
            });
            if name.to_lowercase().contains(&title_lower) && artist_match {
                return Lookup::Found(item.into_library_track());
            }
        }

        debug!(title, artist, "track not in library");
        Lookup::Absent
    }

    async fn lyrics_from_lrc(&self, track_path: &str) -> Option<String> {
        let lrc_path = Path::new(track_path).with_extension("lrc");
        match tokio::fs::read_to_string(&lrc_path).await {
            Ok(contents) => {
                let stripped = strip_lrc_timecodes(&contents);
                if stripped.is_empty() {
                    None
                } else {
                    debug!(path = %lrc_path.display(), "loaded adjacent lyrics file");
                    Some(stripped)
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %lrc_path.display(), error = %e, "failed to read lyrics file");
                None
            }
        }
    }

    async fn lyrics_from_endpoint(&self, item_id: &str) -> Option<String> {
        let url = format!("{}/Items/{}/Lyrics", self.settings.url, item_id);
        let request = self
            .client
            .get(&url)
            .query(&[("api_key", &self.settings.api_key)])
            .timeout(self.timeouts.short);

        let response = match request.send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(item_id, status = %r.status(), "no lyrics from library endpoint");
                return None;
            }
            Err(e) => {
                warn!(item_id, error = %e, "lyrics fetch failed");
                return None;
            }
        };

        let body: LyricsResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(item_id, error = %e, "lyrics parse failed");
                return None;
            }
        };

        let lines: Vec<String> = body.lyrics.into_iter().filter_map(|l| l.text).collect();
        if lines.is_empty() {
            None
        } else {
            debug!(item_id, lines = lines.len(), "fetched structured lyrics");
            Some(lines.join("\n"))
        }
    }
}

#[async_trait]
impl MusicLibrary for JellyfinClient {
    async fn find_track(&self, title: &str, artist: &str) -> Lookup<LibraryTrack> {
        if !self.settings.is_configured() {
            debug!("library not configured; skipping");
            return Lookup::Absent;
        }
        let key = lookup_key(title, artist);
        cached_lookup(&self.cache, &key, || self.search(title, artist)).await
    }

    async fn lyrics_for(&self, track: &LibraryTrack) -> Option<String> {
        if !self.lyrics_enabled {
            return None;
        }
        if let Some(path) = &track.path {
            if let Some(lyrics) = self.lyrics_from_lrc(path).await {
                return Some(lyrics);
            }
        }
        if track.has_lyrics && !track.item_id.is_empty() {
            return self.lyrics_from_endpoint(&track.item_id).await;
        }
        None
    }
}
