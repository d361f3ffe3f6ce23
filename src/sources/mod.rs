//! External metadata source adapters.
//!
//! One adapter per third-party source, each behind a small async trait so
//! the orchestrator can run against in-memory fakes. Adapters never
//! propagate transport errors: every lookup resolves to a [`Lookup`] value,
//! and the absent-vs-failed distinction is carried in the type rather than
//! by convention.

mod applemusic;
mod jellyfin;
mod lastfm;
mod mood_classifier;
mod songbpm;
mod spotify;

pub use applemusic::AppleMusicClient;
pub use jellyfin::{strip_lrc_timecodes, JellyfinClient, LibraryTrack};
pub use lastfm::LastfmClient;
pub use mood_classifier::{LlmError, LyricsMoodClassifier};
pub use songbpm::SongBpmClient;
pub use spotify::SpotifyClient;

use crate::cache::TtlCache;
use crate::model::AudioFeatures;
use async_trait::async_trait;
use std::future::Future;

/// Outcome of a source lookup.
///
/// `Absent` means the source was reached and definitively knows nothing
/// about the track — safe to negative-cache. `Failed` means the lookup
/// itself broke (transport, parse, timeout); it degrades to "no data" for
/// the caller but is never cached, so the next request retries.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
    Failed,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Whether this outcome may be cached (anything but `Failed`).
    fn is_cacheable(&self) -> bool {
        !matches!(self, Lookup::Failed)
    }
}

/// Cache-through helper shared by every adapter: serve a live cache entry,
/// otherwise fetch and cache the outcome unless the fetch failed.
pub(crate) async fn cached_lookup<T, F, Fut>(
    cache: &TtlCache<Lookup<T>>,
    key: &str,
    fetch: F,
) -> Lookup<T>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Lookup<T>>,
{
    if let Some(hit) = cache.get(key) {
        return hit;
    }
    let outcome = fetch().await;
    if outcome.is_cacheable() {
        cache.put(key.to_string(), outcome.clone());
    }
    outcome
}

/// Track info from the tag/listener service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackInfo {
    pub listeners: u64,
    pub album: Option<String>,
    pub release_date: String,
}

/// The folded result of the two tag-service calls.
#[derive(Debug, Clone, Default)]
pub struct TagServiceData {
    pub exists: bool,
    pub listeners: u64,
    pub album: Option<String>,
    pub release_date: String,
    /// Top tags, most relevant first.
    pub tags: Vec<String>,
}

/// Basic metadata from a streaming catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogTrack {
    pub album: Option<String>,
    pub year: Option<i32>,
    pub duration_ms: Option<u64>,
}

/// Tag/listener service (Last.fm-shaped).
#[async_trait]
pub trait TagService: Send + Sync {
    /// Top tags for a track, most relevant first. `Found(vec![])` is a
    /// valid answer: the track exists but is untagged.
    async fn top_tags(&self, title: &str, artist: &str) -> Lookup<Vec<String>>;

    /// Listener count and album/release-date info.
    async fn track_info(&self, title: &str, artist: &str) -> Lookup<TrackInfo>;

    /// Run both lookups concurrently and fold them, treating absent pieces
    /// as empty.
    async fn enrich(&self, title: &str, artist: &str) -> TagServiceData {
        let (info, tags) = tokio::join!(self.track_info(title, artist), self.top_tags(title, artist));
        let tags = tags.found().unwrap_or_default();
        match info.found() {
            Some(info) => TagServiceData {
                exists: true,
                listeners: info.listeners,
                album: info.album,
                release_date: info.release_date,
                tags,
            },
            None => TagServiceData {
                tags,
                ..Default::default()
            },
        }
    }
}

/// BPM/audio-feature service (GetSongBPM-shaped).
#[async_trait]
pub trait AudioFeatureService: Send + Sync {
    async fn lookup(&self, title: &str, artist: &str) -> Lookup<AudioFeatures>;
}

/// Media library (Jellyfin-shaped).
#[async_trait]
pub trait MusicLibrary: Send + Sync {
    /// Search by title and confirm the artist by fuzzy containment.
    async fn find_track(&self, title: &str, artist: &str) -> Lookup<LibraryTrack>;

    /// Lyrics for a library track, timecodes stripped. `None` covers both
    /// "no lyrics" and "lyrics disabled/unreachable".
    async fn lyrics_for(&self, track: &LibraryTrack) -> Option<String>;
}

/// Lyrics-text to mood-word classifier.
#[async_trait]
pub trait MoodClassifier: Send + Sync {
    /// One lowercase mood word for the given lyrics.
    async fn classify(&self, lyrics: &str) -> Lookup<String>;
}

/// A streaming catalog used to fill album/year/duration gaps.
#[async_trait]
pub trait StreamingCatalog: Send + Sync {
    fn name(&self) -> &'static str;
    async fn lookup(&self, title: &str, artist: &str) -> Lookup<CatalogTrack>;
}
