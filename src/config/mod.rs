mod file_config;

pub use file_config::FileConfig;

use crate::mood::MoodWeights;
use crate::popularity::PopularityConfig;
use anyhow::{bail, Result};
use std::time::Duration;

/// CLI arguments that participate in config resolution. Mirrors the subset
/// of CLI flags that the TOML config can override.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub library_url: Option<String>,
    pub library_api_key: Option<String>,
    pub library_user_id: Option<String>,
    pub lastfm_api_key: Option<String>,
    pub lyrics_enabled: bool,
    pub enrich_concurrency: Option<usize>,
}

/// Media library connection settings. Empty values disable the adapter; a
/// missing optional source is a config gap, not an error.
#[derive(Debug, Clone, Default)]
pub struct LibrarySettings {
    pub url: String,
    pub api_key: String,
    pub user_id: String,
}

impl LibrarySettings {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.api_key.is_empty()
    }
}

/// Client-credential pair for a streaming catalog.
#[derive(Debug, Clone)]
pub struct CatalogCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// OpenAI-compatible chat API settings for the lyrics-mood classifier.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Low temperature keeps single-word classifications consistent.
    pub lyrics_temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            lyrics_temperature: 0.4,
        }
    }
}

/// Per-source cache TTLs. BPM data is essentially immutable, so it keeps
/// the longest window; library contents churn the most.
#[derive(Debug, Clone)]
pub struct CacheTtls {
    pub tags: Duration,
    pub track_info: Duration,
    pub bpm: Duration,
    pub library: Duration,
    pub classifier: Duration,
    pub catalog: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        const HOUR: u64 = 60 * 60;
        Self {
            tags: Duration::from_secs(HOUR * 24 * 7),
            track_info: Duration::from_secs(HOUR * 24 * 7),
            bpm: Duration::from_secs(HOUR * 24 * 30),
            library: Duration::from_secs(HOUR * 24),
            classifier: Duration::from_secs(HOUR * 24),
            catalog: Duration::from_secs(HOUR * 24),
        }
    }
}

/// Request timeout classes: short for point lookups, long for search and
/// listing calls.
#[derive(Debug, Clone, Copy)]
pub struct HttpTimeouts {
    pub short: Duration,
    pub long: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(10),
            long: Duration::from_secs(30),
        }
    }
}

/// Immutable application configuration, resolved once and passed by
/// reference into every adapter and the orchestrator.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub library: LibrarySettings,
    /// Empty disables the tag/listener adapter.
    pub lastfm_api_key: String,
    pub songbpm_api_key: Option<String>,
    pub spotify: Option<CatalogCredentials>,
    pub apple_music: Option<CatalogCredentials>,
    pub llm: LlmSettings,
    pub lyrics_enabled: bool,
    pub mood_weights: MoodWeights,
    pub popularity: PopularityConfig,
    pub cache_ttls: CacheTtls,
    pub http: HttpTimeouts,
    pub enrich_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library: LibrarySettings::default(),
            lastfm_api_key: String::new(),
            songbpm_api_key: None,
            spotify: None,
            apple_music: None,
            llm: LlmSettings::default(),
            lyrics_enabled: false,
            mood_weights: MoodWeights::default(),
            popularity: PopularityConfig::default(),
            cache_ttls: CacheTtls::default(),
            http: HttpTimeouts::default(),
            enrich_concurrency: 12,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let library_file = file.library.unwrap_or_default();
        let library = LibrarySettings {
            url: library_file
                .url
                .or_else(|| cli.library_url.clone())
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            api_key: library_file
                .api_key
                .or_else(|| cli.library_api_key.clone())
                .unwrap_or_default(),
            user_id: library_file
                .user_id
                .or_else(|| cli.library_user_id.clone())
                .unwrap_or_default(),
        };

        let lastfm_api_key = file
            .lastfm
            .and_then(|l| l.api_key)
            .or_else(|| cli.lastfm_api_key.clone())
            .unwrap_or_default();

        let songbpm_api_key = file
            .songbpm
            .and_then(|s| s.api_key)
            .filter(|k| !k.is_empty());

        let catalog_credentials = |section: Option<file_config::CatalogCredentialsConfig>| {
            let section = section?;
            match (section.client_id, section.client_secret) {
                (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                    Some(CatalogCredentials {
                        client_id: id,
                        client_secret: secret,
                    })
                }
                _ => None,
            }
        };
        let spotify = catalog_credentials(file.spotify);
        let apple_music = catalog_credentials(file.apple_music);

        let llm_defaults = LlmSettings::default();
        let llm_file = file.llm.unwrap_or_default();
        let llm = LlmSettings {
            base_url: llm_file
                .base_url
                .unwrap_or(llm_defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            api_key: llm_file.api_key.filter(|k| !k.is_empty()),
            model: llm_file.model.unwrap_or(llm_defaults.model),
            lyrics_temperature: llm_file
                .lyrics_temperature
                .unwrap_or(llm_defaults.lyrics_temperature),
        };

        let weight_defaults = MoodWeights::default();
        let weights_file = file.mood_weights.unwrap_or_default();
        let mood_weights = MoodWeights {
            tags: weights_file.tags.unwrap_or(weight_defaults.tags),
            bpm: weights_file.bpm.unwrap_or(weight_defaults.bpm),
            lyrics: weights_file.lyrics.unwrap_or(weight_defaults.lyrics),
        };
        if mood_weights.tags < 0.0 || mood_weights.bpm < 0.0 || mood_weights.lyrics < 0.0 {
            bail!("Mood source weights must be non-negative");
        }

        let pop_defaults = PopularityConfig::default();
        let pop_file = file.popularity.unwrap_or_default();
        let popularity = PopularityConfig {
            global_min_listeners: pop_file
                .global_min_listeners
                .unwrap_or(pop_defaults.global_min_listeners),
            global_max_listeners: pop_file
                .global_max_listeners
                .unwrap_or(pop_defaults.global_max_listeners),
            listeners_weight: pop_file
                .listeners_weight
                .unwrap_or(pop_defaults.listeners_weight),
            play_count_weight: pop_file
                .play_count_weight
                .unwrap_or(pop_defaults.play_count_weight),
        };
        if popularity.global_min_listeners >= popularity.global_max_listeners {
            bail!(
                "global_min_listeners ({}) must be below global_max_listeners ({})",
                popularity.global_min_listeners,
                popularity.global_max_listeners
            );
        }
        if popularity.listeners_weight < 0.0 || popularity.play_count_weight < 0.0 {
            bail!("Popularity weights must be non-negative");
        }

        let ttl_defaults = CacheTtls::default();
        let ttl_file = file.cache_ttl.unwrap_or_default();
        let secs_or = |value: Option<u64>, default: Duration| {
            value.map(Duration::from_secs).unwrap_or(default)
        };
        let cache_ttls = CacheTtls {
            tags: secs_or(ttl_file.tags_secs, ttl_defaults.tags),
            track_info: secs_or(ttl_file.track_info_secs, ttl_defaults.track_info),
            bpm: secs_or(ttl_file.bpm_secs, ttl_defaults.bpm),
            library: secs_or(ttl_file.library_secs, ttl_defaults.library),
            classifier: secs_or(ttl_file.classifier_secs, ttl_defaults.classifier),
            catalog: secs_or(ttl_file.catalog_secs, ttl_defaults.catalog),
        };

        let http_defaults = HttpTimeouts::default();
        let http_file = file.http.unwrap_or_default();
        let http = HttpTimeouts {
            short: secs_or(http_file.short_timeout_secs, http_defaults.short),
            long: secs_or(http_file.long_timeout_secs, http_defaults.long),
        };

        let lyrics_enabled = file.lyrics_enabled.unwrap_or(cli.lyrics_enabled);

        let enrich_concurrency = file
            .enrich_concurrency
            .or(cli.enrich_concurrency)
            .unwrap_or(12);
        if enrich_concurrency == 0 {
            bail!("enrich_concurrency must be at least 1");
        }

        Ok(Self {
            library,
            lastfm_api_key,
            songbpm_api_key,
            spotify,
            apple_music,
            llm,
            lyrics_enabled,
            mood_weights,
            popularity,
            cache_ttls,
            http,
            enrich_concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_cli() -> CliConfig {
        CliConfig {
            library_url: Some("http://media.local:8096/".to_string()),
            library_api_key: Some("key".to_string()),
            library_user_id: Some("user".to_string()),
            lastfm_api_key: Some("lfm".to_string()),
            lyrics_enabled: false,
            enrich_concurrency: None,
        }
    }

    #[test]
    fn test_resolve_cli_only_defaults() {
        let config = AppConfig::resolve(&default_cli(), None).unwrap();
        assert_eq!(config.library.url, "http://media.local:8096");
        assert!(config.library.is_configured());
        assert_eq!(config.lastfm_api_key, "lfm");
        assert!(config.songbpm_api_key.is_none());
        assert!(config.spotify.is_none());
        assert_eq!(config.enrich_concurrency, 12);
        assert_eq!(config.popularity.global_min_listeners, 10_000);
        assert_eq!(config.http.short, Duration::from_secs(10));
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let file: FileConfig = toml::from_str(
            r#"
            lyrics_enabled = true
            enrich_concurrency = 4

            [library]
            url = "http://other:8096"

            [mood_weights]
            lyrics = 2.0

            [popularity]
            play_count_weight = 0.5

            [cache_ttl]
            bpm_secs = 60

            [http]
            long_timeout_secs = 45
            "#,
        )
        .unwrap();

        let config = AppConfig::resolve(&default_cli(), Some(file)).unwrap();
        assert_eq!(config.library.url, "http://other:8096");
        // CLI value survives where TOML is silent.
        assert_eq!(config.library.api_key, "key");
        assert!(config.lyrics_enabled);
        assert_eq!(config.enrich_concurrency, 4);
        assert_eq!(config.mood_weights.lyrics, 2.0);
        assert_eq!(config.mood_weights.tags, 0.7);
        assert_eq!(config.popularity.play_count_weight, 0.5);
        assert_eq!(config.cache_ttls.bpm, Duration::from_secs(60));
        assert_eq!(config.http.long, Duration::from_secs(45));
    }

    #[test]
    fn test_resolve_rejects_zero_concurrency() {
        let file: FileConfig = toml::from_str("enrich_concurrency = 0").unwrap();
        let result = AppConfig::resolve(&default_cli(), Some(file));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("enrich_concurrency"));
    }

    #[test]
    fn test_resolve_rejects_inverted_listener_bounds() {
        let file: FileConfig = toml::from_str(
            "[popularity]\nglobal_min_listeners = 100\nglobal_max_listeners = 100",
        )
        .unwrap();
        assert!(AppConfig::resolve(&default_cli(), Some(file)).is_err());
    }

    #[test]
    fn test_partial_catalog_credentials_are_ignored() {
        let file: FileConfig =
            toml::from_str("[spotify]\nclient_id = \"id-only\"").unwrap();
        let config = AppConfig::resolve(&default_cli(), Some(file)).unwrap();
        assert!(config.spotify.is_none());
    }
}
