use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Top-level settings (can override CLI)
    pub lyrics_enabled: Option<bool>,
    pub enrich_concurrency: Option<usize>,

    // Per-service sections
    pub library: Option<LibraryConfig>,
    pub lastfm: Option<LastfmConfig>,
    pub songbpm: Option<SongBpmConfig>,
    pub spotify: Option<CatalogCredentialsConfig>,
    pub apple_music: Option<CatalogCredentialsConfig>,
    pub llm: Option<LlmConfig>,

    // Tuning sections
    pub mood_weights: Option<MoodWeightsConfig>,
    pub popularity: Option<PopularityFileConfig>,
    pub cache_ttl: Option<CacheTtlConfig>,
    pub http: Option<HttpConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LibraryConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LastfmConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SongBpmConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CatalogCredentialsConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub lyrics_temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MoodWeightsConfig {
    pub tags: Option<f64>,
    pub bpm: Option<f64>,
    pub lyrics: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PopularityFileConfig {
    pub global_min_listeners: Option<u64>,
    pub global_max_listeners: Option<u64>,
    pub listeners_weight: Option<f64>,
    pub play_count_weight: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CacheTtlConfig {
    pub tags_secs: Option<u64>,
    pub track_info_secs: Option<u64>,
    pub bpm_secs: Option<u64>,
    pub library_secs: Option<u64>,
    pub classifier_secs: Option<u64>,
    pub catalog_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub short_timeout_secs: Option<u64>,
    pub long_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
