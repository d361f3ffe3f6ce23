use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tracklift::analysis::{summarize, BatchSummary};
use tracklift::config::{AppConfig, CliConfig, FileConfig};
use tracklift::enrichment::TrackEnricher;
use tracklift::model::{EnrichedTrack, RawTrack};
use tracklift::sources::{
    AppleMusicClient, JellyfinClient, LastfmClient, LyricsMoodClassifier, SongBpmClient,
    SpotifyClient, StreamingCatalog,
};
use tracklift::suggestions::{ScoredSuggestion, SuggestionPipeline};

#[derive(Parser, Debug)]
#[clap(about = "Enrich and score a batch of tracks against external metadata sources")]
struct CliArgs {
    /// File with one track per line: "Title - Artist [- Album - Year]".
    pub input: PathBuf,

    /// Path to a TOML config file with service credentials and tuning.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Treat the input as LLM suggestion lines
    /// ("Title - Artist - Album - Year - Reason") and run the
    /// validate-then-enrich pipeline instead of plain batch enrichment.
    #[clap(long)]
    pub suggestions: bool,

    /// Maximum number of suggestions to keep after validation.
    #[clap(long, default_value_t = 10)]
    pub count: usize,

    /// Media library base URL.
    #[clap(long)]
    pub library_url: Option<String>,

    /// Media library API key.
    #[clap(long)]
    pub library_api_key: Option<String>,

    /// Media library user ID.
    #[clap(long)]
    pub library_user_id: Option<String>,

    /// Tag/listener service API key.
    #[clap(long)]
    pub lastfm_api_key: Option<String>,

    /// Classify lyrics moods via the configured LLM.
    #[clap(long)]
    pub lyrics: bool,

    /// Maximum concurrent track enrichments.
    #[clap(long)]
    pub concurrency: Option<usize>,

    /// Print only the batch summary, not the per-track records.
    #[clap(long)]
    pub summary_only: bool,
}

#[derive(Serialize)]
struct BatchReport {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tracks: Vec<EnrichedTrack>,
    summary: BatchSummary,
}

#[derive(Serialize)]
struct SuggestionReport {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<ScoredSuggestion>,
    summary: BatchSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        library_url: cli_args.library_url.clone(),
        library_api_key: cli_args.library_api_key.clone(),
        library_user_id: cli_args.library_user_id.clone(),
        lastfm_api_key: cli_args.lastfm_api_key.clone(),
        lyrics_enabled: cli_args.lyrics,
        enrich_concurrency: cli_args.concurrency,
    };
    let config = Arc::new(AppConfig::resolve(&cli_config, file_config)?);

    let lines: Vec<String> = std::fs::read_to_string(&cli_args.input)
        .with_context(|| format!("Failed to read input file: {:?}", cli_args.input))?
        .lines()
        .map(str::to_string)
        .filter(|l| !l.trim().is_empty())
        .collect();
    info!(tracks = lines.len(), "read input");

    let library = Arc::new(JellyfinClient::new(
        config.library.clone(),
        config.http,
        &config.cache_ttls,
        config.lyrics_enabled,
    ));
    let tags = Arc::new(LastfmClient::new(
        config.lastfm_api_key.clone(),
        config.http,
        &config.cache_ttls,
    ));
    let features = Arc::new(SongBpmClient::new(
        config.songbpm_api_key.clone(),
        config.http,
        &config.cache_ttls,
    ));
    let classifier = Arc::new(LyricsMoodClassifier::new(
        config.llm.clone(),
        config.http,
        &config.cache_ttls,
    ));
    // Catalogs in priority order: first hit fills the album/year/duration
    // gaps.
    let catalogs: Vec<Arc<dyn StreamingCatalog>> = vec![
        Arc::new(SpotifyClient::new(
            config.spotify.clone(),
            config.http,
            &config.cache_ttls,
        )),
        Arc::new(AppleMusicClient::new(
            config.apple_music.clone(),
            config.http,
            &config.cache_ttls,
        )),
    ];

    let enricher = Arc::new(TrackEnricher::new(
        config.clone(),
        tags.clone(),
        features,
        classifier,
        catalogs,
    ));

    let output = if cli_args.suggestions {
        let pipeline =
            SuggestionPipeline::new(config.clone(), tags, library, enricher.clone());
        let suggestions = pipeline
            .run(&lines, &HashSet::new(), cli_args.count)
            .await;
        let tracks: Vec<EnrichedTrack> =
            suggestions.iter().map(|s| s.track.clone()).collect();
        let report = SuggestionReport {
            summary: summarize(&tracks),
            suggestions: if cli_args.summary_only {
                Vec::new()
            } else {
                suggestions
            },
        };
        serde_json::to_string_pretty(&report)?
    } else {
        let raws: Vec<RawTrack> = lines
            .iter()
            .map(|l| RawTrack::from_suggestion_line(l))
            .collect();
        let tracks = enricher.enrich_batch(&raws).await;
        let report = BatchReport {
            summary: summarize(&tracks),
            tracks: if cli_args.summary_only { Vec::new() } else { tracks },
        };
        serde_json::to_string_pretty(&report)?
    };

    println!("{}", output);
    Ok(())
}
