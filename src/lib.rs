//! tracklift - playlist curation core.
//!
//! Enriches tracks from a media library and LLM suggestions with
//! cross-source metadata (genre, mood, tempo, popularity), then scores and
//! summarizes them. The HTTP surface, persistence and prompt templates
//! live in external collaborators; this crate owns the enrichment and
//! popularity-normalization pipeline.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod enrichment;
pub mod genre;
pub mod model;
pub mod mood;
pub mod popularity;
pub mod sources;
pub mod suggestions;

// Re-export the types most callers need.
pub use analysis::{summarize, BatchSummary, Outlier, OutlierReason};
pub use config::{AppConfig, CliConfig, FileConfig};
pub use enrichment::{EnrichError, TrackEnricher};
pub use model::{AudioFeatures, EnrichedTrack, RawTrack};
pub use mood::{Mood, MoodWeights};
pub use popularity::{fuse_popularity, normalize_linear, normalize_log, PopularityConfig};
pub use sources::Lookup;
pub use suggestions::{ScoredSuggestion, SuggestionPipeline};
