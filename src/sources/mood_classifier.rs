//! Lyrics-mood classification via an OpenAI-compatible chat API.
//!
//! Works with OpenAI, OpenRouter, vLLM, and any other service implementing
//! the chat completions API. The contract is deliberately narrow: lyrics
//! text in, one lowercase mood word out. Classifications are cached by a
//! content fingerprint of the lyrics (plus model and temperature), not by
//! track identity, so re-tagged files reclassify and duplicates do not.

use super::{cached_lookup, Lookup, MoodClassifier};
use crate::cache::{fingerprint, TtlCache};
use crate::config::{CacheTtls, HttpTimeouts, LlmSettings};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the chat completions API.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timeout")]
    Timeout,
}

pub struct LyricsMoodClassifier {
    client: Client,
    settings: LlmSettings,
    timeouts: HttpTimeouts,
    cache: TtlCache<Lookup<String>>,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

fn classification_prompt(lyrics: &str) -> String {
    format!(
        "You are an expert music analyst.\n\n\
         Analyze the following song lyrics and classify the overall mood of \
         the song in one word, such as 'happy', 'sad', 'chill', 'intense', \
         'romantic', 'dark', 'uplifting', 'nostalgic', 'party'.\n\n\
         Respond with only the mood label and nothing else.\n\n\
         Lyrics:\n{}\n",
        lyrics
    )
}

impl LyricsMoodClassifier {
    pub fn new(settings: LlmSettings, timeouts: HttpTimeouts, ttls: &CacheTtls) -> Self {
        Self {
            client: Client::new(),
            settings,
            timeouts,
            cache: TtlCache::new(ttls.classifier),
        }
    }

    async fn complete(&self, prompt: &str, api_key: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: self.settings.lyrics_temperature,
        };

        debug!(model = %self.settings.model, "sending classification request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .header("Authorization", format!("Bearer {}", api_key))
            .timeout(self.timeouts.long)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn classify_uncached(&self, lyrics: &str, api_key: &str) -> Lookup<String> {
        let prompt = classification_prompt(lyrics);
        match self.complete(&prompt, api_key).await {
            Ok(content) => {
                let mood = content
                    .trim()
                    .trim_matches(|c: char| c == '\'' || c == '"' || c == '.')
                    .to_lowercase();
                if mood.is_empty() {
                    debug!("classifier returned no mood word");
                    Lookup::Absent
                } else {
                    debug!(mood, "lyrics mood classified");
                    Lookup::Found(mood)
                }
            }
            Err(e) => {
                warn!(error = %e, "lyrics mood classification failed");
                Lookup::Failed
            }
        }
    }
}

#[async_trait]
impl MoodClassifier for LyricsMoodClassifier {
    async fn classify(&self, lyrics: &str) -> Lookup<String> {
        if lyrics.trim().is_empty() {
            return Lookup::Absent;
        }
        let api_key = match &self.settings.api_key {
            Some(key) => key.clone(),
            None => {
                debug!("lyrics classifier not configured; skipping");
                return Lookup::Absent;
            }
        };

        let key = fingerprint(&[
            lyrics,
            &self.settings.model,
            &format!("{}", self.settings.lyrics_temperature),
        ]);
        cached_lookup(&self.cache, &key, || self.classify_uncached(lyrics, &api_key)).await
    }
}
