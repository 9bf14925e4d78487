// Gladia v2 implementation
//
// upload (multipart) -> audio_url
// transcription request -> result_url
// poll result_url until status == "done"

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{DubError, Result};
use crate::poll::{poll_until, PollPolicy, PollStatus};
use super::TranscriberTrait;

const API_KEY_HEADER: &str = "x-gladia-key";

#[derive(Debug, Clone, Deserialize)]
pub struct GladiaUploadResponse {
    pub audio_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GladiaTranscriptionRequest {
    pub audio_url: String,
    pub translation: bool,
    pub translation_config: GladiaTranslationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct GladiaTranslationConfig {
    pub target_languages: Vec<String>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GladiaJob {
    #[serde(default)]
    pub id: Option<String>,
    pub result_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GladiaPollResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<GladiaResult>,
    #[serde(default)]
    pub error_code: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GladiaResult {
    #[serde(default)]
    pub translation: Option<GladiaTranslation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GladiaTranslation {
    pub results: Vec<GladiaTranslationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GladiaTranslationEntry {
    pub languages: Vec<String>,
    pub full_transcript: String,
}

impl GladiaTranslation {
    /// Transcript registered under `language`. When several entries carry the
    /// same language the last one wins.
    pub fn transcript_for(&self, language: &str) -> Result<String> {
        self.results
            .iter()
            .rev()
            .find(|entry| entry.languages.first().map(String::as_str) == Some(language))
            .map(|entry| entry.full_transcript.clone())
            .ok_or_else(|| DubError::LanguageNotFound {
                language: language.to_string(),
                available: self
                    .results
                    .iter()
                    .filter_map(|entry| entry.languages.first().cloned())
                    .collect(),
            })
    }
}

impl GladiaPollResponse {
    /// Interpret one poll of the result endpoint.
    pub fn into_status(self, language: &str) -> PollStatus<String> {
        match self.status.as_str() {
            "done" => {
                let translation = self.result.and_then(|result| result.translation);
                match translation {
                    Some(translation) => match translation.transcript_for(language) {
                        Ok(transcript) => PollStatus::Done(transcript),
                        Err(e) => PollStatus::Failed(e),
                    },
                    None => PollStatus::Failed(DubError::Transcription(
                        "Transcription finished without a translation result".to_string(),
                    )),
                }
            }
            "error" => PollStatus::Failed(DubError::Transcription(format!(
                "Gladia reported an error (code {})",
                self.error_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ))),
            other => PollStatus::Pending(other.to_string()),
        }
    }
}

pub struct GladiaTranscriber {
    client: Client,
    config: TranscriberConfig,
    api_key: String,
}

impl GladiaTranscriber {
    pub fn new(config: TranscriberConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self { client, config, api_key })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    /// Upload the audio file and return the handle Gladia assigns to it
    async fn upload(&self, audio_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let form = Form::new().part(
            "audio",
            Part::bytes(bytes).file_name(file_name).mime_str("audio/mpeg")?,
        );

        let response = self
            .client
            .post(self.url("/v2/upload"))
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DubError::from_response("Gladia upload", response).await);
        }

        let upload: GladiaUploadResponse = response.json().await?;
        debug!("Uploaded audio to {}", upload.audio_url);
        Ok(upload.audio_url)
    }

    async fn submit(&self, audio_url: String, language: &str) -> Result<GladiaJob> {
        let request = GladiaTranscriptionRequest {
            audio_url,
            translation: true,
            translation_config: GladiaTranslationConfig {
                target_languages: vec![language.to_string()],
                model: self.config.quality.as_str().to_string(),
            },
        };

        info!("Sending transcription request to Gladia");
        let response = self
            .client
            .post(self.url("/v2/transcription/"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DubError::from_response("Gladia transcription", response).await);
        }

        let job: GladiaJob = response.json().await?;
        info!("Transcription job accepted: {}", job.id.as_deref().unwrap_or("<no id>"));
        Ok(job)
    }

    async fn fetch_result(&self, result_url: &str) -> Result<GladiaPollResponse> {
        let response = self
            .client
            .get(result_url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DubError::from_response("Gladia result", response).await);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TranscriberTrait for GladiaTranscriber {
    async fn transcribe_and_translate(
        &self,
        audio_path: &Path,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        info!("Starting Gladia transcription of: {}", audio_path.display());

        let audio_url = self.upload(audio_path).await?;
        let job = self.submit(audio_url, language).await?;

        let policy = PollPolicy::new(self.config.poll_interval(), self.config.max_attempts);
        let result_url = job.result_url.as_str();
        let transcript = poll_until("Transcription", policy, cancel, move || async move {
            let response = self.fetch_result(result_url).await?;
            Ok(response.into_status(language))
        })
        .await?;

        info!("Transcription done ({} characters)", transcript.len());
        Ok(transcript)
    }
}
