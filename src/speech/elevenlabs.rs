use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SpeechConfig;
use crate::error::{DubError, Result};
use super::{translated_audio_path, SpeechSynthesizerTrait, VoiceGender};

#[derive(Debug, Clone, Serialize)]
pub struct ElevenLabsRequest<'a> {
    pub text: &'a str,
    pub model_id: &'a str,
}

/// ElevenLabs text-to-speech client
pub struct ElevenLabsSynthesizer {
    client: Client,
    config: SpeechConfig,
    api_key: String,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: SpeechConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self { client, config, api_key })
    }

    /// Raw mp3 bytes for `text` spoken by `voice_id`
    pub async fn generate(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.endpoint.trim_end_matches('/'),
            voice_id
        );

        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&ElevenLabsRequest {
                text,
                model_id: &self.config.model,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DubError::from_response("ElevenLabs", response).await);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(DubError::Speech("ElevenLabs returned no audio".to_string()));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizerTrait for ElevenLabsSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        output_dir: &Path,
        video_name: &str,
        gender: VoiceGender,
    ) -> Result<PathBuf> {
        let voice = gender.voice(&self.config);
        info!("Synthesizing {} characters with voice {}", text.len(), voice.name);
        debug!("Speech model: {}", self.config.model);

        let audio = self.generate(text, &voice.id).await?;

        let output_path = translated_audio_path(output_dir, video_name);
        tokio::fs::write(&output_path, &audio).await?;

        info!("Translated audio written to {}", output_path.display());
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn synthesizer(endpoint: String) -> ElevenLabsSynthesizer {
        let mut config = Config::default().speech;
        config.endpoint = endpoint;
        ElevenLabsSynthesizer::new(config, "eleven-key".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_synthesize_writes_audio_for_female_voice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM"))
            .and(header("xi-api-key", "eleven-key"))
            .and(body_json(json!({
                "text": "Hola a todos.",
                "model_id": "eleven_multilingual_v1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = assert_fs::TempDir::new().unwrap();
        let output = synthesizer(server.uri())
            .synthesize("Hola a todos.", dir.path(), "clip", VoiceGender::Female)
            .await
            .unwrap();

        assert_eq!(output, dir.path().join("clip_translated_audio.mp3"));
        assert_eq!(std::fs::read(&output).unwrap(), b"mp3-bytes");
    }

    #[tokio::test]
    async fn test_synthesize_uses_male_voice_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/VR6AewLTigWG4xSOukaG"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"male".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = assert_fs::TempDir::new().unwrap();
        let output = synthesizer(server.uri())
            .synthesize("Hola.", dir.path(), "clip", VoiceGender::from_selector("M"))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"male");
    }

    #[tokio::test]
    async fn test_synthesis_error_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let dir = assert_fs::TempDir::new().unwrap();
        let err = synthesizer(server.uri())
            .synthesize("Hola.", dir.path(), "clip", VoiceGender::Female)
            .await
            .unwrap_err();

        assert!(matches!(err, DubError::UnexpectedStatus { status: 429, .. }));
        assert!(!dir.path().join("clip_translated_audio.mp3").exists());
    }
}
