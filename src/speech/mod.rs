// Text-to-speech for the translated transcript
//
// - ElevenLabs: hosted multilingual synthesis

pub mod elevenlabs;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::warn;

#[cfg(test)]
use mockall::automock;

pub use elevenlabs::*;
use crate::config::{Credentials, SpeechConfig, Voice};
use crate::error::Result;

/// Voice selector given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceGender {
    Male,
    Female,
}

impl VoiceGender {
    /// `"M"` selects the male voice; every other value selects the female one.
    pub fn from_selector(selector: &str) -> Self {
        match selector {
            "M" => Self::Male,
            "F" => Self::Female,
            other => {
                warn!("Unrecognized gender selector '{}', using the female voice", other);
                Self::Female
            }
        }
    }

    pub fn voice<'a>(&self, config: &'a SpeechConfig) -> &'a Voice {
        match self {
            Self::Male => &config.male_voice,
            Self::Female => &config.female_voice,
        }
    }
}

/// `{video_name}_translated_audio.mp3` inside `output_dir`
pub fn translated_audio_path(output_dir: &Path, video_name: &str) -> PathBuf {
    output_dir.join(format!("{}_translated_audio.mp3", video_name))
}

/// Main trait for speech synthesis
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechSynthesizerTrait: Send + Sync {
    /// Synthesize `text` and write it to `{video_name}_translated_audio.mp3` in `output_dir`
    async fn synthesize(
        &self,
        text: &str,
        output_dir: &Path,
        video_name: &str,
        gender: VoiceGender,
    ) -> Result<PathBuf>;
}

/// Factory for creating synthesizer instances
pub struct SpeechSynthesizerFactory;

impl SpeechSynthesizerFactory {
    pub fn create_default(
        config: SpeechConfig,
        credentials: &Credentials,
    ) -> Result<Box<dyn SpeechSynthesizerTrait>> {
        Ok(Box::new(ElevenLabsSynthesizer::new(config, credentials.elevenlabs_key.clone())?))
    }
}
