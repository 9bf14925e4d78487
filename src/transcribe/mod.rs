// Speech-to-text with translation
//
// - Gladia: hosted transcription with built-in translation (v2 API)
//
// To add another service, implement `TranscriberTrait` and extend the factory.

pub mod gladia;

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use mockall::automock;

pub use gladia::*;
use crate::config::{Credentials, TranscriberConfig};
use crate::error::Result;

/// Main trait for transcription operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Transcribe the audio file and return the full transcript translated into `language`
    async fn transcribe_and_translate(
        &self,
        audio_path: &Path,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_default(
        config: TranscriberConfig,
        credentials: &Credentials,
    ) -> Result<Box<dyn TranscriberTrait>> {
        Ok(Box::new(GladiaTranscriber::new(config, credentials.gladia_key.clone())?))
    }
}
