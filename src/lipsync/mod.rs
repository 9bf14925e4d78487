// Lip-sync rendering of the silent video against the translated audio
//
// - SyncLabs: submit a render job, poll it until it is terminal

pub mod synclabs;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use mockall::automock;

pub use synclabs::*;
use crate::config::{Credentials, LipSyncConfig};
use crate::error::Result;

/// Remote render job states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LipSyncStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Rejected,
    Canceled,
    Unknown(String),
}

impl std::str::FromStr for LipSyncStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "PROCESSING" => Self::Processing,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "REJECTED" => Self::Rejected,
            "CANCELED" | "CANCELLED" => Self::Canceled,
            _ => Self::Unknown(s.to_string()),
        })
    }
}

impl LipSyncStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Processing)
    }
}

/// Result of submitting a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The service answered synchronously with a finished render
    Completed { url: String },
    /// The render was queued and must be polled by id
    Queued { id: String },
}

/// Main trait for lip-sync rendering
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LipSyncTrait: Send + Sync {
    /// Render the video at `video_url` against `audio_url` and return the download URL
    async fn render(
        &self,
        audio_url: &str,
        video_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// Factory for creating lip-sync instances
pub struct LipSyncFactory;

impl LipSyncFactory {
    pub fn create_default(
        config: LipSyncConfig,
        credentials: &Credentials,
    ) -> Result<Box<dyn LipSyncTrait>> {
        Ok(Box::new(SyncLabsClient::new(config, credentials.synclabs_key.clone())?))
    }
}
