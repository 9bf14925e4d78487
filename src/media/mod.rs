// Media demuxing
//
// - Processor: ffmpeg-backed splitter behind a trait
// - Commands: command builders and abstractions

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[cfg(test)]
use mockall::automock;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Files produced by splitting a video into its audio and picture tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitMedia {
    /// Extracted audio track (mp3)
    pub audio_path: PathBuf,
    /// Video with the audio track removed (mp4)
    pub silent_video_path: PathBuf,
}

/// Main trait for media processing operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Write `{video_name}_audio.mp3` and `{video_name}__without_audio.mp4` into `output_dir`
    async fn split_audio_video(
        &self,
        video_path: &Path,
        output_dir: &Path,
        video_name: &str,
    ) -> Result<SplitMedia>;

    /// Check if media processor is available
    async fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
