use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{info, debug};

use crate::config::MediaConfig;
use crate::error::{Result, DubError};
use super::{MediaProcessorTrait, MediaCommandBuilder, SplitMedia};

/// ffmpeg-backed media processor
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

/// Output locations for a split, next to the source in `output_dir`.
pub fn split_paths(output_dir: &Path, video_name: &str) -> SplitMedia {
    SplitMedia {
        audio_path: output_dir.join(format!("{}_audio.mp3", video_name)),
        silent_video_path: output_dir.join(format!("{}__without_audio.mp4", video_name)),
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn split_audio_video(
        &self,
        video_path: &Path,
        output_dir: &Path,
        video_name: &str,
    ) -> Result<SplitMedia> {
        if !video_path.exists() {
            return Err(DubError::FileNotFound(video_path.display().to_string()));
        }

        let split = split_paths(output_dir, video_name);

        let command = self.command_builder.extract_audio(
            video_path,
            split.audio_path.as_path(),
            &self.config.audio_options,
        );
        command.execute().await?;
        info!("Audio has been successfully extracted to {}", split.audio_path.display());

        let command = self.command_builder.strip_audio(video_path, split.silent_video_path.as_path());
        command.execute().await?;
        info!(
            "Video with no audio has been successfully extracted to {}",
            split.silent_video_path.display()
        );

        Ok(split)
    }

    async fn check_availability(&self) -> Result<()> {
        self.command_builder
            .version_check()
            .execute()
            .await
            .map_err(|e| DubError::Media(format!("Media processor not available: {}", e)))?;

        info!("Media processor is available");
        Ok(())
    }

    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let output = Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| DubError::Media(format!("Failed to execute media processor: {}", e)))?;

        if output.status.success() {
            let version_info = String::from_utf8_lossy(&output.stdout);
            let first_line = version_info.lines().next().unwrap_or("Unknown version");
            Ok(first_line.to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(DubError::Media(format!("Media processor version check failed: {}", stderr)))
        }
    }
}
