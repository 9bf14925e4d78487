use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::config::DownloadConfig;
use crate::error::{DubError, Result};

/// `{video_name}_final_video.mp4` inside `output_dir`
pub fn final_video_path(output_dir: &Path, video_name: &str) -> PathBuf {
    output_dir.join(format!("{}_final_video.mp4", video_name))
}

/// Streams remote files to disk without holding them in memory
pub struct Downloader {
    client: Client,
    config: DownloadConfig,
}

impl Downloader {
    pub fn new(config: DownloadConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(DubError::Config("download.chunk_size must be positive".to_string()));
        }

        let client = Client::builder()
            .user_agent(concat!("lipdub/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    /// Download `url` to `output_path`, returning the number of bytes written.
    ///
    /// A failure mid-stream leaves the partial file in place.
    pub async fn download(&self, url: &str, output_path: &Path) -> Result<u64> {
        info!("Downloading {} to {}", url, output_path.display());

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DubError::from_response("Download", response).await);
        }

        let progress = match (self.config.show_progress, response.content_length()) {
            (true, Some(length)) => {
                let pb = ProgressBar::new(length);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                {
                    pb.set_style(style.progress_chars("#>-"));
                }
                Some(pb)
            }
            _ => None,
        };

        let file = tokio::fs::File::create(output_path).await?;
        let mut writer = BufWriter::with_capacity(self.config.chunk_size, file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DubError::Download(format!("Stream interrupted: {}", e)))?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if let Some(pb) = &progress {
                pb.set_position(written);
            }
        }

        writer.flush().await?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        debug!("Wrote {} bytes", written);
        info!("Video downloaded successfully: {}", output_path.display());
        Ok(written)
    }
}
