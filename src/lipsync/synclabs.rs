use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::LipSyncConfig;
use crate::error::{DubError, Result};
use crate::poll::{poll_until, PollPolicy, PollStatus};
use super::{LipSyncStatus, LipSyncTrait, Submission};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLabsRequest<'a> {
    pub audio_url: &'a str,
    pub video_url: &'a str,
    pub synergize: bool,
    pub model: &'a str,
}

/// Body of a submit response
#[derive(Debug, Clone, Deserialize)]
pub struct SyncLabsJob {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl SyncLabsJob {
    pub fn status(&self) -> LipSyncStatus {
        let Ok(status) = self.status.as_deref().unwrap_or("PENDING").parse::<LipSyncStatus>();
        status
    }
}

/// Body of a job status response. Only `status` and `url` are read.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncLabsStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl SyncLabsStatus {
    /// Interpret one status poll for `job_id`. Only `PENDING` and `PROCESSING`
    /// keep the loop going; a body without a status is a failure.
    pub fn into_poll_status(self, job_id: &str) -> PollStatus<String> {
        let Some(raw) = self.status else {
            return PollStatus::Failed(DubError::LipSync(format!(
                "Status response for job {} has no status field",
                job_id
            )));
        };

        let Ok(status) = raw.parse::<LipSyncStatus>();
        if !status.is_terminal() {
            return PollStatus::Pending(raw);
        }

        match status {
            LipSyncStatus::Completed => match self.url {
                Some(url) if !url.is_empty() => PollStatus::Done(url),
                _ => PollStatus::Failed(DubError::LipSync(format!(
                    "Job {} completed without a download URL",
                    job_id
                ))),
            },
            other => PollStatus::Failed(DubError::LipSync(format!(
                "Job {} ended with status {:?}",
                job_id, other
            ))),
        }
    }
}

/// SyncLabs lip-sync client
pub struct SyncLabsClient {
    client: Client,
    config: LipSyncConfig,
    api_key: String,
}

impl SyncLabsClient {
    pub fn new(config: LipSyncConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self { client, config, api_key })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    /// Submit a render. 200 is a synchronous answer, 201 an accepted job;
    /// anything else is an error.
    pub async fn submit(&self, audio_url: &str, video_url: &str) -> Result<Submission> {
        let url = self.url("/video");
        info!("Sending request to SyncLabs at {}", url);

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&SyncLabsRequest {
                audio_url,
                video_url,
                synergize: self.config.synergize,
                model: &self.config.model,
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let job: SyncLabsJob = response.json().await?;
                debug!("Synchronous response from SyncLabs: {:?}", job);
                match (job.status(), job.url) {
                    (LipSyncStatus::Completed, Some(url)) if !url.is_empty() => {
                        Ok(Submission::Completed { url })
                    }
                    _ => Ok(Submission::Queued { id: job.id }),
                }
            }
            StatusCode::CREATED => {
                let job: SyncLabsJob = response.json().await?;
                info!("Request accepted, generation in progress (job {})", job.id);
                Ok(Submission::Queued { id: job.id })
            }
            _ => Err(DubError::from_response("SyncLabs submit", response).await),
        }
    }

    pub async fn job_status(&self, job_id: &str) -> Result<SyncLabsStatus> {
        let response = self
            .client
            .get(self.url(&format!("/video/{}", job_id)))
            .header(API_KEY_HEADER, &self.api_key)
            .header("accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DubError::from_response("SyncLabs status", response).await);
        }

        let body = response.text().await?;
        debug!("SyncLabs status for job {}: {}", job_id, body);
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl LipSyncTrait for SyncLabsClient {
    async fn render(
        &self,
        audio_url: &str,
        video_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let job_id = match self.submit(audio_url, video_url).await? {
            Submission::Completed { url } => return Ok(url),
            Submission::Queued { id } => id,
        };

        let policy = PollPolicy::new(self.config.poll_interval(), self.config.max_attempts);
        let job_id = job_id.as_str();
        let url = poll_until("Lip-sync render", policy, cancel, move || async move {
            Ok(self.job_status(job_id).await?.into_poll_status(job_id))
        })
        .await?;

        info!("Lip-sync render completed: {}", url);
        Ok(url)
    }
}
