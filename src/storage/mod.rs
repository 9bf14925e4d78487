// Object storage for the intermediate media handed to the lip-sync service
//
// - Supabase: Storage REST API
//
// The uploader names objects after a per-run job id and the cleanup step
// removes them again once the render is downloaded.

pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

pub use supabase::*;
use crate::config::{Credentials, StorageConfig};
use crate::error::Result;

pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Main trait for a bucket-scoped object store
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStoreTrait: Send + Sync {
    /// Name of the bucket every path is relative to
    fn bucket(&self) -> String;

    /// Store `bytes` at `object_path` with an explicit content type
    async fn upload(&self, object_path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Publicly readable URL of `object_path`
    fn public_url(&self, object_path: &str) -> String;

    /// Delete every listed object in one call
    async fn remove(&self, object_paths: &[String]) -> Result<()>;
}

/// Factory for creating object store instances
pub struct ObjectStoreFactory;

impl ObjectStoreFactory {
    pub fn create_default(
        config: StorageConfig,
        credentials: &Credentials,
    ) -> Result<Box<dyn ObjectStoreTrait>> {
        Ok(Box::new(SupabaseStorage::new(
            &credentials.storage_url,
            credentials.storage_key.clone(),
            config.bucket,
        )?))
    }
}

/// Identifier namespacing one run's uploads.
///
/// Second resolution: two runs started in the same second share an id unless
/// `unique` adds a random suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId(String);

impl JobId {
    pub fn from_datetime(at: DateTime<Local>) -> Self {
        Self(at.format("%Y%m%d%H%M%S").to_string())
    }

    pub fn generate(unique: bool) -> Self {
        let JobId(stamp) = Self::from_datetime(Local::now());
        if unique {
            let suffix = Uuid::new_v4().simple().to_string();
            Self(format!("{}-{}", stamp, &suffix[..8]))
        } else {
            Self(stamp)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn audio_object_path(&self) -> String {
        format!("audio_{}.mp3", self.0)
    }

    pub fn video_object_path(&self) -> String {
        format!("video_{}.mp4", self.0)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An uploaded object and where to read it back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub public_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub job_id: JobId,
    pub audio: StoredObject,
    pub video: StoredObject,
}

impl UploadedMedia {
    pub fn object_paths(&self) -> Vec<String> {
        vec![self.audio.path.clone(), self.video.path.clone()]
    }
}

async fn upload_file(
    store: &dyn ObjectStoreTrait,
    local_path: &Path,
    object_path: String,
    content_type: &str,
) -> Result<StoredObject> {
    let bytes = tokio::fs::read(local_path).await?;
    info!("Uploading {} ({} bytes) as {}", local_path.display(), bytes.len(), object_path);

    store.upload(&object_path, bytes, content_type).await?;

    Ok(StoredObject {
        bucket: store.bucket(),
        public_url: store.public_url(&object_path),
        path: object_path,
    })
}

/// Upload the translated audio and the silent video under `job_id`.
///
/// Both files are read from their local paths. If the video upload fails the
/// already-stored audio object is removed before the error is returned.
pub async fn upload_job_media(
    store: &dyn ObjectStoreTrait,
    job_id: &JobId,
    silent_video_path: &Path,
    translated_audio_path: &Path,
) -> Result<UploadedMedia> {
    let audio = upload_file(
        store,
        translated_audio_path,
        job_id.audio_object_path(),
        AUDIO_CONTENT_TYPE,
    )
    .await?;

    let video = match upload_file(
        store,
        silent_video_path,
        job_id.video_object_path(),
        VIDEO_CONTENT_TYPE,
    )
    .await
    {
        Ok(video) => video,
        Err(e) => {
            if let Err(cleanup) = store.remove(&[audio.path.clone()]).await {
                warn!("Failed to remove {} after upload error: {}", audio.path, cleanup);
            }
            return Err(e);
        }
    };

    Ok(UploadedMedia {
        job_id: job_id.clone(),
        audio,
        video,
    })
}

/// Remove the objects created by `upload_job_media`
pub async fn delete_job_media(store: &dyn ObjectStoreTrait, object_paths: &[String]) -> Result<()> {
    store.remove(object_paths).await?;
    info!("Files deleted from bucket {}: {:?}", store.bucket(), object_paths);
    Ok(())
}
