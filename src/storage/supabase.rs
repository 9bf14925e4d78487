use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{DubError, Result};
use super::ObjectStoreTrait;

#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

/// Supabase Storage client bound to a single bucket
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, api_key: String, bucket: String) -> Result<Self> {
        if base_url.is_empty() {
            return Err(DubError::Config("Storage URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            bucket,
        })
    }

    fn object_url(&self, object_path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, object_path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("apikey", &self.api_key)
    }
}

#[async_trait]
impl ObjectStoreTrait for SupabaseStorage {
    fn bucket(&self) -> String {
        self.bucket.clone()
    }

    async fn upload(&self, object_path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        debug!("POST {}", self.object_url(object_path));

        let response = self
            .authorized(self.client.post(self.object_url(object_path)))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DubError::from_response("Supabase upload", response).await);
        }

        Ok(())
    }

    fn public_url(&self, object_path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, object_path
        )
    }

    async fn remove(&self, object_paths: &[String]) -> Result<()> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);

        let response = self
            .authorized(self.client.delete(url))
            .json(&RemoveRequest { prefixes: object_paths })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DubError::from_response("Supabase remove", response).await);
        }

        Ok(())
    }
}
