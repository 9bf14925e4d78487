use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::{Result, DubError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub speech: SpeechConfig,
    pub storage: StorageConfig,
    pub lipsync: LipSyncConfig,
    pub media: MediaConfig,
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Gladia API base URL
    pub endpoint: String,
    /// Translation quality tier
    pub quality: QualityTier,
    /// Seconds between result polls
    pub poll_interval_secs: u64,
    /// Give up after this many polls (unbounded when absent)
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Base: fast translation
    Base,
    /// Enhanced: slower but better quality
    Enhanced,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Enhanced => "enhanced",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// ElevenLabs API base URL
    pub endpoint: String,
    /// Synthesis model identifier
    pub model: String,
    /// Voice used for the male selector
    pub male_voice: Voice,
    /// Voice used for every other selector
    pub female_voice: Voice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket holding the intermediate media
    pub bucket: String,
    /// Append a random suffix to job ids so runs started in the same second do not collide
    #[serde(default)]
    pub unique_job_ids: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LipSyncConfig {
    /// SyncLabs API base URL
    pub endpoint: String,
    /// Render model identifier
    pub model: String,
    pub synergize: bool,
    /// Seconds between job status polls
    pub poll_interval_secs: u64,
    /// Give up after this many polls (unbounded when absent)
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Additional options for the audio extraction pass
    /// e.g. ["-q:a", "0"] for the best VBR quality
    pub audio_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Bytes buffered before each write to disk
    pub chunk_size: usize,
    /// Show a progress bar while downloading
    pub show_progress: bool,
}

impl TranscriberConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl LipSyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transcriber: TranscriberConfig {
                endpoint: "https://api.gladia.io".to_string(),
                quality: QualityTier::Base,
                poll_interval_secs: 1,
                max_attempts: Some(600),
            },
            speech: SpeechConfig {
                endpoint: "https://api.elevenlabs.io".to_string(),
                model: "eleven_multilingual_v1".to_string(),
                male_voice: Voice {
                    name: "Arnold".to_string(),
                    id: "VR6AewLTigWG4xSOukaG".to_string(),
                },
                female_voice: Voice {
                    name: "Rachel".to_string(),
                    id: "21m00Tcm4TlvDq8ikWAM".to_string(),
                },
            },
            storage: StorageConfig {
                bucket: "translation".to_string(),
                unique_job_ids: false,
            },
            lipsync: LipSyncConfig {
                endpoint: "https://api.synclabs.so".to_string(),
                model: "sync-1.5-beta".to_string(),
                synergize: true,
                poll_interval_secs: 10,
                max_attempts: Some(360),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                audio_options: vec![
                    "-q:a".to_string(), "2".to_string(),
                ],
            },
            download: DownloadConfig {
                chunk_size: 1024 * 1024,
                show_progress: true,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DubError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DubError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DubError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

/// API keys and the storage endpoint, read once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub storage_url: String,
    pub storage_key: String,
    pub gladia_key: String,
    pub synclabs_key: String,
    pub elevenlabs_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("storage_url", &self.storage_url)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub const STORAGE_URL: &'static str = "SUPABASE_URL";
    pub const STORAGE_KEY: &'static str = "SUPABASE_KEY";
    pub const GLADIA_KEY: &'static str = "GLADIA_KEY";
    pub const SYNCLABS_KEY: &'static str = "SYNCLABS_API_KEY";
    pub const ELEVENLABS_KEY: &'static str = "ELEVENLABS_API_KEY";

    /// Read every credential from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from an arbitrary variable lookup, reporting all
    /// missing names at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut get = |name: &'static str| match lookup(name) {
            Some(value) if !value.trim().is_empty() => value,
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let credentials = Self {
            storage_url: get(Self::STORAGE_URL).trim_end_matches('/').to_string(),
            storage_key: get(Self::STORAGE_KEY),
            gladia_key: get(Self::GLADIA_KEY),
            synclabs_key: get(Self::SYNCLABS_KEY),
            elevenlabs_key: get(Self::ELEVENLABS_KEY),
        };

        if !missing.is_empty() {
            return Err(DubError::Config(format!(
                "Missing environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(credentials)
    }
}
