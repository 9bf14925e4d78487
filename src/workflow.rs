use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, Credentials};
use crate::download::{final_video_path, Downloader};
use crate::error::{Result, DubError};
use crate::lipsync::{LipSyncFactory, LipSyncTrait};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait, SplitMedia};
use crate::speech::{SpeechSynthesizerFactory, SpeechSynthesizerTrait, VoiceGender};
use crate::storage::{
    delete_job_media, upload_job_media, JobId, ObjectStoreFactory, ObjectStoreTrait, UploadedMedia,
};
use crate::transcribe::{TranscriberFactory, TranscriberTrait};

/// Inputs of one dubbing run
#[derive(Debug, Clone)]
pub struct JobParams {
    /// Directory holding the source video; every artifact is written here
    pub base_path: PathBuf,
    /// Source file name including extension, e.g. `clip.mp4`
    pub video_file: String,
    /// Target language code, e.g. `es`
    pub language: String,
    pub gender: VoiceGender,
}

impl JobParams {
    pub fn video_path(&self) -> PathBuf {
        self.base_path.join(&self.video_file)
    }

    /// File name up to the first `.`
    pub fn video_name(&self) -> Result<String> {
        let name = self.video_file.split('.').next().unwrap_or_default();
        if name.is_empty() {
            return Err(DubError::Config(format!(
                "Cannot derive a name from video file '{}'",
                self.video_file
            )));
        }
        Ok(name.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct DubResult {
    pub final_video: PathBuf,
    pub download_url: String,
    pub job_id: JobId,
}

pub struct Workflow {
    config: Config,
    media: Box<dyn MediaProcessorTrait>,
    transcriber: Box<dyn TranscriberTrait>,
    speech: Box<dyn SpeechSynthesizerTrait>,
    storage: Box<dyn ObjectStoreTrait>,
    lipsync: Box<dyn LipSyncTrait>,
    downloader: Downloader,
    cancel: CancellationToken,
}

impl Workflow {
    /// Build the production clients. ffmpeg is only probed by `run`, so the
    /// single-stage commands work on hosts without it.
    pub fn new(config: Config, credentials: &Credentials, cancel: CancellationToken) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        let transcriber = TranscriberFactory::create_default(config.transcriber.clone(), credentials)?;
        let speech = SpeechSynthesizerFactory::create_default(config.speech.clone(), credentials)?;
        let storage = ObjectStoreFactory::create_default(config.storage.clone(), credentials)?;
        let lipsync = LipSyncFactory::create_default(config.lipsync.clone(), credentials)?;

        Self::with_services(config, media, transcriber, speech, storage, lipsync, cancel)
    }

    /// Assemble a workflow from already-built service clients
    pub fn with_services(
        config: Config,
        media: Box<dyn MediaProcessorTrait>,
        transcriber: Box<dyn TranscriberTrait>,
        speech: Box<dyn SpeechSynthesizerTrait>,
        storage: Box<dyn ObjectStoreTrait>,
        lipsync: Box<dyn LipSyncTrait>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let downloader = Downloader::new(config.download.clone())?;

        Ok(Self {
            config,
            media,
            transcriber,
            speech,
            storage,
            lipsync,
            downloader,
            cancel,
        })
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(DubError::Cancelled);
        }
        Ok(())
    }

    /// Run the full dubbing pipeline for one video
    pub async fn run(&self, params: &JobParams) -> Result<DubResult> {
        let video_path = params.video_path();
        let video_name = params.video_name()?;

        info!("Processed video name: {}", video_name);
        info!("Video path: {}", video_path.display());
        info!("Output language: {}", params.language);
        info!("Gender: {:?}", params.gender);

        if !video_path.exists() {
            return Err(DubError::FileNotFound(video_path.display().to_string()));
        }

        // Check dependencies
        self.media.check_availability().await?;

        info!("Step 1: Splitting audio and video...");
        let split = self.split(&video_path, &params.base_path, &video_name).await?;

        self.ensure_not_cancelled()?;
        info!("Step 2: Performing speech to text and translation...");
        let translated_text = self.transcribe(&split.audio_path, &params.language).await?;

        self.ensure_not_cancelled()?;
        info!("Step 3: Generating audio from translated text...");
        let translated_audio = self
            .speak(&translated_text, &params.base_path, &video_name, params.gender)
            .await?;

        self.ensure_not_cancelled()?;
        info!("Step 4: Uploading files to storage...");
        let job_id = JobId::generate(self.config.storage.unique_job_ids);
        let uploaded = upload_job_media(
            self.storage.as_ref(),
            &job_id,
            &split.silent_video_path,
            &translated_audio,
        )
        .await?;

        let outcome = self.render_and_download(&uploaded, &params.base_path, &video_name).await;

        info!("Step 7: Deleting files from storage...");
        let cleanup = self.cleanup(&uploaded.object_paths()).await;

        match (outcome, cleanup) {
            (Ok(result), Ok(())) => {
                info!("Pipeline completed. Download link: {}", result.download_url);
                Ok(result)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_error)) => {
                warn!(
                    "Cleanup after failed run also failed, objects {:?} may remain: {}",
                    uploaded.object_paths(),
                    cleanup_error
                );
                Err(e)
            }
        }
    }

    async fn render_and_download(
        &self,
        uploaded: &UploadedMedia,
        base_path: &Path,
        video_name: &str,
    ) -> Result<DubResult> {
        self.ensure_not_cancelled()?;
        info!("Step 5: Performing lip sync...");
        let download_url = self
            .lipsync
            .render(&uploaded.audio.public_url, &uploaded.video.public_url, &self.cancel)
            .await?;

        self.ensure_not_cancelled()?;
        info!("Step 6: Downloading the final video...");
        let final_video = final_video_path(base_path, video_name);
        self.downloader.download(&download_url, &final_video).await?;

        Ok(DubResult {
            final_video,
            download_url,
            job_id: uploaded.job_id.clone(),
        })
    }

    /// Demux `video_path` into `output_dir`
    pub async fn split(&self, video_path: &Path, output_dir: &Path, video_name: &str) -> Result<SplitMedia> {
        self.media.split_audio_video(video_path, output_dir, video_name).await
    }

    /// Transcribe `audio_path` and return the transcript translated into `language`
    pub async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<String> {
        self.transcriber
            .transcribe_and_translate(audio_path, language, &self.cancel)
            .await
    }

    /// Synthesize `text` into `{video_name}_translated_audio.mp3`
    pub async fn speak(
        &self,
        text: &str,
        output_dir: &Path,
        video_name: &str,
        gender: VoiceGender,
    ) -> Result<PathBuf> {
        self.speech.synthesize(text, output_dir, video_name, gender).await
    }

    /// Delete stored objects by path
    pub async fn cleanup(&self, object_paths: &[String]) -> Result<()> {
        delete_job_media(self.storage.as_ref(), object_paths).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lipsync::MockLipSyncTrait;
    use crate::media::{split_paths, MockMediaProcessorTrait};
    use crate::speech::{translated_audio_path, MockSpeechSynthesizerTrait};
    use crate::storage::MockObjectStoreTrait;
    use crate::transcribe::MockTranscriberTrait;
    use mockall::predicate::eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FINAL_BYTES: &[u8] = b"final lip-synced video";

    fn params(base: &Path) -> JobParams {
        JobParams {
            base_path: base.to_path_buf(),
            video_file: "clip.mp4".to_string(),
            language: "es".to_string(),
            gender: VoiceGender::from_selector("F"),
        }
    }

    fn media_mock() -> MockMediaProcessorTrait {
        let mut media = MockMediaProcessorTrait::new();
        media.expect_check_availability().times(1).returning(|| Ok(()));
        media
            .expect_split_audio_video()
            .times(1)
            .returning(|_, dir, name| {
                let split = split_paths(dir, name);
                std::fs::write(&split.audio_path, b"original audio").unwrap();
                std::fs::write(&split.silent_video_path, b"silent video").unwrap();
                Ok(split)
            });
        media
    }

    fn speech_mock() -> MockSpeechSynthesizerTrait {
        let mut speech = MockSpeechSynthesizerTrait::new();
        speech
            .expect_synthesize()
            .withf(|text, _, name, gender| {
                text == "Hola a todos." && name == "clip" && *gender == VoiceGender::Female
            })
            .times(1)
            .returning(|_, dir, name, _| {
                let path = translated_audio_path(dir, name);
                std::fs::write(&path, b"spanish speech").unwrap();
                Ok(path)
            });
        speech
    }

    fn transcriber_mock(result: fn() -> Result<String>) -> MockTranscriberTrait {
        let mut transcriber = MockTranscriberTrait::new();
        transcriber
            .expect_transcribe_and_translate()
            .withf(|audio, language, _| audio.ends_with("clip_audio.mp3") && language == "es")
            .times(1)
            .returning(move |_, _, _| result());
        transcriber
    }

    fn storage_mock(uploads: usize, removes: usize) -> MockObjectStoreTrait {
        let mut storage = MockObjectStoreTrait::new();
        storage.expect_bucket().returning(|| "translation".to_string());
        storage
            .expect_public_url()
            .returning(|p| format!("https://store.test/public/translation/{}", p));
        storage.expect_upload().times(uploads).returning(|_, _, _| Ok(()));
        storage
            .expect_remove()
            .withf(|paths: &[String]| {
                paths.len() == 2 && paths[0].starts_with("audio_") && paths[1].starts_with("video_")
            })
            .times(removes)
            .returning(|_| Ok(()));
        storage
    }

    fn workflow(
        media: MockMediaProcessorTrait,
        transcriber: MockTranscriberTrait,
        speech: MockSpeechSynthesizerTrait,
        storage: MockObjectStoreTrait,
        lipsync: MockLipSyncTrait,
    ) -> Workflow {
        cancellable_workflow(media, transcriber, speech, storage, lipsync, CancellationToken::new())
    }

    fn cancellable_workflow(
        media: MockMediaProcessorTrait,
        transcriber: MockTranscriberTrait,
        speech: MockSpeechSynthesizerTrait,
        storage: MockObjectStoreTrait,
        lipsync: MockLipSyncTrait,
        cancel: CancellationToken,
    ) -> Workflow {
        let mut config = Config::default();
        config.download.show_progress = false;
        Workflow::with_services(
            config,
            Box::new(media),
            Box::new(transcriber),
            Box::new(speech),
            Box::new(storage),
            Box::new(lipsync),
            cancel,
        )
        .unwrap()
    }

    fn source_video(dir: &assert_fs::TempDir) {
        std::fs::write(dir.path().join("clip.mp4"), b"source video").unwrap();
    }

    #[test]
    fn test_job_params_derivation() {
        let params = JobParams {
            base_path: PathBuf::from("/tmp/job1/"),
            video_file: "my.clip.mp4".to_string(),
            language: "es".to_string(),
            gender: VoiceGender::Male,
        };
        assert_eq!(params.video_path(), PathBuf::from("/tmp/job1/my.clip.mp4"));
        assert_eq!(params.video_name().unwrap(), "my");

        let hidden = JobParams { video_file: ".mp4".to_string(), ..params };
        assert!(hidden.video_name().is_err());
    }

    #[tokio::test]
    async fn test_full_run_produces_final_video() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/renders/vid-7.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(FINAL_BYTES.to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = assert_fs::TempDir::new().unwrap();
        source_video(&dir);

        let download_url = format!("{}/renders/vid-7.mp4", server.uri());
        let mut lipsync = MockLipSyncTrait::new();
        let returned_url = download_url.clone();
        lipsync
            .expect_render()
            .withf(|audio, video, _| {
                audio.starts_with("https://store.test/public/translation/audio_")
                    && video.starts_with("https://store.test/public/translation/video_")
            })
            .times(1)
            .returning(move |_, _, _| Ok(returned_url.clone()));

        let workflow = workflow(
            media_mock(),
            transcriber_mock(|| Ok("Hola a todos.".to_string())),
            speech_mock(),
            storage_mock(2, 1),
            lipsync,
        );

        let result = workflow.run(&params(dir.path())).await.unwrap();

        assert_eq!(result.final_video, dir.path().join("clip_final_video.mp4"));
        assert_eq!(result.download_url, download_url);
        assert_eq!(std::fs::read(&result.final_video).unwrap(), FINAL_BYTES);
    }

    #[tokio::test]
    async fn test_failed_render_still_cleans_up() {
        let dir = assert_fs::TempDir::new().unwrap();
        source_video(&dir);

        let mut lipsync = MockLipSyncTrait::new();
        lipsync
            .expect_render()
            .times(1)
            .returning(|_, _, _| Err(DubError::LipSync("Job vid-7 ended with status Failed".to_string())));

        let workflow = workflow(
            media_mock(),
            transcriber_mock(|| Ok("Hola a todos.".to_string())),
            speech_mock(),
            storage_mock(2, 1),
            lipsync,
        );

        let err = workflow.run(&params(dir.path())).await.unwrap_err();
        assert!(matches!(err, DubError::LipSync(_)));
        assert!(!dir.path().join("clip_final_video.mp4").exists());
    }

    #[tokio::test]
    async fn test_missing_translation_stops_before_upload() {
        let dir = assert_fs::TempDir::new().unwrap();
        source_video(&dir);

        let mut speech = MockSpeechSynthesizerTrait::new();
        speech.expect_synthesize().times(0);
        let mut lipsync = MockLipSyncTrait::new();
        lipsync.expect_render().times(0);

        let workflow = workflow(
            media_mock(),
            transcriber_mock(|| {
                Err(DubError::LanguageNotFound {
                    language: "es".to_string(),
                    available: vec!["en".to_string()],
                })
            }),
            speech,
            storage_mock(0, 0),
            lipsync,
        );

        let err = workflow.run(&params(dir.path())).await.unwrap_err();
        assert!(matches!(err, DubError::LanguageNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_source_video() {
        let dir = assert_fs::TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_split_audio_video().times(0);

        let workflow = workflow(
            media,
            MockTranscriberTrait::new(),
            MockSpeechSynthesizerTrait::new(),
            MockObjectStoreTrait::new(),
            MockLipSyncTrait::new(),
        );

        let err = workflow.run(&params(dir.path())).await.unwrap_err();
        assert!(matches!(err, DubError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_cleanup_passes_paths_through() {
        let mut storage = MockObjectStoreTrait::new();
        storage.expect_bucket().returning(|| "translation".to_string());
        storage
            .expect_remove()
            .with(eq(vec!["audio_1.mp3".to_string()]))
            .times(1)
            .returning(|_| Ok(()));

        let workflow = workflow(
            MockMediaProcessorTrait::new(),
            MockTranscriberTrait::new(),
            MockSpeechSynthesizerTrait::new(),
            storage,
            MockLipSyncTrait::new(),
        );

        workflow.cleanup(&["audio_1.mp3".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_stops_before_split() {
        let dir = assert_fs::TempDir::new().unwrap();
        source_video(&dir);

        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_check_availability()
            .times(1)
            .returning(|| Err(DubError::Media("FFmpeg not found".to_string())));
        media.expect_split_audio_video().times(0);

        let workflow = workflow(
            media,
            MockTranscriberTrait::new(),
            MockSpeechSynthesizerTrait::new(),
            MockObjectStoreTrait::new(),
            MockLipSyncTrait::new(),
        );

        let err = workflow.run(&params(dir.path())).await.unwrap_err();
        assert!(matches!(err, DubError::Media(_)));
    }

    #[tokio::test]
    async fn test_cancelled_run_still_removes_uploads() {
        let dir = assert_fs::TempDir::new().unwrap();
        source_video(&dir);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut lipsync = MockLipSyncTrait::new();
        lipsync.expect_render().times(1).returning(move |_, _, _| {
            token.cancel();
            Ok("https://cdn.synclabs.test/vid-7.mp4".to_string())
        });

        let workflow = cancellable_workflow(
            media_mock(),
            transcriber_mock(|| Ok("Hola a todos.".to_string())),
            speech_mock(),
            storage_mock(2, 1),
            lipsync,
            cancel,
        );

        let err = workflow.run(&params(dir.path())).await.unwrap_err();
        assert!(matches!(err, DubError::Cancelled));
        assert!(!dir.path().join("clip_final_video.mp4").exists());
    }

    #[tokio::test]
    async fn test_cleanup_failure_after_successful_render_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/renders/vid-7.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(FINAL_BYTES.to_vec()))
            .mount(&server)
            .await;

        let dir = assert_fs::TempDir::new().unwrap();
        source_video(&dir);

        let mut storage = MockObjectStoreTrait::new();
        storage.expect_bucket().returning(|| "translation".to_string());
        storage
            .expect_public_url()
            .returning(|p| format!("https://store.test/public/translation/{}", p));
        storage.expect_upload().times(2).returning(|_, _, _| Ok(()));
        storage.expect_remove().times(1).returning(|_| {
            Err(DubError::UnexpectedStatus {
                service: "Supabase remove",
                status: 500,
                body: "internal error".to_string(),
            })
        });

        let download_url = format!("{}/renders/vid-7.mp4", server.uri());
        let mut lipsync = MockLipSyncTrait::new();
        lipsync
            .expect_render()
            .times(1)
            .returning(move |_, _, _| Ok(download_url.clone()));

        let workflow = workflow(
            media_mock(),
            transcriber_mock(|| Ok("Hola a todos.".to_string())),
            speech_mock(),
            storage,
            lipsync,
        );

        let err = workflow.run(&params(dir.path())).await.unwrap_err();
        assert!(matches!(err, DubError::UnexpectedStatus { status: 500, .. }));
        assert_eq!(
            std::fs::read(dir.path().join("clip_final_video.mp4")).unwrap(),
            FINAL_BYTES
        );
    }

    #[tokio::test]
    async fn test_cleanup_does_not_need_ffmpeg() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/translation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.media.binary_path = "/nonexistent/ffmpeg".to_string();
        let credentials = Credentials {
            storage_url: server.uri(),
            storage_key: "storage-key".to_string(),
            gladia_key: "gladia-key".to_string(),
            synclabs_key: "sync-key".to_string(),
            elevenlabs_key: "eleven-key".to_string(),
        };

        let workflow = Workflow::new(config, &credentials, CancellationToken::new()).unwrap();
        workflow
            .cleanup(&["audio_1.mp3".to_string(), "video_1.mp4".to_string()])
            .await
            .unwrap();
    }
}
