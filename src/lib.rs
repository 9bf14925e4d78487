//! Lipdub - Automated Video Dubbing Workflow
//!
//! Splits a video with ffmpeg, transcribes and translates its speech with
//! Gladia, voices the translation with ElevenLabs, and has SyncLabs re-render
//! the lips against the new audio. Intermediate media is exchanged through a
//! Supabase storage bucket.

pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod lipsync;
pub mod media;
pub mod poll;
pub mod speech;
pub mod storage;
pub mod transcribe;
pub mod workflow;
