use clap::{Parser, Subcommand, ValueEnum};
use std::io::BufRead;
use std::path::PathBuf;

use crate::config::QualityTier;
use crate::error::{DubError, Result};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dub a video into another language; missing values are asked for interactively
    Dub {
        /// Directory holding the video; all outputs are written here
        #[arg(short, long)]
        base_path: Option<PathBuf>,

        /// Video file name with extension (e.g. video.mp4)
        #[arg(short = 'i', long)]
        video: Option<String>,

        /// Target language for translation (e.g. 'es' for Spanish)
        #[arg(short, long)]
        language: Option<String>,

        /// Voice gender (M/F)
        #[arg(short, long)]
        gender: Option<String>,

        /// Translation quality tier
        #[arg(long, value_enum)]
        quality: Option<QualityArg>,
    },

    /// Split a video into an mp3 audio track and a silent mp4
    Split {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (defaults to the video's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Transcribe an audio file and print the translated transcript
    Transcribe {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Target language for translation
        #[arg(short, long)]
        language: String,

        /// Translation quality tier
        #[arg(long, value_enum)]
        quality: Option<QualityArg>,
    },

    /// Synthesize speech for a text
    Speak {
        /// Text to speak
        #[arg(short, long)]
        text: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Name prefix of the written `{name}_translated_audio.mp3`
        #[arg(short, long)]
        name: String,

        /// Voice gender (M/F)
        #[arg(short, long, default_value = "F")]
        gender: String,
    },

    /// Delete objects left in the storage bucket by an interrupted run
    Cleanup {
        /// Object paths, e.g. audio_20240309070501.mp3
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Write the default configuration as TOML
    InitConfig {
        /// Output file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    /// Fast translation
    Base,
    /// Slower, higher quality translation
    Enhanced,
}

impl From<QualityArg> for QualityTier {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Base => QualityTier::Base,
            QualityArg::Enhanced => QualityTier::Enhanced,
        }
    }
}

/// Read one trimmed answer to `question`. End of input is an error.
pub fn read_answer<R: BufRead>(reader: &mut R, question: &str) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(DubError::Config(format!(
            "No answer to '{}': input closed",
            question.trim_end_matches([':', ' '])
        )));
    }
    Ok(line.trim().to_string())
}
