use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Video Factory - AI-powered video generation", long_about = None)]
#[command(after_help = "Example: video-factory generate --prompt 'Create a video about AI'")]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Narration language
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Language {
    Ru,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::En => "en",
        }
    }
}

/// Where the source text comes from
#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct InputArgs {
    /// Text prompt for video generation
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Path to script file
    #[arg(short, long)]
    pub script: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline: script → visuals → voiceover → video
    Generate {
        #[command(flatten)]
        input: InputArgs,

        /// Voice name [default: voiceover.default_voice]
        #[arg(long)]
        voice: Option<String>,

        /// Language [default: voiceover.default_language]
        #[arg(long, value_enum)]
        lang: Option<Language>,

        /// Video style template
        #[arg(long, default_value = "default")]
        style: String,

        /// Disable subtitles
        #[arg(long)]
        no_subtitles: bool,

        /// Output file path (defaults to final-video.mp4 in the run directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Segment text into scenes and write script.json
    Script {
        #[command(flatten)]
        input: InputArgs,

        /// Video style template
        #[arg(long, default_value = "default")]
        style: String,

        /// Output scene file
        #[arg(short, long, default_value = "script.json")]
        output: PathBuf,
    },

    /// Generate one image per scene from a scene file
    Visuals {
        /// Scene file (script.json)
        #[arg(long)]
        scenes: PathBuf,

        /// Directory for {scene_id}.png files
        #[arg(short, long, default_value = "scenes")]
        output_dir: PathBuf,
    },

    /// Synthesize the narration and timing table from a scene file
    Voiceover {
        /// Scene file (script.json)
        #[arg(long)]
        scenes: PathBuf,

        /// Directory for the audio and timing files
        #[arg(short, long, default_value = "audio")]
        output_dir: PathBuf,

        /// Voice name [default: voiceover.default_voice]
        #[arg(long)]
        voice: Option<String>,

        /// Language [default: voiceover.default_language]
        #[arg(long, value_enum)]
        lang: Option<Language>,
    },

    /// Combine scene images, narration and timing into a video
    Assemble {
        /// Directory containing {scene_id}.png files
        #[arg(long)]
        scenes_dir: PathBuf,

        /// Narration audio file
        #[arg(long)]
        audio: PathBuf,

        /// Timing table (timing.json)
        #[arg(long)]
        timing: PathBuf,

        /// Output video file
        #[arg(short, long, default_value = "output.mp4")]
        output: PathBuf,

        /// SRT file to burn into the video
        #[arg(long)]
        subtitles: Option<PathBuf>,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}
