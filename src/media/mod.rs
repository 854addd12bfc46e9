// Media processing
//
// Thin abstraction over the video encoder:
// - Processor: ffmpeg-backed implementation
// - Commands: command builders and filter graph construction

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::PathBuf;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// One still image shown for a fixed time
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub image_path: PathBuf,
    pub duration: f64,
}

/// Everything needed to encode the final slideshow
#[derive(Debug, Clone, PartialEq)]
pub struct SlideshowRequest {
    /// Clips in display order
    pub clips: Vec<Clip>,
    /// Narration track, attached as-is
    pub audio_path: PathBuf,
    /// SRT file burned into the picture when present
    pub subtitles: Option<PathBuf>,
    pub output_path: PathBuf,
}

impl SlideshowRequest {
    pub fn visual_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration).sum()
    }
}

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Encode clips + audio into one video file
    async fn render_slideshow(&self, request: &SlideshowRequest) -> Result<()>;

    /// Check if media processor is available
    fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
