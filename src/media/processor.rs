use async_trait::async_trait;
use std::io::Write;
use tracing::{info, debug};

use crate::config::MediaConfig;
use crate::error::{Result, FactoryError};
use super::{MediaProcessorTrait, MediaCommandBuilder, SlideshowRequest, slideshow_filter_graph};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn render_slideshow(&self, request: &SlideshowRequest) -> Result<()> {
        if request.clips.is_empty() {
            return Err(FactoryError::NoContent("slideshow has no clips".to_string()));
        }

        info!("Encoding {} clips ({:.1}s) with {} -> {}",
              request.clips.len(), request.visual_duration(),
              request.audio_path.display(), request.output_path.display());

        if let Some(parent) = request.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Removed when dropped, whichever way the encode ends
        let mut filter_script = tempfile::Builder::new()
            .prefix("slideshow-")
            .suffix(".filter")
            .tempfile()?;
        let graph = slideshow_filter_graph(request.clips.len(), &self.config, request.subtitles.as_deref());
        filter_script.write_all(graph.as_bytes())?;
        filter_script.flush()?;
        debug!("Filter graph: {}", graph);

        let command = self.command_builder.slideshow(request, &self.config, filter_script.path());
        command.execute().await?;

        info!("Slideshow encoding completed successfully");
        Ok(())
    }

    /// Check if media processor is available
    fn check_availability(&self) -> Result<()> {
        let output = std::process::Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .map_err(|e| FactoryError::Config(format!("Media processor not found: {}", e)))?;

        if output.status.success() {
            info!("Media processor is available");
            Ok(())
        } else {
            Err(FactoryError::Config("Media processor version check failed".to_string()))
        }
    }

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let stdout = self.command_builder.version_check().execute().await?;
        // The first line carries the version
        let first_line = stdout.lines().next().unwrap_or("Unknown version");
        Ok(first_line.to_string())
    }
}
