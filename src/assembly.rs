//! Final video assembly.
//!
//! Turns the timing table, the per-scene images and the narration track into
//! one encoded video. Scenes whose image is missing are dropped with a
//! warning; only a table with no usable scene at all is an error. Any other
//! failure is logged and reported as `Ok(false)`.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::{Result, FactoryError};
use crate::media::{Clip, MediaProcessorTrait, SlideshowRequest};
use crate::scene::{TimingEntry, is_safe_scene_id, load_timing_entries};

#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    pub scenes_dir: PathBuf,
    pub audio_path: PathBuf,
    pub timing_path: PathBuf,
    pub output_path: PathBuf,
    pub subtitles: Option<PathBuf>,
}

/// Clips for every timing entry whose `{scene_id}.png` exists, in table order
pub fn collect_clips(entries: &[TimingEntry], scenes_dir: &Path) -> Result<Vec<Clip>> {
    let total = entries.len();
    let mut clips = Vec::with_capacity(total);

    for (idx, entry) in entries.iter().enumerate() {
        if !is_safe_scene_id(&entry.scene_id) {
            warn!("Skipping scene with unusable id '{}'", entry.scene_id);
            continue;
        }

        let image_path = scenes_dir.join(format!("{}.png", entry.scene_id));

        if !image_path.exists() {
            warn!("Image not found: {}", image_path.display());
            continue;
        }

        if !entry.duration.is_finite() || entry.duration <= 0.0 {
            warn!("Skipping {}: invalid duration {}", entry.scene_id, entry.duration);
            continue;
        }

        info!("[{}/{}] {} ({:.1}s)", idx + 1, total, entry.scene_id, entry.duration);
        clips.push(Clip {
            image_path,
            duration: entry.duration,
        });
    }

    if clips.is_empty() {
        return Err(FactoryError::NoContent(format!(
            "none of the {} timed scenes has an image in {}",
            total,
            scenes_dir.display()
        )));
    }

    Ok(clips)
}

pub struct VideoAssembler<'a> {
    media: &'a dyn MediaProcessorTrait,
}

impl<'a> VideoAssembler<'a> {
    pub fn new(media: &'a dyn MediaProcessorTrait) -> Self {
        Self { media }
    }

    /// Encode the video; `Ok(false)` on any failure other than "no usable scenes"
    pub async fn assemble(&self, request: &AssemblyRequest) -> Result<bool> {
        let entries = match load_timing_entries(&request.timing_path).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to load timing data from {}: {}", request.timing_path.display(), e);
                return Ok(false);
            }
        };

        info!("Creating video from {} scenes", entries.len());
        let clips = collect_clips(&entries, &request.scenes_dir)?;

        if !request.audio_path.exists() {
            error!("Audio file not found: {}", request.audio_path.display());
            return Ok(false);
        }

        let slideshow = SlideshowRequest {
            clips,
            audio_path: request.audio_path.clone(),
            subtitles: request.subtitles.clone(),
            output_path: request.output_path.clone(),
        };

        info!("Concatenating {} clips ({:.1}s of picture)", slideshow.clips.len(), slideshow.visual_duration());

        if let Err(e) = self.media.render_slideshow(&slideshow).await {
            error!("Error exporting video: {}", e);
            return Ok(false);
        }

        match tokio::fs::metadata(&request.output_path).await {
            Ok(meta) => info!(
                "Video exported: {} ({:.1} MB)",
                request.output_path.display(),
                meta.len() as f64 / 1024.0 / 1024.0
            ),
            Err(e) => warn!("Encoded video not readable at {}: {}", request.output_path.display(), e),
        }

        Ok(true)
    }
}
