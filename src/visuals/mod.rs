// Visual generation
//
// One image per scene, written as `{scene.id}.png`:
// - existing files are kept and never re-requested
// - a failed request is logged; a placeholder is drawn in its place when enabled
// - the stage only fails when no image file exists at all afterwards

pub mod placeholder;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

pub use placeholder::*;
use crate::config::VisualsConfig;
use crate::error::{Result, FactoryError};
use crate::scene::Scene;

/// Image-generation capability used by the visual generator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate a single image and return its encoded bytes
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Prepend the house style to a scene's visual prompt
pub fn augment_prompt(visual_prompt: &str) -> String {
    format!(
        "Premium quality, professional, modern aesthetic.\n\
         Resolution: 1920x1080\n\
         Style: Clean, tech-focused, cinematic\n\
         Lighting: Professional, well-balanced\n\
         Composition: Centered, rule of thirds\n\
         \n\
         {}",
        visual_prompt
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisualOutcome {
    /// File was already on disk
    Existing,
    Generated,
    /// Generation failed and a placeholder was drawn
    Placeholder,
    /// No image file for this scene
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SceneVisual {
    pub scene_id: String,
    pub path: PathBuf,
    pub outcome: VisualOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct VisualReport {
    pub scenes: Vec<SceneVisual>,
}

impl VisualReport {
    /// True when every scene has a real (generated or pre-existing) image
    pub fn all_succeeded(&self) -> bool {
        self.scenes
            .iter()
            .all(|s| matches!(s.outcome, VisualOutcome::Existing | VisualOutcome::Generated))
    }

    pub fn success_count(&self) -> usize {
        self.scenes
            .iter()
            .filter(|s| matches!(s.outcome, VisualOutcome::Existing | VisualOutcome::Generated))
            .count()
    }

    pub fn placeholder_count(&self) -> usize {
        self.scenes.iter().filter(|s| s.outcome == VisualOutcome::Placeholder).count()
    }

    /// Scenes that have an image file on disk, placeholders included
    pub fn image_count(&self) -> usize {
        self.scenes
            .iter()
            .filter(|s| !matches!(s.outcome, VisualOutcome::Failed(_)))
            .count()
    }
}

pub struct VisualGenerator<'a> {
    generator: &'a dyn ImageGenerator,
    delay: Duration,
    placeholder: Option<PlaceholderRenderer>,
}

impl<'a> VisualGenerator<'a> {
    pub fn new(generator: &'a dyn ImageGenerator, config: &VisualsConfig, delay: Duration) -> Self {
        let placeholder = config.placeholder_on_failure.then(|| {
            PlaceholderRenderer::new(config.width, config.height, config.placeholder_font.as_deref())
        });

        Self {
            generator,
            delay,
            placeholder,
        }
    }

    /// Produce `{id}.png` for every scene inside `output_dir`
    pub async fn generate_visuals(&self, scenes: &[Scene], output_dir: &Path) -> Result<VisualReport> {
        fs::create_dir_all(output_dir).await?;

        info!("Generating visuals for {} scenes into {}", scenes.len(), output_dir.display());

        let pb = ProgressBar::new(scenes.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut report = VisualReport::default();
        let total = scenes.len();

        for (idx, scene) in scenes.iter().enumerate() {
            let path = output_dir.join(scene.image_file_name());
            pb.set_message(scene.id.clone());

            if path.exists() {
                info!("[{}/{}] {} already exists, skipping", idx + 1, total, path.display());
                report.scenes.push(SceneVisual {
                    scene_id: scene.id.clone(),
                    path,
                    outcome: VisualOutcome::Existing,
                });
                pb.inc(1);
                continue;
            }

            info!("[{}/{}] Generating image for {}", idx + 1, total, scene.id);
            let outcome = self.generate_one(scene, &path).await;
            report.scenes.push(SceneVisual {
                scene_id: scene.id.clone(),
                path,
                outcome,
            });
            pb.inc(1);

            // Rate limiting between requests, not after the last scene
            if idx + 1 < total && !self.delay.is_zero() {
                info!("Waiting {:.1}s before next generation...", self.delay.as_secs_f64());
                tokio::time::sleep(self.delay).await;
            }
        }

        pb.finish_and_clear();

        info!(
            "Generated {}/{} images ({} placeholders)",
            report.success_count(),
            total,
            report.placeholder_count()
        );

        if total > 0 && report.image_count() == 0 {
            return Err(FactoryError::NoContent(format!(
                "no images were produced for {} scenes",
                total
            )));
        }

        Ok(report)
    }

    async fn generate_one(&self, scene: &Scene, path: &Path) -> VisualOutcome {
        let prompt = augment_prompt(&scene.visual_prompt);

        let error = match self.generator.generate_image(&prompt).await {
            Ok(bytes) => match save_as_png(&bytes, path) {
                Ok(()) => {
                    info!("Image saved: {}", path.display());
                    return VisualOutcome::Generated;
                }
                Err(e) => e,
            },
            Err(e) => e,
        };

        warn!("Error generating image for {}: {}", scene.id, error);

        let Some(renderer) = &self.placeholder else {
            return VisualOutcome::Failed(error.to_string());
        };

        match renderer.render_to_file(&scene.visual_prompt, path) {
            Ok(()) => VisualOutcome::Placeholder,
            Err(e) => {
                warn!("Failed to render placeholder for {}: {}", scene.id, e);
                VisualOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Decode whatever the service returned and store it as PNG
fn save_as_png(bytes: &[u8], path: &Path) -> Result<()> {
    if bytes.is_empty() {
        return Err(FactoryError::Api("Empty image payload".to_string()));
    }
    let img = image::load_from_memory(bytes)?;
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}
