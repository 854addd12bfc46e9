use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::assembly::{AssemblyRequest, VideoAssembler};
use crate::config::Config;
use crate::error::{Result, FactoryError};
use crate::gemini::GeminiClient;
use crate::media::{MediaProcessorTrait, MediaProcessorFactory};
use crate::scene::{Scene, save_scenes, total_duration};
use crate::script::{ScriptProcessor, TextGenerator};
use crate::subtitle::{SUBTITLE_FILE_NAME, generate_srt};
use crate::visuals::{ImageGenerator, VisualGenerator, VisualReport};
use crate::voiceover::{HelperScriptSynthesizer, SpeechSynthesizer, VoiceoverGenerator, VoiceoverResult};

pub const SCRIPT_FILE_NAME: &str = "script.json";
pub const SCENES_DIR_NAME: &str = "scenes";
pub const AUDIO_DIR_NAME: &str = "audio";
pub const VIDEO_FILE_NAME: &str = "final-video.mp4";

/// Parameters of one end-to-end run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input_text: String,
    pub style: String,
    pub voice: String,
    pub language: String,
    pub subtitles: bool,
    /// Final video location; defaults to `final-video.mp4` in the run directory
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_dir: PathBuf,
    pub script_path: PathBuf,
    pub scenes_dir: PathBuf,
    pub audio_path: PathBuf,
    pub timing_path: PathBuf,
    pub subtitles_path: Option<PathBuf>,
    pub video_path: PathBuf,
    pub scene_count: usize,
    pub declared_duration: f64,
    /// False when some scenes got a placeholder or no image
    pub visuals_complete: bool,
}

pub struct Workflow {
    config: Config,
    text: Box<dyn TextGenerator>,
    images: Box<dyn ImageGenerator>,
    speech: Box<dyn SpeechSynthesizer>,
    media: Box<dyn MediaProcessorTrait>,
}

impl Workflow {
    /// Production wiring: Gemini for text and images, the TTS helper, ffmpeg
    pub fn new(config: Config) -> Result<Self> {
        let text = GeminiClient::new(config.gemini.clone(), config.script.clone())?;
        let images = GeminiClient::new(config.gemini.clone(), config.script.clone())?;

        let speech = HelperScriptSynthesizer::new(&config.voiceover);
        speech.check_availability()?;

        let media = MediaProcessorFactory::create_processor(config.media.clone());

        // Check dependencies
        media.check_availability()?;

        Ok(Self::with_components(
            config,
            Box::new(text),
            Box::new(images),
            Box::new(speech),
            media,
        ))
    }

    pub fn with_components(
        config: Config,
        text: Box<dyn TextGenerator>,
        images: Box<dyn ImageGenerator>,
        speech: Box<dyn SpeechSynthesizer>,
        media: Box<dyn MediaProcessorTrait>,
    ) -> Self {
        Self {
            config,
            text,
            images,
            speech,
            media,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Script → visuals → voiceover → assembly inside a fresh run directory
    pub async fn run(&self, request: &RunRequest) -> Result<RunSummary> {
        let run_dir = create_run_dir(&self.config.output.root_dir, &request.input_text, self.config.output.slug_length).await?;
        info!("Output directory: {}", run_dir.display());

        if let Ok(version) = self.media.get_version_info().await {
            info!("Using {}", version);
        }

        info!("STEP 1: Processing script → scenes");
        let script_path = run_dir.join(SCRIPT_FILE_NAME);
        let scenes = self.process_script(&request.input_text, &request.style, &script_path).await?;
        info!("Script processing complete: {} scenes, estimated duration {:.1}s",
              scenes.len(), total_duration(&scenes));

        info!("STEP 2: Generating visuals (AI images)");
        let scenes_dir = run_dir.join(SCENES_DIR_NAME);
        let report = self.generate_visuals(&scenes, &scenes_dir).await?;
        if !report.all_succeeded() {
            warn!("Some images failed to generate ({} placeholders, {} missing)",
                  report.placeholder_count(), scenes.len() - report.image_count());
        }

        info!("STEP 3: Generating voiceover (TTS)");
        let audio_dir = run_dir.join(AUDIO_DIR_NAME);
        let voiceover = self.generate_voiceover(&scenes, &audio_dir, &request.voice, &request.language).await?;
        info!("Voiceover complete: {} ({:.1}s declared)", voiceover.audio_path.display(), voiceover.total_duration);

        let subtitles_path = if request.subtitles {
            let path = audio_dir.join(SUBTITLE_FILE_NAME);
            generate_srt(&voiceover.timing, &path).await?;
            Some(path)
        } else {
            None
        };

        info!("STEP 4: Assembling final video");
        let video_path = request
            .output
            .clone()
            .unwrap_or_else(|| run_dir.join(VIDEO_FILE_NAME));

        let assembly = AssemblyRequest {
            scenes_dir: scenes_dir.clone(),
            audio_path: voiceover.audio_path.clone(),
            timing_path: voiceover.timing_path.clone(),
            output_path: video_path.clone(),
            subtitles: subtitles_path.clone(),
        };

        if !self.assemble(&assembly).await? {
            return Err(FactoryError::Media("Video assembly failed".to_string()));
        }

        Ok(RunSummary {
            run_dir,
            script_path,
            scenes_dir,
            audio_path: voiceover.audio_path,
            timing_path: voiceover.timing_path,
            subtitles_path,
            video_path,
            scene_count: scenes.len(),
            declared_duration: voiceover.total_duration,
            visuals_complete: report.all_succeeded(),
        })
    }

    /// Segment text into scenes and save them to `script_path`
    pub async fn process_script(&self, input_text: &str, style: &str, script_path: &Path) -> Result<Vec<Scene>> {
        let scenes = ScriptProcessor::new(self.text.as_ref())
            .process_script(input_text, style)
            .await?;
        save_scenes(&scenes, script_path).await?;
        Ok(scenes)
    }

    pub async fn generate_visuals(&self, scenes: &[Scene], scenes_dir: &Path) -> Result<VisualReport> {
        VisualGenerator::new(self.images.as_ref(), &self.config.visuals, self.config.visual_delay())
            .generate_visuals(scenes, scenes_dir)
            .await
    }

    pub async fn generate_voiceover(
        &self,
        scenes: &[Scene],
        audio_dir: &Path,
        voice: &str,
        language: &str,
    ) -> Result<VoiceoverResult> {
        VoiceoverGenerator::new(self.speech.as_ref(), self.config.voiceover.audio_file_name.clone())
            .generate_voiceover(scenes, audio_dir, voice, language)
            .await
    }

    pub async fn assemble(&self, request: &AssemblyRequest) -> Result<bool> {
        VideoAssembler::new(self.media.as_ref()).assemble(request).await
    }
}

/// Create `root/{YYYYMMDD-HHMMSS}-{slug}` for a new run
pub async fn create_run_dir(root: &Path, prompt: &str, slug_length: usize) -> Result<PathBuf> {
    let dir = root.join(run_dir_name(prompt, slug_length, Local::now()));
    fs::create_dir_all(&dir).await?;
    Ok(dir)
}

pub fn run_dir_name(prompt: &str, slug_length: usize, timestamp: DateTime<Local>) -> String {
    let stamp = timestamp.format("%Y%m%d-%H%M%S").to_string();
    let slug = prompt_slug(prompt, slug_length);
    if slug.is_empty() {
        stamp
    } else {
        format!("{}-{}", stamp, slug)
    }
}

/// Filename-safe slug from the start of the prompt
pub fn prompt_slug(prompt: &str, max_chars: usize) -> String {
    prompt
        .chars()
        .take(max_chars)
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect::<String>()
        .trim()
        .replace(' ', "-")
        .to_lowercase()
}
