//! Video Factory - AI video generation
//!
//! Command line entry point: turns a prompt into a narrated slideshow video
//! through scene scripting, image generation, speech synthesis and ffmpeg.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use video_factory::assembly::{AssemblyRequest, VideoAssembler};
use video_factory::cli::{Args, Commands, InputArgs};
use video_factory::config::Config;
use video_factory::gemini::GeminiClient;
use video_factory::media::MediaProcessorFactory;
use video_factory::scene::{load_scenes, save_scenes, total_duration};
use video_factory::script::ScriptProcessor;
use video_factory::visuals::VisualGenerator;
use video_factory::voiceover::{HelperScriptSynthesizer, VoiceoverGenerator};
use video_factory::workflow::{RunRequest, Workflow};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    if let Err(e) = setup_logging(args.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    tokio::select! {
        result = run(args) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Fatal error: {:#}", e);
                eprintln!("{:?}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Generation interrupted by user");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Generate { input, voice, lang, style, no_subtitles, output } => {
            let input_text = read_input(&input).await?;
            let voice = config.voiceover.resolve_voice(voice);
            let language = config.voiceover.resolve_language(lang.map(|l| l.code()));

            println!("Video Factory - AI Video Generation");
            println!("{}", "=".repeat(80));
            println!("Script length: {} chars", input_text.chars().count());
            println!("Voice: {} ({})", voice, language);
            println!("Style: {}", style);
            println!("Subtitles: {}", if no_subtitles { "disabled" } else { "enabled" });
            println!("{}", "=".repeat(80));

            let workflow = Workflow::new(config.clone())?;
            let request = RunRequest {
                input_text,
                style,
                voice: voice.clone(),
                language: language.clone(),
                subtitles: !no_subtitles,
                output,
            };

            let summary = workflow.run(&request).await?;

            println!("\n{}", "=".repeat(80));
            println!("VIDEO GENERATION COMPLETE");
            println!("{}", "=".repeat(80));
            println!("Final video:   {}", summary.video_path.display());
            println!("Project files: {}", summary.run_dir.display());
            println!("\nSummary:");
            println!("  Scenes:     {}", summary.scene_count);
            println!("  Duration:   {:.1}s (declared)", summary.declared_duration);
            println!("  Resolution: {}x{}", config.media.width, config.media.height);
            println!("  FPS:        {}", config.media.fps);
            println!("  Audio:      {} ({})", voice, language);
            if !summary.visuals_complete {
                println!("  Note:       some scenes use placeholder images");
            }
        }
        Commands::Script { input, style, output } => {
            let input_text = read_input(&input).await?;
            let client = GeminiClient::new(config.gemini.clone(), config.script.clone())?;

            let scenes = ScriptProcessor::new(&client).process_script(&input_text, &style).await?;
            save_scenes(&scenes, &output).await?;

            println!("\n{:<12} {:>8}  {}", "Scene", "Seconds", "Narration");
            println!("{}", "-".repeat(80));
            for scene in &scenes {
                println!("{:<12} {:>8.1}  {}", scene.id, scene.duration, scene.text);
            }
            println!("{}", "-".repeat(80));
            println!("{} scenes, {:.1}s -> {}", scenes.len(), total_duration(&scenes), output.display());
        }
        Commands::Visuals { scenes, output_dir } => {
            let scenes = load_scenes(&scenes).await?;
            let client = GeminiClient::new(config.gemini.clone(), config.script.clone())?;

            let report = VisualGenerator::new(&client, &config.visuals, config.visual_delay())
                .generate_visuals(&scenes, &output_dir)
                .await?;

            println!("Generated {}/{} images ({} placeholders) in {}",
                     report.success_count(), scenes.len(), report.placeholder_count(), output_dir.display());
            if !report.all_succeeded() {
                warn!("Some images failed to generate");
            }
        }
        Commands::Voiceover { scenes, output_dir, voice, lang } => {
            let scenes = load_scenes(&scenes).await?;
            let voice = config.voiceover.resolve_voice(voice);
            let language = config.voiceover.resolve_language(lang.map(|l| l.code()));
            let synthesizer = HelperScriptSynthesizer::new(&config.voiceover);
            synthesizer.check_availability()?;

            let result = VoiceoverGenerator::new(&synthesizer, config.voiceover.audio_file_name.clone())
                .generate_voiceover(&scenes, &output_dir, &voice, &language)
                .await?;

            println!("Audio:  {}", result.audio_path.display());
            println!("Timing: {} ({} markers, {:.1}s)",
                     result.timing_path.display(), result.timing.len(), result.total_duration);
        }
        Commands::Assemble { scenes_dir, audio, timing, output, subtitles } => {
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            media.check_availability()?;

            let request = AssemblyRequest {
                scenes_dir,
                audio_path: audio,
                timing_path: timing,
                output_path: output.clone(),
                subtitles,
            };

            if !VideoAssembler::new(media.as_ref()).assemble(&request).await? {
                anyhow::bail!("Video assembly failed");
            }
            println!("Video assembly complete: {}", output.display());
        }
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Default configuration written to {}", output.display());
        }
    }

    Ok(())
}

/// `--config` path, else `config.toml` in the current directory, else defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    Ok(config.with_env_overrides())
}

async fn read_input(input: &InputArgs) -> Result<String> {
    match (&input.prompt, &input.script) {
        (Some(prompt), _) => {
            info!("Using prompt: {}", prompt);
            Ok(prompt.clone())
        }
        (None, Some(script)) => {
            info!("Loading script from: {}", script.display());
            tokio::fs::read_to_string(script)
                .await
                .with_context(|| format!("Failed to read script file: {}", script.display()))
        }
        (None, None) => anyhow::bail!("Either --prompt or --script is required"),
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir: PathBuf = std::env::current_dir()?.join(".video-factory").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "video-factory.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
