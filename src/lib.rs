//! Video Factory - Automated Narrated Video Generation
//!
//! Turns a text prompt into a narrated slideshow video: Gemini segments the
//! text into scenes and paints one image per scene, a TTS helper script
//! narrates the whole script, and ffmpeg assembles the result.

pub mod cli;
pub mod config;
pub mod workflow;
pub mod scene;
pub mod gemini;
pub mod script;
pub mod visuals;
pub mod voiceover;
pub mod subtitle;
pub mod assembly;
pub mod media;
pub mod error;
