// Script processing
//
// Turns raw input text into an ordered list of scenes with a single request
// to a text-generation model:
// - prompt: instruction text sent to the model
// - parser: fence stripping and scene schema checks on the model's reply

pub mod parser;
pub mod prompt;

use async_trait::async_trait;
use tracing::{info, error};

pub use parser::*;
pub use prompt::*;
use crate::error::{Result, FactoryError};
use crate::scene::{Scene, total_duration};

/// Text-generation capability used by the script processor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt and return the model's raw text reply
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

pub struct ScriptProcessor<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> ScriptProcessor<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    /// Segment `text` into scenes in the given visual style
    pub async fn process_script(&self, text: &str, style: &str) -> Result<Vec<Scene>> {
        info!("Processing script ({} chars, style '{}')", text.chars().count(), style);

        let prompt = build_segmentation_prompt(text, style);
        let response = self.generator.generate_text(&prompt).await?;

        let scenes = match parse_scenes(&response) {
            Ok(scenes) => scenes,
            Err(e) => {
                if let FactoryError::Parsing { raw, .. } = &e {
                    error!("Failed to parse scene JSON. Response was: {}", raw);
                }
                return Err(e);
            }
        };

        info!(
            "Generated {} scenes, estimated duration {:.1}s",
            scenes.len(),
            total_duration(&scenes)
        );
        Ok(scenes)
    }
}
