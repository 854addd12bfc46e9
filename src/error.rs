use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Model output could not be parsed as JSON. `raw` keeps the response for diagnosis.
    #[error("Failed to parse model output: {message}")]
    Parsing { message: String, raw: String },

    /// A scene record is missing a key or breaks a scene invariant.
    #[error("Invalid scene #{index}: {message}")]
    Schema { index: usize, message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis {
        message: String,
        stdout: String,
        stderr: String,
    },

    #[error("Expected output file was not created: {0}")]
    OutputMissing(String),

    #[error("No usable content: {0}")]
    NoContent(String),

    #[error("Generation service error: {0}")]
    Api(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, FactoryError>;
