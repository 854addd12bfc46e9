use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::config::MediaConfig;
use crate::error::{Result, FactoryError};
use super::SlideshowRequest;

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add a still image repeated for `duration` seconds
    pub fn still_image<P: AsRef<Path>>(self, path: P, duration: f64, fps: u32) -> Self {
        self.arg("-loop").arg("1")
            .arg("-framerate").arg(fps.to_string())
            .arg("-t").arg(format!("{:.3}", duration))
            .input(path)
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Set output frame rate
    pub fn frame_rate(self, fps: u32) -> Self {
        self.arg("-r").arg(fps.to_string())
    }

    pub fn pixel_format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    /// Select a stream or filter output for the output file
    pub fn map<S: Into<String>>(self, spec: S) -> Self {
        self.arg("-map").arg(spec)
    }

    /// Read the filter graph from a file
    pub fn filter_complex_script<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-filter_complex_script").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<String> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        // Dropping the future (ctrl-c) must not leave the encoder running
        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| FactoryError::Media(format!("Failed to execute media processor: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FactoryError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Builder for common media processing operations
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build the slideshow encoding command.
    ///
    /// Inputs are the clips in order followed by the audio track; the filter
    /// graph (see [`slideshow_filter_graph`]) is read from `filter_script`.
    /// No `-shortest`: audio and picture lengths pass through unmodified.
    pub fn slideshow<P: AsRef<Path>>(
        &self,
        request: &SlideshowRequest,
        config: &MediaConfig,
        filter_script: P,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Slideshow encoding").overwrite();

        for clip in &request.clips {
            cmd = cmd.still_image(&clip.image_path, clip.duration, config.fps);
        }

        let audio_index = request.clips.len();

        cmd.input(&request.audio_path)
            .filter_complex_script(filter_script)
            .map("[vout]")
            .map(format!("{}:a:0", audio_index))
            .video_codec(&config.video_codec)
            .pixel_format("yuv420p")
            .frame_rate(config.fps)
            .audio_codec(&config.audio_codec)
            .args(config.encode_options.iter().cloned())
            .output(&request.output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check")
            .arg("-version")
    }
}

/// Filter graph that normalizes every clip and concatenates them.
///
/// Each clip is scaled to the target size with square pixels, a fixed frame
/// rate and pixel format so clips of different sizes concatenate cleanly.
/// The result is labelled `[vout]`.
pub fn slideshow_filter_graph(clip_count: usize, config: &MediaConfig, subtitles: Option<&Path>) -> String {
    let mut chains: Vec<String> = (0..clip_count)
        .map(|i| {
            format!(
                "[{i}:v]scale={w}:{h},setsar=1,fps={fps},format=yuv420p[v{i}]",
                i = i,
                w = config.width,
                h = config.height,
                fps = config.fps
            )
        })
        .collect();

    let labels: String = (0..clip_count).map(|i| format!("[v{}]", i)).collect();
    chains.push(format!("{}concat=n={}:v=1:a=0[vcat]", labels, clip_count));

    match subtitles {
        Some(path) => chains.push(format!("[vcat]subtitles='{}'[vout]", escape_filter_path(path))),
        None => chains.push("[vcat]null[vout]".to_string()),
    }

    chains.join(";")
}

/// Path for use inside a single-quoted filter argument.
///
/// The value is unescaped twice: once by the graph parser (which sees the
/// single quotes) and once by the filter's option parser (which sees `\:` and
/// `\'`).
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
        .replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::media::Clip;
    use std::path::PathBuf;

    fn request() -> SlideshowRequest {
        SlideshowRequest {
            clips: vec![
                Clip { image_path: PathBuf::from("/run/scenes/scene-001.png"), duration: 4.0 },
                Clip { image_path: PathBuf::from("/run/scenes/scene-003.png"), duration: 2.5 },
            ],
            audio_path: PathBuf::from("/run/audio/voiceover.wav"),
            subtitles: None,
            output_path: PathBuf::from("/run/final-video.mp4"),
        }
    }

    #[test]
    fn test_filter_graph_concatenates_in_order() {
        let config = Config::default().media;
        let graph = slideshow_filter_graph(2, &config, None);

        assert_eq!(
            graph,
            "[0:v]scale=1920:1080,setsar=1,fps=30,format=yuv420p[v0];\
             [1:v]scale=1920:1080,setsar=1,fps=30,format=yuv420p[v1];\
             [v0][v1]concat=n=2:v=1:a=0[vcat];\
             [vcat]null[vout]"
        );
    }

    #[test]
    fn test_filter_graph_burns_subtitles() {
        let config = Config::default().media;
        let graph = slideshow_filter_graph(1, &config, Some(Path::new("/tmp/it's/subs.srt")));
        assert!(graph.ends_with("[vcat]subtitles='/tmp/it\\'\\''s/subs.srt'[vout]"));
    }

    #[test]
    fn test_slideshow_command_layout() {
        let config = Config::default().media;
        let cmd = MediaCommandBuilder::new("ffmpeg").slideshow(&request(), &config, "/tmp/graph.txt");
        let args = cmd.args.join(" ");

        assert_eq!(cmd.binary_path, "ffmpeg");
        assert!(args.starts_with("-y -loop 1 -framerate 30 -t 4.000 -i /run/scenes/scene-001.png \
                                  -loop 1 -framerate 30 -t 2.500 -i /run/scenes/scene-003.png \
                                  -i /run/audio/voiceover.wav"));
        assert!(args.contains("-filter_complex_script /tmp/graph.txt"));
        assert!(args.contains("-map [vout] -map 2:a:0"));
        assert!(args.contains("-c:v libx264"));
        assert!(args.contains("-c:a aac"));
        assert!(args.contains("-r 30"));
        assert!(!args.contains("-shortest"));
        assert_eq!(cmd.args.last().unwrap(), "/run/final-video.mp4");
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path(Path::new("C:\\subs.srt")), "C\\:/subs.srt");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_command_stops_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");

        let cmd = MediaCommand::new("sh", "Slow encode")
            .arg("-c")
            .arg(format!("sleep 1; touch '{}'", marker.display()));

        let result = tokio::time::timeout(std::time::Duration::from_millis(200), cmd.execute()).await;
        assert!(result.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_execute_reports_missing_binary() {
        let cmd = MediaCommand::new("/nonexistent/ffmpeg", "Version check").arg("-version");
        let result = cmd.execute().await;
        assert!(matches!(result, Err(FactoryError::Media(_))));
    }
}
