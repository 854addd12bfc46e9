use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::Result;
use crate::scene::TimingRecord;

pub const SUBTITLE_FILE_NAME: &str = "subtitles.srt";

/// Generate an SRT file from the timing table; scenes without narration are skipped
pub async fn generate_srt<P: AsRef<Path>>(timing: &[TimingRecord], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    fs::write(output_path, render_srt(timing)).await?;

    info!("SRT file generated successfully");
    Ok(())
}

pub fn render_srt(timing: &[TimingRecord]) -> String {
    let mut srt_content = String::new();

    let cues = timing.iter().filter(|record| !record.text.trim().is_empty());
    for (index, record) in cues.enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(record.start),
            format_srt_time(record.end),
            record.text.trim()
        ));
    }

    srt_content
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Scene, build_timing_table};

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.500), "01:01:01,500");
    }

    #[test]
    fn test_render_srt_numbers_cues_and_skips_silent_scenes() {
        let timing = build_timing_table(&[
            Scene::new("a", "Hello world.", "v", 4.0),
            Scene::new("b", "  ", "v", 1.0),
            Scene::new("c", "Goodbye.", "v", 2.5),
        ]);

        assert_eq!(
            render_srt(&timing),
            "1\n00:00:00,000 --> 00:00:04,000\nHello world.\n\n\
             2\n00:00:05,000 --> 00:00:07,500\nGoodbye.\n\n"
        );
    }

    #[tokio::test]
    async fn test_generate_srt_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SUBTITLE_FILE_NAME);
        let timing = build_timing_table(&[Scene::new("a", "Line", "v", 1.0)]);

        generate_srt(&timing, &path).await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("Line"));
    }
}
