//! Scene records and the timing table derived from them.
//!
//! Both are persisted as pretty-printed UTF-8 JSON arrays and form the
//! contract between pipeline stages.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{Result, FactoryError};

/// One narration + visual unit of the video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Stable identifier, also the image filename stem
    pub id: String,
    /// Narration spoken for this scene
    pub text: String,
    /// Description fed to the image generator
    pub visual_prompt: String,
    /// Declared display duration in seconds
    pub duration: f64,
}

impl Scene {
    pub fn new<S1, S2, S3>(id: S1, text: S2, visual_prompt: S3, duration: f64) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            id: id.into(),
            text: text.into(),
            visual_prompt: visual_prompt.into(),
            duration,
        }
    }

    /// Filename of this scene's image
    pub fn image_file_name(&self) -> String {
        format!("{}.png", self.id)
    }
}

/// Identifier used when the model leaves one out (1-based index)
pub fn default_scene_id(index: usize) -> String {
    format!("scene-{:03}", index)
}

/// Whether `id` can be used as a filename stem inside a scenes directory
pub fn is_safe_scene_id(id: &str) -> bool {
    !id.starts_with('.')
        && !id.contains("..")
        && !id.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Check sequence invariants: non-empty filename-safe ids, unique ids, positive finite durations
pub fn validate_scenes(scenes: &[Scene]) -> Result<()> {
    let mut seen = HashSet::new();

    for (idx, scene) in scenes.iter().enumerate() {
        let index = idx + 1;

        if scene.id.trim().is_empty() {
            return Err(FactoryError::Schema {
                index,
                message: "id must not be empty".to_string(),
            });
        }

        if !is_safe_scene_id(&scene.id) {
            return Err(FactoryError::Schema {
                index,
                message: format!("id '{}' is not a valid file name", scene.id),
            });
        }

        if !seen.insert(scene.id.as_str()) {
            return Err(FactoryError::Schema {
                index,
                message: format!("duplicate id '{}'", scene.id),
            });
        }

        if !scene.duration.is_finite() || scene.duration <= 0.0 {
            return Err(FactoryError::Schema {
                index,
                message: format!("duration must be positive, got {}", scene.duration),
            });
        }
    }

    Ok(())
}

pub fn total_duration(scenes: &[Scene]) -> f64 {
    scenes.iter().map(|s| s.duration).sum()
}

/// Write scenes as an indented JSON array; non-ASCII text is kept as-is
pub async fn save_scenes<P: AsRef<Path>>(scenes: &[Scene], path: P) -> Result<()> {
    let path = path.as_ref();
    write_json(scenes, path).await?;
    info!("Saved {} scenes to {}", scenes.len(), path.display());
    Ok(())
}

/// Read a scene file written by [`save_scenes`]
pub async fn load_scenes<P: AsRef<Path>>(path: P) -> Result<Vec<Scene>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FactoryError::FileNotFound(path.display().to_string()));
    }

    let content = fs::read_to_string(path).await?;
    let scenes: Vec<Scene> = serde_json::from_str(&content)?;
    validate_scenes(&scenes)?;

    info!("Loaded {} scenes from {}", scenes.len(), path.display());
    Ok(scenes)
}

/// Time range of one scene within the combined narration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub scene_id: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub text: String,
}

/// Cumulative timing from declared durations; not measured against the audio
pub fn build_timing_table(scenes: &[Scene]) -> Vec<TimingRecord> {
    let mut current = 0.0;

    scenes
        .iter()
        .map(|scene| {
            let record = TimingRecord {
                scene_id: scene.id.clone(),
                start: current,
                end: current + scene.duration,
                duration: scene.duration,
                text: scene.text.clone(),
            };
            current = record.end;
            record
        })
        .collect()
}

pub async fn save_timing<P: AsRef<Path>>(timing: &[TimingRecord], path: P) -> Result<()> {
    let path = path.as_ref();
    write_json(timing, path).await?;
    info!("Saved {} timing records to {}", timing.len(), path.display());
    Ok(())
}

/// The part of a timing record the assembler relies on.
///
/// Accepts `id` in place of `scene_id` and ignores every other field, so older
/// timing files still load.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimingEntry {
    #[serde(alias = "id")]
    pub scene_id: String,
    pub duration: f64,
}

pub async fn load_timing_entries<P: AsRef<Path>>(path: P) -> Result<Vec<TimingEntry>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FactoryError::FileNotFound(path.display().to_string()));
    }

    let content = fs::read_to_string(path).await?;
    let entries: Vec<TimingEntry> = serde_json::from_str(&content)?;
    info!("Loaded {} scene timings from {}", entries.len(), path.display());
    Ok(entries)
}

async fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    // serde_json never escapes non-ASCII characters
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scenes() -> Vec<Scene> {
        vec![
            Scene::new("scene-001", "Добро пожаловать", "Futuristic city at dusk", 5.0),
            Scene::new("scene-002", "", "Empty narration, quiet lab", 2.5),
            Scene::new("intro", "Third \"quoted\" line", "Robot arm, cinematic", 7.25),
        ]
    }

    #[tokio::test]
    async fn test_scene_file_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");

        let scenes = sample_scenes();
        save_scenes(&scenes, &path).await.unwrap();
        let loaded = load_scenes(&path).await.unwrap();

        assert_eq!(loaded, scenes);
    }

    #[tokio::test]
    async fn test_scene_file_round_trip_keeps_full_precision_durations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");

        // xorshift64 so the durations are full-precision but reproducible
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next_duration = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            0.5 + (state >> 11) as f64 / (1u64 << 53) as f64 * 9.5
        };

        let mut scenes: Vec<Scene> = (1..=5000)
            .map(|i| Scene::new(default_scene_id(i), "t", "v", next_duration()))
            .collect();
        scenes.push(Scene::new("known-bad", "t", "v", 9.644860774776141));
        scenes.push(Scene::new("third", "t", "v", 1.0 / 3.0));

        save_scenes(&scenes, &path).await.unwrap();
        let loaded = load_scenes(&path).await.unwrap();

        for (saved, read) in scenes.iter().zip(&loaded) {
            assert_eq!(saved.duration.to_bits(), read.duration.to_bits(), "scene {}", saved.id);
        }
        assert_eq!(loaded, scenes);
    }

    #[tokio::test]
    async fn test_scene_file_keeps_unicode_unescaped_and_indented() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");

        save_scenes(&sample_scenes(), &path).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        assert!(content.contains("Добро пожаловать"));
        assert!(!content.contains("\\u"));
        assert!(content.contains("\n  {"));
    }

    #[tokio::test]
    async fn test_load_rejects_zero_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        std::fs::write(
            &path,
            r#"[{"id":"a","text":"t","visual_prompt":"v","duration":0.0}]"#,
        )
        .unwrap();

        match load_scenes(&path).await {
            Err(FactoryError::Schema { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let scenes = vec![
            Scene::new("a", "one", "v", 1.0),
            Scene::new("a", "two", "v", 1.0),
        ];
        match validate_scenes(&scenes) {
            Err(FactoryError::Schema { index, message }) => {
                assert_eq!(index, 2);
                assert!(message.contains("duplicate"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_is_safe_scene_id() {
        assert!(is_safe_scene_id("scene-001"));
        assert!(is_safe_scene_id("intro.v2"));
        assert!(is_safe_scene_id("Вступление"));

        assert!(!is_safe_scene_id("../escaped"));
        assert!(!is_safe_scene_id("a/b"));
        assert!(!is_safe_scene_id("a\\b"));
        assert!(!is_safe_scene_id(".hidden"));
        assert!(!is_safe_scene_id("a..b"));
        assert!(!is_safe_scene_id("line\nbreak"));
    }

    #[tokio::test]
    async fn test_load_rejects_path_like_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        std::fs::write(
            &path,
            r#"[{"id":"ok","text":"t","visual_prompt":"v","duration":1.0},
                {"id":"/etc/cron.d/x","text":"t","visual_prompt":"v","duration":1.0}]"#,
        )
        .unwrap();

        assert!(matches!(load_scenes(&path).await, Err(FactoryError::Schema { index: 2, .. })));
    }

    #[test]
    fn test_validate_rejects_negative_and_nan_durations() {
        assert!(validate_scenes(&[Scene::new("a", "t", "v", -1.0)]).is_err());
        assert!(validate_scenes(&[Scene::new("a", "t", "v", f64::NAN)]).is_err());
    }

    #[test]
    fn test_timing_table_is_cumulative() {
        let scenes = vec![
            Scene::new("a", "one", "v", 1.5),
            Scene::new("b", "two", "v", 2.0),
            Scene::new("c", "three", "v", 0.5),
        ];
        let timing = build_timing_table(&scenes);

        let mut expected_start = 0.0;
        for (record, scene) in timing.iter().zip(&scenes) {
            assert_eq!(record.scene_id, scene.id);
            assert_eq!(record.text, scene.text);
            assert!((record.start - expected_start).abs() < 1e-9);
            assert!((record.end - (record.start + scene.duration)).abs() < 1e-9);
            expected_start = record.end;
        }
        let last = timing.last().unwrap();
        assert!((last.end - total_duration(&scenes)).abs() < 1e-9);
    }

    #[test]
    fn test_timing_table_empty() {
        assert!(build_timing_table(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_timing_entries_accept_id_alias_and_extra_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timing.json");
        std::fs::write(
            &path,
            r#"[{"id":"scene-001","duration":4.0,"start":0.0},{"scene_id":"scene-002","duration":3.0,"text":"x"}]"#,
        )
        .unwrap();

        let entries = load_timing_entries(&path).await.unwrap();
        assert_eq!(entries[0].scene_id, "scene-001");
        assert_eq!(entries[1].scene_id, "scene-002");
        assert_eq!(entries[1].duration, 3.0);
    }

    #[tokio::test]
    async fn test_saved_timing_loads_as_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio/timing.json");

        let timing = build_timing_table(&sample_scenes());
        save_timing(&timing, &path).await.unwrap();
        let entries = load_timing_entries(&path).await.unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].scene_id, "intro");
        assert_eq!(entries[2].duration, 7.25);
    }

    #[test]
    fn test_default_scene_id() {
        assert_eq!(default_scene_id(1), "scene-001");
        assert_eq!(default_scene_id(42), "scene-042");
        assert_eq!(default_scene_id(1234), "scene-1234");
    }
}
