use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::error::{Result, FactoryError};
use crate::scene::{Scene, default_scene_id, validate_scenes};

/// Remove a markdown code fence wrapped around the model's JSON
pub fn strip_code_fence(response: &str) -> &str {
    let mut text = response.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse the model's reply into validated scenes
pub fn parse_scenes(response: &str) -> Result<Vec<Scene>> {
    let payload = strip_code_fence(response);
    debug!("Parsing scene payload ({} bytes)", payload.len());

    let value: Value = serde_json::from_str(payload).map_err(|e| FactoryError::Parsing {
        message: e.to_string(),
        raw: response.to_string(),
    })?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(FactoryError::Parsing {
                message: format!("expected a JSON array of scenes, got {}", json_kind(&other)),
                raw: response.to_string(),
            });
        }
    };

    if items.is_empty() {
        return Err(FactoryError::Parsing {
            message: "model returned no scenes".to_string(),
            raw: response.to_string(),
        });
    }

    let drafts = items
        .iter()
        .enumerate()
        .map(|(idx, item)| draft_from_value(idx + 1, item))
        .collect::<Result<Vec<_>>>()?;

    // Generated ids must not collide with ids the model chose for other scenes
    let mut taken: HashSet<String> = drafts.iter().filter_map(|d| d.id.clone()).collect();

    let scenes: Vec<Scene> = drafts
        .into_iter()
        .enumerate()
        .map(|(idx, draft)| Scene {
            id: match draft.id {
                Some(id) => id,
                None => unused_scene_id(idx + 1, &mut taken),
            },
            text: draft.text,
            visual_prompt: draft.visual_prompt,
            duration: draft.duration,
        })
        .collect();

    validate_scenes(&scenes)?;
    Ok(scenes)
}

/// A scene as the model wrote it; `id` is `None` when left out or blank
struct SceneDraft {
    id: Option<String>,
    text: String,
    visual_prompt: String,
    duration: f64,
}

/// `scene-{index:03}`, or the first `scene-{index:03}-{n}` not yet in `taken`
fn unused_scene_id(index: usize, taken: &mut HashSet<String>) -> String {
    let base = default_scene_id(index);
    let mut candidate = base.clone();
    let mut suffix = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

fn draft_from_value(index: usize, item: &Value) -> Result<SceneDraft> {
    let object = item.as_object().ok_or_else(|| FactoryError::Schema {
        index,
        message: format!("expected an object, got {}", json_kind(item)),
    })?;

    let id = match object.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(FactoryError::Schema {
                index,
                message: format!("'id' must be a string, got {}", json_kind(other)),
            });
        }
    };

    let text = required_string(index, object.get("text"), "text")?;
    let visual_prompt = required_string(index, object.get("visual_prompt"), "visual_prompt")?;
    let duration = required_seconds(index, object.get("duration"))?;

    Ok(SceneDraft {
        id,
        text,
        visual_prompt,
        duration,
    })
}

fn required_string(index: usize, value: Option<&Value>, key: &str) -> Result<String> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        None | Some(Value::Null) => Err(FactoryError::Schema {
            index,
            message: format!("missing required key '{}'", key),
        }),
        Some(other) => Err(FactoryError::Schema {
            index,
            message: format!("'{}' must be a string, got {}", key, json_kind(other)),
        }),
    }
}

/// Durations arrive as numbers, sometimes as numeric strings
fn required_seconds(index: usize, value: Option<&Value>) -> Result<f64> {
    let seconds = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        None | Some(Value::Null) => {
            return Err(FactoryError::Schema {
                index,
                message: "missing required key 'duration'".to_string(),
            });
        }
        Some(_) => None,
    };

    seconds.ok_or_else(|| FactoryError::Schema {
        index,
        message: format!("'duration' is not a number: {}", value.map(|v| v.to_string()).unwrap_or_default()),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  [1]  "), "[1]");
        assert_eq!(strip_code_fence("[1]\n```"), "[1]");
    }

    #[test]
    fn test_parse_synthesizes_missing_ids() {
        let scenes = parse_scenes(
            r#"[
                {"text": "One", "visual_prompt": "A", "duration": 5},
                {"id": "custom", "text": "Two", "visual_prompt": "B", "duration": 6.5},
                {"id": "", "text": "Three", "visual_prompt": "C", "duration": 7}
            ]"#,
        )
        .unwrap();

        let ids: Vec<_> = scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["scene-001", "custom", "scene-003"]);
        assert_eq!(scenes[1].duration, 6.5);
    }

    #[test]
    fn test_parse_invalid_json_is_parsing_error() {
        match parse_scenes("```json\n[{\"text\": \n```") {
            Err(FactoryError::Parsing { raw, .. }) => assert!(raw.starts_with("```json")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_non_array_is_parsing_error() {
        assert!(matches!(
            parse_scenes(r#"{"scenes": []}"#),
            Err(FactoryError::Parsing { .. })
        ));
        assert!(matches!(parse_scenes("[]"), Err(FactoryError::Parsing { .. })));
    }

    #[test]
    fn test_parse_missing_key_is_schema_error() {
        let result = parse_scenes(
            r#"[{"text": "One", "visual_prompt": "A", "duration": 5},
                {"text": "Two", "duration": 5}]"#,
        );
        match result {
            Err(FactoryError::Schema { index, message }) => {
                assert_eq!(index, 2);
                assert!(message.contains("visual_prompt"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_bad_duration_is_schema_error() {
        let result = parse_scenes(r#"[{"text": "t", "visual_prompt": "v", "duration": "long"}]"#);
        assert!(matches!(result, Err(FactoryError::Schema { index: 1, .. })));

        let result = parse_scenes(r#"[{"text": "t", "visual_prompt": "v", "duration": 0}]"#);
        assert!(matches!(result, Err(FactoryError::Schema { index: 1, .. })));
    }

    #[test]
    fn test_generated_ids_avoid_ids_taken_by_other_scenes() {
        let scenes = parse_scenes(
            r#"[
                {"id": "scene-002", "text": "One", "visual_prompt": "A", "duration": 5},
                {"text": "Two", "visual_prompt": "B", "duration": 5},
                {"id": "scene-002-2", "text": "Three", "visual_prompt": "C", "duration": 5}
            ]"#,
        )
        .unwrap();

        let ids: Vec<_> = scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["scene-002", "scene-002-3", "scene-002-2"]);
    }

    #[test]
    fn test_parse_rejects_ids_that_leave_the_scenes_dir() {
        for id in ["../escaped", "nested/scene", "..\\\\up", ".hidden"] {
            let reply = format!(
                r#"[{{"id": "ok", "text": "t", "visual_prompt": "v", "duration": 1}},
                    {{"id": "{}", "text": "t", "visual_prompt": "v", "duration": 1}}]"#,
                id
            );
            match parse_scenes(&reply) {
                Err(FactoryError::Schema { index, message }) => {
                    assert_eq!(index, 2);
                    assert!(message.contains("not a valid file name"), "{}", message);
                }
                other => panic!("id {:?} accepted: {:?}", id, other),
            }
        }
    }

    #[test]
    fn test_parse_accepts_empty_narration() {
        let scenes = parse_scenes(r#"[{"text": "", "visual_prompt": "Title card", "duration": 3}]"#).unwrap();
        assert_eq!(scenes[0].text, "");
    }
}
