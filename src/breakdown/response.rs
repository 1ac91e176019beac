/*!
 * Defensive parsing of oracle responses.
 *
 * Nothing about the oracle's output is trusted: the JSON may be wrapped in
 * markdown fences or prose, fields may be missing, misnamed or of the wrong
 * type. Anything that cannot be read as a reply at all is a schema error,
 * which the orchestrator retries like a transport failure. Individual scene
 * records that are unusable are dropped without failing the whole reply.
 */

use log::debug;
use serde_json::{Map, Value};

use crate::errors::BreakdownError;

use super::model::{canonical_scene_number, fold_digits, ExtractionResult, RawScene, DEFAULT_EPISODE};

/// Tagged reply from the oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleReply {
    /// The text is script-like and was extracted
    Extracted(ExtractionResult),

    /// The oracle classified the text as something other than a script
    NotScript {
        /// Explanation supplied by the oracle, or a default one
        message: String,
    },
}

/// Parse the raw text of an oracle response for the given chunk
pub fn parse_reply(chunk_index: usize, raw: &str) -> Result<OracleReply, BreakdownError> {
    let json = extract_json(raw)
        .ok_or_else(|| BreakdownError::OracleSchema("no JSON object found in response".to_string()))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| BreakdownError::OracleSchema(format!("invalid JSON: {}", e)))?;

    let Value::Object(object) = &value else {
        return Err(BreakdownError::OracleSchema("response is not a JSON object".to_string()));
    };

    let error_message = object
        .get("error_message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    let is_script = read_is_script(object)?;
    if !is_script {
        return Ok(OracleReply::NotScript {
            message: error_message.unwrap_or_else(|| "text was classified as non-script".to_string()),
        });
    }

    let characters = match object.get("characters") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => string_list(value)
            .ok_or_else(|| BreakdownError::OracleSchema("'characters' is not a list".to_string()))?,
    };

    let scenes = match object.get("scenes") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(read_scene).collect(),
        Some(_) => {
            return Err(BreakdownError::OracleSchema("'scenes' is not a list".to_string()));
        }
    };

    Ok(OracleReply::Extracted(ExtractionResult {
        chunk_index,
        is_script,
        error_message,
        characters,
        scenes,
    }))
}

/// Locate the JSON object in a response that may carry fences or prose
pub fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + 7..];
        if let Some(end) = body.find("```") {
            let fenced = body[..end].trim();
            if fenced.starts_with('{') {
                return Some(fenced);
            }
        }
    }

    // Prose may carry its own braces; take the first block that is a JSON object
    let mut fallback = None;
    for (start, _) in trimmed.match_indices('{') {
        let Some(block) = extract_balanced(&trimmed[start..]) else {
            continue;
        };
        if matches!(serde_json::from_str::<Value>(block), Ok(Value::Object(_))) {
            return Some(block);
        }
        fallback.get_or_insert(block);
    }
    fallback
}

/// Take the first balanced `{ ... }` block, skipping braces inside strings
fn extract_balanced(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// When the flag is missing, a reply counts as script iff it carries a scene list
fn read_is_script(object: &Map<String, Value>) -> Result<bool, BreakdownError> {
    match object.get("is_script") {
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(Value::String(flag)) => match flag.trim().to_lowercase().as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            other => Err(BreakdownError::OracleSchema(format!("unreadable is_script value '{}'", other))),
        },
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|flag| flag != 0.0)
            .ok_or_else(|| BreakdownError::OracleSchema(format!("unreadable is_script value {}", n))),
        None | Some(Value::Null) => Ok(matches!(object.get("scenes"), Some(Value::Array(_)))),
        Some(other) => Err(BreakdownError::OracleSchema(format!("unreadable is_script value {}", other))),
    }
}

fn read_scene(value: &Value) -> Option<RawScene> {
    let Some(object) = value.as_object() else {
        debug!("Dropping scene record that is not an object: {}", value);
        return None;
    };

    let scene_number = first_field(object, &["scene_number", "scene", "number", "scene_no"])
        .map(scalar_text)
        .map(|raw| canonical_scene_number(&raw))
        .filter(|n| !n.is_empty());
    let Some(scene_number) = scene_number else {
        debug!("Dropping scene record without a scene number");
        return None;
    };

    let episode = first_field(object, &["episode", "ep"])
        .and_then(read_episode)
        .unwrap_or(DEFAULT_EPISODE);

    Some(RawScene {
        episode,
        scene_number,
        location: text_field(object, &["location", "place", "setting"]),
        time_of_day: text_field(object, &["time_of_day", "time"]),
        content: text_field(object, &["content", "summary"]),
        characters: first_field(object, &["characters", "cast"])
            .and_then(string_list)
            .unwrap_or_default(),
        props: first_field(object, &["props"]).and_then(string_list).unwrap_or_default(),
        notes: text_field(object, &["notes", "note", "remarks"]),
    })
}

fn first_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn read_episode(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => fold_digits(s.trim()).parse().ok(),
        _ => None,
    }
}

/// Render a scalar as text; integral floats lose their fraction
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match (n.as_u64(), n.as_f64()) {
            (Some(whole), _) => whole.to_string(),
            (None, Some(float)) if float.fract() == 0.0 && float >= 0.0 => format!("{}", float as u64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> String {
    match first_field(object, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Some(value) => scalar_text(value),
        None => String::new(),
    }
}

/// A list of names: a JSON array of strings, or a comma-separated string
fn string_list(value: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().map(scalar_text).collect(),
        Value::String(s) => s.split([',', '、', '，']).map(|p| p.trim().to_string()).collect(),
        _ => return None,
    };
    Some(items.into_iter().filter(|s| !s.is_empty()).collect())
}
