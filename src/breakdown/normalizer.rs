/*!
 * Normalization of merged scenes into table rows.
 */

use std::collections::{BTreeMap, HashSet};

use super::character::CharacterKey;
use super::merger::MergeOutput;
use super::model::{MergedTable, NormalizedScene, RawScene, TimeCode};

/// Marker appended to truncated summaries
pub const ELLIPSIS: &str = "…";

/// Night keywords win over day keywords
const NIGHT_KEYWORDS: &[&str] = &["夜", "深夜", "夜中", "晩", "夕夜", "NIGHT", "MIDNIGHT"];

const DAY_KEYWORDS: &[&str] = &[
    "朝", "昼", "日中", "早朝", "午前", "午後", "夕", "夕方", "DAY", "MORNING", "NOON", "AFTERNOON",
];

/// Map free-form time-of-day text onto the fixed code vocabulary
pub fn classify_time_of_day(text: &str) -> TimeCode {
    let upper = text.to_ascii_uppercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|keyword| upper.contains(keyword));

    if contains_any(NIGHT_KEYWORDS) {
        TimeCode::Night
    } else if contains_any(DAY_KEYWORDS) {
        TimeCode::Day
    } else {
        TimeCode::Unknown
    }
}

/// Cap text at `max_chars` characters, marking the cut with an ellipsis
pub fn truncate_content(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => format!("{}{}", &text[..offset], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Turns merged scenes into the final table
#[derive(Debug, Clone)]
pub struct Normalizer {
    summary_max_chars: usize,
}

impl Normalizer {
    pub fn new(summary_max_chars: usize) -> Self {
        Self { summary_max_chars }
    }

    pub fn normalize(&self, merged: MergeOutput) -> MergedTable {
        let characters: Vec<String> = merged.roster.iter().map(|key| key.to_string()).collect();

        let scenes = merged
            .scenes
            .into_iter()
            .map(|scene| self.normalize_scene(scene, &merged.roster))
            .collect();

        MergedTable { characters, scenes }
    }

    fn normalize_scene(&self, scene: RawScene, roster: &[CharacterKey]) -> NormalizedScene {
        let present: HashSet<CharacterKey> = scene
            .characters
            .iter()
            .filter_map(|name| CharacterKey::parse(name))
            .collect();

        let presence: BTreeMap<String, bool> = roster
            .iter()
            .map(|key| (key.to_string(), present.contains(key)))
            .collect();

        NormalizedScene {
            time_code: classify_time_of_day(&scene.time_of_day),
            content: truncate_content(&scene.content, self.summary_max_chars),
            episode: scene.episode,
            scene_number: scene.scene_number,
            location: scene.location,
            time_of_day: scene.time_of_day,
            presence,
            props: scene.props,
            notes: scene.notes,
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(60)
    }
}
