/*!
 * Data model for the scene breakdown.
 *
 * Chunks flow out of the segmenter, extraction results come back from the
 * oracle, and the merged table is what callers finally receive.
 */

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Episode assumed for scenes that do not name one
pub const DEFAULT_EPISODE: u32 = 1;

/// A bounded slice of the source text submitted to one extraction call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in the document
    pub index: usize,

    /// Text sent to the oracle, including any repeated overlap prefix
    pub text: String,

    /// Number of leading characters repeated from the previous chunk
    pub overlap: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(index: usize, text: String, overlap: usize) -> Self {
        Self { index, text, overlap }
    }

    /// The part of the chunk that is not repeated from its predecessor
    pub fn body(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((offset, _)) => &self.text[offset..],
            None => "",
        }
    }

    /// Length of the chunk text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Identity of a scene across chunks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneKey {
    pub episode: u32,
    pub scene_number: String,
}

impl SceneKey {
    pub fn new(episode: u32, scene_number: impl Into<String>) -> Self {
        Self {
            episode,
            scene_number: scene_number.into(),
        }
    }
}

impl Ord for SceneKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.episode
            .cmp(&other.episode)
            .then_with(|| compare_scene_numbers(&self.scene_number, &other.scene_number))
    }
}

impl PartialOrd for SceneKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.episode, self.scene_number)
    }
}

/// Numeric scene numbers sort numerically and ahead of non-numeric ones,
/// which sort lexically among themselves.
pub fn compare_scene_numbers(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Fold full-width digits to their ASCII counterparts
pub fn fold_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            _ => c,
        })
        .collect()
}

/// Canonical form of a scene number: trimmed, ASCII digits, no leading zeros
pub fn canonical_scene_number(raw: &str) -> String {
    let folded = fold_digits(raw.trim());
    match folded.parse::<u64>() {
        Ok(number) => number.to_string(),
        Err(_) => folded,
    }
}

/// A scene record as reported by the oracle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawScene {
    pub episode: u32,
    pub scene_number: String,
    pub location: String,
    pub time_of_day: String,
    pub content: String,
    pub characters: Vec<String>,
    pub props: Vec<String>,
    pub notes: String,
}

impl RawScene {
    /// Create a scene with the given identity and everything else empty
    pub fn new(episode: u32, scene_number: impl AsRef<str>) -> Self {
        Self {
            episode,
            scene_number: canonical_scene_number(scene_number.as_ref()),
            ..Default::default()
        }
    }

    /// Identity key used for deduplication
    pub fn key(&self) -> SceneKey {
        SceneKey::new(self.episode, self.scene_number.clone())
    }

    /// Length of the content summary in characters
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Outcome of one successful extraction call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Index of the chunk this result was extracted from
    pub chunk_index: usize,

    /// Whether the oracle considered the text a script
    pub is_script: bool,

    /// Message the oracle attached to its answer, if any
    pub error_message: Option<String>,

    /// Raw character names seen in the chunk
    pub characters: Vec<String>,

    /// Raw scene records
    pub scenes: Vec<RawScene>,
}

/// One line of the coarse scene skeleton produced by the roster scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonEntry {
    pub episode: u32,
    pub scene_number: String,
    pub location: String,
}

impl SkeletonEntry {
    pub fn key(&self) -> SceneKey {
        SceneKey::new(self.episode, self.scene_number.clone())
    }
}

/// Fixed-vocabulary time-of-day code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeCode {
    Day,
    Night,
    #[default]
    Unknown,
}

impl TimeCode {
    /// Short code used in the breakdown table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "D",
            Self::Night => "N",
            Self::Unknown => "",
        }
    }
}

impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TimeCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TimeCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        match code.as_str() {
            "D" => Ok(Self::Day),
            "N" => Ok(Self::Night),
            "" => Ok(Self::Unknown),
            other => Err(serde::de::Error::custom(format!("unknown time code: {}", other))),
        }
    }
}

/// A fully normalized row of the breakdown table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedScene {
    pub episode: u32,
    pub scene_number: String,
    pub location: String,
    /// Time-of-day text as reported by the oracle
    pub time_of_day: String,
    pub time_code: TimeCode,
    /// Content summary, capped in length
    pub content: String,
    /// One entry per roster character, keyed by canonical name
    pub presence: BTreeMap<String, bool>,
    pub props: Vec<String>,
    pub notes: String,
}

impl NormalizedScene {
    pub fn key(&self) -> SceneKey {
        SceneKey::new(self.episode, self.scene_number.clone())
    }

    /// Canonical names of the characters present in this scene
    pub fn present_characters(&self) -> Vec<&str> {
        self.presence
            .iter()
            .filter(|(_, present)| **present)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// The merged, normalized breakdown of a whole document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedTable {
    /// Sorted unique canonical character names
    pub characters: Vec<String>,

    /// Sorted, deduplicated scenes
    pub scenes: Vec<NormalizedScene>,
}

impl MergedTable {
    /// Whether every scene carries exactly one presence entry per roster character
    pub fn presence_is_complete(&self) -> bool {
        self.scenes.iter().all(|scene| {
            scene.presence.len() == self.characters.len()
                && self.characters.iter().all(|name| scene.presence.contains_key(name))
        })
    }
}

/// Progress of a multi-chunk run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}
