/*!
 * Roster scan over the opening of a document.
 *
 * A single call on a bounded prefix yields the cast and a coarse scene
 * skeleton. The cast seeds every chunk call as spelling hints, and the
 * skeleton later fills in locations the chunk calls left empty. The scan also
 * acts as the early gate: a prefix the oracle rejects as non-script stops the
 * pipeline before any chunk is submitted.
 */

use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::BreakdownError;

use super::character::CharacterKey;
use super::model::{ExtractionResult, SkeletonEntry};
use super::oracle::ExtractionOracle;
use super::orchestrator::{call_with_retries, ChunkState, RetryPolicy};
use super::prompts::ExtractionRequest;

/// What the roster scan learned about the document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterScan {
    /// Raw character names, first spelling of each identity, in order of appearance
    pub characters: Vec<String>,

    /// Scene headings in order of appearance, one per scene key
    pub skeleton: Vec<SkeletonEntry>,
}

impl RosterScan {
    /// Build a scan from an extraction result
    pub fn from_result(result: &ExtractionResult) -> Self {
        let mut seen_characters = HashSet::new();
        let characters = result
            .characters
            .iter()
            .chain(result.scenes.iter().flat_map(|scene| scene.characters.iter()))
            .filter(|name| {
                CharacterKey::parse(name).is_some_and(|key| seen_characters.insert(key))
            })
            .map(|name| name.trim().to_string())
            .collect();

        let mut seen_scenes = HashSet::new();
        let skeleton = result
            .scenes
            .iter()
            .filter(|scene| seen_scenes.insert(scene.key()))
            .map(|scene| SkeletonEntry {
                episode: scene.episode,
                scene_number: scene.scene_number.clone(),
                location: scene.location.trim().to_string(),
            })
            .collect();

        Self {
            characters,
            skeleton,
        }
    }

    /// Canonical character names to pass as hints to chunk calls
    pub fn hints(&self) -> Vec<String> {
        let mut keys: Vec<CharacterKey> = self
            .characters
            .iter()
            .filter_map(|name| CharacterKey::parse(name))
            .collect();
        keys.sort();
        keys.dedup();
        keys.iter().map(|key| key.to_string()).collect()
    }
}

/// Take at most `budget` characters from the start of the text.
///
/// When the cut falls mid-line and a line break exists in the second half of
/// the budget, the sample ends after that line break instead.
pub fn sample_prefix(text: &str, budget: usize) -> &str {
    let cut = match text.char_indices().nth(budget) {
        Some((offset, _)) => offset,
        None => return text,
    };

    let prefix = &text[..cut];
    match prefix.rfind('\n') {
        Some(newline) if prefix[..newline].chars().count() >= budget / 2 => &prefix[..=newline],
        _ => prefix,
    }
}

/// Runs the roster scan
pub struct RosterScanner {
    oracle: Arc<dyn ExtractionOracle>,
    sample_chars: usize,
    retry: RetryPolicy,
}

impl RosterScanner {
    pub fn new(oracle: Arc<dyn ExtractionOracle>, sample_chars: usize, retry: RetryPolicy) -> Self {
        Self {
            oracle,
            sample_chars,
            retry,
        }
    }

    /// Scan the opening of the text.
    ///
    /// Returns `Ok(None)` when the scan could not complete; the pipeline then
    /// runs without hints. A non-script verdict is an error.
    pub async fn scan(&self, text: &str, deadline: Option<Instant>) -> Result<Option<RosterScan>, BreakdownError> {
        let sample = sample_prefix(text, self.sample_chars);
        info!("Scanning roster from the first {} chars", sample.chars().count());

        let request = ExtractionRequest::roster(sample);
        let report = call_with_retries(self.oracle.as_ref(), &request, self.retry, deadline).await;

        match report.state {
            ChunkState::Succeeded(result) => {
                let scan = RosterScan::from_result(&result);
                info!(
                    "Roster scan found {} character(s) and {} scene heading(s)",
                    scan.characters.len(),
                    scan.skeleton.len()
                );
                Ok(Some(scan))
            }
            ChunkState::NotScript(message) => Err(BreakdownError::NotAScript(message)),
            ChunkState::Exhausted(e) => {
                warn!("Roster scan failed, continuing without character hints: {}", e);
                Ok(None)
            }
            _ => {
                warn!("Roster scan did not complete, continuing without character hints");
                Ok(None)
            }
        }
    }
}
