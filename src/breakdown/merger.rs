/*!
 * Merging per-chunk results into one scene list.
 *
 * Chunk boundaries and overlaps mean the same scene is often reported more
 * than once. Variants are grouped by scene key and reduced to a single scene;
 * the variant with the longest content wins, ties going to the earlier chunk.
 * The merge is a pure function of its input, so feeding it the same results
 * again (or duplicated results) gives the same output.
 */

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::character::CharacterKey;
use super::model::{ExtractionResult, RawScene, SceneKey, SkeletonEntry};

/// How the character lists of duplicate scene variants combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterMergePolicy {
    /// The winner keeps its list plus every other variant's characters
    #[default]
    Union,
    /// The winner's list is used as is
    Replace,
}

impl std::str::FromStr for CharacterMergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "union" => Ok(Self::Union),
            "replace" => Ok(Self::Replace),
            _ => Err(format!("Invalid character merge policy: {}", s)),
        }
    }
}

/// Merged scenes and the character roster, both sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutput {
    pub roster: Vec<CharacterKey>,
    pub scenes: Vec<RawScene>,
}

/// Deterministic merger of extraction results
#[derive(Debug, Clone, Default)]
pub struct ResultMerger {
    policy: CharacterMergePolicy,
}

impl ResultMerger {
    pub fn new(policy: CharacterMergePolicy) -> Self {
        Self { policy }
    }

    /// Merge results, using the skeleton to fill missing locations
    pub fn merge(&self, results: &[ExtractionResult], skeleton: &[SkeletonEntry]) -> MergeOutput {
        let mut ordered: Vec<&ExtractionResult> = results.iter().collect();
        ordered.sort_by_key(|result| result.chunk_index);

        let mut variants: BTreeMap<SceneKey, Vec<&RawScene>> = BTreeMap::new();
        for scene in ordered.iter().flat_map(|result| result.scenes.iter()) {
            if scene.scene_number.is_empty() {
                continue;
            }
            variants.entry(scene.key()).or_default().push(scene);
        }

        let skeleton_locations: HashMap<SceneKey, &str> = skeleton
            .iter()
            .filter(|entry| !entry.location.trim().is_empty())
            .fold(HashMap::new(), |mut locations, entry| {
                locations.entry(entry.key()).or_insert(entry.location.trim());
                locations
            });

        let scenes: Vec<RawScene> = variants
            .into_iter()
            .map(|(key, group)| {
                let mut scene = self.reduce(&group);
                if scene.location.is_empty() {
                    if let Some(location) = skeleton_locations.get(&key) {
                        scene.location = location.to_string();
                    }
                }
                scene
            })
            .collect();

        let roster = collect_roster(&ordered);

        debug!(
            "Merged {} result(s) into {} scene(s) and {} character(s)",
            results.len(),
            scenes.len(),
            roster.len()
        );

        MergeOutput { roster, scenes }
    }

    /// Reduce the variants of one scene, given in chunk order
    fn reduce(&self, group: &[&RawScene]) -> RawScene {
        let mut winner_index = 0;
        for (index, variant) in group.iter().enumerate() {
            if variant.content_len() > group[winner_index].content_len() {
                winner_index = index;
            }
        }

        let winner = group[winner_index];
        let losers: Vec<&RawScene> = group
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != winner_index)
            .map(|(_, variant)| *variant)
            .collect();

        let mut scene = RawScene {
            location: winner.location.trim().to_string(),
            time_of_day: winner.time_of_day.trim().to_string(),
            content: winner.content.trim().to_string(),
            notes: winner.notes.trim().to_string(),
            characters: dedupe_characters(winner.characters.iter()),
            props: dedupe_props(winner.props.iter()),
            ..RawScene::new(winner.episode, &winner.scene_number)
        };

        fill_from(&mut scene.location, &losers, |variant| &variant.location);
        fill_from(&mut scene.time_of_day, &losers, |variant| &variant.time_of_day);
        fill_from(&mut scene.notes, &losers, |variant| &variant.notes);

        if self.policy == CharacterMergePolicy::Union {
            let all = winner
                .characters
                .iter()
                .chain(losers.iter().flat_map(|variant| variant.characters.iter()));
            scene.characters = dedupe_characters(all);
        }

        let all_props = winner
            .props
            .iter()
            .chain(losers.iter().flat_map(|variant| variant.props.iter()));
        scene.props = dedupe_props(all_props);

        scene
    }
}

/// Fill an empty field from the first variant that has it
fn fill_from(field: &mut String, variants: &[&RawScene], get: impl Fn(&RawScene) -> &String) {
    if !field.is_empty() {
        return;
    }
    if let Some(value) = variants
        .iter()
        .map(|variant| get(variant).trim())
        .find(|value| !value.is_empty())
    {
        *field = value.to_string();
    }
}

/// Keep the first raw spelling of each character identity
fn dedupe_characters<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .filter(|name| CharacterKey::parse(name).is_some_and(|key| seen.insert(key)))
        .map(|name| name.trim().to_string())
        .collect()
}

fn dedupe_props<'a>(props: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    props
        .map(|prop| prop.trim())
        .filter(|prop| !prop.is_empty() && seen.insert(prop.to_string()))
        .map(str::to_string)
        .collect()
}

/// Sorted unique canonical keys of every character mentioned anywhere
fn collect_roster(results: &[&ExtractionResult]) -> Vec<CharacterKey> {
    let names = results.iter().flat_map(|result| {
        result
            .characters
            .iter()
            .chain(result.scenes.iter().flat_map(|scene| scene.characters.iter()))
    });

    names
        .filter_map(|name| CharacterKey::parse(name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
