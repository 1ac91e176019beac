/*!
 * Tests for character identities across the merge
 */

use scenebreak::breakdown::character::CharacterKey;
use scenebreak::breakdown::model::{ExtractionResult, RawScene};
use scenebreak::breakdown::{Normalizer, ResultMerger};

fn result_with_names(chunk_index: usize, names: &[&str]) -> ExtractionResult {
    ExtractionResult {
        chunk_index,
        is_script: true,
        error_message: None,
        characters: names.iter().map(|n| n.to_string()).collect(),
        scenes: Vec::new(),
    }
}

fn roster_names(results: &[ExtractionResult]) -> Vec<String> {
    ResultMerger::default()
        .merge(results, &[])
        .roster
        .iter()
        .map(|key| key.to_string())
        .collect()
}

#[test]
fn test_ageVariants_shouldStayDistinct() {
    let names = roster_names(&[result_with_names(0, &["Tanaka", "Tanaka(25)", "Tanaka(13)"])]);
    assert_eq!(names, vec!["Tanaka", "Tanaka(13)", "Tanaka(25)"]);
}

#[test]
fn test_repeatedNames_shouldCollapse() {
    let names = roster_names(&[result_with_names(0, &["Sato"]), result_with_names(1, &["Sato", " Sato "])]);
    assert_eq!(names, vec!["Sato"]);
}

#[test]
fn test_annotationVariants_shouldShareIdentity() {
    let names = roster_names(&[result_with_names(0, &["田中（声）", "田中", "田中(２５歳)", "田中（25）"])]);
    assert_eq!(names, vec!["田中", "田中(25)"]);
}

#[test]
fn test_presence_shouldMatchAnnotatedCastToCanonicalColumn() {
    let mut scene = RawScene::new(1, "7");
    scene.characters = vec!["JOHN (V.O.)".to_string(), "MARY(30)".to_string()];

    let results = vec![ExtractionResult {
        chunk_index: 0,
        is_script: true,
        error_message: None,
        characters: vec!["JOHN".to_string(), "MARY".to_string(), "MARY (30)".to_string()],
        scenes: vec![scene],
    }];

    let table = Normalizer::default().normalize(ResultMerger::default().merge(&results, &[]));

    assert_eq!(table.characters, vec!["JOHN", "MARY", "MARY(30)"]);
    assert!(table.presence_is_complete());
    assert_eq!(table.scenes[0].present_characters(), vec!["JOHN", "MARY(30)"]);
}

#[test]
fn test_parse_shouldRejectNamesWithoutABase() {
    for raw in ["", "（声）", "(12)", "\u{3000}"] {
        assert!(CharacterKey::parse(raw).is_none(), "{:?} should not parse", raw);
    }
}
