/*!
 * Tests for splitting scripts into chunks
 */

use scenebreak::breakdown::segmenter::{reconstruct, Segmenter};
use scenebreak::errors::BreakdownError;

use crate::common::sample_script;

fn texts() -> Vec<String> {
    vec![
        sample_script(9),
        "INT. KITCHEN - NIGHT\nJOHN\nWhere were you?\n\nEXT. STREET - DAY\nMARY walks away.\n".to_string(),
        "#1 駅前\n田中「おはよう」\n#2 教室\n佐藤「遅刻だよ」\n#3 屋上\n".to_string(),
        "No headings at all, just one long line of prose that keeps going and going.".to_string(),
        "\n\n○ 冒頭\r\n空行から始まる台本\n".to_string(),
    ]
}

#[test]
fn test_chunks_shouldReconstructEveryText() {
    for text in texts() {
        for (max, overlap) in [(20, 0), (20, 5), (64, 16), (5000, 0)] {
            let segmenter = Segmenter::new(max, overlap).unwrap();
            let chunks = segmenter.split(&text).unwrap();

            assert_eq!(reconstruct(&chunks), text, "max={} overlap={}", max, overlap);
            assert!(chunks.iter().all(|chunk| chunk.char_len() <= max));
            assert!(chunks.iter().enumerate().all(|(i, chunk)| chunk.index == i));
            assert_eq!(chunks[0].overlap, 0);
        }
    }
}

#[test]
fn test_split_shouldBeDeterministic() {
    let segmenter = Segmenter::new(64, 8).unwrap();
    let text = sample_script(20);
    assert_eq!(segmenter.split(&text).unwrap(), segmenter.split(&text).unwrap());
}

#[test]
fn test_sampleScript_shouldPutOneScenePerChunk() {
    let segmenter = Segmenter::new(50, 0).unwrap();
    let chunks = segmenter.split(&sample_script(5)).unwrap();

    assert_eq!(chunks.len(), 5);
    for (i, chunk) in chunks.iter().enumerate() {
        assert!(chunk.text.starts_with(&format!("○ 場所{}", i)));
    }
}

#[test]
fn test_overlap_shouldCarryPreviousTail() {
    let segmenter = Segmenter::new(50, 10).unwrap();
    let chunks = segmenter.split(&sample_script(3)).unwrap();

    assert_eq!(chunks.len(), 3);
    for pair in chunks.windows(2) {
        let previous: Vec<char> = pair[0].text.chars().collect();
        let tail: String = previous[previous.len() - 10..].iter().collect();
        assert_eq!(pair[1].overlap, 10);
        assert!(pair[1].text.starts_with(&tail));
    }
}

#[test]
fn test_invalidSettings_shouldBeRejected() {
    assert!(matches!(Segmenter::new(0, 0), Err(BreakdownError::InvalidConfig(_))));
    assert!(matches!(Segmenter::new(100, 150), Err(BreakdownError::InvalidConfig(_))));
    assert!(matches!(Segmenter::new(10, 0).unwrap().split(""), Err(BreakdownError::InputEmpty)));
}
