/*!
 * Tests for reading oracle replies
 */

use scenebreak::breakdown::response::{extract_json, parse_reply, OracleReply};
use scenebreak::errors::BreakdownError;
use scenebreak::providers::mock::MockOracle;

#[test]
fn test_mockScriptReply_shouldParse() {
    let raw = MockOracle::script_reply(&["田中", "佐藤"], &[("1", "出会い", &["田中", "佐藤"]), ("2", "別れ", &["佐藤"])]);

    match parse_reply(3, &raw).unwrap() {
        OracleReply::Extracted(result) => {
            assert_eq!(result.chunk_index, 3);
            assert_eq!(result.characters, vec!["田中", "佐藤"]);
            let numbers: Vec<&str> = result.scenes.iter().map(|s| s.scene_number.as_str()).collect();
            assert_eq!(numbers, vec!["1", "2"]);
            assert_eq!(result.scenes[1].characters, vec!["佐藤"]);
        }
        other => panic!("expected extraction, got {:?}", other),
    }
}

#[test]
fn test_notScriptWithoutMessage_shouldGetDefaultMessage() {
    match parse_reply(0, r#"{"is_script": "no", "error_message": "   "}"#).unwrap() {
        OracleReply::NotScript { message } => assert!(!message.is_empty()),
        other => panic!("expected not-script, got {:?}", other),
    }
}

#[test]
fn test_extractJson_shouldPreferFencedBlock() {
    let raw = "Note {not json}\n```json\n{\"scenes\": []}\n```";
    assert_eq!(extract_json(raw), Some("{\"scenes\": []}"));
}

#[test]
fn test_extractJson_shouldHandleNestedObjectsAndEscapes() {
    let raw = r#"Result: {"a": {"b": "quote \" and brace }"}} trailing"#;
    assert_eq!(extract_json(raw), Some(r#"{"a": {"b": "quote \" and brace }"}}"#));
}

#[test]
fn test_nonObjectReplies_shouldBeSchemaErrors() {
    for raw in ["", "[1, 2, 3]", "null", "{\"is_script\": [true]}", "{\"is_script\": true, \"characters\": 5}"] {
        assert!(
            matches!(parse_reply(0, raw), Err(BreakdownError::OracleSchema(_))),
            "{:?} should be rejected",
            raw
        );
    }
}

#[test]
fn test_schemaErrors_shouldBeRetryable() {
    let error = parse_reply(0, "no json").unwrap_err();
    assert!(error.is_retryable());
    assert!(!BreakdownError::NotAScript("recipe".into()).is_retryable());
}

#[test]
fn test_sceneNumbers_shouldBeCanonicalized() {
    let raw = r#"{"is_script": true, "scenes": [
        {"scene_number": "００７", "content": "a"},
        {"scene_number": 8, "content": "b"},
        {"scene_number": "12A", "content": "c"},
        {"scene_number": "   ", "content": "dropped"}
    ]}"#;

    match parse_reply(0, raw).unwrap() {
        OracleReply::Extracted(result) => {
            let numbers: Vec<&str> = result.scenes.iter().map(|s| s.scene_number.as_str()).collect();
            assert_eq!(numbers, vec!["7", "8", "12A"]);
        }
        other => panic!("expected extraction, got {:?}", other),
    }
}
