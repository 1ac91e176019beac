/*!
 * Tests for the controller's file workflow
 */

use anyhow::Result;
use std::sync::Arc;

use scenebreak::app_config::Config;
use scenebreak::app_controller::Controller;
use scenebreak::providers::mock::MockOracle;

use crate::common;

fn test_config() -> Config {
    let mut config = Config::default();
    config.oracle.common.retry_count = 1;
    config.oracle.common.retry_backoff_ms = 0;
    config.breakdown.max_chunk_chars = 50;
    config.breakdown.deadline_secs = None;
    config
}

fn controller(oracle: &MockOracle) -> Controller {
    Controller::with_oracle(test_config(), Arc::new(oracle.clone()))
}

/// Test that a single script is written as a JSON breakdown next to the input
#[tokio::test]
async fn test_run_shouldWriteBreakdownJson() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "ep01.txt", &common::sample_script(3))?;

    let oracle = MockOracle::working();
    let written = controller(&oracle).run(input, None, false).await?;

    let output = temp_dir.path().join("ep01.breakdown.json");
    assert_eq!(written, Some(output.clone()));

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    assert_eq!(json["table"]["characters"], serde_json::json!(["田中"]));
    assert_eq!(json["table"]["scenes"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["table"]["scenes"][0]["presence"]["田中"], serde_json::json!(true));
    assert_eq!(json["stats"]["succeeded"], serde_json::json!(3));
    Ok(())
}

/// Test that an existing breakdown is left alone unless overwriting is forced
#[tokio::test]
async fn test_runExistingOutput_shouldSkipWithoutForce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "ep02.txt", &common::sample_script(2))?;
    let existing = common::create_test_file(temp_dir.path(), "ep02.breakdown.json", "{}")?;

    let oracle = MockOracle::working();
    let controller = controller(&oracle);

    let skipped = controller.run(input.clone(), None, false).await?;
    assert!(skipped.is_none());
    assert_eq!(oracle.call_count(), 0);
    assert_eq!(std::fs::read_to_string(&existing)?, "{}");

    let forced = controller.run(input, None, true).await?;
    assert_eq!(forced, Some(existing.clone()));
    assert_ne!(std::fs::read_to_string(&existing)?, "{}");
    Ok(())
}

/// Test that an explicit output path is honored
#[tokio::test]
async fn test_runWithOutputPath_shouldWriteThere() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "pilot.fountain", &common::sample_script(1))?;
    let output = temp_dir.path().join("reports").join("pilot.json");

    let oracle = MockOracle::working();
    let written = controller(&oracle).run(input, Some(output.clone()), false).await?;

    assert_eq!(written, Some(output.clone()));
    assert!(output.exists());
    Ok(())
}

/// Test that a non-script file surfaces as an error and writes nothing
#[tokio::test]
async fn test_runNonScript_shouldFailWithoutOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "recipe.txt", "Mix flour and water.\nBake for 20 minutes.\n")?;

    let oracle = MockOracle::not_script();
    let result = controller(&oracle).run(input, None, false).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("recipe.breakdown.json").exists());
    Ok(())
}

/// Test that a directory run processes every script file and keeps going after failures
#[tokio::test]
async fn test_runFolder_shouldProcessEveryScript() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("season1");
    std::fs::create_dir_all(&nested)?;

    common::create_test_file(temp_dir.path(), "ep01.txt", &common::sample_script(2))?;
    common::create_test_file(&nested, "ep02.fountain", &common::sample_script(2))?;
    common::create_test_file(&nested, "notes.md", "not a script file")?;
    common::create_test_file(temp_dir.path(), "empty.txt", "   \n")?;

    let oracle = MockOracle::working();
    controller(&oracle).run_folder(temp_dir.path().to_path_buf(), false).await?;

    assert!(temp_dir.path().join("ep01.breakdown.json").exists());
    assert!(nested.join("ep02.breakdown.json").exists());
    assert!(!nested.join("notes.breakdown.json").exists());
    assert!(!temp_dir.path().join("empty.breakdown.json").exists());
    Ok(())
}

/// Test that a directory without scripts is an error
#[tokio::test]
async fn test_runFolderWithoutScripts_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "readme.md", "nothing here")?;

    let oracle = MockOracle::working();
    let result = controller(&oracle).run_folder(temp_dir.path().to_path_buf(), false).await;

    assert!(result.is_err());
    Ok(())
}

/// Test that a controller around a non-provider oracle skips the connection check
#[tokio::test]
async fn test_checkConnectionWithMockOracle_shouldPassWithoutCalls() {
    let oracle = MockOracle::working();
    assert!(controller(&oracle).check_connection().await);
    assert_eq!(oracle.call_count(), 0);
}
