/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use std::time::Duration;

use scenebreak::app_config::{Config, LogLevel, OracleProvider};
use scenebreak::breakdown::orchestrator::RetryPolicy;
use scenebreak::breakdown::{CharacterMergePolicy, PipelineOptions};

use crate::common;

/// Test that a config file on disk loads with every section
#[test]
fn test_configFile_shouldLoad() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let json = r#"{
        "oracle": {
            "provider": "openai",
            "available_providers": [
                {"type": "openai", "model": "gpt-4o", "api_key": "sk-test", "endpoint": "", "timeout_secs": 30}
            ],
            "common": {"retry_count": 5, "retry_backoff_ms": 250}
        },
        "breakdown": {
            "max_chunk_chars": 4000,
            "overlap_chars": 200,
            "concurrent_requests": 6,
            "deadline_secs": null,
            "character_merge": "replace"
        },
        "log_level": "debug"
    }"#;
    let path = common::create_test_file(temp_dir.path(), "conf.json", json)?;

    let config: Config = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    config.validate()?;

    assert_eq!(config.oracle.provider, OracleProvider::OpenAI);
    assert_eq!(config.oracle.get_model(), "gpt-4o");
    assert_eq!(config.oracle.get_endpoint(), "https://api.openai.com/v1");
    assert_eq!(config.oracle.get_timeout_secs(), 30);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.breakdown.deadline(), None);
    assert_eq!(config.breakdown.character_merge, CharacterMergePolicy::Replace);
    Ok(())
}

/// Test that pipeline options follow the config
#[test]
fn test_pipelineOptions_shouldFollowConfig() -> Result<()> {
    let mut config = Config::default();
    config.oracle.common.retry_count = 2;
    config.oracle.common.retry_backoff_ms = 500;
    config.breakdown.concurrent_requests = 4;
    config.breakdown.enable_roster_scan = false;

    let options = PipelineOptions::from_config(&config);
    assert_eq!(options.retry, RetryPolicy::new(2, Duration::from_millis(500)));
    assert_eq!(options.retry.max_attempts(), 3);
    assert_eq!(options.concurrency, 4);
    assert!(!options.enable_roster_scan);
    assert_eq!(options.deadline, Some(Duration::from_secs(600)));
    Ok(())
}

/// Test that a default config survives a JSON round trip and stays valid
#[test]
fn test_defaultConfig_shouldRoundTrip() -> Result<()> {
    let json = serde_json::to_string_pretty(&Config::default())?;
    let config: Config = serde_json::from_str(&json)?;

    config.validate()?;
    assert_eq!(config.oracle.available_providers.len(), 4);
    assert!(json.contains("\"character_merge\": \"union\""));
    Ok(())
}

/// Test the settings validation rejects
#[test]
fn test_invalidSettings_shouldFailValidation() {
    let cases: Vec<Box<dyn Fn(&mut Config)>> = vec![
        Box::new(|c: &mut Config| c.breakdown.max_chunk_chars = 0),
        Box::new(|c: &mut Config| c.breakdown.concurrent_requests = 0),
        Box::new(|c: &mut Config| c.breakdown.summary_max_chars = 0),
        Box::new(|c: &mut Config| c.breakdown.roster_sample_chars = 0),
        Box::new(|c: &mut Config| c.oracle.provider = OracleProvider::OpenAI),
    ];

    for (i, mutate) in cases.iter().enumerate() {
        let mut config = Config::default();
        mutate(&mut config);
        assert!(config.validate().is_err(), "case {} should fail", i);
    }
}

/// Test that unknown provider and merge names are rejected
#[test]
fn test_unknownNames_shouldNotParse() {
    assert!("gemini".parse::<OracleProvider>().is_err());
    assert_eq!("LMStudio".parse::<OracleProvider>().unwrap(), OracleProvider::LMStudio);
    assert!("intersect".parse::<CharacterMergePolicy>().is_err());
    assert!(serde_json::from_str::<Config>(r#"{"breakdown": {"character_merge": "intersect"}}"#).is_err());
}
