/*!
 * Integration tests for the full breakdown pipeline.
 *
 * Every test drives `BreakdownPipeline::run` against the scripted mock oracle.
 */

use std::sync::Arc;
use std::time::Duration;

use scenebreak::breakdown::model::{Progress, TimeCode};
use scenebreak::breakdown::pipeline::{BreakdownPipeline, PipelineOptions};
use scenebreak::breakdown::prompts::RequestKind;
use scenebreak::breakdown::CharacterMergePolicy;
use scenebreak::errors::{BreakdownError, ProviderError};
use scenebreak::providers::mock::MockOracle;

use crate::common::{fast_options, sample_script, ProgressRecorder};

fn pipeline(oracle: &MockOracle, options: PipelineOptions) -> BreakdownPipeline {
    BreakdownPipeline::new(Arc::new(oracle.clone()), options).unwrap()
}

fn scene_numbers(report: &scenebreak::BreakdownReport) -> Vec<String> {
    report.table.scenes.iter().map(|s| s.scene_number.clone()).collect()
}

#[tokio::test]
async fn test_pipelineWorkingOracle_shouldReturnOneScenePerChunk() {
    let oracle = MockOracle::working();
    let recorder = ProgressRecorder::default();
    let pipeline = pipeline(&oracle, fast_options(50)).with_progress(recorder.callback());

    let report = pipeline.run(&sample_script(4)).await.unwrap();

    assert_eq!(scene_numbers(&report), vec!["1", "2", "3", "4"]);
    assert_eq!(report.table.characters, vec!["田中"]);
    assert!(report.table.presence_is_complete());
    assert_eq!(report.stats.succeeded, 4);
    assert_eq!(recorder.last(), Some(Progress { completed: 4, total: 4 }));

    // roster hints reach every chunk call
    let chunk_requests: Vec<_> = oracle
        .requests()
        .into_iter()
        .filter(|r| matches!(r.kind, RequestKind::Chunk(_)))
        .collect();
    assert_eq!(chunk_requests.len(), 4);
    assert!(chunk_requests.iter().all(|r| r.character_hints == vec!["田中".to_string()]));
}

#[tokio::test]
async fn test_pipelineChunkExhaustingRetries_shouldBeLeftOut() {
    let oracle = MockOracle::working().with_chunk_replies(
        3,
        vec![Err(ProviderError::ApiError { status_code: 503, message: "overloaded".into() })],
    );
    let recorder = ProgressRecorder::default();
    let pipeline = pipeline(&oracle, fast_options(50)).with_progress(recorder.callback());

    let report = pipeline.run(&sample_script(5)).await.unwrap();

    assert_eq!(scene_numbers(&report), vec!["1", "2", "3", "5"]);
    assert_eq!(report.stats.failed_chunks, vec![3]);
    assert_eq!(report.stats.succeeded, 4);
    assert_eq!(oracle.calls_for(RequestKind::Chunk(3)), 3);

    let seen = recorder.seen();
    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0].completed < w[1].completed));
    assert_eq!(recorder.last(), Some(Progress { completed: 5, total: 5 }));
}

#[tokio::test]
async fn test_pipelineTransientFailures_shouldBeRetried() {
    let oracle = MockOracle::working()
        .with_chunk_replies(
            1,
            vec![
                Err(ProviderError::ConnectionError("reset".into())),
                Ok("I could not find any JSON to give you".into()),
                Ok(MockOracle::script_reply(&["田中"], &[("2", "recovered", &["田中"])])),
            ],
        );
    let report = pipeline(&oracle, fast_options(50)).run(&sample_script(3)).await.unwrap();

    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.table.scenes[1].content, "recovered");
    assert_eq!(oracle.calls_for(RequestKind::Chunk(1)), 3);
}

#[tokio::test]
async fn test_pipelineNonScriptRosterSample_shouldAbortBeforeChunkCalls() {
    let oracle = MockOracle::working()
        .with_roster_replies(vec![Ok(MockOracle::not_script_reply("This is a cooking recipe"))]);

    let result = pipeline(&oracle, fast_options(50)).run(&sample_script(5)).await;

    assert!(matches!(result, Err(BreakdownError::NotAScript(ref m)) if m == "This is a cooking recipe"));
    assert_eq!(oracle.call_count(), 1);
}

#[tokio::test]
async fn test_pipelineNonScriptFirstChunk_shouldAbortWithoutRoster() {
    let oracle = MockOracle::not_script();
    let options = PipelineOptions {
        enable_roster_scan: false,
        ..fast_options(50)
    };

    let result = pipeline(&oracle, options).run(&sample_script(6)).await;

    assert!(matches!(result, Err(BreakdownError::NotAScript(_))));
    // only the first batch was issued
    assert_eq!(oracle.call_count(), 2);
}

#[tokio::test]
async fn test_pipelineNonScriptLaterChunk_shouldBeSkipped() {
    let oracle = MockOracle::working()
        .with_chunk_replies(4, vec![Ok(MockOracle::not_script_reply("appendix"))]);

    let report = pipeline(&oracle, fast_options(50)).run(&sample_script(5)).await.unwrap();

    assert_eq!(report.stats.skipped_chunks, vec![4]);
    assert_eq!(oracle.calls_for(RequestKind::Chunk(4)), 1);
    assert_eq!(scene_numbers(&report), vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_pipelineEveryChunkFailing_shouldBeFatal() {
    let oracle = MockOracle::failing();

    let result = pipeline(&oracle, fast_options(50)).run(&sample_script(5)).await;

    match result {
        Err(BreakdownError::AllChunksFailed { total, failed, skipped }) => {
            assert_eq!((total, failed, skipped), (5, 5, 0));
        }
        other => panic!("expected AllChunksFailed, got {:?}", other.map(|r| r.stats)),
    }
    // roster scan gave up as well but did not stop the run
    assert_eq!(oracle.calls_for(RequestKind::Roster), 3);
    assert_eq!(oracle.call_count(), 3 * 6);
}

#[tokio::test]
async fn test_pipelineRosterFailure_shouldContinueWithoutHints() {
    let oracle = MockOracle::working()
        .with_roster_replies(vec![Err(ProviderError::ConnectionError("refused".into()))]);

    let report = pipeline(&oracle, fast_options(50)).run(&sample_script(2)).await.unwrap();

    assert!(report.skeleton.is_empty());
    assert_eq!(report.stats.succeeded, 2);
    assert!(oracle.requests().iter().all(|r| r.character_hints.is_empty()));
}

#[tokio::test]
async fn test_pipelineElapsedDeadline_shouldReturnPartialResults() {
    let oracle = MockOracle::slow(150);
    let options = PipelineOptions {
        enable_roster_scan: false,
        concurrency: 1,
        deadline: Some(Duration::from_millis(250)),
        ..fast_options(50)
    };
    let recorder = ProgressRecorder::default();

    let report = pipeline(&oracle, options)
        .with_progress(recorder.callback())
        .run(&sample_script(6))
        .await
        .unwrap();

    assert!(report.stats.deadline_elapsed);
    assert!(report.stats.succeeded >= 1 && report.stats.succeeded < 6);
    assert_eq!(report.stats.skipped, 6 - report.stats.succeeded);
    assert_eq!(report.table.scenes.len(), report.stats.succeeded);
    assert_eq!(recorder.last(), Some(Progress { completed: 6, total: 6 }));
}

#[tokio::test]
async fn test_pipelineOverlappingChunks_shouldMergeDuplicateScenes() {
    let short_variant = "a".repeat(11);
    let long_variant = "b".repeat(49);

    let oracle = MockOracle::working()
        .with_roster_replies(vec![Ok(MockOracle::script_reply(&["Tanaka", "Sato"], &[]))])
        .with_chunk_replies(
            0,
            vec![Ok(MockOracle::script_reply(
                &["Tanaka"],
                &[("1", "opening", &["Tanaka", "Sato"]), ("2", short_variant.as_str(), &["Tanaka(25)"])],
            ))],
        )
        .with_chunk_replies(
            1,
            vec![Ok(MockOracle::script_reply(
                &["Tanaka(13)"],
                &[("02", long_variant.as_str(), &["Tanaka(13)"]), ("3", "ending", &["Sato", "Sato"])],
            ))],
        );

    let options = PipelineOptions {
        overlap_chars: 10,
        ..fast_options(60)
    };
    let report = pipeline(&oracle, options).run(&sample_script(2)).await.unwrap();
    let table = &report.table;

    assert_eq!(scene_numbers(&report), vec!["1", "2", "3"]);
    assert_eq!(table.scenes[1].content.chars().count(), 49);
    assert_eq!(table.characters, vec!["Sato", "Tanaka", "Tanaka(13)", "Tanaka(25)"]);
    assert!(table.presence_is_complete());

    // union keeps the losing variant's cast
    assert_eq!(table.scenes[1].present_characters(), vec!["Tanaka(13)", "Tanaka(25)"]);
    assert_eq!(table.scenes[2].present_characters(), vec!["Sato"]);
}

#[tokio::test]
async fn test_pipelineReplacePolicy_shouldKeepWinnerCastOnly() {
    let oracle = MockOracle::working()
        .with_chunk_replies(0, vec![Ok(MockOracle::script_reply(&[], &[("1", "short", &["A"])]))])
        .with_chunk_replies(1, vec![Ok(MockOracle::script_reply(&[], &[("1", "the longer one", &["B"])]))]);

    let options = PipelineOptions {
        character_merge: CharacterMergePolicy::Replace,
        enable_roster_scan: false,
        ..fast_options(50)
    };
    let report = pipeline(&oracle, options).run(&sample_script(2)).await.unwrap();

    assert_eq!(report.table.characters, vec!["A", "B"]);
    assert_eq!(report.table.scenes[0].present_characters(), vec!["B"]);
}

#[tokio::test]
async fn test_pipeline_shouldNormalizeTimeAndCapSummaries() {
    let reply = r#"{"is_script": true, "scenes": [
        {"scene": "1", "time": "夕方", "summary": "SUMMARY", "cast": "田中、佐藤", "props": "傘, 鞄"},
        {"scene_number": 2, "time_of_day": "深夜", "content": "short"}
    ]}"#
    .replace("SUMMARY", &"長".repeat(90));

    let oracle = MockOracle::working().with_chunk_replies(0, vec![Ok(reply)]);
    let options = PipelineOptions {
        enable_roster_scan: false,
        ..fast_options(500)
    };
    let report = pipeline(&oracle, options).run(&sample_script(2)).await.unwrap();
    let scenes = &report.table.scenes;

    assert_eq!(scenes[0].time_code, TimeCode::Day);
    assert_eq!(scenes[1].time_code, TimeCode::Night);
    assert_eq!(scenes[0].content.chars().count(), 61);
    assert!(scenes[0].content.ends_with('…'));
    assert_eq!(scenes[1].content, "short");
    assert_eq!(scenes[0].props, vec!["傘", "鞄"]);
    assert_eq!(scenes[0].present_characters(), vec!["佐藤", "田中"]);
}

#[tokio::test]
async fn test_pipeline_shouldBeDeterministicAcrossRuns() {
    let oracle = MockOracle::intermittent(4);
    let options = PipelineOptions {
        concurrency: 1,
        ..fast_options(50)
    };
    let text = sample_script(7);

    let first = pipeline(&oracle, options.clone()).run(&text).await.unwrap();
    let second = pipeline(&oracle, options).run(&text).await.unwrap();

    assert_eq!(first.table, second.table);
    assert_eq!(first.stats.failed, 0);
}
