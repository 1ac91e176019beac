/*!
 * Mock oracle implementations for testing.
 *
 * This module provides a mock oracle that simulates different behaviors:
 * - `MockOracle::working()` - Always answers with a one-scene script reply
 * - `MockOracle::intermittent(n)` - Fails every nth call
 * - `MockOracle::failing()` - Always fails with an error
 * - `MockOracle::not_script()` - Classifies every text as non-script
 * - `MockOracle::malformed()` - Answers with text that holds no JSON
 * - `MockOracle::slow(ms)` - Answers like `working()` after a delay
 *
 * Replies for individual chunks (or the roster call) can be scripted on top
 * of any behavior; a scripted sequence is consumed call by call and its last
 * entry repeats.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::breakdown::oracle::ExtractionOracle;
use crate::breakdown::prompts::{ExtractionRequest, RequestKind};
use crate::errors::ProviderError;

/// Behavior mode for the mock oracle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a well-formed reply
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Says the text is not a script
    NotScript,
    /// Returns prose without any JSON
    Malformed,
    /// Simulates slow response (for deadline testing)
    Slow { delay_ms: u64 },
}

type ScriptedReplies = HashMap<RequestKind, VecDeque<Result<String, ProviderError>>>;

/// Mock oracle for testing pipeline behavior
#[derive(Debug, Clone)]
pub struct MockOracle {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Replies scripted per request kind
    scripted: Arc<Mutex<ScriptedReplies>>,
    /// Every request received, in arrival order
    received: Arc<Mutex<Vec<ExtractionRequest>>>,
}

impl MockOracle {
    /// Create a new mock oracle with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            scripted: Arc::new(Mutex::new(HashMap::new())),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock oracle that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock oracle
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock oracle that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock oracle that rejects every text as non-script
    pub fn not_script() -> Self {
        Self::new(MockBehavior::NotScript)
    }

    /// Create a mock oracle that answers without JSON
    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    /// Create a mock oracle that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Script the replies for one chunk
    pub fn with_chunk_replies(self, index: usize, replies: Vec<Result<String, ProviderError>>) -> Self {
        self.scripted.lock().insert(RequestKind::Chunk(index), replies.into());
        self
    }

    /// Script the replies for the roster call
    pub fn with_roster_replies(self, replies: Vec<Result<String, ProviderError>>) -> Self {
        self.scripted.lock().insert(RequestKind::Roster, replies.into());
        self
    }

    /// Number of calls made so far, across clones
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Number of calls made for the given request kind
    pub fn calls_for(&self, kind: RequestKind) -> usize {
        self.received.lock().iter().filter(|r| r.kind == kind).count()
    }

    /// Copy of every request received so far
    pub fn requests(&self) -> Vec<ExtractionRequest> {
        self.received.lock().clone()
    }

    /// A script reply holding the given scenes
    ///
    /// Each scene is `(scene_number, content, characters)`.
    pub fn script_reply(characters: &[&str], scenes: &[(&str, &str, &[&str])]) -> String {
        let scenes: Vec<_> = scenes
            .iter()
            .map(|(number, content, cast)| {
                json!({
                    "scene_number": number,
                    "location": "",
                    "time_of_day": "",
                    "content": content,
                    "characters": cast,
                    "props": [],
                    "notes": ""
                })
            })
            .collect();

        json!({
            "is_script": true,
            "error_message": null,
            "characters": characters,
            "scenes": scenes,
        })
        .to_string()
    }

    /// A reply classifying the text as non-script
    pub fn not_script_reply(message: &str) -> String {
        json!({ "is_script": false, "error_message": message }).to_string()
    }

    /// Default reply of the working behavior
    fn working_reply(request: &ExtractionRequest) -> String {
        match request.kind {
            RequestKind::Roster => Self::script_reply(&["田中"], &[]),
            RequestKind::Chunk(index) => {
                let number = (index + 1).to_string();
                let content: String = request.text.chars().take(20).collect();
                Self::script_reply(&["田中"], &[(number.as_str(), content.as_str(), &["田中"])])
            }
        }
    }

    /// Take the next scripted reply for a request kind, if any is scripted
    fn next_scripted(&self, kind: RequestKind) -> Option<Result<String, ProviderError>> {
        let mut scripted = self.scripted.lock();
        let queue = scripted.get_mut(&kind)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl ExtractionOracle for MockOracle {
    async fn extract(&self, request: &ExtractionRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(request.clone());

        if let MockBehavior::Slow { delay_ms } = self.behavior {
            tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
        }

        if let Some(reply) = self.next_scripted(request.kind) {
            return reply;
        }

        match self.behavior {
            MockBehavior::Working | MockBehavior::Slow { .. } => Ok(Self::working_reply(request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(Self::working_reply(request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::NotScript => Ok(Self::not_script_reply("This looks like a novel")),

            MockBehavior::Malformed => Ok("Sure! Here is the breakdown you asked for.".to_string()),
        }
    }
}
