//! Scripted completion backend for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::anthropic::{
    CompletionClient, CompletionError, CompletionRequest, CompletionResponse, ContentBlock, Usage,
};

/// What the mock answers with on every call
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    RateLimited,
    Status(u16),
    Undecodable,
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

pub struct MockCompletionClient {
    reply: MockReply,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockCompletionClient {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        match &self.reply {
            MockReply::Text(text) => Ok(CompletionResponse {
                content: vec![ContentBlock {
                    kind: Some("text".to_string()),
                    text: Some(text.clone()),
                }],
                usage: Usage {
                    input_tokens: 120,
                    output_tokens: 340,
                },
            }),
            MockReply::RateLimited => Err(CompletionError::RateLimited),
            MockReply::Status(status) => Err(CompletionError::Status(*status)),
            MockReply::Undecodable => {
                let err = serde_json::from_str::<CompletionResponse>("<html>")
                    .expect_err("html is not json");
                Err(CompletionError::Decode(err))
            }
        }
    }
}
