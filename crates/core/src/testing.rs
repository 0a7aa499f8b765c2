//! In-memory provider used by unit tests across the crate.

use crate::providers::{ChatProvider, ChatRequest, FailureReason};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays scripted replies in order, repeating the last one once the script runs out.
pub struct ScriptedProvider {
    name: String,
    replies: Mutex<VecDeque<Result<String, FailureReason>>>,
    last: Result<String, FailureReason>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn scripted(name: &str, replies: Vec<Result<String, FailureReason>>) -> Arc<Self> {
        let last = replies
            .last()
            .cloned()
            .unwrap_or(Err(FailureReason::EmptyResponse));
        Arc::new(Self {
            name: name.to_string(),
            replies: Mutex::new(replies.into()),
            last,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn always(name: &str, reply: Result<String, FailureReason>) -> Arc<Self> {
        Self::scripted(name, vec![reply])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, FailureReason> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => self.last.clone(),
        }
    }
}
