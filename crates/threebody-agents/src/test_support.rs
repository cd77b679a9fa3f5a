//! Scripted reasoning providers for exercising the pipeline without a model.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::provider::ReasoningProvider;

/// Returns queued replies in order, then repeats the last one.
///
/// A failing provider answers every call with a 503 provider error.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    last_reply: Mutex<Option<String>>,
    fail: bool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedProvider {
    pub fn replying(reply: &str) -> Self {
        Self::sequence(&[reply])
    }

    pub fn sequence(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            last_reply: Mutex::new(None),
            fail: false,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::sequence(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        if self.fail {
            return Err(AgentError::Provider {
                status: 503,
                body: "scripted outage".to_string(),
            });
        }

        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        let mut last = self
            .last_reply
            .lock()
            .map_err(|_| AgentError::Cli("scripted provider poisoned".to_string()))?;
        if let Some(reply) = next {
            *last = Some(reply);
        }
        last.clone().ok_or(AgentError::EmptyResponse)
    }
}
