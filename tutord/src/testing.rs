//! Test doubles shared by the unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tutor_core::{GeminiError, GeminiResult, LLMClient};

use crate::session::{KeyValueBackend, SessionStoreError};

/// LLM that answers every prompt with a fixed reply, or always fails
#[derive(Debug)]
pub(crate) struct ScriptedLlm {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LLMClient for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> GeminiResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(GeminiError::HttpError {
                status_code: 503,
                message: "upstream unavailable".to_string(),
            }),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model_name(&self) -> String {
        "scripted-model".to_string()
    }
}

/// Key/value backend kept in a map; can be told to fail or stall
#[derive(Debug, Default)]
pub(crate) struct MemoryBackend {
    entries: Mutex<HashMap<String, (Vec<u8>, Duration)>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl MemoryBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn entry(&self, key: &str) -> Option<(Vec<u8>, Duration)> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn put_raw(&self, key: &str, value: Vec<u8>) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, Duration::from_secs(60)));
    }

    async fn enter(&self) -> Result<(), SessionStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SessionStoreError::Backend("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn ping(&self) -> Result<(), SessionStoreError> {
        self.enter().await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionStoreError> {
        self.enter().await?;
        Ok(self.entry(key).map(|(value, _)| value))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.enter().await?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, ttl));
        Ok(())
    }
}
