use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::providers::base::{ModelSettings, Provider, Usage};

/// One recorded `complete` call
#[derive(Debug, Clone)]
pub struct MockCall {
    pub system: String,
    pub messages: Vec<Message>,
    pub settings: ModelSettings,
}

/// A mock provider that returns pre-configured responses for testing
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Result<Message, String>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            calls: Arc::default(),
        }
    }

    /// Replies with plain assistant text, one per call
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            replies
                .into_iter()
                .map(|reply| Message::assistant().with_text(reply))
                .collect(),
        )
    }

    /// Every call fails with the given provider message
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Err(message.into())])),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        settings: &ModelSettings,
    ) -> Result<(Message, Usage)> {
        self.calls.lock().unwrap().push(MockCall {
            system: system.to_string(),
            messages: messages.to_vec(),
            settings: settings.clone(),
        });

        let mut responses = self.responses.lock().unwrap();
        match responses.first() {
            // Return empty response if no more pre-configured responses
            None => Ok((Message::assistant().with_text(""), Usage::default())),
            // A failing mock keeps failing
            Some(Err(message)) => Err(anyhow!(message.clone())),
            Some(Ok(_)) => match responses.remove(0) {
                Ok(message) => Ok((message, Usage::default())),
                Err(message) => Err(anyhow!(message)),
            },
        }
    }
}
