//! Scripted [`AiService`] double for unit tests.

use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::AiService;
use crate::image_data::ImageData;

/// Answers prompts from a script and records every prompt it receives.
///
/// Each prompt has a queue of answers; the last answer repeats once the
/// queue is down to one entry.
pub(crate) struct ScriptedService {
    name: String,
    answers: Mutex<HashMap<String, VecDeque<Result<String, String>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            answers: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn respond(self, prompt: &str, text: &str) -> Self {
        self.push(prompt, Ok(text.to_string()))
    }

    pub(crate) fn fail(self, prompt: &str, error: &str) -> Self {
        self.push(prompt, Err(error.to_string()))
    }

    fn push(self, prompt: &str, answer: Result<String, String>) -> Self {
        self.answers
            .lock()
            .unwrap()
            .entry(prompt.to_string())
            .or_default()
            .push_back(answer);
        self
    }

    /// Prompts received so far, in call order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AiService for ScriptedService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _image: &ImageData, prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());

        let mut answers = self.answers.lock().unwrap();
        let queue = answers
            .get_mut(prompt)
            .ok_or_else(|| anyhow::anyhow!("no scripted answer for prompt"))?;
        let answer = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match answer {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(anyhow::anyhow!(e)),
            None => anyhow::bail!("no scripted answer for prompt"),
        }
    }
}

/// Panics on every call.
pub(crate) struct PanickingService;

#[async_trait::async_trait]
impl AiService for PanickingService {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn complete(&self, _image: &ImageData, _prompt: &str) -> Result<String> {
        panic!("provider client blew up");
    }
}
