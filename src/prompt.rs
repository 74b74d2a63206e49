//! Interactive prompts for wizard and interactive modes.

use crate::error::EngineError;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Source of interactive answers.
pub trait Prompter: Send + Sync {
    /// Yes/no question; an empty answer takes `default`.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, EngineError>;

    /// Free-text question; an empty answer is returned as an empty string.
    fn input(&self, prompt: &str) -> Result<String, EngineError>;

    /// Tell the user something (e.g. why an answer was rejected).
    fn notice(&self, message: &str);
}

/// Terminal prompter built on `dialoguer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, EngineError> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| EngineError::Prompt(format!("Failed to get user input: {}", e)))
    }

    fn input(&self, prompt: &str) -> Result<String, EngineError> {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| EngineError::Prompt(format!("Failed to get user input: {}", e)))
    }

    fn notice(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Prompter that answers from a fixed script; for non-interactive embedding
/// and tests. Running out of answers is a prompt error.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }

    fn next_answer(&self, prompt: &str) -> Result<String, EngineError> {
        self.asked.lock().push(prompt.to_string());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| EngineError::Prompt(format!("no scripted answer for '{}'", prompt)))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, EngineError> {
        let answer = self.next_answer(prompt)?;
        match answer.trim().to_lowercase().as_str() {
            "" => Ok(default),
            "y" | "yes" => Ok(true),
            _ => Ok(false),
        }
    }

    fn input(&self, prompt: &str) -> Result<String, EngineError> {
        self.next_answer(prompt)
    }

    fn notice(&self, _message: &str) {}
}
