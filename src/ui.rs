//! User interface implementations

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};

use crate::deps::{MessageStyle, ProgressIndicator, UserInterface};
use crate::error::InfraError;

/// Production UI implementation using dialoguer and indicatif
pub struct RealUserInterface;

impl UserInterface for RealUserInterface {
    fn create_spinner(&self) -> Box<dyn ProgressIndicator> {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")
        {
            pb.set_style(spinner_style);
        }
        Box::new(RealProgressIndicator { pb })
    }

    fn print(&self, message: &str) {
        println!("{message}");
    }

    fn print_styled(&self, message: &str, msg_style: MessageStyle) {
        let styled = match msg_style {
            MessageStyle::Normal => message.to_string(),
            MessageStyle::Bold => style(message).bold().to_string(),
            MessageStyle::Cyan => style(message).cyan().to_string(),
            MessageStyle::Warning => style(message).yellow().bold().to_string(),
            MessageStyle::Error => style(message).red().bold().to_string(),
            MessageStyle::Success => style(message).green().bold().to_string(),
        };
        match msg_style {
            MessageStyle::Warning | MessageStyle::Error => eprintln!("{styled}"),
            _ => println!("{styled}"),
        }
    }

    fn is_interactive(&self) -> bool {
        console::user_attended()
    }

    fn prompt_input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(true);

        if let Some(default_val) = default.filter(|d| !d.is_empty()) {
            input = input.default(default_val.to_string());
        }

        input.interact_text().map_err(prompt_error)
    }

    fn prompt_select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize> {
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact_opt()
            .map_err(prompt_error)?
            .ok_or_else(|| InfraError::UserCancelled.into())
    }

    fn prompt_confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default)
            .interact_opt()
            .map_err(prompt_error)?
            .ok_or_else(|| InfraError::UserCancelled.into())
    }
}

/// Ctrl-C inside a prompt surfaces as an interrupted read
fn prompt_error(error: dialoguer::Error) -> anyhow::Error {
    #[allow(unreachable_patterns)]
    match error {
        dialoguer::Error::IO(io_error) if io_error.kind() == io::ErrorKind::Interrupted => {
            InfraError::UserCancelled.into()
        }
        other => anyhow::anyhow!("Failed to read input: {}", other),
    }
}

struct RealProgressIndicator {
    pb: ProgressBar,
}

impl ProgressIndicator for RealProgressIndicator {
    fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }

    fn enable_steady_tick(&self, duration: Duration) {
        self.pb.enable_steady_tick(duration);
    }
}

// Test implementations for mocking

/// Test UI implementation that captures output and replays scripted answers.
///
/// Once a queue of answers is exhausted the prompt falls back to its default,
/// or to `"test-value"` for text input without one.
pub struct TestUserInterface {
    /// Every printed message, styled or not
    pub output: Arc<Mutex<Vec<String>>>,
    /// Styled messages with their style
    pub styled_output: Arc<Mutex<Vec<(String, MessageStyle)>>>,
    /// Prompt texts in the order asked
    pub prompts: Arc<Mutex<Vec<String>>>,
    inputs: Mutex<VecDeque<String>>,
    selections: Mutex<VecDeque<usize>>,
    confirms: Mutex<VecDeque<bool>>,
}

impl Default for TestUserInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl TestUserInterface {
    /// Interface with no scripted answers
    pub fn new() -> Self {
        Self {
            output: Arc::new(Mutex::new(Vec::new())),
            styled_output: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            inputs: Mutex::new(VecDeque::new()),
            selections: Mutex::new(VecDeque::new()),
            confirms: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue text answers
    #[must_use]
    pub fn with_inputs<I, S>(self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock_inputs().extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Queue selection indices
    #[must_use]
    pub fn with_selections(self, selections: impl IntoIterator<Item = usize>) -> Self {
        self.lock_selections().extend(selections);
        self
    }

    /// Queue yes/no answers
    #[must_use]
    pub fn with_confirms(self, confirms: impl IntoIterator<Item = bool>) -> Self {
        self.lock_confirms().extend(confirms);
        self
    }

    /// Snapshot of `output`
    pub fn get_output(&self) -> Vec<String> {
        self.output.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Snapshot of `styled_output`
    pub fn get_styled_output(&self) -> Vec<(String, MessageStyle)> {
        self.styled_output
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    /// Snapshot of `prompts`
    pub fn get_prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn record_prompt(&self, prompt: &str) {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
    }

    fn lock_inputs(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.inputs.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_selections(&self) -> std::sync::MutexGuard<'_, VecDeque<usize>> {
        self.selections
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_confirms(&self) -> std::sync::MutexGuard<'_, VecDeque<bool>> {
        self.confirms
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl UserInterface for TestUserInterface {
    fn create_spinner(&self) -> Box<dyn ProgressIndicator> {
        Box::new(TestProgressIndicator {
            messages: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn print(&self, message: &str) {
        if let Ok(mut output) = self.output.lock() {
            output.push(message.to_string());
        }
    }

    fn print_styled(&self, message: &str, style: MessageStyle) {
        // Add to both styled output and regular output for easier testing
        if let Ok(mut styled) = self.styled_output.lock() {
            styled.push((message.to_string(), style));
        }
        self.print(message);
    }

    fn is_interactive(&self) -> bool {
        false // Test UI is non-interactive
    }

    fn prompt_input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        self.record_prompt(prompt);
        Ok(self
            .lock_inputs()
            .pop_front()
            .unwrap_or_else(|| default.unwrap_or("test-value").to_string()))
    }

    fn prompt_select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize> {
        self.record_prompt(prompt);
        let selection = self.lock_selections().pop_front().unwrap_or(default);
        if selection >= items.len() {
            anyhow::bail!("Scripted selection {selection} out of range for '{prompt}'");
        }
        Ok(selection)
    }

    fn prompt_confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        self.record_prompt(prompt);
        Ok(self.lock_confirms().pop_front().unwrap_or(default))
    }
}

struct TestProgressIndicator {
    messages: Arc<Mutex<Vec<String>>>,
}

impl ProgressIndicator for TestProgressIndicator {
    fn set_message(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }

    fn finish_and_clear(&self) {}

    fn enable_steady_tick(&self, _duration: Duration) {}
}
