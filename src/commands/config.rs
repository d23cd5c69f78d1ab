//! The `config` subcommand shared by both binaries

use std::sync::Arc;

use anyhow::Result;

use crate::config::{self, Config, ConfigStore};
use crate::deps::{MessageStyle, UserInterface};

/// Dependencies for the `config` subcommand
pub struct ConfigDependencies {
    /// Prompts and output
    pub ui: Arc<dyn UserInterface>,
}

/// Walk through every setting and write `config.json`
pub fn execute_with_deps(store: &ConfigStore, deps: &Arc<ConfigDependencies>) -> Result<Config> {
    let ui = deps.ui.as_ref();
    ui.print_styled(
        &format!("→ Configuring {}", store.path().display()),
        MessageStyle::Cyan,
    );
    ui.print("Press enter to keep the value shown in brackets.");
    config::prompt_and_save(store, ui)
}
