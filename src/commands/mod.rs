//! Actions behind the `infra` and `cluster` subcommands

use anyhow::Result;

use crate::composer::CommandSpec;
use crate::config::Config;
use crate::deps::{CommandExecutor, CommandOutput, MessageStyle, UserInterface};
use crate::error::InfraError;
use crate::registry::InfraRegistry;

pub mod cluster;
pub mod config;
pub mod infra;


/// Echo and run a command, failing on a non-zero exit
async fn run_checked(
    ui: &dyn UserInterface,
    executor: &dyn CommandExecutor,
    spec: &CommandSpec,
) -> Result<()> {
    executor.check_command_exists(&spec.program).await?;
    ui.print_styled(&format!("Executing: {spec}"), MessageStyle::Bold);
    let status = executor.stream(spec).await?;
    if status.success() {
        return Ok(());
    }
    Err(InfraError::ExternalCommandFailed {
        command: spec.to_string(),
        code: status.code(),
    }
    .into())
}

/// Run a command for its captured output
async fn capture(executor: &dyn CommandExecutor, spec: &CommandSpec) -> Result<CommandOutput> {
    let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
    executor.execute(&spec.program, &args).await
}

/// Registry for the configured root; an empty `infra_dir` is a setup error
fn registry_for(config: &Config) -> Result<InfraRegistry> {
    if config.infra_dir.trim().is_empty() {
        anyhow::bail!("infra_dir is not configured. Run the 'config' subcommand to set it.");
    }
    Ok(InfraRegistry::from_config(config))
}

/// Prompt for one of `names`; `None` when there is nothing to choose from
fn select_name(ui: &dyn UserInterface, prompt: &str, names: &[String]) -> Result<Option<String>> {
    if names.is_empty() {
        return Ok(None);
    }
    let items: Vec<&str> = names.iter().map(String::as_str).collect();
    let index = ui.prompt_select(prompt, &items, 0)?;
    Ok(Some(names[index].clone()))
}

/// Prompt until a non-empty answer is given
fn prompt_required(ui: &dyn UserInterface, prompt: &str, default: &str) -> Result<String> {
    loop {
        let answer = ui.prompt_input(prompt, Some(default).filter(|d| !d.is_empty()))?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        ui.print_styled(&format!("{prompt} is required"), MessageStyle::Warning);
    }
}
