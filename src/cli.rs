//! Process-level plumbing shared by the `infra` and `cluster` binaries

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::commands::cluster::ClusterDependencies;
use crate::commands::config::{self as config_cmd, ConfigDependencies};
use crate::commands::infra::InfraDependencies;
use crate::config::{Config, ConfigStore, Platform};
use crate::deps::{
    MessageStyle, RealCommandExecutor, RealEnvironment, RealHttpClient, UserInterface,
};
use crate::error::{InfraError, exit_code_for};
use crate::ui::RealUserInterface;

/// Log filter for a `-v` count; `RUST_LOG` wins when set
pub fn log_filter(verbose: u8) -> EnvFilter {
    if verbose == 0
        && let Ok(filter) = EnvFilter::try_from_default_env()
    {
        return filter;
    }
    match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Install the stderr `tracing` subscriber
pub fn init_tracing(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// Exit with status 1 on Ctrl-C outside of a prompt
pub fn install_interrupt_handler() {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            // dialoguer hides the cursor while a prompt is active
            let _ = console::Term::stderr().show_cursor();
            eprintln!();
            eprintln!("Operation cancelled.");
            std::process::exit(1);
        }
    });
}

/// Store at this platform's configuration directory
pub fn config_store() -> Result<ConfigStore> {
    ConfigStore::resolve(&Platform::current(), &RealEnvironment)
}

/// Load the configuration, pointing at `<tool> config` when there is none
pub fn load_config(store: &ConfigStore, tool: &str) -> Result<Config> {
    store.ensure_exists(tool)?;
    let config = store.load()?;
    tracing::debug!(path = %store.path().display(), "loaded configuration");
    Ok(config)
}

/// Terminal-backed user interface
pub fn ui() -> Arc<dyn UserInterface> {
    Arc::new(RealUserInterface)
}

/// Run the `config` subcommand against `store`
pub fn run_config(store: &ConfigStore, ui: Arc<dyn UserInterface>) -> Result<()> {
    let deps = Arc::new(ConfigDependencies { ui });
    config_cmd::execute_with_deps(store, &deps).map(|_| ())
}

/// Production dependencies for the `infra` commands
pub fn infra_deps(ui: Arc<dyn UserInterface>) -> Arc<InfraDependencies> {
    Arc::new(InfraDependencies {
        ui,
        command_executor: Arc::new(RealCommandExecutor),
    })
}

/// Production dependencies for the `cluster` commands
pub fn cluster_deps(ui: Arc<dyn UserInterface>) -> Arc<ClusterDependencies> {
    Arc::new(ClusterDependencies {
        ui,
        command_executor: Arc::new(RealCommandExecutor),
        http_client: Arc::new(RealHttpClient),
    })
}

/// Pick a subcommand from a menu when none was given on the command line
pub fn choose_command(ui: &dyn UserInterface, commands: &[&str]) -> Result<usize> {
    if !ui.is_interactive() {
        anyhow::bail!(
            "No command given and the terminal is not interactive. Use one of: {}",
            commands.join(", ")
        );
    }
    ui.prompt_select("Select a command", commands, 0)
}

/// Report a failed action and translate it into the process exit status
pub fn finish(result: Result<()>, ui: &dyn UserInterface) -> ExitCode {
    let Err(error) = result else {
        return ExitCode::SUCCESS;
    };

    if matches!(error.downcast_ref::<InfraError>(), Some(InfraError::UserCancelled)) {
        ui.print("Operation cancelled.");
    } else {
        tracing::debug!("{error:?}");
        ui.print_styled(&format!("Error: {error:#}"), MessageStyle::Error);
    }

    let code = exit_code_for(&error);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
