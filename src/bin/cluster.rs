//! `cluster`: render, apply and manage HyperShift hosted clusters

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use hypershift_infra::cli;
use hypershift_infra::commands::cluster;
use hypershift_infra::deps::UserInterface;

#[derive(Parser)]
#[command(name = "cluster")]
#[command(about = "Render, apply and manage HyperShift hosted clusters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    /// Render cluster.yaml for an infrastructure
    Render,
    /// Apply a rendered cluster.yaml with oc
    Apply,
    /// Create a kubeconfig for a hosted cluster
    #[command(name = "k", visible_alias = "kubeconfig")]
    Kubeconfig,
    /// Delete a hosted cluster
    #[command(name = "rm")]
    Delete,
    /// List hosted clusters
    List,
    /// Write the configuration file
    Config,
}

impl Command {
    const MENU: [Self; 6] = [
        Self::Render,
        Self::Apply,
        Self::Kubeconfig,
        Self::Delete,
        Self::List,
        Self::Config,
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Apply => "apply",
            Self::Kubeconfig => "k",
            Self::Delete => "rm",
            Self::List => "list",
            Self::Config => "config",
        }
    }
}

async fn run(command: Option<Command>, ui: &Arc<dyn UserInterface>) -> Result<()> {
    let command = match command {
        Some(command) => command,
        None => {
            let names = Command::MENU.map(Command::name);
            Command::MENU[cli::choose_command(ui.as_ref(), &names)?]
        }
    };

    let store = cli::config_store()?;
    let setup = || -> Result<_> {
        let config = cli::load_config(&store, "cluster")?;
        Ok((config, cli::cluster_deps(ui.clone())))
    };

    match command {
        Command::Config => cli::run_config(&store, ui.clone()),
        Command::Render => {
            let (config, deps) = setup()?;
            cluster::render_interactive(&config, &deps).await
        }
        Command::Apply => {
            let (config, deps) = setup()?;
            cluster::apply_interactive(&config, &deps).await
        }
        Command::Kubeconfig => {
            let (config, deps) = setup()?;
            cluster::kubeconfig_interactive(&config, &deps).await
        }
        Command::Delete => {
            let (_, deps) = setup()?;
            cluster::delete_interactive(&deps).await
        }
        Command::List => {
            let (_, deps) = setup()?;
            cluster::list_with_deps(&deps).await;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose);
    cli::install_interrupt_handler();

    let ui = cli::ui();
    let result = run(cli.command, &ui).await;
    cli::finish(result, ui.as_ref())
}
