//! `infra`: create, destroy and list HyperShift cloud infrastructures

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use hypershift_infra::cli;
use hypershift_infra::commands::infra;
use hypershift_infra::deps::UserInterface;

#[derive(Parser)]
#[command(name = "infra")]
#[command(about = "Create, destroy and list HyperShift infrastructure on AWS")]
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
    /// Create infrastructure and IAM resources
    Create,
    /// Destroy infrastructure and IAM resources
    Destroy,
    /// List known infrastructures
    List,
    /// Write the configuration file
    Config,
}

impl Command {
    const MENU: [Self; 4] = [Self::Create, Self::Destroy, Self::List, Self::Config];

    const fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Destroy => "destroy",
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
        let config = cli::load_config(&store, "infra")?;
        Ok((config, cli::infra_deps(ui.clone())))
    };

    match command {
        Command::Config => cli::run_config(&store, ui.clone()),
        Command::Create => {
            let (config, deps) = setup()?;
            infra::create_interactive(&config, &deps).await
        }
        Command::Destroy => {
            let (config, deps) = setup()?;
            infra::destroy_interactive(&config, &deps).await
        }
        Command::List => {
            let (config, deps) = setup()?;
            infra::list_with_deps(&config, &deps).map(|_| ())
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
