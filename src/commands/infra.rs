//! Infrastructure lifecycle: create, destroy and list

use std::sync::Arc;

use anyhow::Result;

use super::{registry_for, run_checked, select_name, prompt_required};
use crate::composer::{CommandSpec, Composer, ConnectivityMode};
use crate::config::Config;
use crate::deps::{CommandExecutor, MessageStyle, UserInterface};
use crate::error::InfraError;
use crate::registry::InfraRecord;

/// Dependencies for infrastructure commands
pub struct InfraDependencies {
    /// Prompts and output
    pub ui: Arc<dyn UserInterface>,
    /// Runs `hypershift`
    pub command_executor: Arc<dyn CommandExecutor>,
}

/// Inputs for a new infrastructure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Directory and cluster name
    pub name: String,
    /// AWS region
    pub region: String,
    /// Route 53 base domain
    pub base_domain: String,
    /// Outbound traffic path
    pub connectivity: ConnectivityMode,
}

/// Create the record, then the cloud infrastructure and its IAM resources.
///
/// A failing step leaves the directory in place for inspection; nothing is
/// rolled back.
pub async fn create_with_deps(
    config: &Config,
    request: &CreateRequest,
    deps: &Arc<InfraDependencies>,
) -> Result<InfraRecord> {
    let registry = registry_for(config)?;
    let record = registry.init_record(&request.name)?;
    deps.ui.print(&format!("Created directory: {}", record.dir.display()));

    let composer = Composer::new(config);

    let create_infra = composer.create_infra(
        &record,
        &request.region,
        &request.base_domain,
        request.connectivity,
    );
    if let Err(e) = run_checked(
        deps.ui.as_ref(),
        deps.command_executor.as_ref(),
        &create_infra,
    )
    .await
    {
        deps.ui
            .print_styled("Failed to create infrastructure.", MessageStyle::Error);
        return Err(e);
    }

    let infra = record
        .load_infra()?
        .ok_or_else(|| InfraError::MissingArtifact {
            name: record.name.clone(),
            artifact: crate::registry::INFRA_JSON,
        })?;

    let create_iam = composer.create_iam(&record, &infra);
    if let Err(e) = run_checked(
        deps.ui.as_ref(),
        deps.command_executor.as_ref(),
        &create_iam,
    )
    .await
    {
        deps.ui
            .print_styled("Failed to create IAM.", MessageStyle::Error);
        return Err(e);
    }

    deps.ui.print_styled(
        &format!("✓ Infrastructure '{}' created successfully.", record.name),
        MessageStyle::Success,
    );
    Ok(record)
}

/// Destroy whatever artifacts exist and remove the directory on full success.
///
/// Each step is attempted even if an earlier one failed, including when its
/// artifact cannot be parsed; any failure keeps the directory so the
/// operation can be retried.
pub async fn destroy_with_deps(
    config: &Config,
    name: &str,
    deps: &Arc<InfraDependencies>,
) -> Result<()> {
    let registry = registry_for(config)?;
    let record = registry.open(name)?;
    let composer = Composer::new(config);

    let infra_step = destroy_step(
        deps,
        record.load_infra(),
        |infra| composer.destroy_infra(infra),
        &format!("✓ Infrastructure '{name}' destroyed."),
        "Failed to destroy infrastructure.",
    )
    .await;
    let iam_step = destroy_step(
        deps,
        record.load_iam(),
        |iam| composer.destroy_iam(iam),
        &format!("✓ IAM for '{name}' destroyed."),
        "Failed to destroy IAM.",
    )
    .await;

    let attempted = infra_step.is_some() || iam_step.is_some();
    let first_failure = [infra_step, iam_step]
        .into_iter()
        .flatten()
        .find_map(Result::err);

    if let Some(e) = first_failure {
        deps.ui.print_styled(
            &format!("Keeping {} so the destroy can be retried", record.dir.display()),
            MessageStyle::Warning,
        );
        return Err(e);
    }

    if !attempted {
        tracing::info!(name, "no artifacts to destroy");
    }
    registry.remove(&record)?;
    deps.ui.print(&format!("Removed {}", record.dir.display()));
    Ok(())
}

/// Run one destroy step for an artifact; `None` when the artifact is absent.
///
/// An artifact that cannot be parsed counts as a failed step.
async fn destroy_step<T>(
    deps: &Arc<InfraDependencies>,
    artifact: Result<Option<T>>,
    compose: impl FnOnce(&T) -> CommandSpec,
    success: &str,
    failure: &str,
) -> Option<Result<()>> {
    let artifact = match artifact {
        Ok(Some(artifact)) => artifact,
        Ok(None) => return None,
        Err(e) => {
            deps.ui
                .print_styled(&format!("{failure} {e:#}"), MessageStyle::Error);
            return Some(Err(e));
        }
    };

    let spec = compose(&artifact);
    let result = run_checked(deps.ui.as_ref(), deps.command_executor.as_ref(), &spec).await;
    match &result {
        Ok(()) => deps.ui.print_styled(success, MessageStyle::Success),
        Err(_) => deps.ui.print_styled(failure, MessageStyle::Error),
    }
    Some(result)
}

/// Print the numbered list of infrastructures and return their names
pub fn list_with_deps(config: &Config, deps: &Arc<InfraDependencies>) -> Result<Vec<String>> {
    let names = registry_for(config)?.list()?;
    if names.is_empty() {
        deps.ui.print("No infrastructure found.");
    }
    for (i, name) in names.iter().enumerate() {
        deps.ui.print(&format!("{}. {name}", i + 1));
    }
    Ok(names)
}

/// Ask for the creation inputs, defaulting to the configured values
pub fn prompt_create_request(config: &Config, ui: &dyn UserInterface) -> Result<CreateRequest> {
    let name = prompt_required(ui, "Name", &config.name)?;
    let region = prompt_required(ui, "Region", &config.region)?;
    let base_domain = prompt_required(ui, "Base Domain", &config.base_domain)?;

    let labels = ConnectivityMode::ALL.map(ConnectivityMode::label);
    let selected = ui.prompt_select("External Traffic", &labels, 0)?;

    Ok(CreateRequest {
        name,
        region,
        base_domain,
        connectivity: ConnectivityMode::ALL[selected],
    })
}

/// Collect the creation inputs and create the infrastructure
pub async fn create_interactive(config: &Config, deps: &Arc<InfraDependencies>) -> Result<()> {
    let request = prompt_create_request(config, deps.ui.as_ref())?;
    create_with_deps(config, &request, deps).await.map(|_| ())
}

/// Pick an infrastructure and destroy it after confirmation
pub async fn destroy_interactive(config: &Config, deps: &Arc<InfraDependencies>) -> Result<()> {
    let names = list_with_deps(config, deps)?;
    let Some(name) = select_name(
        deps.ui.as_ref(),
        "Select infrastructure to destroy",
        &names,
    )?
    else {
        return Ok(());
    };

    let confirmed = deps
        .ui
        .prompt_confirm(&format!("Destroy '{name}' and all of its cloud resources?"), true)?;
    if !confirmed {
        deps.ui.print("Operation cancelled.");
        return Ok(());
    }

    destroy_with_deps(config, &name, deps).await
}
