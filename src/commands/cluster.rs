//! Hosted cluster actions: render, apply, kubeconfig, delete and list

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use super::{capture, prompt_required, registry_for, run_checked, select_name};
use crate::composer::{
    self, AccessMode, AvailabilityPolicy, Composer, ControlPlaneVersion, RenderOptions,
};
use crate::config::Config;
use crate::deps::{CommandExecutor, HttpClient, MessageStyle, UserInterface};
use crate::error::InfraError;
use crate::registry::{CLUSTER_YAML, INFRA_JSON, validate_name};
use crate::release::{ReleaseResolver, prompt_release_selection};

/// Node pool size offered when the operator has no preference
pub const DEFAULT_NODE_COUNT: &str = "2";
/// EC2 instance type offered for the node pool
pub const DEFAULT_INSTANCE_TYPE: &str = "m6i.xlarge";

/// Dependencies for cluster commands
pub struct ClusterDependencies {
    /// Prompts and output
    pub ui: Arc<dyn UserInterface>,
    /// Runs `hypershift`, `oc` and `git`
    pub command_executor: Arc<dyn CommandExecutor>,
    /// Release stream lookups
    pub http_client: Arc<dyn HttpClient>,
}

/// Operator selections for `render`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Pull spec of the OpenShift release payload
    pub release_image: String,
    /// Endpoint publishing strategy
    pub access_mode: AccessMode,
    /// Control plane availability
    pub control_plane: AvailabilityPolicy,
    /// Infrastructure availability
    pub infrastructure: AvailabilityPolicy,
    /// Control plane operator generation
    pub cp_version: ControlPlaneVersion,
    /// Override the control plane operator with a locally built image
    pub use_local_cpo: bool,
    /// Replicas in the default node pool
    pub node_count: u32,
    /// EC2 instance type of the node pool
    pub instance_type: String,
}

/// Render the hosted cluster manifests of an infrastructure into `cluster.yaml`
pub async fn render_with_deps(
    config: &Config,
    name: &str,
    request: &RenderRequest,
    deps: &Arc<ClusterDependencies>,
) -> Result<PathBuf> {
    let record = registry_for(config)?.open(name)?;
    let infra = record
        .load_infra()?
        .ok_or_else(|| InfraError::MissingArtifact {
            name: name.to_string(),
            artifact: INFRA_JSON,
        })?;

    let cpo_image = if request.use_local_cpo {
        local_cpo_image(config, deps).await
    } else {
        None
    };

    let options = RenderOptions {
        release_image: request.release_image.clone(),
        access_mode: request.access_mode,
        control_plane: request.control_plane,
        infrastructure: request.infrastructure,
        cp_version: request.cp_version,
        cpo_image,
        node_count: request.node_count,
        instance_type: request.instance_type.clone(),
    };
    let spec = Composer::new(config).render_cluster(&record, &infra, &options);

    let yaml_path = record.cluster_yaml();
    if let Err(e) = run_checked(deps.ui.as_ref(), deps.command_executor.as_ref(), &spec).await {
        // A partial render must not make the infrastructure look applyable
        if yaml_path.exists() {
            std::fs::remove_file(&yaml_path)
                .with_context(|| format!("Failed to remove {}", yaml_path.display()))?;
        }
        return Err(e);
    }

    deps.ui.print_styled(
        &format!("✓ Cluster YAML written to {}", yaml_path.display()),
        MessageStyle::Success,
    );
    Ok(yaml_path)
}

/// `<prefix>:<short hash>` of the configured hypershift checkout.
///
/// Any missing setting or failed lookup degrades to `None` with a warning.
pub async fn local_cpo_image(config: &Config, deps: &Arc<ClusterDependencies>) -> Option<String> {
    let repo = config.hypershift_repo_dir.trim();
    let prefix = config.local_cpo_image_prefix.trim();
    if repo.is_empty() || prefix.is_empty() {
        deps.ui.print_styled(
            "Warning: hypershift_repo_dir and local_cpo_image_prefix must be configured to use a local CPO image",
            MessageStyle::Warning,
        );
        return None;
    }

    let repo = PathBuf::from(repo);
    if !repo.is_dir() {
        deps.ui.print_styled(
            &format!("Warning: {} is not a directory", repo.display()),
            MessageStyle::Warning,
        );
        return None;
    }

    let spec = composer::git_short_hash(&repo);
    match capture(deps.command_executor.as_ref(), &spec).await {
        Ok(output) if output.success => {
            let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if hash.is_empty() {
                tracing::warn!("git returned an empty commit hash for {}", repo.display());
                return None;
            }
            Some(format!("{prefix}:{hash}"))
        }
        Ok(output) => {
            deps.ui.print_styled(
                &format!(
                    "Warning: Failed to compute local CPO image from repo {}: {}",
                    repo.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                MessageStyle::Warning,
            );
            None
        }
        Err(e) => {
            deps.ui.print_styled(
                &format!(
                    "Warning: Failed to compute local CPO image from repo {}: {e}",
                    repo.display()
                ),
                MessageStyle::Warning,
            );
            None
        }
    }
}

/// Apply a rendered `cluster.yaml` to the management cluster
pub async fn apply_with_deps(
    config: &Config,
    name: &str,
    deps: &Arc<ClusterDependencies>,
) -> Result<()> {
    let record = registry_for(config)?.open(name)?;
    let yaml_path = record.cluster_yaml();
    if !yaml_path.is_file() {
        return Err(InfraError::MissingArtifact {
            name: name.to_string(),
            artifact: CLUSTER_YAML,
        }
        .into());
    }

    deps.ui.print(&format!(
        "Applying {} to the Kubernetes cluster...",
        yaml_path.display()
    ));
    run_checked(
        deps.ui.as_ref(),
        deps.command_executor.as_ref(),
        &composer::apply_cluster(&yaml_path),
    )
    .await?;
    deps.ui
        .print_styled("✓ Cluster applied successfully.", MessageStyle::Success);
    Ok(())
}

/// Names of the `HostedCluster` objects; a failing lookup is reported and
/// treated as none
pub async fn hosted_clusters_with_deps(deps: &Arc<ClusterDependencies>) -> Vec<String> {
    let spec = composer::list_hosted_clusters();
    match capture(deps.command_executor.as_ref(), &spec).await {
        Ok(output) if output.success => parse_hosted_clusters(&String::from_utf8_lossy(&output.stdout)),
        Ok(output) => {
            deps.ui.print_styled(
                &format!(
                    "Error fetching hosted clusters: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                MessageStyle::Error,
            );
            Vec::new()
        }
        Err(e) => {
            deps.ui.print_styled(
                &format!("Error fetching hosted clusters: {e}"),
                MessageStyle::Error,
            );
            Vec::new()
        }
    }
}

/// First column of every non-empty line of `oc get --no-headers`
pub fn parse_hosted_clusters(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Write `<kubeconfig_dir>/<kubeconfig_name>.kubeconfig` for a hosted cluster
pub async fn kubeconfig_with_deps(
    config: &Config,
    hosted_cluster: &str,
    kubeconfig_name: &str,
    deps: &Arc<ClusterDependencies>,
) -> Result<PathBuf> {
    if config.kubeconfig_dir.trim().is_empty() {
        anyhow::bail!("kubeconfig_dir is not configured. Run the 'config' subcommand to set it.");
    }
    validate_name(kubeconfig_name)?;
    let dir = config.kubeconfig_root();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(format!("{kubeconfig_name}.kubeconfig"));
    let spec = Composer::new(config).create_kubeconfig(hosted_cluster, &path);
    if let Err(e) = run_checked(deps.ui.as_ref(), deps.command_executor.as_ref(), &spec).await {
        deps.ui
            .print_styled("Error creating kubeconfig.", MessageStyle::Error);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        return Err(e);
    }

    deps.ui.print_styled(
        &format!("✓ Kubeconfig created at {}", path.display()),
        MessageStyle::Success,
    );
    Ok(path)
}

/// Delete a hosted cluster without waiting for teardown
pub async fn delete_hosted_cluster_with_deps(
    hosted_cluster: &str,
    deps: &Arc<ClusterDependencies>,
) -> Result<()> {
    run_checked(
        deps.ui.as_ref(),
        deps.command_executor.as_ref(),
        &composer::delete_hosted_cluster(hosted_cluster),
    )
    .await?;
    deps.ui.print_styled(
        &format!("✓ HostedCluster {hosted_cluster} deleted successfully."),
        MessageStyle::Success,
    );
    Ok(())
}

/// Print the hosted clusters known to the management cluster
pub async fn list_with_deps(deps: &Arc<ClusterDependencies>) -> Vec<String> {
    let clusters = hosted_clusters_with_deps(deps).await;
    if clusters.is_empty() {
        deps.ui.print("No hosted clusters found.");
    } else {
        deps.ui.print("Hosted Clusters:");
        for cluster in &clusters {
            deps.ui.print(&format!("- {cluster}"));
        }
    }
    clusters
}

/// Ask for everything `render` needs apart from the infrastructure
pub async fn prompt_render_request(
    deps: &Arc<ClusterDependencies>,
) -> Result<RenderRequest> {
    let ui = deps.ui.as_ref();

    let selection = prompt_release_selection(ui)?;
    let spinner = ui.create_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(&format!("Resolving release image for {}", selection.describe()));
    let resolved = ReleaseResolver::new(deps.http_client.clone())
        .resolve(&selection)
        .await;
    spinner.finish_and_clear();
    let release_image = resolved?;
    ui.print(&format!("Release image: {release_image}"));

    let access_labels = AccessMode::ALL.map(AccessMode::as_str);
    let access_mode = AccessMode::ALL[ui.prompt_select("Select an access mode", &access_labels, 0)?];

    let policy_labels = AvailabilityPolicy::ALL.map(AvailabilityPolicy::as_str);
    let control_plane = AvailabilityPolicy::ALL
        [ui.prompt_select("Select control plane mode", &policy_labels, 0)?];
    let infrastructure = AvailabilityPolicy::ALL
        [ui.prompt_select("Select infrastructure mode", &policy_labels, 0)?];

    let version_labels = ControlPlaneVersion::ALL.map(ControlPlaneVersion::as_str);
    let cp_version = ControlPlaneVersion::ALL
        [ui.prompt_select("Select control plane version", &version_labels, 0)?];

    let use_local_cpo = ui.prompt_confirm("Use local control plane operator?", false)?;

    let node_count = loop {
        let answer = ui.prompt_input("Enter number of nodes", Some(DEFAULT_NODE_COUNT))?;
        match answer.trim().parse::<u32>() {
            Ok(count) => break count,
            Err(_) => ui.print_styled(
                &format!("'{}' is not a valid node count", answer.trim()),
                MessageStyle::Warning,
            ),
        }
    };
    let instance_type = prompt_required(ui, "Enter instance type", DEFAULT_INSTANCE_TYPE)?;

    Ok(RenderRequest {
        release_image,
        access_mode,
        control_plane,
        infrastructure,
        cp_version,
        use_local_cpo,
        node_count,
        instance_type,
    })
}

/// Pick an infrastructure, collect the render inputs and render it
pub async fn render_interactive(config: &Config, deps: &Arc<ClusterDependencies>) -> Result<()> {
    let names = registry_for(config)?.list()?;
    let Some(name) = select_name(deps.ui.as_ref(), "Select an infrastructure", &names)? else {
        deps.ui.print("No infrastructures available.");
        return Ok(());
    };

    let request = prompt_render_request(deps).await?;
    render_with_deps(config, &name, &request, deps).await.map(|_| ())
}

/// Pick a rendered infrastructure and apply it
pub async fn apply_interactive(config: &Config, deps: &Arc<ClusterDependencies>) -> Result<()> {
    let names = registry_for(config)?.list_renderable()?;
    let Some(name) = select_name(
        deps.ui.as_ref(),
        "Select an infrastructure to apply",
        &names,
    )?
    else {
        deps.ui.print("No infrastructures with cluster.yaml found.");
        return Ok(());
    };

    apply_with_deps(config, &name, deps).await
}

async fn select_hosted_cluster(deps: &Arc<ClusterDependencies>) -> Result<Option<String>> {
    let clusters = hosted_clusters_with_deps(deps).await;
    let selected = select_name(deps.ui.as_ref(), "Select a HostedCluster", &clusters)?;
    if selected.is_none() {
        deps.ui.print("No hosted clusters found.");
    }
    Ok(selected)
}

/// Pick a hosted cluster and write a kubeconfig for it
pub async fn kubeconfig_interactive(
    config: &Config,
    deps: &Arc<ClusterDependencies>,
) -> Result<()> {
    let Some(hosted_cluster) = select_hosted_cluster(deps).await? else {
        return Ok(());
    };
    let kubeconfig_name = prompt_required(
        deps.ui.as_ref(),
        "Enter the kubeconfig name",
        &hosted_cluster,
    )?;
    kubeconfig_with_deps(config, &hosted_cluster, &kubeconfig_name, deps)
        .await
        .map(|_| ())
}

/// Pick a hosted cluster and delete it after confirmation
pub async fn delete_interactive(deps: &Arc<ClusterDependencies>) -> Result<()> {
    let Some(hosted_cluster) = select_hosted_cluster(deps).await? else {
        return Ok(());
    };
    let confirmed = deps
        .ui
        .prompt_confirm(&format!("Delete HostedCluster {hosted_cluster}?"), true)?;
    if !confirmed {
        deps.ui.print("Operation cancelled.");
        return Ok(());
    }
    delete_hosted_cluster_with_deps(&hosted_cluster, deps).await
}
