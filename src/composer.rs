//! External command composition
//!
//! Every builder here is a pure function of the configuration, the parsed
//! artifacts of earlier steps and the operator's selections. Nothing is
//! executed; the resulting [`CommandSpec`] is handed to a
//! [`CommandExecutor`](crate::deps::CommandExecutor).

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::registry::{IamOutput, InfraOutput, InfraRecord};

/// Namespace holding `HostedCluster` objects on the management cluster
pub const HOSTED_CLUSTER_NAMESPACE: &str = "clusters";

const OC: &str = "oc";
const GIT: &str = "git";
const CLEANUP_ANNOTATION: &str = "hypershift.openshift.io/cleanup-cloud-resources=true";
const CPO_V2_ANNOTATION: &str = "hypershift.openshift.io/cpo-v2=true";

/// A program plus its ordered arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path
    pub program: String,
    /// Arguments in order, without shell quoting
    pub args: Vec<String>,
    /// File receiving the command's stdout
    pub stdout_path: Option<PathBuf>,
}

impl CommandSpec {
    /// Command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout_path: None,
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `--flag value`
    #[must_use]
    pub fn opt(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Append `--flag path`
    #[must_use]
    pub fn path_opt(self, flag: &str, path: &Path) -> Self {
        self.opt(flag, path.to_string_lossy())
    }

    /// Redirect stdout into `path` instead of the terminal
    #[must_use]
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_path = Some(path.into());
        self
    }

    /// Whether `arg` appears anywhere in the argument list
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value following the first occurrence of `flag`
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// All values following repeated occurrences of `flag`
    pub fn values_of(&self, flag: &str) -> Vec<&str> {
        self.args
            .windows(2)
            .filter(|pair| pair[0] == flag)
            .map(|pair| pair[1].as_str())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        if let Some(path) = &self.stdout_path {
            write!(f, " > {}", quote(&path.to_string_lossy()))?;
        }
        Ok(())
    }
}

fn quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Outbound traffic path for a new infrastructure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityMode {
    /// Public subnets only
    Public,
    /// HTTP proxy in front of private subnets
    Proxy,
    /// HTTPS proxy in front of private subnets
    SecureProxy,
    /// NAT gateway per zone
    NatGateway,
}

impl ConnectivityMode {
    /// Menu order
    pub const ALL: [Self; 4] = [Self::Public, Self::Proxy, Self::SecureProxy, Self::NatGateway];

    /// Menu label
    pub const fn label(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Proxy => "Proxy",
            Self::SecureProxy => "SecureProxy",
            Self::NatGateway => "NAT gateway",
        }
    }

    /// Extra `create infra` flag; NAT gateway is the tool's default
    pub const fn flag(self) -> Option<&'static str> {
        match self {
            Self::Public => Some("--public-only"),
            Self::Proxy => Some("--enable-proxy"),
            Self::SecureProxy => Some("--enable-secure-proxy"),
            Self::NatGateway => None,
        }
    }
}

/// API endpoint exposure of the hosted cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Public API and router endpoints
    Public,
    /// Public endpoints reachable privately from the VPC
    PublicAndPrivate,
    /// Endpoints reachable only from the VPC
    Private,
}

impl AccessMode {
    /// Menu order
    pub const ALL: [Self; 3] = [Self::Public, Self::PublicAndPrivate, Self::Private];

    /// Value passed to `--endpoint-access`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::PublicAndPrivate => "PublicAndPrivate",
            Self::Private => "Private",
        }
    }

    const fn uses_external_dns(self) -> bool {
        matches!(self, Self::PublicAndPrivate | Self::Private)
    }
}

/// Replica topology for control-plane or infrastructure components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityPolicy {
    /// One replica of each component
    SingleReplica,
    /// Replicas spread across availability zones
    HighlyAvailable,
}

impl AvailabilityPolicy {
    /// Menu order
    pub const ALL: [Self; 2] = [Self::SingleReplica, Self::HighlyAvailable];

    /// Value passed to the availability policy flags
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleReplica => "SingleReplica",
            Self::HighlyAvailable => "HighlyAvailable",
        }
    }
}

/// Control plane operator generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPlaneVersion {
    /// Annotated with `cpo-v2`
    V2,
    /// Legacy control plane operator
    V1,
}

impl ControlPlaneVersion {
    /// Menu order, newest first
    pub const ALL: [Self; 2] = [Self::V2, Self::V1];

    /// Menu label
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V2 => "v2",
            Self::V1 => "v1",
        }
    }
}

/// Operator selections for rendering a hosted cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Release payload pull spec
    pub release_image: String,
    /// Endpoint publishing strategy
    pub access_mode: AccessMode,
    /// Control plane availability
    pub control_plane: AvailabilityPolicy,
    /// Infrastructure availability
    pub infrastructure: AvailabilityPolicy,
    /// Control plane operator generation
    pub cp_version: ControlPlaneVersion,
    /// Resolved control-plane-operator image, if a local build is used
    pub cpo_image: Option<String>,
    /// Default node pool replicas
    pub node_count: u32,
    /// Node pool EC2 instance type
    pub instance_type: String,
}

/// Builds command lines from a configuration
pub struct Composer<'a> {
    config: &'a Config,
}

impl<'a> Composer<'a> {
    /// Composer reading paths and credentials from `config`
    pub const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn hypershift(&self) -> CommandSpec {
        CommandSpec::new(self.config.hypershift_program())
    }

    /// `hypershift create infra aws`, writing `infra.json` into the record
    pub fn create_infra(
        &self,
        record: &InfraRecord,
        region: &str,
        base_domain: &str,
        connectivity: ConnectivityMode,
    ) -> CommandSpec {
        let spec = self
            .hypershift()
            .args(["create", "infra", "aws"])
            .opt("--aws-creds", &self.config.aws_creds_path)
            .opt("--base-domain", base_domain)
            .opt("--infra-id", &record.infra_id)
            .opt("--name", &record.name)
            .opt("--region", region);
        let spec = match connectivity.flag() {
            Some(flag) => spec.arg(flag),
            None => spec,
        };
        spec.path_opt("--output-file", &record.infra_json())
    }

    /// `hypershift create iam aws` for the zones in `infra`
    pub fn create_iam(&self, record: &InfraRecord, infra: &InfraOutput) -> CommandSpec {
        self.hypershift()
            .args(["create", "iam", "aws"])
            .opt("--aws-creds", &self.config.aws_creds_path)
            .opt("--infra-id", &infra.infra_id)
            .opt(
                "--oidc-storage-provider-s3-bucket-name",
                &self.config.oidc_s3_bucket_name,
            )
            .opt("--oidc-storage-provider-s3-region", &self.config.oidc_s3_region)
            .opt("--region", &infra.region)
            .opt("--local-zone-id", &infra.local_zone_id)
            .opt("--public-zone-id", &infra.public_zone_id)
            .opt("--private-zone-id", &infra.private_zone_id)
            .path_opt("--output-file", &record.iam_json())
    }

    /// `hypershift destroy infra aws` for a created infrastructure
    pub fn destroy_infra(&self, infra: &InfraOutput) -> CommandSpec {
        self.hypershift()
            .args(["destroy", "infra", "aws"])
            .opt("--infra-id", &infra.infra_id)
            .opt("--name", &infra.name)
            .opt("--region", &infra.region)
            .opt("--aws-creds", &self.config.aws_creds_path)
            .opt("--base-domain", &infra.base_domain)
    }

    /// `hypershift destroy iam aws` for created IAM resources
    pub fn destroy_iam(&self, iam: &IamOutput) -> CommandSpec {
        self.hypershift()
            .args(["destroy", "iam", "aws"])
            .opt("--infra-id", &iam.infra_id)
            .opt("--aws-creds", &self.config.aws_creds_path)
            .opt("--region", &iam.region)
    }

    /// `hypershift create cluster aws --render` writing `cluster.yaml`
    pub fn render_cluster(
        &self,
        record: &InfraRecord,
        infra: &InfraOutput,
        options: &RenderOptions,
    ) -> CommandSpec {
        let mut spec = self
            .hypershift()
            .args(["create", "cluster", "aws", "--render"])
            .opt("--aws-creds", &self.config.aws_creds_path)
            .opt("--instance-type", &options.instance_type)
            .opt("--region", &infra.region)
            .opt(
                "--control-plane-availability-policy",
                options.control_plane.as_str(),
            )
            .opt("--infra-availability-policy", options.infrastructure.as_str())
            .arg("--auto-repair")
            .arg("--generate-ssh")
            .opt("--name", &infra.name)
            .opt("--endpoint-access", options.access_mode.as_str())
            .opt("--node-pool-replicas", options.node_count.to_string())
            .opt("--pull-secret", &self.config.pull_secret_path)
            .opt("--infra-id", &infra.infra_id)
            .path_opt("--infra-json", &record.infra_json())
            .path_opt("--iam-json", &record.iam_json())
            .opt("--base-domain", &infra.base_domain);

        if options.access_mode.uses_external_dns() && !self.config.external_dns_domain.is_empty() {
            spec = spec.opt("--external-dns-domain", &self.config.external_dns_domain);
        }

        spec = spec.opt("--release-image", &options.release_image);

        if let Some(image) = &options.cpo_image {
            spec = spec.opt("--control-plane-operator-image", image);
        }

        spec = spec.opt("--annotations", CLEANUP_ANNOTATION);

        if options.cp_version == ControlPlaneVersion::V2 {
            spec = spec.opt("--annotations", CPO_V2_ANNOTATION);
        }

        spec.arg("--render-sensitive")
            .stdout_to(record.cluster_yaml())
    }

    /// `hypershift create kubeconfig`, redirected into `output`
    pub fn create_kubeconfig(&self, hosted_cluster: &str, output: &Path) -> CommandSpec {
        self.hypershift()
            .args(["create", "kubeconfig"])
            .opt("--name", hosted_cluster)
            .stdout_to(output)
    }
}

/// `oc apply -f` for a rendered manifest
pub fn apply_cluster(cluster_yaml: &Path) -> CommandSpec {
    CommandSpec::new(OC).arg("apply").path_opt("-f", cluster_yaml)
}

/// Hosted cluster names in the default namespace
pub fn list_hosted_clusters() -> CommandSpec {
    CommandSpec::new(OC).args(["get", "hc", "-n", HOSTED_CLUSTER_NAMESPACE, "--no-headers"])
}

/// `oc delete hc` without waiting for teardown
pub fn delete_hosted_cluster(name: &str) -> CommandSpec {
    CommandSpec::new(OC)
        .args(["delete", "hc", "-n", HOSTED_CLUSTER_NAMESPACE, name, "--wait=false"])
}

/// Short commit hash of the checkout at `repo`
pub fn git_short_hash(repo: &Path) -> CommandSpec {
    CommandSpec::new(GIT)
        .path_opt("-C", repo)
        .args(["rev-parse", "--short=9", "HEAD"])
}

#[cfg(test)]
#[path = "composer_tests.rs"]
mod tests;
