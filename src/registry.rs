//! On-disk registry of named infrastructures
//!
//! Layout: `<infra_dir>/<name>/{name, infra_id, infra.json, iam.json, cluster.yaml}`.
//! `infra.json` and `iam.json` are written by `hypershift`; this module only
//! reads the handful of fields later steps need.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::InfraError;

/// Plain-text infrastructure name
pub const NAME_FILE: &str = "name";
/// Plain-text infra ID
pub const INFRA_ID_FILE: &str = "infra_id";
/// Output of `create infra`
pub const INFRA_JSON: &str = "infra.json";
/// Output of `create iam`
pub const IAM_JSON: &str = "iam.json";
/// Rendered hosted cluster manifests
pub const CLUSTER_YAML: &str = "cluster.yaml";

/// Length of the random part of an infra ID
pub const SUFFIX_LEN: usize = 6;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Fields of `hypershift create infra aws` output used by later steps
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfraOutput {
    /// AWS region
    pub region: String,
    /// Infrastructure name
    #[serde(rename = "Name")]
    pub name: String,
    /// Tag value shared by every cloud resource
    #[serde(rename = "infraID")]
    pub infra_id: String,
    /// Route 53 base domain
    #[serde(rename = "baseDomain")]
    pub base_domain: String,
    /// Route 53 public hosted zone
    #[serde(rename = "publicZoneID")]
    pub public_zone_id: String,
    /// Route 53 private hosted zone
    #[serde(rename = "privateZoneID")]
    pub private_zone_id: String,
    /// Route 53 zone for in-VPC names
    #[serde(rename = "localZoneID")]
    pub local_zone_id: String,
}

/// Fields of `hypershift create iam aws` output used by later steps
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IamOutput {
    /// Infra ID the IAM resources were created for
    #[serde(rename = "infraID")]
    pub infra_id: String,
    /// Region the IAM resources were created in
    pub region: String,
}

/// One infrastructure directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraRecord {
    /// Directory name
    pub name: String,
    /// Empty when the record predates `infra_id` files
    pub infra_id: String,
    /// Absolute directory of the record
    pub dir: PathBuf,
}

impl InfraRecord {
    /// Path of `infra.json`
    pub fn infra_json(&self) -> PathBuf {
        self.dir.join(INFRA_JSON)
    }

    /// Path of `iam.json`
    pub fn iam_json(&self) -> PathBuf {
        self.dir.join(IAM_JSON)
    }

    /// Path of `cluster.yaml`
    pub fn cluster_yaml(&self) -> PathBuf {
        self.dir.join(CLUSTER_YAML)
    }

    /// Whether `cluster.yaml` has been rendered
    pub fn is_renderable(&self) -> bool {
        self.cluster_yaml().is_file()
    }

    /// Parsed `infra.json`; `None` when the file does not exist
    pub fn load_infra(&self) -> Result<Option<InfraOutput>> {
        read_artifact(&self.infra_json())
    }

    /// Parsed `iam.json`; `None` when the file does not exist
    pub fn load_iam(&self) -> Result<Option<IamOutput>> {
        read_artifact(&self.iam_json())
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    serde_json::from_str(&content).map(Some).map_err(|source| {
        InfraError::MalformedArtifact {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Random lowercase-alphanumeric string
pub fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())]))
        .collect()
}

/// Names must stay inside the directory they are joined onto
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_whitespace);
    if invalid {
        return Err(InfraError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

/// Registry rooted at the configured infrastructure directory
#[derive(Debug, Clone)]
pub struct InfraRegistry {
    root: PathBuf,
}

impl InfraRegistry {
    /// Registry over `root`; nothing is created until first use
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Registry over the configured `infra_dir`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.infra_root())
    }

    /// Directory holding the records
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).with_context(|| {
            format!(
                "Failed to create infrastructure directory {}",
                self.root.display()
            )
        })
    }

    /// Sorted infrastructure names; creates the root when missing
    pub fn list(&self) -> Result<Vec<String>> {
        self.ensure_root()?;

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read {}", self.root.display()))?
        {
            let entry = entry?;
            // Follows symlinks so linked infrastructure directories are listed
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Infrastructures with a rendered `cluster.yaml`
    pub fn list_renderable(&self) -> Result<Vec<String>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|name| self.root.join(name).join(CLUSTER_YAML).is_file())
            .collect())
    }

    /// Whether an entry with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.root.join(name).exists()
    }

    /// Create the directory with its `name` and `infra_id` files.
    ///
    /// Fails with [`InfraError::AlreadyExists`] without touching anything when
    /// the directory is present.
    pub fn init_record(&self, name: &str) -> Result<InfraRecord> {
        validate_name(name)?;
        self.ensure_root()?;

        let dir = self.root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(InfraError::AlreadyExists(name.to_string()).into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", dir.display()));
            }
        }

        let infra_id = format!("{name}-{}", random_suffix(SUFFIX_LEN));
        fs::write(dir.join(NAME_FILE), name)
            .with_context(|| format!("Failed to write {NAME_FILE} for '{name}'"))?;
        fs::write(dir.join(INFRA_ID_FILE), &infra_id)
            .with_context(|| format!("Failed to write {INFRA_ID_FILE} for '{name}'"))?;

        tracing::info!(name, infra_id = %infra_id, "initialized infrastructure record");
        Ok(InfraRecord {
            name: name.to_string(),
            infra_id,
            dir,
        })
    }

    /// Open an existing record
    pub fn open(&self, name: &str) -> Result<InfraRecord> {
        validate_name(name)?;
        let dir = self.root.join(name);
        if !dir.is_dir() {
            anyhow::bail!("Infrastructure '{}' not found in {}", name, self.root.display());
        }

        let infra_id = match fs::read_to_string(dir.join(INFRA_ID_FILE)) {
            Ok(id) => id.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e).context("Failed to read infra_id"),
        };

        Ok(InfraRecord {
            name: name.to_string(),
            infra_id,
            dir,
        })
    }

    /// Recursively delete a record's directory
    pub fn remove(&self, record: &InfraRecord) -> Result<()> {
        fs::remove_dir_all(&record.dir)
            .with_context(|| format!("Failed to remove {}", record.dir.display()))?;
        tracing::info!(name = %record.name, "removed infrastructure directory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_list_creates_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path().join("infras"));

        assert!(registry.list().unwrap().is_empty());
        assert!(registry.root().is_dir());
    }

    #[test]
    fn test_list_is_sorted_and_skips_files() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path());
        for name in ["zeta", "alpha", "mid"] {
            fs::create_dir(temp_dir.path().join(name)).unwrap();
        }
        fs::write(temp_dir.path().join("stray.txt"), "x").unwrap();

        assert_eq!(registry.list().unwrap(), vec!["alpha", "mid", "zeta"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_follows_directory_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("infras");
        let elsewhere = temp_dir.path().join("elsewhere");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir(&elsewhere).unwrap();
        std::os::unix::fs::symlink(&elsewhere, root.join("linked")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("missing"), root.join("dangling")).unwrap();

        let registry = InfraRegistry::new(&root);
        assert_eq!(registry.list().unwrap(), vec!["linked"]);
    }

    #[test]
    fn test_list_renderable_requires_cluster_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path());
        let one = registry.init_record("one").unwrap();
        registry.init_record("two").unwrap();
        fs::write(one.cluster_yaml(), "kind: HostedCluster").unwrap();

        assert_eq!(registry.list_renderable().unwrap(), vec!["one"]);
        assert!(one.is_renderable());
    }

    #[test]
    fn test_init_record_writes_name_and_infra_id() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path());

        let record = registry.init_record("dev").unwrap();

        assert_eq!(fs::read_to_string(record.dir.join(NAME_FILE)).unwrap(), "dev");
        let infra_id = fs::read_to_string(record.dir.join(INFRA_ID_FILE)).unwrap();
        assert_eq!(infra_id, record.infra_id);

        let suffix = infra_id.strip_prefix("dev-").unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_init_record_twice_keeps_first_infra_id() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path());
        let first = registry.init_record("dev").unwrap();

        let err = registry.init_record("dev").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InfraError>(),
            Some(InfraError::AlreadyExists(name)) if name == "dev"
        ));
        assert_eq!(registry.open("dev").unwrap().infra_id, first.infra_id);
    }

    #[test]
    fn test_infra_ids_are_unique() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path());

        let ids: HashSet<String> = (0..50)
            .map(|i| registry.init_record(&format!("infra{i}")).unwrap().infra_id)
            .collect();
        assert_eq!(ids.len(), 50);

        let suffixes: HashSet<String> = (0..200).map(|_| random_suffix(SUFFIX_LEN)).collect();
        assert!(suffixes.len() > 195);
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path());

        for name in ["", ".", "..", "a/b", "with space"] {
            let err = registry.init_record(name).unwrap_err();
            assert!(
                matches!(err.downcast_ref::<InfraError>(), Some(InfraError::InvalidName(_))),
                "{name:?} should be invalid"
            );
        }
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_artifacts_absent_until_written() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path());
        let record = registry.init_record("dev").unwrap();

        assert!(record.load_infra().unwrap().is_none());
        assert!(record.load_iam().unwrap().is_none());
    }

    #[test]
    fn test_load_infra_reads_hypershift_field_names() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path());
        let record = registry.init_record("dev").unwrap();
        fs::write(
            record.infra_json(),
            r#"{
                "region": "us-east-1",
                "zone": "",
                "infraID": "dev-abc123",
                "vpcID": "vpc-1",
                "Name": "dev",
                "baseDomain": "example.com",
                "publicZoneID": "Z1",
                "privateZoneID": "Z2",
                "localZoneID": "Z3"
            }"#,
        )
        .unwrap();

        let infra = record.load_infra().unwrap().unwrap();
        assert_eq!(infra.infra_id, "dev-abc123");
        assert_eq!(infra.name, "dev");
        assert_eq!(infra.base_domain, "example.com");
        assert_eq!(infra.local_zone_id, "Z3");
    }

    #[test]
    fn test_malformed_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path());
        let record = registry.init_record("dev").unwrap();
        fs::write(record.iam_json(), r#"{"region": "us-east-1"}"#).unwrap();

        let err = record.load_iam().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InfraError>(),
            Some(InfraError::MalformedArtifact { .. })
        ));
    }

    #[test]
    fn test_open_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let registry = InfraRegistry::new(temp_dir.path());
        registry.init_record("dev").unwrap();

        let record = registry.open("dev").unwrap();
        assert!(registry.contains("dev"));
        registry.remove(&record).unwrap();
        assert!(!registry.contains("dev"));
        assert!(registry.open("dev").is_err());
    }
}
