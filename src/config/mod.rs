//! Configuration store
//!
//! A single flat JSON document holding binary paths, defaults for new
//! infrastructures and the directories artifacts are written to. It lives in
//! the directory chosen by [`platform::resolve_config_dir`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::deps::{Environment, MessageStyle, UserInterface};
use crate::error::InfraError;

pub mod platform;

pub use platform::{Platform, resolve_config_dir};

/// Name of the configuration file inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Binary used when `hypershift_path` is left empty
pub const DEFAULT_HYPERSHIFT: &str = "hypershift";

/// Persisted tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default infrastructure name offered at creation
    pub name: String,
    /// AWS region for new infrastructures
    pub region: String,
    /// Route 53 base domain
    pub base_domain: String,
    /// `hypershift` binary; empty means the one on `PATH`
    pub hypershift_path: String,
    /// Root holding one directory per infrastructure
    pub infra_dir: String,
    /// AWS shared credentials file
    pub aws_creds_path: String,
    /// Pull secret passed to `create cluster`
    pub pull_secret_path: String,
    /// Where `cluster k` writes kubeconfigs
    pub kubeconfig_dir: String,
    /// S3 bucket hosting the OIDC discovery documents
    pub oidc_s3_bucket_name: String,
    /// Region of the OIDC bucket
    pub oidc_s3_region: String,
    /// Domain for external DNS, required for private endpoint access
    pub external_dns_domain: String,
    /// Local hypershift checkout used for custom control-plane-operator images
    pub hypershift_repo_dir: String,
    /// Repository that local control-plane-operator images are pushed to
    pub local_cpo_image_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: String::new(),
            region: String::new(),
            base_domain: String::new(),
            hypershift_path: DEFAULT_HYPERSHIFT.to_string(),
            infra_dir: String::new(),
            aws_creds_path: String::new(),
            pull_secret_path: String::new(),
            kubeconfig_dir: String::new(),
            oidc_s3_bucket_name: String::new(),
            oidc_s3_region: String::new(),
            external_dns_domain: String::new(),
            hypershift_repo_dir: String::new(),
            local_cpo_image_prefix: String::new(),
        }
    }
}

impl Config {
    /// Program to invoke for `hypershift` commands
    pub fn hypershift_program(&self) -> &str {
        if self.hypershift_path.is_empty() {
            DEFAULT_HYPERSHIFT
        } else {
            &self.hypershift_path
        }
    }

    /// `infra_dir` as a path
    pub fn infra_root(&self) -> PathBuf {
        PathBuf::from(&self.infra_dir)
    }

    /// `kubeconfig_dir` as a path
    pub fn kubeconfig_root(&self) -> PathBuf {
        PathBuf::from(&self.kubeconfig_dir)
    }

    /// Expand `~` and environment variables in every path-valued setting
    pub fn expand_paths(&mut self) {
        for value in [
            &mut self.hypershift_path,
            &mut self.infra_dir,
            &mut self.aws_creds_path,
            &mut self.pull_secret_path,
            &mut self.kubeconfig_dir,
            &mut self.hypershift_repo_dir,
        ] {
            *value = expand_path(value);
        }
    }
}

/// Expand `~` and `$VAR`/`${VAR}`; an undefined variable leaves the value as-is
pub fn expand_path(value: &str) -> String {
    match shellexpand::full(value) {
        Ok(expanded) => expanded.into_owned(),
        Err(e) => {
            tracing::debug!("Leaving '{}' unexpanded: {}", value, e);
            shellexpand::tilde(value).into_owned()
        }
    }
}

/// Reads and writes `config.json` in a resolved directory
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Store rooted at the platform's configuration directory
    pub fn resolve(platform: &Platform, env: &dyn Environment) -> Result<Self> {
        Ok(Self::at(resolve_config_dir(platform, env)?))
    }

    /// Store rooted at `dir`
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Configuration directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of `config.json`
    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Whether `config.json` is present
    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Read and parse `config.json`, expanding path settings
    pub fn load(&self) -> Result<Config> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(InfraError::ConfigNotFound(path).into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config from {}", path.display()));
            }
        };

        serde_json::from_str(&content)
            .map_err(|source| InfraError::ConfigCorrupt { path, source }.into())
    }

    /// Existing configuration, or defaults when none was written yet
    pub fn load_or_default(&self) -> Result<Config> {
        match self.load() {
            Err(e) if matches!(e.downcast_ref::<InfraError>(), Some(InfraError::ConfigNotFound(_))) => {
                Ok(Config::default())
            }
            other => other,
        }
    }

    /// Write the configuration, replacing any existing file
    pub fn save(&self, config: &Config, ui: &dyn UserInterface) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create config directory {}", self.dir.display())
        })?;

        let path = self.path();
        let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        ui.print_styled(
            &format!("Configuration written to: {}", path.display()),
            MessageStyle::Success,
        );
        Ok(path)
    }

    /// Fail with a remediation hint unless a configuration file exists
    pub fn ensure_exists(&self, hint: &str) -> Result<()> {
        if self.exists() {
            return Ok(());
        }
        Err(InfraError::ConfigMissing {
            path: self.path(),
            hint: hint.to_string(),
        }
        .into())
    }
}

/// Prompt for every setting, using current values as defaults, and persist
pub fn prompt_and_save(store: &ConfigStore, ui: &dyn UserInterface) -> Result<Config> {
    let existing = store.load_or_default()?;
    let defaults = Config::default();

    let ask = |prompt: &str, current: &str, fallback: &str| -> Result<String> {
        let default = if current.is_empty() { fallback } else { current };
        ui.prompt_input(prompt, Some(default))
            .map(|answer| answer.trim().to_string())
    };

    let mut config = Config {
        name: ask("Default name", &existing.name, &defaults.name)?,
        region: ask("Default region", &existing.region, &defaults.region)?,
        base_domain: ask("Default base domain", &existing.base_domain, &defaults.base_domain)?,
        hypershift_path: ask(
            "Path to hypershift binary (or 'hypershift' if on PATH)",
            &existing.hypershift_path,
            &defaults.hypershift_path,
        )?,
        infra_dir: ask("Directory to store infrastructures", &existing.infra_dir, &defaults.infra_dir)?,
        aws_creds_path: ask(
            "Path to AWS credentials file",
            &existing.aws_creds_path,
            &defaults.aws_creds_path,
        )?,
        pull_secret_path: ask(
            "Path to pull-secret file",
            &existing.pull_secret_path,
            &defaults.pull_secret_path,
        )?,
        kubeconfig_dir: ask(
            "Directory to store kubeconfigs",
            &existing.kubeconfig_dir,
            &defaults.kubeconfig_dir,
        )?,
        oidc_s3_bucket_name: ask(
            "OIDC S3 bucket name (for IAM create)",
            &existing.oidc_s3_bucket_name,
            &defaults.oidc_s3_bucket_name,
        )?,
        oidc_s3_region: ask(
            "OIDC S3 region (for IAM create)",
            &existing.oidc_s3_region,
            &defaults.oidc_s3_region,
        )?,
        external_dns_domain: ask(
            "External DNS domain (optional)",
            &existing.external_dns_domain,
            &defaults.external_dns_domain,
        )?,
        hypershift_repo_dir: ask(
            "Path to local hypershift repo (optional)",
            &existing.hypershift_repo_dir,
            &defaults.hypershift_repo_dir,
        )?,
        local_cpo_image_prefix: ask(
            "Local CPO image prefix (e.g. quay.io/you/hypershift) (optional)",
            &existing.local_cpo_image_prefix,
            &defaults.local_cpo_image_prefix,
        )?,
    };
    config.expand_paths();

    for dir in [&config.infra_dir, &config.kubeconfig_dir] {
        if !dir.is_empty() {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {dir}"))?;
        }
    }

    store.save(&config, ui)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::ui::TestUserInterface;

    #[test]
    fn test_missing_keys_take_defaults() {
        let config: Config = serde_json::from_str(r#"{"region": "us-east-1"}"#).unwrap();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.hypershift_path, "hypershift");
        assert_eq!(config.infra_dir, "");
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config: Config =
            serde_json::from_str(r#"{"name": "dev", "something_else": 3}"#).unwrap();
        assert_eq!(config.name, "dev");
    }

    #[test]
    fn test_empty_hypershift_path_uses_default_binary() {
        let config = Config {
            hypershift_path: String::new(),
            ..Config::default()
        };
        assert_eq!(config.hypershift_program(), "hypershift");
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::at(temp_dir.path().join("infra"));

        let err = store.load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InfraError>(),
            Some(InfraError::ConfigNotFound(_))
        ));
        assert_eq!(store.load_or_default().unwrap(), Config::default());
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::at(temp_dir.path());
        fs::write(store.path(), "{ not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InfraError>(),
            Some(InfraError::ConfigCorrupt { .. })
        ));
        assert!(err.to_string().contains("'config' subcommand"));
        assert!(store.load_or_default().is_err());
    }

    #[test]
    fn test_save_creates_directory_and_roundtrips() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::at(temp_dir.path().join("nested").join("infra"));
        let ui = TestUserInterface::new();

        let config = Config {
            name: "dev".to_string(),
            region: "us-east-2".to_string(),
            infra_dir: "/tmp/infras".to_string(),
            ..Config::default()
        };
        let path = store.save(&config, &ui).unwrap();

        assert_eq!(path, store.path());
        assert_eq!(store.load().unwrap(), config);
        assert!(
            ui.get_output()
                .iter()
                .any(|line| line.contains("Configuration written to"))
        );

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"name\": \"dev\""), "expected indented JSON: {raw}");
    }

    #[test]
    fn test_ensure_exists() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::at(temp_dir.path());

        let err = store.ensure_exists("cluster").unwrap_err();
        assert!(err.to_string().contains("Run: cluster config"));

        fs::write(store.path(), "{}").unwrap();
        assert!(store.ensure_exists("cluster").is_ok());
    }

    #[test]
    fn test_expand_paths_resolves_home() {
        let home = dirs::home_dir().unwrap();
        let mut config = Config {
            infra_dir: "~/infras".to_string(),
            external_dns_domain: "~/not-a-path".to_string(),
            ..Config::default()
        };
        config.expand_paths();

        assert_eq!(PathBuf::from(&config.infra_dir), home.join("infras"));
        assert_eq!(config.external_dns_domain, "~/not-a-path");
    }

    #[test]
    fn test_expand_path_keeps_undefined_variables() {
        let value = "$HYPERSHIFT_INFRA_SURELY_UNDEFINED_VAR/creds";
        assert_eq!(expand_path(value), value);
    }

    #[test]
    fn test_prompt_and_save_writes_answers() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::at(temp_dir.path().join("config"));
        let infra_dir = temp_dir.path().join("infras");
        let kube_dir = temp_dir.path().join("kube");

        let ui = Arc::new(TestUserInterface::new().with_inputs([
            "dev".to_string(),
            "us-east-1".to_string(),
            "example.com".to_string(),
            "hypershift".to_string(),
            infra_dir.to_string_lossy().to_string(),
            "/creds".to_string(),
            "/pull-secret".to_string(),
            kube_dir.to_string_lossy().to_string(),
            "oidc-bucket".to_string(),
            "us-east-1".to_string(),
            String::new(),
            String::new(),
            String::new(),
        ]));

        let config = prompt_and_save(&store, ui.as_ref()).unwrap();

        assert_eq!(config.name, "dev");
        assert_eq!(config.oidc_s3_bucket_name, "oidc-bucket");
        assert!(infra_dir.is_dir());
        assert!(kube_dir.is_dir());
        assert_eq!(store.load().unwrap(), config);
        assert_eq!(ui.get_prompts().len(), 13);
    }

    #[test]
    fn test_prompt_defaults_to_existing_values() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::at(temp_dir.path());
        let existing = Config {
            name: "kept".to_string(),
            region: "eu-west-1".to_string(),
            ..Config::default()
        };
        store.save(&existing, &TestUserInterface::new()).unwrap();

        // No scripted answers: every prompt accepts its default
        let config = prompt_and_save(&store, &TestUserInterface::new()).unwrap();
        assert_eq!(config.name, "kept");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.hypershift_path, "hypershift");
    }
}
