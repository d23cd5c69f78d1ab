//! Test helper utilities and mock implementations

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use mockall::mock;

use crate::composer::CommandSpec;
use crate::config::Config;
use crate::deps::*;

// Mock implementations using mockall
mock! {
    pub HttpClientMock {}

    #[async_trait]
    impl HttpClient for HttpClientMock {
        async fn get(&self, url: &str, user_agent: &str) -> Result<String>;
    }
}

mock! {
    pub EnvironmentMock {}

    impl Environment for EnvironmentMock {
        fn get_var(&self, key: &str) -> Option<String>;
        fn get_home_dir(&self) -> Option<PathBuf>;
        fn dir_exists(&self, path: &Path) -> bool;
        fn systemd_user_config_dir(&self) -> Option<PathBuf>;
    }
}

// Hand-written recording executor; mockall struggles with async traits taking
// slices of references
type StreamFn = dyn Fn(&CommandSpec) -> Result<ExitStatus> + Send + Sync;
type ExecuteFn = dyn Fn(&str, &[&str]) -> Result<CommandOutput> + Send + Sync;

pub struct RecordingExecutor {
    stream_fn: Box<StreamFn>,
    execute_fn: Box<ExecuteFn>,
    streamed: Mutex<Vec<CommandSpec>>,
    executed: Mutex<Vec<(String, Vec<String>)>>,
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingExecutor {
    /// Every command succeeds without output
    pub fn new() -> Self {
        Self {
            stream_fn: Box::new(|_| Ok(ExitStatus::new(Some(0)))),
            execute_fn: Box::new(|_, _| Ok(success_output(""))),
            streamed: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Streamed commands behave like `hypershift`/`oc` writing their artifacts
    pub fn fake_tools() -> Self {
        Self::new().on_stream(fake_tool)
    }

    #[must_use]
    pub fn on_stream<F>(mut self, f: F) -> Self
    where
        F: Fn(&CommandSpec) -> Result<ExitStatus> + Send + Sync + 'static,
    {
        self.stream_fn = Box::new(f);
        self
    }

    #[must_use]
    pub fn on_execute<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &[&str]) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        self.execute_fn = Box::new(f);
        self
    }

    pub fn streamed(&self) -> Vec<CommandSpec> {
        self.streamed.lock().unwrap().clone()
    }

    pub fn executed(&self) -> Vec<(String, Vec<String>)> {
        self.executed.lock().unwrap().clone()
    }

    /// Streamed commands whose leading arguments match `prefix`
    pub fn streamed_with(&self, prefix: &[&str]) -> Vec<CommandSpec> {
        self.streamed()
            .into_iter()
            .filter(|spec| {
                spec.args.len() >= prefix.len()
                    && spec.args.iter().zip(prefix).all(|(a, p)| a.as_str() == *p)
            })
            .collect()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn check_command_exists(&self, _command: &str) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, command: &str, args: &[&str]) -> Result<CommandOutput> {
        self.executed.lock().unwrap().push((
            command.to_string(),
            args.iter().map(|a| (*a).to_string()).collect(),
        ));
        (self.execute_fn)(command, args)
    }

    async fn stream(&self, spec: &CommandSpec) -> Result<ExitStatus> {
        self.streamed.lock().unwrap().push(spec.clone());
        (self.stream_fn)(spec)
    }
}

pub fn success_output(stdout: &str) -> CommandOutput {
    CommandOutput {
        success: true,
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

pub fn failed_output(stderr: &str) -> CommandOutput {
    CommandOutput {
        success: false,
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

pub const fn exit(code: i32) -> ExitStatus {
    ExitStatus::new(Some(code))
}

/// Simulates the artifacts `hypershift` writes for a successful command
pub fn fake_tool(spec: &CommandSpec) -> Result<ExitStatus> {
    let is = |prefix: &[&str]| {
        spec.args
            .iter()
            .map(String::as_str)
            .take(prefix.len())
            .eq(prefix.iter().copied())
    };

    if is(&["create", "infra", "aws"]) {
        let output = spec.value_of("--output-file").unwrap();
        std::fs::write(
            output,
            infra_json(
                spec.value_of("--name").unwrap(),
                spec.value_of("--infra-id").unwrap(),
                spec.value_of("--region").unwrap(),
                spec.value_of("--base-domain").unwrap(),
            ),
        )?;
    } else if is(&["create", "iam", "aws"]) {
        let output = spec.value_of("--output-file").unwrap();
        std::fs::write(
            output,
            iam_json(
                spec.value_of("--infra-id").unwrap(),
                spec.value_of("--region").unwrap(),
            ),
        )?;
    } else if let Some(path) = &spec.stdout_path {
        std::fs::write(path, format!("# rendered by {}\n", spec.program))?;
    }
    Ok(exit(0))
}

pub fn infra_json(name: &str, infra_id: &str, region: &str, base_domain: &str) -> String {
    serde_json::json!({
        "region": region,
        "zone": "",
        "infraID": infra_id,
        "machineCIDR": "10.0.0.0/16",
        "vpcID": "vpc-0123",
        "Name": name,
        "baseDomain": base_domain,
        "publicZoneID": "ZPUBLIC",
        "privateZoneID": "ZPRIVATE",
        "localZoneID": "ZLOCAL",
    })
    .to_string()
}

pub fn iam_json(infra_id: &str, region: &str) -> String {
    serde_json::json!({
        "region": region,
        "infraID": infra_id,
        "issuerURL": "https://oidc.example.com/dev",
        "roles": {},
    })
    .to_string()
}

/// Configuration pointing at a temporary infrastructure root
pub fn test_config(infra_dir: &Path) -> Config {
    Config {
        name: "dev".to_string(),
        region: "us-east-1".to_string(),
        base_domain: "example.com".to_string(),
        hypershift_path: "/usr/local/bin/hypershift".to_string(),
        infra_dir: infra_dir.to_string_lossy().to_string(),
        aws_creds_path: "/home/op/.aws/credentials".to_string(),
        pull_secret_path: "/home/op/pull-secret.json".to_string(),
        kubeconfig_dir: infra_dir.join("kubeconfigs").to_string_lossy().to_string(),
        oidc_s3_bucket_name: "oidc-bucket".to_string(),
        oidc_s3_region: "us-east-1".to_string(),
        ..Config::default()
    }
}

