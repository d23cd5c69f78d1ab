//! Typed failures surfaced to the interactive session
//!
//! Everything else travels as `anyhow::Error`; the binaries downcast to
//! [`InfraError`] to decide the exit status.

use std::path::PathBuf;

use thiserror::Error;

/// Failures with a defined user-facing meaning
#[derive(Debug, Error)]
pub enum InfraError {
    /// No configuration file at the resolved location
    #[error("Configuration not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// A command that needs configuration was run before `config`
    #[error("Configuration not found at: {}\nRun: {hint} config", path.display())]
    ConfigMissing {
        /// Where the configuration was looked for
        path: PathBuf,
        /// Binary name to suggest
        hint: String,
    },

    /// The configuration file exists but is not valid JSON
    #[error(
        "Config file is corrupted or invalid JSON: {}\nPlease run the 'config' subcommand to repair it.",
        path.display()
    )]
    ConfigCorrupt {
        /// Offending file
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// The configuration directory cannot be determined on this platform
    #[error("Unable to determine the configuration directory: {0}")]
    UnsupportedPlatform(String),

    /// Infrastructure and kubeconfig names become file system names
    #[error("Invalid name '{0}'")]
    InvalidName(String),

    /// An infrastructure directory with this name is already present
    #[error("Infrastructure '{0}' already exists")]
    AlreadyExists(String),

    /// A step was attempted before the step producing its input
    #[error("{artifact} not found for infrastructure '{name}'")]
    MissingArtifact {
        /// Infrastructure name
        name: String,
        /// File name of the missing artifact
        artifact: &'static str,
    },

    /// An artifact exists but cannot be parsed
    #[error("Failed to parse {}", path.display())]
    MalformedArtifact {
        /// Offending file
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// An external binary exited non-zero
    #[error("Command failed ({}): {command}", describe_exit(.code))]
    ExternalCommandFailed {
        /// Rendered command line
        command: String,
        /// Exit code; `None` when terminated by a signal
        code: Option<i32>,
    },

    /// Release metadata could not be downloaded
    #[error("Failed to fetch {url}: {reason}")]
    NetworkFetchFailed {
        /// Requested URL
        url: String,
        /// Transport error or HTTP status
        reason: String,
    },

    /// The release stream has no matching accepted release
    #[error("No release image found for {0}")]
    ReleaseNotFound(String),

    /// The operator interrupted a prompt
    #[error("Operation cancelled.")]
    UserCancelled,
}

impl InfraError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ExternalCommandFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Exit status for any error reaching `main`
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<InfraError>()
        .map_or(1, InfraError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_failure_propagates_code() {
        let err = InfraError::ExternalCommandFailed {
            command: "hypershift create infra aws".to_string(),
            code: Some(3),
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("exit status 3"));
    }

    #[test]
    fn test_signal_termination_maps_to_one() {
        let err = InfraError::ExternalCommandFailed {
            command: "oc apply -f cluster.yaml".to_string(),
            code: None,
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_through_anyhow_context() {
        let err = anyhow::Error::from(InfraError::UserCancelled).context("while rendering");
        assert_eq!(exit_code_for(&err), 1);

        let plain = anyhow::anyhow!("boom");
        assert_eq!(exit_code_for(&plain), 1);
    }

    #[test]
    fn test_config_missing_mentions_hint() {
        let err = InfraError::ConfigMissing {
            path: PathBuf::from("/home/u/.infra/config.json"),
            hint: "infra".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("/home/u/.infra/config.json"));
        assert!(message.contains("Run: infra config"));
    }
}
