//! Release image resolution against the OpenShift release-controller API

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;

use crate::deps::{HttpClient, UserInterface};
use crate::error::InfraError;

/// Base URL of the amd64 release-controller streams
pub const RELEASE_STREAM_API: &str =
    "https://amd64.ocp.releases.ci.openshift.org/api/v1/releasestream";

/// Minor versions offered in the release prompt, newest first
pub const OFFERED_VERSIONS: [&str; 7] = ["4.20", "4.19", "4.18", "4.17", "4.16", "4.15", "4.14"];

const CUSTOM_PULLSPEC: &str = "Specify release image pullspec";

/// Release stream family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// CI builds
    Ci,
    /// Nightly builds
    Nightly,
    /// Accepted GA releases
    Stable,
}

impl Channel {
    /// Menu order
    pub const ALL: [Self; 3] = [Self::Ci, Self::Nightly, Self::Stable];

    /// Menu label and stream suffix
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ci => "ci",
            Self::Nightly => "nightly",
            Self::Stable => "stable",
        }
    }
}

/// What the operator asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseSelection {
    /// Latest image of a version on a channel
    Stream {
        /// Minor version such as `4.18`
        version: String,
        /// Release stream to search
        channel: Channel,
    },
    /// A pull-spec used verbatim
    Literal(String),
}

impl ReleaseSelection {
    /// Short label for progress messages
    pub fn describe(&self) -> String {
        match self {
            Self::Stream { version, channel } => format!("{version} {}", channel.as_str()),
            Self::Literal(pullspec) => pullspec.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    #[serde(rename = "pullSpec")]
    pull_spec: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseTags {
    tags: Vec<ReleaseTag>,
}

#[derive(Debug, Deserialize)]
struct ReleaseTag {
    name: String,
    #[serde(rename = "pullSpec")]
    pull_spec: String,
}

/// Turns a [`ReleaseSelection`] into a concrete pull-spec
pub struct ReleaseResolver {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl ReleaseResolver {
    /// Resolver against the public release controller
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_base_url(http_client, RELEASE_STREAM_API)
    }

    /// Resolver against another release controller
    pub fn with_base_url(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Pull-spec of the selection, fetching stream metadata when needed
    pub async fn resolve(&self, selection: &ReleaseSelection) -> Result<String> {
        match selection {
            ReleaseSelection::Literal(pullspec) => Ok(pullspec.clone()),
            ReleaseSelection::Stream {
                version,
                channel: Channel::Stable,
            } => self.latest_stable(version).await,
            ReleaseSelection::Stream { version, channel } => {
                self.latest_in_stream(version, *channel).await
            }
        }
    }

    async fn latest_in_stream(&self, version: &str, channel: Channel) -> Result<String> {
        let url = format!(
            "{}/{version}.0-0.{}/latest",
            self.base_url,
            channel.as_str()
        );
        let release: LatestRelease = self.fetch(&url).await?;
        Ok(release.pull_spec)
    }

    async fn latest_stable(&self, version: &str) -> Result<String> {
        let url = format!("{}/4-stable/tags", self.base_url);
        let tags: ReleaseTags = self.fetch(&url).await?;

        // Tags are listed newest first
        let dotted = format!("{version}.");
        tags.tags
            .into_iter()
            .find(|tag| tag.name == version || tag.name.starts_with(&dotted))
            .map(|tag| tag.pull_spec)
            .ok_or_else(|| InfraError::ReleaseNotFound(format!("{version} stable")).into())
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!(url, "fetching release metadata");
        let user_agent = format!("hypershift-infra/{}", env!("CARGO_PKG_VERSION"));

        let body = self
            .http_client
            .get(url, &user_agent)
            .await
            .map_err(|e| InfraError::NetworkFetchFailed {
                url: url.to_string(),
                reason: format!("{e:#}"),
            })?;

        serde_json::from_str(&body).map_err(|e| {
            InfraError::NetworkFetchFailed {
                url: url.to_string(),
                reason: format!("unexpected response: {e}"),
            }
            .into()
        })
    }
}

/// Ask for a minor version and channel, or a literal pull-spec
pub fn prompt_release_selection(ui: &dyn UserInterface) -> Result<ReleaseSelection> {
    let mut choices: Vec<&str> = OFFERED_VERSIONS.to_vec();
    choices.push(CUSTOM_PULLSPEC);

    let selected = ui.prompt_select(
        "Select a major version or enter a release image pullspec",
        &choices,
        0,
    )?;

    if choices[selected] == CUSTOM_PULLSPEC {
        loop {
            let pullspec = ui.prompt_input("Enter release image pullspec", None)?;
            let pullspec = pullspec.trim();
            if !pullspec.is_empty() {
                return Ok(ReleaseSelection::Literal(pullspec.to_string()));
            }
        }
    }

    let version = choices[selected].to_string();
    let channels = Channel::ALL.map(Channel::as_str);
    let channel = ui.prompt_select(
        &format!("Select a version type for {version}"),
        &channels,
        0,
    )?;

    Ok(ReleaseSelection::Stream {
        version,
        channel: Channel::ALL[channel],
    })
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
