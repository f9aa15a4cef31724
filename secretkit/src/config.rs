//! Configuration management

use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::config::Region;
use aws_sdk_secretsmanager::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

/// Where and as whom to reach Secrets Manager; unset fields fall back to
/// the SDK's default provider chains
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    pub region: Option<String>,

    /// Alternative endpoint, e.g. a local emulator
    pub endpoint_url: Option<String>,

    pub profile: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Per-request timeout; 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Values given on the command line, which win over file and environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub profile: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from `secretkit.toml` (optional) and
    /// `SECRETKIT_<SECTION>__<KEY>` environment variables
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("secretkit").required(false))
            .add_source(
                config::Environment::with_prefix("SECRETKIT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize::<Config>()?.normalized())
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if overrides.region.is_some() {
            self.aws.region = overrides.region;
        }
        if overrides.endpoint_url.is_some() {
            self.aws.endpoint_url = overrides.endpoint_url;
        }
        if overrides.profile.is_some() {
            self.aws.profile = overrides.profile;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.client.timeout_secs = secs;
        }
        *self = std::mem::take(self).normalized();
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.client.timeout_secs > 0).then(|| Duration::from_secs(self.client.timeout_secs))
    }

    /// Build the Secrets Manager client once for the whole process
    pub async fn sdk_client(&self) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.aws.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &self.aws.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &self.aws.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let shared_config = loader.load().await;
        debug!(
            region = ?shared_config.region(),
            endpoint = ?self.aws.endpoint_url,
            "Loaded AWS configuration"
        );
        Client::new(&shared_config)
    }

    /// Treat blank strings as unset
    fn normalized(mut self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        self.aws.region = blank_to_none(self.aws.region);
        self.aws.endpoint_url = blank_to_none(self.aws.endpoint_url);
        self.aws.profile = blank_to_none(self.aws.profile);
        self
    }
}
