use std::path::Path;

use delaysqs_aws::SqsQueueConfig;
use delaysqs_delayer::DelayerConfig;
use serde::Deserialize;

/// Contents of `delaysqs.toml`.
///
/// ```toml
/// log_level = "info"
///
/// [queue]
/// region = "us-east-1"
/// queue_url = "https://sqs.us-east-1.amazonaws.com/123456789012/delayed"
///
/// [delayer]
/// max_messages = 10
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Fallback log filter when `RUST_LOG` is not set.
    pub log_level: Option<String>,
    pub queue: SqsQueueConfig,
    pub delayer: DelayerConfig,
}

impl FileConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(toml::from_str("")?);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Apply command-line overrides on top of the file.
    #[must_use]
    pub fn with_overrides(mut self, queue_url: Option<String>, region: Option<String>) -> Self {
        if let Some(url) = queue_url {
            self.queue.queue_url = Some(url);
        }
        if let Some(region) = region {
            self.queue.aws.region = region;
        }
        self
    }
}
