use serde::{Deserialize, Serialize};

use crate::error::AwsQueueError;

fn default_region() -> String {
    "us-east-1".to_owned()
}

/// Connection settings shared by AWS-backed gateways.
///
/// Region and credentials resolve through the usual AWS environment chain;
/// `role_arn` switches to STS assume-role and `endpoint_url` points the client
/// at a local emulator such as `LocalStack`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsBaseConfig {
    /// AWS region (e.g. `"eu-west-1"`).
    #[serde(default = "default_region")]
    pub region: String,

    /// IAM role to assume via STS.
    #[serde(default)]
    pub role_arn: Option<String>,

    /// Endpoint override for local development.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// STS session name (defaults to `"delaysqs"`).
    #[serde(default)]
    pub session_name: Option<String>,

    /// External ID required by some cross-account trust policies.
    #[serde(default)]
    pub external_id: Option<String>,
}

impl std::fmt::Debug for AwsBaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsBaseConfig")
            .field("region", &self.region)
            .field("role_arn", &self.role_arn.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint_url", &self.endpoint_url)
            .field("session_name", &self.session_name)
            .field("external_id", &self.external_id.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AwsBaseConfig {
    fn default() -> Self {
        Self::new(default_region())
    }
}

impl AwsBaseConfig {
    /// Settings for `region` with everything else left to the environment.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            role_arn: None,
            endpoint_url: None,
            session_name: None,
            external_id: None,
        }
    }

    #[must_use]
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    #[must_use]
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Catch obvious mistakes before the SDK turns them into opaque errors.
    pub fn validate(&self) -> Result<(), AwsQueueError> {
        if self.region.trim().is_empty() {
            return Err(AwsQueueError::Configuration("region must not be empty".into()));
        }
        if let Some(arn) = &self.role_arn
            && !arn.starts_with("arn:")
        {
            return Err(AwsQueueError::Configuration(format!(
                "role_arn must be an ARN, got {arn:?}"
            )));
        }
        if let Some(url) = &self.endpoint_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(AwsQueueError::Configuration(format!(
                "endpoint_url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.external_id.is_some() && self.role_arn.is_none() {
            return Err(AwsQueueError::Configuration(
                "external_id is only used together with role_arn".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_us_east_1() {
        let config = AwsBaseConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_redacts_role_and_external_id() {
        let config = AwsBaseConfig::new("us-east-1")
            .with_role_arn("arn:aws:iam::123456789012:role/delayer")
            .with_external_id("s3cr3t");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("123456789012"));
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn rejects_malformed_role_arn() {
        let config = AwsBaseConfig::new("us-east-1").with_role_arn("delayer-role");
        assert!(matches!(
            config.validate(),
            Err(AwsQueueError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let config = AwsBaseConfig::new("us-east-1").with_endpoint_url("localhost:4566");
        assert!(config.validate().is_err());
        let config = AwsBaseConfig::new("us-east-1").with_endpoint_url("http://localhost:4566");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn external_id_requires_role() {
        let config = AwsBaseConfig::new("us-east-1").with_external_id("x");
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_with_missing_region() {
        let config: AwsBaseConfig =
            serde_json::from_str(r#"{"endpoint_url": "http://localhost:4566"}"#).unwrap();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:4566"));
    }
}
