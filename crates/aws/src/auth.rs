use aws_config::{ConfigLoader, Region, SdkConfig};
use tracing::{debug, info};

use crate::config::AwsBaseConfig;

/// Start an environment-based loader for the configured region and endpoint.
fn loader(config: &AwsBaseConfig) -> ConfigLoader {
    let mut loader = aws_config::from_env().region(Region::new(config.region.clone()));
    if let Some(endpoint) = &config.endpoint_url {
        debug!(endpoint = %endpoint, "using custom AWS endpoint");
        loader = loader.endpoint_url(endpoint);
    }
    loader
}

/// Build an AWS SDK configuration from an [`AwsBaseConfig`].
///
/// Credentials come from the standard environment chain. When `role_arn` is
/// set, the base credentials are only used to call STS, and the returned
/// config carries an assume-role provider that refreshes itself before
/// expiry.
///
/// # Examples
///
/// ```no_run
/// use delaysqs_aws::auth::build_sdk_config;
/// use delaysqs_aws::config::AwsBaseConfig;
///
/// # async fn example() {
/// let config = AwsBaseConfig::new("us-east-1").with_endpoint_url("http://localhost:4566");
/// let sdk_config = build_sdk_config(&config).await;
/// # }
/// ```
pub async fn build_sdk_config(config: &AwsBaseConfig) -> SdkConfig {
    let Some(role_arn) = &config.role_arn else {
        return loader(config).load().await;
    };

    let session_name = config.session_name.as_deref().unwrap_or("delaysqs");
    info!(role_arn = %role_arn, session_name = %session_name, "assuming IAM role via STS");

    let base = loader(config).load().await;
    let mut role = aws_config::sts::AssumeRoleProvider::builder(role_arn)
        .session_name(session_name)
        .region(Region::new(config.region.clone()));
    if let Some(external_id) = &config.external_id {
        role = role.external_id(external_id);
    }
    let provider = role.configure(&base).build().await;

    loader(config).credentials_provider(provider).load().await
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    // `load()` needs a TLS root store, so these only run in integration mode.

    #[tokio::test]
    async fn region_is_applied() {
        let sdk_config = build_sdk_config(&AwsBaseConfig::new("ap-northeast-1")).await;
        assert_eq!(
            sdk_config.region().map(|r| r.as_ref()),
            Some("ap-northeast-1")
        );
    }

    #[tokio::test]
    async fn endpoint_override_keeps_region() {
        let config = AwsBaseConfig::new("us-west-2").with_endpoint_url("http://localhost:4566");
        let sdk_config = build_sdk_config(&config).await;
        assert_eq!(sdk_config.region().map(|r| r.as_ref()), Some("us-west-2"));
    }
}
