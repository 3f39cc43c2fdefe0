//! AWS SDK configuration shared by the S3, Macie and STS clients.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::DisplayErrorContext;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classification::macie::MacieService;
use crate::core::config::PipelineConfig;
use crate::core::errors::{PipelineError, Result};
use crate::storage::s3::S3ObjectStore;

/// Region, profile and endpoint used to build every client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSettings {
    /// AWS region
    pub region: String,

    /// Named profile (optional)
    pub profile: Option<String>,

    /// Custom endpoint URL (for LocalStack)
    pub endpoint: Option<String>,
}

impl AwsSettings {
    /// Settings for a region with the default credential chain.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    /// Set the AWS profile.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set a custom endpoint (for LocalStack).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Settings taken from the `aws` section of a pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut settings = Self::new(config.aws.region.clone());
        if let Some(profile) = config.profile() {
            settings = settings.with_profile(profile);
        }
        if let Some(endpoint) = &config.aws.endpoint_url {
            settings = settings.with_endpoint(endpoint.clone());
        }
        settings
    }
}

/// Load the shared SDK configuration.
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(settings.region.clone()));

    if let Some(endpoint) = &settings.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    if let Some(profile) = &settings.profile {
        loader = loader.profile_name(profile);
    }

    loader.load().await
}

/// The three service clients a run needs.
#[derive(Clone)]
pub struct AwsClients {
    settings: AwsSettings,
    s3: aws_sdk_s3::Client,
    macie: aws_sdk_macie2::Client,
    sts: aws_sdk_sts::Client,
}

impl AwsClients {
    /// Build every client from one SDK configuration.
    pub async fn connect(settings: AwsSettings) -> Self {
        let sdk_config = load_sdk_config(&settings).await;
        debug!(region = %settings.region, profile = ?settings.profile, "Loaded AWS configuration");

        // Path-style addressing for custom endpoints (LocalStack)
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.endpoint.is_some())
            .build();

        Self {
            s3: aws_sdk_s3::Client::from_conf(s3_config),
            macie: aws_sdk_macie2::Client::new(&sdk_config),
            sts: aws_sdk_sts::Client::new(&sdk_config),
            settings,
        }
    }

    /// Settings the clients were built from
    pub fn settings(&self) -> &AwsSettings {
        &self.settings
    }

    /// S3-backed object store
    pub fn object_store(&self) -> Arc<S3ObjectStore> {
        Arc::new(S3ObjectStore::new(self.s3.clone()))
    }

    /// Macie-backed classification service
    pub fn classification_service(&self) -> Arc<MacieService> {
        Arc::new(MacieService::new(self.macie.clone()))
    }

    /// Account id of the caller's credentials.
    pub async fn account_id(&self) -> Result<String> {
        let identity = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| PipelineError::remote("sts", "GetCallerIdentity", sdk_message(&e)))?;

        identity
            .account()
            .map(str::to_string)
            .ok_or_else(|| PipelineError::remote("sts", "GetCallerIdentity", "no account in response"))
    }
}

/// Console page listing classification jobs for a region.
pub fn macie_console_url(region: &str) -> String {
    format!("https://{region}.console.aws.amazon.com/macie/home?region={region}#/jobs")
}

/// Full error chain of an SDK error, including the service error code.
pub(crate) fn sdk_message<E: std::error::Error>(err: &E) -> String {
    DisplayErrorContext(err).to_string()
}
