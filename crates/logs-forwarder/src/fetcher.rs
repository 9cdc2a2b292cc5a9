// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::debug;

use crate::error::FetchError;
use crate::notification::BatchReference;

/// Read access to the storage holding compressed batches.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, location: &BatchReference) -> Result<Bytes, FetchError>;
}

/// [`ObjectStore`] backed by S3. Credentials and region come from the host environment.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    #[must_use]
    pub fn new(client: S3Client) -> Self {
        S3ObjectStore { client }
    }

    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        S3ObjectStore::new(S3Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, location: &BatchReference) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| FetchError::new(location, DisplayErrorContext(&e).to_string()))?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| FetchError::new(location, e.to_string()))?
            .into_bytes();

        debug!("FORWARDER | Fetched {} bytes from {location}", body.len());
        Ok(body)
    }
}
