// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::Deserialize;
use tracing::{debug, warn};

/// S3 object-created notification. Only the fields the forwarder reads are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
}

/// Location of one compressed batch in object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReference {
    pub bucket: String,
    pub key: String,
}

impl fmt::Display for BatchReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

impl Notification {
    /// Returns the batch named by the first record.
    ///
    /// Later records are ignored: one invocation forwards one object. A notification
    /// carrying several objects will silently drop all but the first, so this is logged.
    #[must_use]
    pub fn batch_reference(&self) -> Option<BatchReference> {
        let first = self.records.first()?;
        if self.records.len() > 1 {
            warn!(
                "FORWARDER | Notification carries {} records, only the first is forwarded",
                self.records.len()
            );
        }
        debug!("FORWARDER | Notification record: {:?}", first);
        Some(BatchReference {
            bucket: first.s3.bucket.name.clone(),
            key: first.s3.object.key.clone(),
        })
    }
}
