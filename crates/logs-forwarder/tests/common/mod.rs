// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use logs_forwarder::error::{DeliveryError, FetchError};
use logs_forwarder::fetcher::ObjectStore;
use logs_forwarder::notification::{BatchReference, Notification};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Object store serving fixed objects from memory
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: HashMap<(String, String), Bytes>,
    pub requests: Mutex<Vec<BatchReference>>,
}

impl InMemoryObjectStore {
    pub fn with_object(mut self, bucket: &str, key: &str, body: Vec<u8>) -> Self {
        self.objects
            .insert((bucket.to_string(), key.to_string()), Bytes::from(body));
        self
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, location: &BatchReference) -> Result<Bytes, FetchError> {
        self.requests.lock().unwrap().push(location.clone());
        self.objects
            .get(&(location.bucket.clone(), location.key.clone()))
            .cloned()
            .ok_or_else(|| FetchError::new(location, "NoSuchKey"))
    }
}

/// Gzip-compress a batch document
pub fn gzip(document: &Value) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(document.to_string().as_bytes())
        .expect("failed to compress batch");
    encoder.finish().expect("failed to compress batch")
}

/// Build an S3 object-created notification for one object
pub fn notification(bucket: &str, key: &str) -> Notification {
    serde_json::from_value(json!({
        "Records": [{
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": { "name": bucket },
                "object": { "key": key, "size": 512 }
            }
        }]
    }))
    .expect("failed to build notification")
}

/// Tracks how many deliveries run at the same time
#[derive(Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    pub peak: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn is_terminal(result: &Result<String, DeliveryError>) -> bool {
    matches!(result, Err(DeliveryError::Terminal(_)))
}
