// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Runs one notification through fetch, decode, normalize and delivery.
//!
//! Fetch and decode failures reject the whole batch. Once records are available every
//! line is delivered in its own task, gated by a semaphore so that at most
//! `max_concurrent_requests` requests are in flight. A failed line never stops its
//! siblings; every line's outcome ends up in the [`BatchReport`].

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::DeliveryConfig;
use crate::decoder;
use crate::delivery::Shipper;
use crate::error::{DeliveryError, DispatchError};
use crate::fetcher::ObjectStore;
use crate::normalizer::{normalize, LogLine};
use crate::notification::Notification;

/// Per-line delivery outcomes, in record order.
#[derive(Debug)]
pub struct BatchReport {
    outcomes: Vec<Result<String, DeliveryError>>,
}

impl BatchReport {
    #[must_use]
    pub fn outcomes(&self) -> &[Result<String, DeliveryError>] {
        &self.outcomes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    #[must_use]
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.len() - self.delivered()
    }

    /// The error of the earliest failed record.
    #[must_use]
    pub fn first_error(&self) -> Option<&DeliveryError> {
        self.outcomes.iter().find_map(|outcome| outcome.as_ref().err())
    }

    /// Collapses the report into a single result: every response body, or the error of
    /// the earliest failed record.
    pub fn into_result(self) -> Result<Vec<String>, DeliveryError> {
        self.outcomes.into_iter().collect()
    }
}

pub struct Dispatcher {
    store: Arc<dyn ObjectStore>,
    shipper: Arc<dyn Shipper>,
    config: Arc<DeliveryConfig>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        shipper: Arc<dyn Shipper>,
        config: Arc<DeliveryConfig>,
    ) -> Self {
        Dispatcher {
            store,
            shipper,
            config,
        }
    }

    pub async fn dispatch(
        &self,
        notification: &Notification,
    ) -> Result<BatchReport, DispatchError> {
        let location = notification
            .batch_reference()
            .ok_or(DispatchError::EmptyNotification)?;

        info!("FORWARDER | Fetching batch {location}");
        let raw = self.store.get(&location).await?;

        let records = decoder::decode(&raw)?;
        debug!(
            "FORWARDER | Decoded {} records from {} compressed bytes",
            records.len(),
            raw.len()
        );

        let lines = records
            .into_iter()
            .map(|record| normalize(record, &self.config))
            .collect::<Vec<LogLine>>();

        let report = self.deliver_all(lines).await;
        info!(
            "FORWARDER | Batch {location} done: {} delivered, {} failed",
            report.delivered(),
            report.failed()
        );
        Ok(report)
    }

    /// Delivers every line concurrently and waits for all of them.
    pub async fn deliver_all(&self, lines: Vec<LogLine>) -> BatchReport {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_requests.max(1)));
        let mut set = JoinSet::new();
        let total = lines.len();

        for (index, line) in lines.into_iter().enumerate() {
            let shipper = Arc::clone(&self.shipper);
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                // Acquire only fails on a closed semaphore; this one never is.
                let _permit = permits.acquire_owned().await.ok();
                (index, shipper.deliver(&line).await)
            });
        }

        let mut slots = (0..total).map(|_| None).collect::<Vec<_>>();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!("FORWARDER | Failed to join delivery task: {e}"),
            }
        }

        let outcomes = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(DeliveryError::Interrupted(
                        "task ended without an outcome".to_string(),
                    ))
                })
            })
            .collect();
        BatchReport { outcomes }
    }
}
