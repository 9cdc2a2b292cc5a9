// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwards CloudTrail batches from S3 to a LogDNA-compatible ingestion endpoint.
//!
//! - [`notification`]: the S3 event that names the batch
//! - [`fetcher`]: retrieves the compressed batch
//! - [`decoder`]: gunzips and parses its `Records`
//! - [`normalizer`]: turns each record into a [`normalizer::LogLine`]
//! - [`delivery`]: ships one line with retries and backoff
//! - [`dispatcher`]: runs the whole pipeline for one notification

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod decoder;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod normalizer;
pub mod notification;
