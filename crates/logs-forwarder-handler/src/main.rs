// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::io::Read;
use std::{env, fs, process, sync::Arc};

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use logs_forwarder::{
    config::DeliveryConfig,
    delivery::DeliveryClient,
    dispatcher::{BatchReport, Dispatcher},
    fetcher::S3ObjectStore,
    notification::Notification,
};

#[derive(Serialize)]
struct LineSummary<'a> {
    index: usize,
    delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
pub async fn main() {
    let log_level = env::var("LOGDNA_FORWARDER_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!(
        "h2=off,hyper=off,rustls=off,aws_config=warn,aws_smithy_runtime=warn,{}",
        log_level
    );

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let notification = match read_notification(env::args().nth(1)) {
        Ok(notification) => notification,
        Err(e) => {
            error!("Unable to read notification: {e:#}");
            process::exit(1);
        }
    };

    let config = Arc::new(DeliveryConfig::from_env());
    debug!("Forwarder configuration: {:?}", config);
    if config.key.is_none() {
        error!("LOGDNA_KEY not set, every delivery will fail");
    }

    let store = Arc::new(S3ObjectStore::from_env().await);
    let shipper = Arc::new(DeliveryClient::new(Arc::clone(&config)));
    let dispatcher = Dispatcher::new(store, shipper, config);

    let report = match dispatcher.dispatch(&notification).await {
        Ok(report) => report,
        Err(e) => {
            error!("Batch rejected: {e}");
            process::exit(1);
        }
    };

    match summarize(&report) {
        Ok(summary) => println!("{summary}"),
        Err(e) => error!("Unable to serialize batch report: {e}"),
    }

    if let Some(e) = report.first_error() {
        error!(
            "{} of {} lines failed, first failure: {e}",
            report.failed(),
            report.len()
        );
        process::exit(1);
    }
    info!("Forwarded {} lines", report.len());
}

/// Reads the S3 notification from the file named by `path`, or from stdin.
fn read_notification(path: Option<String>) -> anyhow::Result<Notification> {
    let raw = match path {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read notification from {path}"))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read notification from stdin")?;
            raw
        }
    };
    serde_json::from_str(&raw).context("notification is not a valid S3 event")
}

fn summarize(report: &BatchReport) -> serde_json::Result<String> {
    let lines = report
        .outcomes()
        .iter()
        .enumerate()
        .map(|(index, outcome)| match outcome {
            Ok(response) => LineSummary {
                index,
                delivered: true,
                response: Some(response.as_str()),
                error: None,
            },
            Err(e) => LineSummary {
                index,
                delivered: false,
                response: None,
                error: Some(e.to_string()),
            },
        })
        .collect::<Vec<_>>();
    serde_json::to_string_pretty(&lines)
}
