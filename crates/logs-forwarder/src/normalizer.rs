// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use serde_json::Value;

use crate::config::DeliveryConfig;

/// One entry of the ingestion payload's `lines` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    pub line: Value,
    pub level: String,
    pub app: String,
}

/// Builds the log line for one raw record. Never fails: the whole record becomes the
/// line, whatever its shape.
#[must_use]
pub fn normalize(record: Value, config: &DeliveryConfig) -> LogLine {
    let timestamp = field(&record, "timestamp")
        .or_else(|| field(&record, "eventTime"))
        .cloned();

    LogLine {
        timestamp,
        line: record,
        level: config.level().to_string(),
        app: config.app().to_string(),
    }
}

// Empty strings, zero, false and null count as missing.
fn field<'a>(record: &'a Value, name: &str) -> Option<&'a Value> {
    record.get(name).filter(|value| match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::Array(_) | Value::Object(_) => true,
    })
}
