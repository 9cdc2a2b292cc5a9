// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns a compressed CloudTrail batch into its ordered list of records.

use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};
use serde_json::Value;

use crate::error::DecodeError;

/// Raw records in batch order.
pub type RecordSet = Vec<Value>;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompresses `raw` and returns the top-level `Records` array.
///
/// Gzip is expected; anything without the gzip magic bytes is tried as a zlib stream.
/// Decoding is all-or-nothing: no records are returned unless the whole batch parses.
pub fn decode(raw: &[u8]) -> Result<RecordSet, DecodeError> {
    let decompressed = decompress(raw)?;
    let mut document: Value = serde_json::from_slice(&decompressed)?;
    match document.get_mut("Records").map(Value::take) {
        Some(Value::Array(records)) => Ok(records),
        _ => Err(DecodeError::MissingRecords),
    }
}

fn decompress(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decompressed = Vec::new();
    let result = if raw.starts_with(&GZIP_MAGIC) {
        GzDecoder::new(raw).read_to_end(&mut decompressed)
    } else {
        ZlibDecoder::new(raw).read_to_end(&mut decompressed)
    };
    result.map_err(DecodeError::Decompress)?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use serde_json::json;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decode_preserves_order() {
        let records = (0..25)
            .map(|i| json!({ "eventID": i, "eventName": format!("Event{i}") }))
            .collect::<Vec<_>>();
        let document = json!({ "Records": records });
        let raw = gzip(document.to_string().as_bytes());

        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded.len(), 25);
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_decode_empty_batch() {
        let raw = gzip(br#"{"Records":[]}"#);
        assert!(decode(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_decode_zlib_batch() {
        let raw = zlib(br#"{"Records":[{"eventName":"GetObject"}]}"#);
        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded, vec![json!({ "eventName": "GetObject" })]);
    }

    #[test]
    fn test_decode_uncompressed_input_fails() {
        let result = decode(br#"{"Records":[]}"#);
        assert!(matches!(result, Err(DecodeError::Decompress(_))));
    }

    #[test]
    fn test_decode_truncated_gzip_fails() {
        let raw = gzip(br#"{"Records":[{"eventName":"PutObject"},{"eventName":"GetObject"}]}"#);
        let truncated = &raw[..raw.len() / 2];
        assert!(decode(truncated).is_err());
    }

    #[test]
    fn test_decode_invalid_json_fails() {
        let raw = gzip(b"not json at all");
        assert!(matches!(decode(&raw), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_decode_missing_records_fails() {
        let raw = gzip(br#"{"records":[]}"#);
        assert!(matches!(decode(&raw), Err(DecodeError::MissingRecords)));

        let raw = gzip(br#"{"Records":{"eventName":"PutObject"}}"#);
        assert!(matches!(decode(&raw), Err(DecodeError::MissingRecords)));

        let raw = gzip(b"[]");
        assert!(matches!(decode(&raw), Err(DecodeError::MissingRecords)));
    }
}
