//! Payload decoding.
//!
//! Devices publish a flat JSON object of named numeric fields, e.g.
//! `{"gyro_x": 0.1, "temperature": 31.5, "light": 220}`. Non-numeric
//! fields are skipped.

use sensorwatch_types::Reading;
use serde_json::Value;

use crate::error::DecodeError;

/// Decode a message payload into a [`Reading`] keyed by field name.
pub fn decode_payload(payload: &[u8]) -> Result<Reading, DecodeError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Json(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(DecodeError::NotAnObject);
    };

    Ok(fields
        .iter()
        .filter_map(|(name, value)| value.as_f64().map(|n| (name.as_str(), n)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_device_payload() {
        let payload = br#"{
            "gyro_x": 0.25, "gyro_y": -1.5, "gyro_z": 0,
            "temperature": 31.5, "humidity": 0.42, "light": 220
        }"#;
        let reading = decode_payload(payload).unwrap();
        assert_eq!(reading.len(), 6);
        assert_eq!(reading.get("gyro_y"), Some(-1.5));
        assert_eq!(reading.get("light"), Some(220.0));
    }

    #[test]
    fn test_non_numeric_fields_skipped() {
        let reading =
            decode_payload(br#"{"light": 3, "id": "dev-1", "ok": true, "nested": {"a": 1}}"#)
                .unwrap();
        assert_eq!(reading.len(), 1);
        assert!(reading.contains("light"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(decode_payload(b"not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode_payload(b""), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(decode_payload(b"[1, 2, 3]"), Err(DecodeError::NotAnObject));
        assert_eq!(decode_payload(b"42"), Err(DecodeError::NotAnObject));
    }
}
