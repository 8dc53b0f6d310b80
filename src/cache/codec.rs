//! Serialization Codec
//!
//! Converts values to and from the JSON text stored in the cache. Encoding goes
//! through `serde_json::Value` first so values without a canonical JSON form
//! (integers wider than 64 bits, maps keyed by non-strings) are rejected
//! before any I/O.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Encodes `value` as JSON text.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let tree = serde_json::to_value(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
    serde_json::to_string(&tree).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Decodes JSON text into `T`. Nothing is returned on failure.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| CacheError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde::{Deserialize, Serializer};
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Project {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        archived_at: Option<String>,
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("circular reference"))
        }
    }

    #[test]
    fn test_encode_omits_skipped_fields_and_keeps_null() {
        let project = Project {
            name: "Acme".into(),
            description: None,
            archived_at: None,
        };

        let text = encode(&project).unwrap();
        assert_eq!(text, r#"{"archived_at":null,"name":"Acme"}"#);
        assert_eq!(decode::<Project>(&text).unwrap(), project);
    }

    #[test]
    fn test_encode_timestamp_as_text() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(encode(&at).unwrap(), r#""2024-05-01T12:00:00Z""#);
    }

    #[test]
    fn test_encode_rejects_wide_integer() {
        let result = encode(&u128::MAX);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_encode_rejects_non_string_map_keys() {
        let mut map = HashMap::new();
        map.insert((1, 2), "cell");

        assert!(matches!(encode(&map), Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_encode_surfaces_serializer_errors() {
        let err = encode(&Unencodable).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(ref msg) if msg.contains("circular")));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let result = decode::<Project>("{\"name\":");
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[test]
    fn test_decode_wrong_shape() {
        let result = decode::<Project>("[1,2,3]");
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }
}
