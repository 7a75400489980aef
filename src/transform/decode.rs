use crate::domain::{RecordMap, RecordValue};

/// Converts every raw-byte leaf and field name into text so the serializer
/// emits strings. A byte name colliding with a text name replaces it.
pub fn decode_map(record: RecordMap) -> RecordMap {
    record
        .into_iter()
        .map(|(key, value)| (key.into_text_key(), decode_value(value)))
        .collect()
}

pub fn decode_value(value: RecordValue) -> RecordValue {
    match value {
        RecordValue::Bytes(bytes) => RecordValue::String(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }),
        RecordValue::Map(map) => RecordValue::Map(decode_map(map)),
        RecordValue::Array(items) => {
            RecordValue::Array(items.into_iter().map(decode_value).collect())
        }
        other => other,
    }
}
