use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Mapping from field name to value at any nesting depth of a record.
pub type RecordMap = BTreeMap<RecordKey, RecordValue>;

/// A field name as supplied by the host collector.
///
/// Hosts hand over names as either text or raw bytes; other key types can
/// appear in decoded maps and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    Text(String),
    Bytes(Vec<u8>),
    Integer(i64),
}

impl RecordKey {
    /// Textual view of the key, `None` for key types that have no name.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RecordKey::Text(s) => Some(Cow::Borrowed(s.as_str())),
            RecordKey::Bytes(b) => Some(String::from_utf8_lossy(b)),
            RecordKey::Integer(_) => None,
        }
    }

    /// Folds byte names into text so both spellings address one field.
    pub fn into_text_key(self) -> RecordKey {
        match self {
            RecordKey::Bytes(b) => RecordKey::Text(match String::from_utf8(b) {
                Ok(text) => text,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            }),
            other => other,
        }
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        RecordKey::Text(value.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        RecordKey::Text(value)
    }
}

impl From<Vec<u8>> for RecordKey {
    fn from(value: Vec<u8>) -> Self {
        RecordKey::Bytes(value)
    }
}

impl Serialize for RecordKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordKey::Text(s) => serializer.serialize_str(s),
            RecordKey::Bytes(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
            RecordKey::Integer(i) => serializer.serialize_i64(*i),
        }
    }
}

/// A loosely-typed record value.
///
/// `Bytes` leaves are what the host produces for most string data; they must
/// be decoded to `String` before serialization or they are emitted as
/// integer arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<RecordValue>),
    Map(RecordMap),
}

impl RecordValue {
    pub fn as_map(&self) -> Option<&RecordMap> {
        match self {
            RecordValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RecordValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        RecordValue::String(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        RecordValue::String(value)
    }
}

impl From<Vec<u8>> for RecordValue {
    fn from(value: Vec<u8>) -> Self {
        RecordValue::Bytes(value)
    }
}

impl From<i64> for RecordValue {
    fn from(value: i64) -> Self {
        RecordValue::Integer(value)
    }
}

impl From<bool> for RecordValue {
    fn from(value: bool) -> Self {
        RecordValue::Boolean(value)
    }
}

impl From<RecordMap> for RecordValue {
    fn from(value: RecordMap) -> Self {
        RecordValue::Map(value)
    }
}

impl From<serde_json::Value> for RecordValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => RecordValue::Nil,
            Value::Bool(b) => RecordValue::Boolean(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RecordValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    RecordValue::Unsigned(u)
                } else {
                    RecordValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => RecordValue::String(s),
            Value::Array(items) => {
                RecordValue::Array(items.into_iter().map(RecordValue::from).collect())
            }
            Value::Object(object) => RecordValue::Map(
                object
                    .into_iter()
                    .map(|(k, v)| (RecordKey::Text(k), RecordValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for RecordValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordValue::Nil => serializer.serialize_unit(),
            RecordValue::Boolean(b) => serializer.serialize_bool(*b),
            RecordValue::Integer(i) => serializer.serialize_i64(*i),
            RecordValue::Unsigned(u) => serializer.serialize_u64(*u),
            RecordValue::Float(f) => serializer.serialize_f64(*f),
            RecordValue::String(s) => serializer.serialize_str(s),
            RecordValue::Bytes(b) => serializer.serialize_bytes(b),
            RecordValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            RecordValue::Map(map) => serialize_map(map, serializer),
        }
    }
}

pub(crate) fn serialize_map<S: Serializer>(map: &RecordMap, serializer: S) -> Result<S::Ok, S::Error> {
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (key, value) in map {
        out.serialize_entry(key, value)?;
    }
    out.end()
}

/// Builds a record from a JSON object; anything else is wrapped under `log`.
pub fn record_from_json(value: serde_json::Value) -> RecordMap {
    match RecordValue::from(value) {
        RecordValue::Map(map) => map,
        other => {
            let mut map = RecordMap::new();
            map.insert(RecordKey::from("log"), other);
            map
        }
    }
}
