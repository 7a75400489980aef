use crate::domain::{RecordKey, RecordMap, RecordValue};
use tracing::debug;

/// Parses a comma-separated allowlist into trimmed, non-empty key names.
pub fn parse_data_keys(input: &str) -> Vec<String> {
    input
        .trim()
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Removes every top-level key that is not in `keys`.
///
/// Keys without a textual form cannot be matched and are kept.
pub fn filter_data_keys(record: &mut RecordMap, keys: &[String]) {
    record.retain(|key, _| match key.as_text() {
        Some(name) => keys.iter().any(|k| k.as_str() == name),
        None => {
            debug!("Unable to determine type of key {:?}, keeping it", key);
            true
        }
    });
}

/// Rewrites every `.` in field names to `replacement`, at every depth.
/// Values are left untouched. Names come out as text; a renamed field
/// overwrites any field that already carried the new name.
pub fn replace_dots(record: RecordMap, replacement: &str) -> RecordMap {
    let mut out = RecordMap::new();
    let mut renamed = Vec::new();
    for (key, value) in record {
        let value = replace_in_value(value, replacement);
        match key.into_text_key() {
            RecordKey::Text(name) if name.contains('.') => {
                renamed.push((RecordKey::Text(name.replace('.', replacement)), value));
            }
            other => {
                out.insert(other, value);
            }
        }
    }
    out.extend(renamed);
    out
}

fn replace_in_value(value: RecordValue, replacement: &str) -> RecordValue {
    match value {
        RecordValue::Map(map) => RecordValue::Map(replace_dots(map, replacement)),
        RecordValue::Array(items) => RecordValue::Array(
            items
                .into_iter()
                .map(|item| replace_in_value(item, replacement))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> RecordKey {
        RecordKey::from(name)
    }

    #[test]
    fn test_parse_data_keys_trims_entries() {
        assert_eq!(parse_data_keys(" log, level ,,msg "), vec!["log", "level", "msg"]);
        assert!(parse_data_keys("").is_empty());
    }

    #[test]
    fn test_filter_keeps_nested_structure_under_retained_keys() {
        let mut nested = RecordMap::new();
        nested.insert(key("inner"), RecordValue::from("x"));

        let mut record = RecordMap::new();
        record.insert(key("log"), RecordValue::from("line"));
        record.insert(key("drop.me"), RecordValue::from("gone"));
        record.insert(RecordKey::from(b"kubernetes".to_vec()), RecordValue::Map(nested.clone()));
        record.insert(RecordKey::Integer(42), RecordValue::from("kept"));

        filter_data_keys(&mut record, &["log".to_string(), "kubernetes".to_string()]);

        assert_eq!(record.len(), 3);
        assert!(record.contains_key(&key("log")));
        assert!(!record.contains_key(&key("drop.me")));
        assert_eq!(
            record[&RecordKey::from(b"kubernetes".to_vec())],
            RecordValue::Map(nested)
        );
        assert!(record.contains_key(&RecordKey::Integer(42)));
    }

    #[test]
    fn test_replace_dots_in_names_only() {
        let mut labels = RecordMap::new();
        labels.insert(key("app.kubernetes.io/name"), RecordValue::from("some.message"));

        let mut record = RecordMap::new();
        record.insert(key("kubernetes"), RecordValue::Map(labels));
        record.insert(
            RecordKey::from(b"message.key".to_vec()),
            RecordValue::from("v.1"),
        );
        record.insert(
            key("list"),
            RecordValue::Array(vec![RecordValue::Map(
                [(key("a.b"), RecordValue::Integer(1))].into_iter().collect(),
            )]),
        );

        let replaced = replace_dots(record, "-");

        let labels = replaced[&key("kubernetes")].as_map().unwrap();
        assert_eq!(
            labels[&key("app-kubernetes-io/name")],
            RecordValue::from("some.message")
        );
        assert_eq!(replaced[&key("message-key")], RecordValue::from("v.1"));
        let RecordValue::Array(items) = &replaced[&key("list")] else {
            panic!("expected array");
        };
        assert!(items[0].as_map().unwrap().contains_key(&key("a-b")));
    }

    #[test]
    fn test_renamed_field_overwrites_existing_name() {
        let mut record = RecordMap::new();
        record.insert(key("a.b"), RecordValue::from("dotted"));
        record.insert(RecordKey::from(b"a-b".to_vec()), RecordValue::from("bytes"));
        record.insert(key("c"), RecordValue::from("kept"));

        let replaced = replace_dots(record, "-");

        assert_eq!(replaced.len(), 2);
        assert_eq!(replaced[&key("a-b")], RecordValue::from("dotted"));
        assert_eq!(replaced[&key("c")], RecordValue::from("kept"));
    }
}
