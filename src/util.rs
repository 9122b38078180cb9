//! Utility functions for LevelUp.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{LevelUpError, Result};

/// Maximum model document size that can be read into memory (10 MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read a file into a string with size limit protection.
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read (doesn't exist, permission denied, etc.)
/// * The file exceeds `MAX_FILE_SIZE`
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| LevelUpError::storage(path, e))?;

    let size = metadata.len();
    if size > MAX_FILE_SIZE {
        return Err(LevelUpError::deserialize(format!(
            "File {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            MAX_FILE_SIZE
        )));
    }

    fs::read_to_string(path).map_err(|e| LevelUpError::storage(path, e))
}

/// An entity identified by a string id within its parent.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Insert `item` under its own key, rejecting duplicates.
pub fn insert_keyed<V: Keyed>(map: &mut BTreeMap<String, V>, item: V) -> Result<()> {
    let key = item.key().to_string();
    if map.contains_key(&key) {
        return Err(LevelUpError::deserialize(format!("duplicate id `{}`", key)));
    }
    map.insert(key, item);
    Ok(())
}

/// Serde adapter storing an id-keyed map as a JSON array of its values.
///
/// Deserialization rejects two entries with the same id.
pub mod keyed_map {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Keyed;

    pub fn serialize<S, V>(map: &BTreeMap<String, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de> + Keyed,
    {
        let items = Vec::<V>::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for item in items {
            let key = item.key().to_string();
            if map.insert(key.clone(), item).is_some() {
                return Err(D::Error::custom(format!("duplicate id `{}`", key)));
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    impl Keyed for Item {
        fn key(&self) -> &str {
            &self.id
        }
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "keyed_map")]
        items: BTreeMap<String, Item>,
    }

    #[test]
    fn test_keyed_map_as_array() {
        let json = r#"{"items":[{"id":"b"},{"id":"a"}]}"#;
        let holder: Holder = serde_json::from_str(json).unwrap();
        assert_eq!(holder.items.len(), 2);
        assert!(holder.items.contains_key("a"));

        let out = serde_json::to_value(&holder).unwrap();
        assert!(out["items"].is_array());
        assert_eq!(out["items"][0]["id"], "a");
    }

    #[test]
    fn test_keyed_map_rejects_duplicates() {
        let json = r#"{"items":[{"id":"a"},{"id":"a"}]}"#;
        let err = serde_json::from_str::<Holder>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate id `a`"));
    }

    #[test]
    fn test_insert_keyed_rejects_duplicates() {
        let mut map = BTreeMap::new();
        insert_keyed(&mut map, Item { id: "x".into() }).unwrap();
        assert!(insert_keyed(&mut map, Item { id: "x".into() }).is_err());
    }

    #[test]
    fn test_read_to_string_limited() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "hello").unwrap();
        assert_eq!(read_to_string_limited(file.path()).unwrap(), "hello");
    }

    #[test]
    fn test_read_to_string_limited_missing() {
        let err = read_to_string_limited(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, LevelUpError::Storage { .. }));
    }
}
