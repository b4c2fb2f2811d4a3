use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::mirror::CookieMap;

/// Type marker carried by every [`CookieSnapshot`].
pub const SNAPSHOT_TAG: &str = "Cookies";

/// A flat, immutable copy of the mirror at one instant.
///
/// Returned by `get_all`, `remove` and `clear`. It owns its entries, so later
/// rebuilds never change it, and taking a snapshot of a snapshot is just
/// another flat copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieSnapshot {
    entries: CookieMap,
}

impl CookieSnapshot {
    pub fn new(entries: CookieMap) -> Self {
        Self { entries }
    }

    /// Descriptive type marker (`"Cookies"`).
    pub fn tag(&self) -> &'static str {
        SNAPSHOT_TAG
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.entries.iter()
    }

    pub fn as_map(&self) -> &CookieMap {
        &self.entries
    }

    pub fn into_map(self) -> CookieMap {
        self.entries
    }
}

impl<'a> IntoIterator for &'a CookieSnapshot {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Serializes as a plain object; the tag is not part of the data.
impl Serialize for CookieSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl fmt::Display for CookieSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}]", SNAPSHOT_TAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> CookieMap {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn tagged_and_displayed() {
        let snap = CookieSnapshot::new(map(json!({"a": 1})));
        assert_eq!(snap.tag(), "Cookies");
        assert_eq!(snap.to_string(), "[object Cookies]");
    }

    #[test]
    fn serializes_as_plain_object() {
        let snap = CookieSnapshot::new(map(json!({"a": 1, "b": "x"})));
        assert_eq!(serde_json::to_string(&snap).unwrap(), r#"{"a":1,"b":"x"}"#);
    }

    #[test]
    fn snapshot_of_snapshot_stays_flat() {
        let mut snap = CookieSnapshot::new(map(json!({"a": 1})));
        for _ in 0..100 {
            snap = CookieSnapshot::new(snap.as_map().clone());
        }
        assert_eq!(snap.len(), 1);
        assert_eq!(serde_json::to_string(&snap).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn iterates_in_order() {
        let snap = CookieSnapshot::new(map(json!({"b": 2, "a": 1})));
        let names: Vec<_> = (&snap).into_iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(snap.contains("a"));
        assert_eq!(snap.get("b"), Some(&json!(2)));
    }
}
