use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::DataCategory;

/// One element of a query key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySegment {
    Int(i64),
    Str(String),
}

impl KeySegment {
    /// Ids match across representations, so `Int(5)` matches `Str("5")`.
    pub fn matches_id(&self, id: &KeySegment) -> bool {
        self == id || self.to_string() == id.to_string()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeySegment::Str(s) => Some(s),
            KeySegment::Int(_) => None,
        }
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Int(n) => write!(f, "{}", n),
            KeySegment::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for KeySegment {
    fn from(value: &str) -> Self {
        KeySegment::Str(value.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(value: String) -> Self {
        KeySegment::Str(value)
    }
}

impl From<i64> for KeySegment {
    fn from(value: i64) -> Self {
        KeySegment::Int(value)
    }
}

impl From<i32> for KeySegment {
    fn from(value: i32) -> Self {
        KeySegment::Int(i64::from(value))
    }
}

impl From<u32> for KeySegment {
    fn from(value: u32) -> Self {
        KeySegment::Int(i64::from(value))
    }
}

/// Ordered list of segments identifying one cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn new(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&KeySegment> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn push(mut self, segment: impl Into<KeySegment>) -> Self {
        self.0.push(segment.into());
        self
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl<S: Into<KeySegment>, const N: usize> From<[S; N]> for QueryKey {
    fn from(segments: [S; N]) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }
}

/// Build the standard key for a category.
///
/// List categories produce `[tag, sub_key?]` and ignore `id`; every other
/// category produces `[tag, id?, sub_key?]`.
pub fn build_cache_key(
    category: DataCategory,
    id: Option<KeySegment>,
    sub_key: Option<&str>,
) -> QueryKey {
    let mut segments = vec![KeySegment::from(category.as_str())];

    if !category.is_list() {
        if let Some(id) = id {
            segments.push(id);
        }
    }

    if let Some(sub_key) = sub_key.filter(|s| !s.is_empty()) {
        segments.push(KeySegment::from(sub_key));
    }

    QueryKey(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_key_ignores_id() {
        let key = build_cache_key(DataCategory::MealsList, Some(7.into()), Some("recent"));
        assert_eq!(key, QueryKey::from(["meals-list", "recent"]));
    }

    #[test]
    fn test_detail_key_with_id_and_sub_key() {
        let key = build_cache_key(DataCategory::MealDetails, Some(42.into()), Some("nutrition"));
        assert_eq!(key.to_string(), "meal-details,42,nutrition");
        assert_eq!(key.get(1), Some(&KeySegment::Int(42)));
    }

    #[test]
    fn test_empty_sub_key_is_dropped() {
        let key = build_cache_key(DataCategory::UserDetails, None, Some(""));
        assert_eq!(key, QueryKey::from(["user-details"]));
    }

    #[test]
    fn test_matches_id_across_representations() {
        assert!(KeySegment::Int(5).matches_id(&KeySegment::from("5")));
        assert!(KeySegment::from("abc").matches_id(&KeySegment::from("abc")));
        assert!(!KeySegment::Int(5).matches_id(&KeySegment::Int(6)));
    }

    #[test]
    fn test_starts_with() {
        let key = build_cache_key(DataCategory::PlanDetails, Some(3.into()), Some("days"));
        assert!(key.starts_with(&QueryKey::from(["plan-details"])));
        assert!(!key.starts_with(&QueryKey::from(["plans-list"])));
    }
}
