//! Query parameters
//!
//! A key maps to exactly one value, so a request can never carry both
//! `pageSize=5` and `pageSize=abc`.

use std::collections::BTreeMap;
use std::fmt;

/// Page size query parameter
pub const PAGE_SIZE: &str = "pageSize";
/// Page token query parameter
pub const PAGE_TOKEN: &str = "pageToken";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

/// Ordered query parameter map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, ParamValue>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// String value of a key, if it holds one
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ParamValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Integer value of a key, if it holds one
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(ParamValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Wire form for `reqwest::RequestBuilder::query`
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_existing_key() {
        let mut params = QueryParams::new().with(PAGE_SIZE, 5u32);
        params.insert(PAGE_SIZE, 10u32);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get_int(PAGE_SIZE), Some(10));
    }

    #[test]
    fn test_retyping_a_key_keeps_one_value() {
        let params = QueryParams::new().with("force", 1i64).with("force", "true");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get_str("force"), Some("true"));
        assert_eq!(params.get_int("force"), None);
    }

    #[test]
    fn test_to_pairs_is_sorted() {
        let params = QueryParams::new()
            .with(PAGE_TOKEN, "abc")
            .with(PAGE_SIZE, 5u32);
        assert_eq!(
            params.to_pairs(),
            vec![
                ("pageSize".to_string(), "5".to_string()),
                ("pageToken".to_string(), "abc".to_string()),
            ]
        );
    }
}
