//! URL query object: an ordered map of parameter names to scalar or repeated values.
//!
//! Mirrors what a browser router hands out for `?a=1&a=2&b`: a name maps to one
//! value, to a list (the name was repeated), or to null (the name had no value).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Null,
    One(String),
    Many(Vec<Option<String>>),
}

impl QueryValue {
    /// First non-null value.
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Null => None,
            QueryValue::One(v) => Some(v.as_str()),
            QueryValue::Many(vs) => vs.iter().flatten().map(|s| s.as_str()).next(),
        }
    }

    /// All non-null values in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            QueryValue::Null => Vec::new(),
            QueryValue::One(v) => vec![v.as_str()],
            QueryValue::Many(vs) => vs.iter().flatten().map(|s| s.as_str()).collect(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }

    pub fn is_many(&self) -> bool {
        matches!(self, QueryValue::Many(_))
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::One(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::One(v)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(vs: Vec<String>) -> Self {
        QueryValue::Many(vs.into_iter().map(Some).collect())
    }
}

/// Query parameters keyed by name. Iteration order is the canonical (sorted) order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query {
    params: BTreeMap<String, QueryValue>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (with or without the leading `?`).
    /// Repeated names promote to a list, same as [`Query::append`].
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut q = Query::new();
        for (k, v) in form_urlencoded::parse(raw.as_bytes()) {
            q.append(k.as_ref(), v.into_owned());
        }
        q
    }

    /// Render back to `a=1&a=2&b` form. Null list entries are skipped.
    pub fn to_query_string(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in self.params.iter() {
            match v {
                QueryValue::Null => {
                    ser.append_key_only(k);
                }
                QueryValue::One(s) => {
                    ser.append_pair(k, s);
                }
                QueryValue::Many(vs) => {
                    for s in vs.iter().flatten() {
                        ser.append_pair(k, s);
                    }
                }
            }
        }
        ser.finish()
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.params.get(key)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.first())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Set a scalar value, replacing whatever was there.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.params.insert(key.into(), value.into());
    }

    /// Add a value under `key`: the first write stores a scalar, the second
    /// promotes to a list, later writes append.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.params.entry(key.into()) {
            Entry::Occupied(mut slot) => {
                let prev = std::mem::replace(slot.get_mut(), QueryValue::Null);
                *slot.get_mut() = match prev {
                    QueryValue::Null => QueryValue::Many(vec![None, Some(value)]),
                    QueryValue::One(first) => QueryValue::Many(vec![Some(first), Some(value)]),
                    QueryValue::Many(mut vs) => {
                        vs.push(Some(value));
                        QueryValue::Many(vs)
                    }
                };
            }
            Entry::Vacant(slot) => {
                slot.insert(QueryValue::One(value));
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        self.params.remove(key)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &QueryValue) -> bool) {
        self.params.retain(|k, v| keep(k, v));
    }

    /// Copy every parameter of `other` over this query.
    pub fn merge(&mut self, other: Query) {
        self.params.extend(other.params);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut q = Query::new();
        for (k, v) in iter {
            q.insert(k, v);
        }
        q
    }
}

/// Lenient `decodeURIComponent`: valid `%XX` escapes are decoded, anything
/// malformed is kept verbatim instead of failing.
pub fn decode_component(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_promotes_on_second_write() {
        let mut q = Query::new();
        q.append("k", "a");
        assert_eq!(q.get("k"), Some(&QueryValue::One("a".into())));
        q.append("k", "b");
        assert_eq!(q.get("k"), Some(&QueryValue::Many(vec![Some("a".into()), Some("b".into())])));
        q.append("k", "c");
        assert_eq!(q.get("k").unwrap().values(), vec!["a", "b", "c"]);
    }

    #[test]
    fn parse_and_render() {
        let q = Query::parse("?filters%5Bnamespace%5D%5BIN%5D=a&filters%5Bnamespace%5D%5BIN%5D=b&q=hello+world");
        assert_eq!(q.get("filters[namespace][IN]").unwrap().values(), vec!["a", "b"]);
        assert_eq!(q.first("q"), Some("hello world"));
        let back = Query::parse(&q.to_query_string());
        assert_eq!(back, q);
    }

    #[test]
    fn first_skips_nulls() {
        let v = QueryValue::Many(vec![None, Some("x".into())]);
        assert_eq!(v.first(), Some("x"));
        assert_eq!(v.values(), vec!["x"]);
        assert_eq!(QueryValue::Null.first(), None);
    }

    #[test]
    fn json_shape_matches_router_query() {
        let q: Query = serde_json::from_str(r#"{"a":"1","b":["x",null],"c":null}"#).unwrap();
        assert_eq!(q.first("a"), Some("1"));
        assert_eq!(q.get("b"), Some(&QueryValue::Many(vec![Some("x".into()), None])));
        assert!(q.get("c").unwrap().is_null());
    }

    #[test]
    fn decode_component_is_lenient() {
        assert_eq!(decode_component("a%20b"), "a b");
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%zz"), "%zz");
        assert_eq!(decode_component("caf%C3%A9"), "café");
        assert_eq!(decode_component("bad%FFbyte"), "bad%FFbyte");
    }
}
