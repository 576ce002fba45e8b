//! Query parameter container.
//!
//! Keys map to one or more values. Keys are kept sorted so the encoded query
//! string is identical for identical inputs; values keep insertion order.

use std::collections::BTreeMap;
use std::fmt::Display;

use url::form_urlencoded;

/// Builder for assembling query parameters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Append a value under `key`.
    pub fn push<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Display,
    {
        self.values
            .entry(key.into())
            .or_default()
            .push(value.to_string());
    }

    /// Append a value when it is present.
    pub fn push_opt<T>(&mut self, key: impl Into<String>, value: Option<T>)
    where
        T: Display,
    {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// Chaining form of [`QueryParams::push`].
    #[must_use]
    pub fn with<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Display,
    {
        self.push(key, value);
        self
    }

    /// Values recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate key/value pairs, keys in lexicographic order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key.as_str(), value.as_str())))
    }

    /// Encode as an `application/x-www-form-urlencoded` query string.
    #[must_use]
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }

    /// Decode a query string produced by [`QueryParams::encode`].
    #[must_use]
    pub fn decode(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.push(key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::QueryParams;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn arbitrary_values() -> impl Strategy<Value = BTreeMap<String, Vec<String>>> {
        prop::collection::btree_map(
            "\\PC{0,12}",
            prop::collection::vec("\\PC{0,12}", 1..4),
            1..6,
        )
    }

    proptest! {
        #[test]
        fn encode_decode_preserves_every_value(values in arbitrary_values()) {
            let params: QueryParams = values
                .iter()
                .flat_map(|(key, vals)| vals.iter().map(move |v| (key.clone(), v.clone())))
                .collect();

            let decoded = QueryParams::decode(&params.encode());
            prop_assert_eq!(&decoded, &params);
            for (key, vals) in &values {
                prop_assert_eq!(decoded.get(key).unwrap(), vals.as_slice());
            }
        }

        #[test]
        fn encoding_is_deterministic(values in arbitrary_values()) {
            let forward: QueryParams = values
                .iter()
                .flat_map(|(key, vals)| vals.iter().map(move |v| (key.clone(), v.clone())))
                .collect();
            let reversed: QueryParams = values
                .iter()
                .rev()
                .flat_map(|(key, vals)| vals.iter().map(move |v| (key.clone(), v.clone())))
                .collect();
            prop_assert_eq!(forward.encode(), reversed.encode());
        }
    }

    #[test]
    fn push_opt_skips_none() {
        let mut params = QueryParams::new();
        params.push_opt("keyword", Option::<String>::None);
        assert!(params.is_empty());
    }

    #[test]
    fn encode_sorts_keys() {
        let params = QueryParams::new()
            .with("per_page", 100)
            .with("keyword", "Lame");
        assert_eq!(params.encode(), "keyword=Lame&per_page=100");
    }

    #[test]
    fn repeated_keys_keep_value_order() {
        let params = QueryParams::new()
            .with("tag", "b")
            .with("tag", "a");
        assert_eq!(params.get("tag").unwrap(), ["b", "a"]);
        assert_eq!(params.encode(), "tag=b&tag=a");
    }

    #[test]
    fn encode_escapes_reserved_characters() {
        let params = QueryParams::new().with("keyword", "a b&c=d");
        assert_eq!(params.encode(), "keyword=a+b%26c%3Dd");
    }

    #[test]
    fn decode_reverses_encode() {
        let params = QueryParams::new()
            .with("keyword", "Bank Robber")
            .with("per_page", 100)
            .with("product", "labs")
            .with("product", "fortresses")
            .with("symbols", "ä/?#");

        let decoded = QueryParams::decode(&params.encode());
        assert_eq!(decoded, params);
    }

    #[test]
    fn collect_from_pairs() {
        let params: QueryParams = [("product", "labs"), ("per_page", "100")]
            .into_iter()
            .collect();
        assert_eq!(params.get("product").unwrap(), ["labs"]);
        assert_eq!(params.get("per_page").unwrap(), ["100"]);
        assert!(params.get("keyword").is_none());
    }
}
