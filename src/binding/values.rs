use std::fmt;

/// Multi-value string map kept in first-insertion key order.
///
/// Lookups are linear; forms, queries and route variables are small.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values {
    entries: Vec<(String, Vec<String>)>,
}

impl Values {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// First value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// Every value for `key`; empty when absent.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.position(key)
            .map(|i| self.entries[i].1.as_slice())
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Append a value, keeping earlier values for the same key.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.position(&key) {
            Some(i) => self.entries[i].1.push(value.into()),
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    /// Replace all values for `key` with a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.position(&key) {
            Some(i) => self.entries[i].1 = vec![value.into()],
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Append every value of `other` after the values already present.
    pub fn extend(&mut self, other: Values) {
        for (key, items) in other.entries {
            match self.position(&key) {
                Some(i) => self.entries[i].1.extend(items),
                None => self.entries.push((key, items)),
            }
        }
    }

    /// Urlencoded form of every pair, in key order.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = url::form_urlencoded::Serializer::new(String::new());
        for (key, items) in &self.entries {
            for item in items {
                out.append_pair(key, item);
            }
        }
        out.finish()
    }
}

impl fmt::Display for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Values {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Values::new();
        for (k, v) in iter {
            values.add(k, v);
        }
        values
    }
}

impl IntoIterator for Values {
    type Item = (String, Vec<String>);
    type IntoIter = std::vec::IntoIter<(String, Vec<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_set() {
        let mut values = Values::new();
        values.add("tag", "a");
        values.add("tag", "b");
        values.add("name", "Rex");
        assert_eq!(values.get("tag"), Some("a"));
        assert_eq!(values.get_all("tag"), ["a", "b"]);
        values.set("tag", "c");
        assert_eq!(values.get_all("tag"), ["c"]);
        assert_eq!(values.len(), 2);
        assert!(values.get_all("missing").is_empty());
    }

    #[test]
    fn test_extend_appends_in_order() {
        let mut first: Values = [("a", "1")].into_iter().collect();
        let second: Values = [("b", "2"), ("a", "3")].into_iter().collect();
        first.extend(second);
        assert_eq!(first.get_all("a"), ["1", "3"]);
        assert_eq!(first.encode(), "a=1&a=3&b=2");
    }

    #[test]
    fn test_encode_escapes() {
        let values: Values = [("q", "a b&c")].into_iter().collect();
        assert_eq!(values.to_string(), "q=a+b%26c");
    }
}
