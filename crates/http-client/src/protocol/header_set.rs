//! Caller supplied request headers.
//!
//! Keys are case-sensitive and the last write wins. Iteration is ordered by
//! name so the same set always frames to the same bytes.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    inner: BTreeMap<String, String>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing any previous value for the exact same name.
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.inner.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Returns true if a header with this name exists, ignoring ASCII case.
    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.inner.keys().any(|key| key.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = HeaderSet::new();
        headers.extend(iter);
        headers
    }
}

impl<N: Into<String>, V: Into<String>> Extend<(N, V)> for HeaderSet {
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}
