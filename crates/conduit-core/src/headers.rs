//! Immutable, case-insensitive, multi-valued header maps

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Conversion into the ordered value list stored for one header name
///
/// A single string becomes a one-element list; lists keep their order.
pub trait IntoHeaderValues {
    fn into_header_values(self) -> Vec<String>;
}

impl IntoHeaderValues for String {
    fn into_header_values(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoHeaderValues for &str {
    fn into_header_values(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl IntoHeaderValues for &String {
    fn into_header_values(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoHeaderValues for Vec<String> {
    fn into_header_values(self) -> Vec<String> {
        self
    }
}

impl IntoHeaderValues for Vec<&str> {
    fn into_header_values(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }
}

impl IntoHeaderValues for &[&str] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(|v| (*v).to_owned()).collect()
    }
}

impl<const N: usize> IntoHeaderValues for [&str; N] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(|v| (*v).to_owned()).collect()
    }
}

#[derive(Debug)]
struct Entry {
    name: String,
    values: Vec<String>,
}

struct HeadersInner {
    entries: Vec<Entry>,
    // lowercase name -> position in `entries`
    index: HashMap<String, usize>,
    single: OnceLock<Vec<String>>,
}

/// An immutable header map
///
/// Names compare case-insensitively while the case they were stored with is
/// kept for iteration. Every name maps to a non-empty, ordered list of values.
/// Cloning is cheap; clones share storage.
#[derive(Clone)]
pub struct Headers {
    inner: Arc<HeadersInner>,
}

impl Headers {
    /// The shared empty instance
    pub fn empty() -> Headers {
        static EMPTY: OnceLock<Headers> = OnceLock::new();
        EMPTY.get_or_init(|| Headers::build(Vec::new())).clone()
    }

    /// Build from name/value pairs, dropping names whose value list is empty
    ///
    /// A later pair whose name matches an earlier one case-insensitively
    /// replaces it in place, taking the later spelling of the name.
    pub fn from_pairs<I, K, V>(pairs: I) -> Headers
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoHeaderValues,
    {
        let mut entries: Vec<Entry> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (name, values) in pairs {
            let name = name.into();
            let values = values.into_header_values();
            let key = name.to_ascii_lowercase();
            match index.get(&key) {
                Some(&pos) => entries[pos] = Entry { name, values },
                None => {
                    index.insert(key, entries.len());
                    entries.push(Entry { name, values });
                }
            }
        }
        entries.retain(|e| !e.values.is_empty());
        if entries.is_empty() {
            return Headers::empty();
        }
        Headers::build(entries)
    }

    fn build(entries: Vec<Entry>) -> Headers {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.to_ascii_lowercase(), i))
            .collect();
        Headers {
            inner: Arc::new(HeadersInner {
                entries,
                index,
                single: OnceLock::new(),
            }),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.inner.index.get(&name.to_ascii_lowercase()).copied()
    }

    /// Single value for `name`: all values joined with `,`
    pub fn get(&self, name: &str) -> Option<&str> {
        let pos = self.position(name)?;
        Some(self.joined()[pos].as_str())
    }

    /// Every value stored for `name`, in order
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.position(name)
            .map(|pos| self.inner.entries[pos].values.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Iterate `(name, values)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.values.as_slice()))
    }

    /// The single-value projection, computed on first use
    pub fn single_values(&self) -> SingleValues<'_> {
        SingleValues { headers: self }
    }

    fn joined(&self) -> &[String] {
        self.inner.single.get_or_init(|| {
            self.inner
                .entries
                .iter()
                .map(|e| e.values.join(","))
                .collect()
        })
    }

    /// Whether two handles share storage
    pub fn ptr_eq(&self, other: &Headers) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A copy with `updates` applied
    ///
    /// `None` removes the name, `Some` replaces its values; names not
    /// mentioned are kept. With no updates the receiver is returned as is.
    pub(crate) fn updated(&self, updates: Vec<(String, Option<Vec<String>>)>) -> Headers {
        if updates.is_empty() {
            return self.clone();
        }
        let mut pairs: Vec<(String, Vec<String>)> = self
            .iter()
            .map(|(name, values)| (name.to_owned(), values.to_vec()))
            .collect();
        for (name, value) in updates {
            let existing = pairs.iter().position(|(n, _)| n.eq_ignore_ascii_case(&name));
            match (existing, value) {
                (Some(pos), None) => {
                    pairs.remove(pos);
                }
                (Some(pos), Some(values)) => pairs[pos] = (name, values),
                (None, Some(values)) => pairs.push((name, values)),
                (None, None) => {}
            }
        }
        Headers::from_pairs(pairs)
    }

    /// A copy with `name` set to `values`, replacing any existing entry
    pub(crate) fn with(&self, name: &str, values: Vec<String>) -> Headers {
        self.updated(vec![(name.to_owned(), Some(values))])
    }
}

impl Default for Headers {
    fn default() -> Self {
        Headers::empty()
    }
}

impl<K: Into<String>, V: IntoHeaderValues> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Headers::from_pairs(iter)
    }
}

impl<K: Into<String>, V: IntoHeaderValues> From<HashMap<K, V>> for Headers {
    fn from(map: HashMap<K, V>) -> Self {
        Headers::from_pairs(map)
    }
}

impl<K: Into<String>, V: IntoHeaderValues> From<Vec<(K, V)>> for Headers {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Headers::from_pairs(pairs)
    }
}

impl<K: Into<String>, V: IntoHeaderValues> From<Option<Vec<(K, V)>>> for Headers {
    fn from(pairs: Option<Vec<(K, V)>>) -> Self {
        pairs.map_or_else(Headers::empty, Headers::from_pairs)
    }
}

impl PartialEq for Headers {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, values)| other.get_all(name) == Some(values))
    }
}

impl Eq for Headers {}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Case-insensitive view of each header as one comma-joined string
#[derive(Clone, Copy)]
pub struct SingleValues<'a> {
    headers: &'a Headers,
}

impl<'a> SingleValues<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        let headers = self.headers;
        headers
            .inner
            .entries
            .iter()
            .zip(headers.joined())
            .map(|(e, joined)| (e.name.as_str(), joined.as_str()))
    }
}

impl fmt::Debug for SingleValues<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
