//! Response capture bag.
//!
//! Values captured from one response (named regex groups) are substituted
//! into later requests wherever `:name` appears. Substitution is a single
//! left-to-right scan: at each `:` the longest key that matches wins, and
//! inserted values are never scanned again.

use std::collections::BTreeMap;

use regex::{Captures, Regex};

/// How a substituted value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Inserted verbatim (paths, request bodies).
    Literal,
    /// Escaped so it matches itself inside a regular expression.
    Regex,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bag {
    values: BTreeMap<String, String>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value. Returns the previous one; last write wins.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Store every named group of `pattern` that took part in the match.
    ///
    /// Returns how many values were stored.
    pub fn capture(&mut self, captures: &Captures<'_>, pattern: &Regex) -> usize {
        let mut stored = 0;
        for name in pattern.capture_names().flatten() {
            if let Some(m) = captures.name(name) {
                self.values.insert(name.to_string(), m.as_str().to_string());
                stored += 1;
            }
        }
        stored
    }

    /// Replace every `:key` occurrence with its value.
    pub fn substitute(&self, text: &str, mode: Mode) -> String {
        if self.values.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find(':') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            match self.longest_key_at(after) {
                Some((key, value)) => {
                    match mode {
                        Mode::Literal => out.push_str(value),
                        Mode::Regex => out.push_str(&regex::escape(value)),
                    }
                    rest = &after[key.len()..];
                }
                None => {
                    out.push(':');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }

    /// Placeholder tokens in `text` that no bag entry would replace.
    ///
    /// A token is `:` followed by an identifier. Tokens followed by another
    /// `:` (POSIX classes like `[:digit:]`), preceded by `?` (regex groups
    /// like `(?:...)`) or glued to a preceding word (`ratio a:b`) are not
    /// placeholders.
    pub fn unresolved(&self, text: &str) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        let mut cursor = 0;

        while let Some(offset) = text[cursor..].find(':') {
            let colon = cursor + offset;
            let start = colon + 1;
            let end = start + identifier_len(&text[start..]);
            cursor = end;

            let before = text[..colon].chars().next_back();
            if end == start
                || text[end..].starts_with(':')
                || before.is_some_and(|c| c == '?' || c == '_' || c.is_alphanumeric())
            {
                continue;
            }

            let ident = &text[start..end];
            if self.longest_key_at(ident).is_none() && !missing.iter().any(|m| m == ident) {
                missing.push(ident.to_string());
            }
        }

        missing
    }

    fn longest_key_at<'a>(&'a self, text: &str) -> Option<(&'a str, &'a str)> {
        self.values
            .iter()
            .filter(|(key, _)| !key.is_empty() && text.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Byte length of the `[A-Za-z_][A-Za-z0-9_]*` prefix of `text`.
fn identifier_len(text: &str) -> usize {
    text.bytes()
        .enumerate()
        .take_while(|&(i, b)| b == b'_' || b.is_ascii_alphabetic() || (i > 0 && b.is_ascii_digit()))
        .count()
}

impl<K, V> FromIterator<(K, V)> for Bag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
