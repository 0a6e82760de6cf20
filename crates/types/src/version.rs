//! Loose version ordering
//!
//! Easyconfig versions are free-form (`1.2.11`, `2018b`, `4.9.3-2.25`,
//! `1.0rc1`). They are split into numeric and alphabetic components and
//! compared component by component:
//! - numbers compare numerically (`1.10 > 1.9`)
//! - words compare lexically
//! - a number against a word compares their textual forms
//! - when one version is a prefix of the other, the shorter one is smaller

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use hpcstack_errors::VersionError;

/// One component of a loose version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionPart {
    Number(u64),
    Word(String),
}

impl VersionPart {
    fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Word(w) => w.clone(),
        }
    }
}

impl Ord for VersionPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::Word(a), Self::Word(b)) => a.cmp(b),
            _ => self.as_text().cmp(&other.as_text()),
        }
    }
}

impl PartialOrd for VersionPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A version string with loose, component-wise ordering
#[derive(Debug, Clone)]
pub struct LooseVersion {
    raw: String,
    parts: Vec<VersionPart>,
}

impl LooseVersion {
    /// Parse a version string; any non-empty string is accepted
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or only whitespace.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(VersionError::InvalidVersion {
                input: input.to_string(),
            });
        }
        Ok(Self::from_trimmed(raw))
    }

    fn from_trimmed(raw: &str) -> Self {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut numeric = false;

        for ch in raw.chars() {
            let is_digit = ch.is_ascii_digit();
            let is_word = ch.is_alphabetic();
            if !is_digit && !is_word {
                flush(&mut parts, &mut current, numeric);
                continue;
            }
            if !current.is_empty() && is_digit != numeric {
                flush(&mut parts, &mut current, numeric);
            }
            numeric = is_digit;
            current.push(ch);
        }
        flush(&mut parts, &mut current, numeric);

        Self {
            raw: raw.to_string(),
            parts,
        }
    }

    /// The version exactly as written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed components
    #[must_use]
    pub fn parts(&self) -> &[VersionPart] {
        &self.parts
    }

    /// First component, used to group versions by major release
    #[must_use]
    pub fn major(&self) -> Option<&VersionPart> {
        self.parts.first()
    }
}

fn flush(parts: &mut Vec<VersionPart>, current: &mut String, numeric: bool) {
    if current.is_empty() {
        return;
    }
    let token = std::mem::take(current);
    // Numbers too large for u64 fall back to textual comparison.
    match (numeric, token.parse::<u64>()) {
        (true, Ok(n)) => parts.push(VersionPart::Number(n)),
        _ => parts.push(VersionPart::Word(token)),
    }
}

impl PartialEq for LooseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LooseVersion {}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LooseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for LooseVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for LooseVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for LooseVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
