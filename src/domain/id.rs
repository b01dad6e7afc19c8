//! Project keys, task IDs and document IDs
//!
//! ID Format:
//! - Project keys: 2-5 uppercase alphanumerics (e.g., `AUTH`)
//! - Task IDs: `{key}-T{5-char-code}` (e.g., `AUTH-T7K2MX`)
//! - Document IDs: `{key}-D{5-char-code}` (e.g., `AUTH-D3PQ9R`)
//!
//! The code is derived from a blake3 hash of title + creation timestamp,
//! mapped onto an alphabet without look-alike characters (no 0/O, 1/I/L).
//! The graph engine itself treats task IDs as opaque strings, so snapshots
//! with hand-written IDs (`A`, `B`, ...) work as well.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";
const CODE_LEN: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid project key '{0}': must be 2-5 uppercase letters or digits")]
    InvalidProjectKey(String),

    #[error("Cannot derive a project key from '{0}': need at least 2 letters (use --key)")]
    KeyUnderivable(String),

    #[error("Invalid task ID format: expected '{{KEY}}-T{{5-char-code}}', got '{0}'")]
    InvalidTaskId(String),

    #[error("Invalid document ID format: expected '{{KEY}}-D{{5-char-code}}', got '{0}'")]
    InvalidDocumentId(String),
}

/// Generates the 5-character code from title, timestamp and a collision nonce
fn generate_code(title: &str, timestamp: DateTime<Utc>, nonce: u32) -> String {
    let input = format!(
        "{}{}{}",
        title,
        timestamp.timestamp_nanos_opt().unwrap_or(0),
        nonce
    );
    let hash = blake3::hash(input.as_bytes());
    hash.as_bytes()[..CODE_LEN]
        .iter()
        .map(|b| CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()] as char)
        .collect()
}

/// Returns true if `s` is `{key}-{marker}{code}` with a valid key and code
fn has_generated_shape(s: &str, marker: char) -> bool {
    let Some((key, suffix)) = s.rsplit_once('-') else {
        return false;
    };
    if key.parse::<ProjectKey>().is_err() {
        return false;
    }
    match suffix.strip_prefix(marker) {
        Some(code) => {
            code.len() == CODE_LEN && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
        }
        None => false,
    }
}

/// Short uppercase key identifying a project (e.g., `AUTH`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectKey(String);

impl ProjectKey {
    /// Derives a key from a project name: ASCII letters only, uppercased, first 4
    pub fn from_name(name: &str) -> Result<Self, IdError> {
        let key: String = name
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_uppercase())
            .take(4)
            .collect();

        if key.len() < 2 {
            return Err(IdError::KeyUnderivable(name.to_string()));
        }

        key.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for ProjectKey {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let valid_len = (2..=5).contains(&s.len());
        let valid_chars = s
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());

        if !valid_len || !valid_chars {
            return Err(IdError::InvalidProjectKey(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ProjectKey {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProjectKey> for String {
    fn from(key: ProjectKey) -> Self {
        key.0
    }
}

/// Task identifier
///
/// Any string is accepted when building from a snapshot; use
/// [`TaskId::parse`] to validate IDs typed by a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an arbitrary identifier without validation
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new task ID for a project
    ///
    /// Callers bump `nonce` when the result collides with an existing ID.
    pub fn generate(key: &ProjectKey, title: &str, timestamp: DateTime<Utc>, nonce: u32) -> Self {
        Self(format!("{}-T{}", key, generate_code(title, timestamp, nonce)))
    }

    /// Parses and validates a generated-style task ID
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let s = s.trim();
        if !has_generated_shape(s, 'T') {
            return Err(IdError::InvalidTaskId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the project key prefix, if this ID has the generated shape
    pub fn project_key(&self) -> Option<ProjectKey> {
        let (key, _) = self.0.rsplit_once('-')?;
        key.parse().ok()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Document identifier, always in the generated shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Generates a new document ID for a project
    pub fn generate(key: &ProjectKey, title: &str, timestamp: DateTime<Utc>, nonce: u32) -> Self {
        Self(format!("{}-D{}", key, generate_code(title, timestamp, nonce)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !has_generated_shape(s, 'D') {
            return Err(IdError::InvalidDocumentId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for DocumentId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}
