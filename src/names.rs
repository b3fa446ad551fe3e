//! # Candidate Names
//!
//! Sanitization of raw model output into [`CandidateName`]s, and loading and
//! saving of name-list files (a JSON array of strings).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::{DatasetError, DatasetResult};
use crate::store::write_json_atomic;

/// A lower-case, single-word subject name with no separator characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CandidateName(String);

impl CandidateName {
    /// Sanitize one line of model output. Returns `None` when nothing usable
    /// is left: blank lines, bare numbers, and multi-word phrases.
    pub fn sanitize(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let cleaned: String = line
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
            .collect();

        let mut words = cleaned.split_whitespace();
        let word = words.next()?;
        if words.next().is_some() {
            return None;
        }

        Self::try_from(word.to_lowercase()).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CandidateName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err("candidate name is empty".to_string());
        }
        if value.chars().any(|c| c == '-' || c == '_' || c.is_whitespace()) {
            return Err(format!("candidate name '{value}' contains a separator"));
        }
        if value.chars().any(char::is_uppercase) {
            return Err(format!("candidate name '{value}' is not lower-case"));
        }
        Ok(Self(value))
    }
}

impl From<CandidateName> for String {
    fn from(name: CandidateName) -> Self {
        name.0
    }
}

impl AsRef<str> for CandidateName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitize every line of a model response, keeping order and duplicates
pub fn parse_candidate_names(text: &str) -> Vec<CandidateName> {
    text.lines().filter_map(CandidateName::sanitize).collect()
}

/// Drop repeated names, keeping the first occurrence of each
pub fn dedup_preserving_order<T>(items: Vec<T>) -> Vec<T>
where
    T: AsRef<str>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.as_ref().to_string()))
        .collect()
}

/// Load a name-list file. Anything other than a JSON array of non-empty
/// strings is malformed input. A leading UTF-8 byte-order mark is ignored.
pub fn load_name_list(path: &Path) -> DatasetResult<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| DatasetError::read(path, e))?;
    let text = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

    let names: Vec<String> = serde_json::from_str(text).map_err(|e| {
        DatasetError::malformed(path, format!("expected a JSON array of strings: {e}"))
    })?;

    if let Some(position) = names.iter().position(|n| n.trim().is_empty()) {
        return Err(DatasetError::malformed(
            path,
            format!("entry {position} is an empty name"),
        ));
    }

    Ok(names)
}

/// Write a name list as a pretty-printed JSON array
pub fn save_name_list<T>(path: &Path, names: &[T]) -> DatasetResult<()>
where
    T: AsRef<str>,
{
    let names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    write_json_atomic(path, &names)
}
