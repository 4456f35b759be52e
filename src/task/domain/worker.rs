//! Validated worker name type.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for a worker name, matching the `VARCHAR(100)` column.
const MAX_NAME_LENGTH: usize = 100;

/// Validated worker identifier.
///
/// Worker names start with a lowercase ASCII letter and continue with
/// lowercase letters, digits, or hyphens (e.g. `gopher-raspberry-pi`).
/// Unlike most names in this crate the input is not lowercased: `gopherPi`
/// is rejected rather than normalised, so a worker always polls under the
/// exact name it registered with.
///
/// # Examples
///
///     use benchplane::task::domain::WorkerName;
///
///     assert!(WorkerName::new("abc-def-9").is_ok());
///     assert!(WorkerName::new("123abc").is_err());
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkerName(String);

impl WorkerName {
    /// Creates a validated worker name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyWorkerName`] when the value is empty,
    /// [`TaskDomainError::WorkerNameTooLong`] when it exceeds 100 characters,
    /// or [`TaskDomainError::InvalidWorkerName`] when it does not match
    /// `[a-z][a-z0-9-]*`.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();

        if raw.is_empty() {
            return Err(TaskDomainError::EmptyWorkerName);
        }

        if raw.len() > MAX_NAME_LENGTH {
            return Err(TaskDomainError::WorkerNameTooLong(raw));
        }

        if !Self::is_valid_name(&raw) {
            return Err(TaskDomainError::InvalidWorkerName(raw));
        }

        Ok(Self(raw))
    }

    fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
        starts_with_letter
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    /// Returns the worker name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkerName {
    type Error = TaskDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkerName> for String {
    fn from(value: WorkerName) -> Self {
        value.0
    }
}

impl AsRef<str> for WorkerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for WorkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
