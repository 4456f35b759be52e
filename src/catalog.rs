//! JSON seed file for the module and commit catalog.
//!
//! ```json
//! {
//!   "modules": [
//!     {"id": "7d3c2f8e-4a51-4c2a-9d0e-5f1b2a3c4d5e",
//!      "path": "golang.org/x/benchmarks", "version": "v0.0.0-20260101"}
//!   ],
//!   "commits": [
//!     {"sha": "0123456789abcdef0123456789abcdef01234567",
//!      "committed_at": "2026-09-30T12:00:00Z"}
//!   ]
//! }
//! ```

use crate::task::domain::{BenchModule, Commit, TargetId, TaskDomainError};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The file could not be read.
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid catalog JSON.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    /// A record failed domain validation.
    #[error("invalid catalog entry: {0}")]
    Invalid(#[from] TaskDomainError),
}

#[derive(Debug, Deserialize)]
struct RawModule {
    id: Uuid,
    path: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    modules: Vec<RawModule>,
    #[serde(default)]
    commits: Vec<Commit>,
}

/// Validated catalog contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Benchmark targets.
    pub modules: Vec<BenchModule>,
    /// Commits under test.
    pub commits: Vec<Commit>,
}

impl Catalog {
    /// Parses catalog JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed JSON or commit hashes and
    /// [`CatalogError::Invalid`] for modules with an empty path.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        let modules = raw
            .modules
            .into_iter()
            .map(|module| {
                BenchModule::new(TargetId::from_uuid(module.id), module.path, module.version)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            modules,
            commits: raw.commits,
        })
    }

    /// Reads and parses the catalog at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] when the file cannot be read, otherwise
    /// the errors of [`Catalog::from_json`].
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
