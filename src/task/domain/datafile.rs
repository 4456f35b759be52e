//! Uploaded result datafiles.

use super::DatafileId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw benchmark output uploaded by a worker, with its content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datafile {
    id: DatafileId,
    sha256: String,
    contents: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl Datafile {
    /// Creates a datafile and computes its SHA-256 digest.
    #[must_use]
    pub fn new(contents: Vec<u8>, clock: &impl Clock) -> Self {
        Self {
            id: DatafileId::new(),
            sha256: sha256_hex(&contents),
            contents,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a datafile from persisted storage without re-hashing.
    #[must_use]
    pub const fn from_persisted(
        id: DatafileId,
        sha256: String,
        contents: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sha256,
            contents,
            created_at,
        }
    }

    /// Returns the datafile identifier.
    #[must_use]
    pub const fn id(&self) -> DatafileId {
        self.id
    }

    /// Returns the recorded lowercase hexadecimal SHA-256 digest.
    #[must_use]
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Returns the raw contents.
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Returns the upload timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether the contents still match the recorded digest.
    #[must_use]
    pub fn verify(&self) -> bool {
        sha256_hex(&self.contents) == self.sha256
    }
}

fn sha256_hex(contents: &[u8]) -> String {
    let digest = Sha256::digest(contents);
    format!("{digest:x}")
}
