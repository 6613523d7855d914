//! Artifact store abstraction.

use std::fmt::Debug;

use crate::error::{JobCheckError, Result};

/// A keyed store of opaque artifact blobs.
///
/// Implementations must make [`put`](ArtifactStore::put) all-or-nothing: a
/// failed write never leaves a partial blob readable under `key`.
pub trait ArtifactStore: Send + Sync + Debug {
    /// Read the blob stored under `key`.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `bytes` under `key`, replacing any previous blob.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Store every entry or none of them.
    ///
    /// On error the store holds exactly the blobs it held before the call.
    fn put_all(&self, entries: &[(&str, &[u8])]) -> Result<()>;

    /// Check if a blob exists under `key`.
    fn contains(&self, key: &str) -> bool;

    /// All stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Reject keys that are empty, hidden, or could escape the store.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.starts_with('.')
        || key.contains(['/', '\\'])
        || key.contains("..")
    {
        return Err(JobCheckError::artifact(format!("invalid artifact key '{key}'")));
    }
    Ok(())
}

/// Validate every key of a batch and reject duplicates.
pub(crate) fn validate_batch(entries: &[(&str, &[u8])]) -> Result<()> {
    for (i, (key, _)) in entries.iter().enumerate() {
        validate_key(key)?;
        if entries[..i].iter().any(|(other, _)| other == key) {
            return Err(JobCheckError::artifact(format!(
                "artifact '{key}' appears twice in one batch"
            )));
        }
    }
    Ok(())
}

pub(crate) fn not_found(key: &str) -> JobCheckError {
    JobCheckError::artifact(format!("artifact '{key}' not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("best_model").is_ok());
        assert!(validate_key("training_report.json").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("nested/key").is_err());
    }

    #[test]
    fn test_validate_batch() {
        let blob: &[u8] = b"1";
        assert!(validate_batch(&[("a", blob), ("b", blob)]).is_ok());
        assert!(validate_batch(&[("a", blob), ("a", blob)]).is_err());
        assert!(validate_batch(&[("a", blob), ("../b", blob)]).is_err());
    }
}
