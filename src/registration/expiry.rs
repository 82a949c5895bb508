//! Registration expiry.
//!
//! The expiry is part of the signed payload, hence of the validation id. It
//! is created once and persisted before anything touches the network; every
//! retry reuses it.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::storage::{Artifact, ArtifactStore, StorageError};

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn parse(text: &str) -> Result<u64, StorageError> {
    text.parse().map_err(|e| StorageError::Corrupt {
        artifact: Artifact::Expiry,
        reason: format!("{text:?}: {e}"),
    })
}

/// Returns the persisted expiry, or persists and returns `now + duration`.
pub fn load_or_create_expiry<S: ArtifactStore + ?Sized>(
    store: &S,
    now: u64,
    duration: Duration,
) -> Result<u64, StorageError> {
    if let Some(text) = store.get_text(Artifact::Expiry)? {
        let expiry = parse(&text)?;
        if expiry <= now {
            log::warn!("Persisted expiry {} is already in the past", expiry);
        }
        log::info!("Reusing expiry {}", expiry);
        return Ok(expiry);
    }

    let expiry = now.saturating_add(duration.as_secs());
    if store.put_text_if_absent(Artifact::Expiry, &expiry.to_string())? {
        log::info!("Created expiry {}", expiry);
        return Ok(expiry);
    }

    // Lost a race with another writer: the stored value is authoritative.
    let text = store
        .get_text(Artifact::Expiry)?
        .ok_or(StorageError::Conflict { artifact: Artifact::Expiry })?;
    parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryArtifactStore;

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn test_first_run_writes_now_plus_duration() {
        let store = MemoryArtifactStore::new();
        assert_eq!(load_or_create_expiry(&store, 1_000, DAY).unwrap(), 87_400);
        assert_eq!(
            store.get_text(Artifact::Expiry).unwrap().as_deref(),
            Some("87400")
        );
    }

    #[test]
    fn test_second_run_reuses_value() {
        let store = MemoryArtifactStore::new();
        let first = load_or_create_expiry(&store, 1_000, DAY).unwrap();
        let second = load_or_create_expiry(&store, 50_000, DAY).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_expiry() {
        let store = MemoryArtifactStore::new().with(Artifact::Expiry, "tomorrow");
        assert!(matches!(
            load_or_create_expiry(&store, 0, DAY),
            Err(StorageError::Corrupt { artifact: Artifact::Expiry, .. })
        ));
    }
}
