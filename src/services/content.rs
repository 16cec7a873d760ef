//! Size-aware persistence for large record fields.
//!
//! A large field is either kept inline in its record or spilled to the blob
//! store, never both. Deleting a blob is always best-effort.

use bytes::Bytes;
use serde::Serialize;

use crate::error::AppError;
use crate::store::{BlobRef, BlobStore};

/// Ceiling for the inline-serialized record, with spilled fields excluded.
pub const MAX_RECORD_BYTES: usize = 950 * 1024;
/// Fields larger than this go to the blob store.
pub const MAX_INLINE_FIELD_BYTES: usize = 400 * 1024;

/// Where a large field should live after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpillPlan<'a> {
    /// Nothing was sent; keep whatever blob is referenced.
    Keep { blob: Option<BlobRef> },
    /// Store inline. Any existing blob reference passes through untouched.
    Inline {
        value: &'a str,
        blob: Option<BlobRef>,
    },
    /// Write to a new blob, replacing `replaces` if set.
    Spill {
        value: &'a str,
        replaces: Option<BlobRef>,
    },
}

pub fn plan_large_field<'a>(value: Option<&'a str>, existing: Option<&BlobRef>) -> SpillPlan<'a> {
    match value {
        None | Some("") => SpillPlan::Keep {
            blob: existing.cloned(),
        },
        Some(value) if value.len() > MAX_INLINE_FIELD_BYTES => SpillPlan::Spill {
            value,
            replaces: existing.cloned(),
        },
        Some(value) => SpillPlan::Inline {
            value,
            blob: existing.cloned(),
        },
    }
}

/// Outcome of [`persist_large_field`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredField {
    pub inline: Option<String>,
    pub blob: Option<BlobRef>,
    /// Blob superseded by this write. Release it once the record referencing
    /// the new value has been written.
    pub stale: Option<BlobRef>,
    /// Whether a new blob was written by this call.
    pub spilled: bool,
}

pub async fn persist_large_field(
    blobs: &dyn BlobStore,
    value: Option<&str>,
    existing: Option<&BlobRef>,
    content_type: &str,
) -> Result<StoredField, AppError> {
    match plan_large_field(value, existing) {
        SpillPlan::Keep { blob } => Ok(StoredField {
            blob,
            ..StoredField::default()
        }),
        SpillPlan::Inline { value, blob } => Ok(StoredField {
            inline: Some(value.to_string()),
            blob,
            ..StoredField::default()
        }),
        SpillPlan::Spill { value, replaces } => {
            let blob = blobs
                .store(Bytes::copy_from_slice(value.as_bytes()), content_type)
                .await?;
            tracing::info!(
                blob = %blob,
                size_kib = value.len() / 1024,
                "large field spilled to blob storage"
            );
            let stale = replaces.filter(|old| *old != blob);
            Ok(StoredField {
                inline: None,
                blob: Some(blob),
                stale,
                spilled: true,
            })
        }
    }
}

/// Deletes a blob, logging instead of failing.
pub async fn release_blob(blobs: &dyn BlobStore, blob: &BlobRef) {
    match blobs.delete(blob).await {
        Ok(()) => tracing::debug!(blob = %blob, "blob released"),
        Err(e) => tracing::warn!(blob = %blob, error = %e, "failed to delete blob"),
    }
}

pub async fn release_blobs(blobs: &dyn BlobStore, refs: &[BlobRef]) {
    for blob in refs {
        release_blob(blobs, blob).await;
    }
}

/// Fails with [`AppError::PayloadTooLarge`] when `record` serializes to more
/// than [`MAX_RECORD_BYTES`]. Spilled fields are absent from the record and
/// do not count.
pub fn assert_within_limit<T: Serialize>(kind: &'static str, record: &T) -> Result<(), AppError> {
    let size = serde_json::to_vec(record)
        .map_err(|e| AppError::Internal(format!("failed to serialize record: {}", e)))?
        .len();
    if size > MAX_RECORD_BYTES {
        tracing::warn!(kind, size_kib = size / 1024, "record over size ceiling");
        return Err(AppError::PayloadTooLarge {
            kind,
            actual: size,
            limit: MAX_RECORD_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;
    use serde_json::json;

    #[test]
    fn test_plan_keeps_existing_when_value_absent() {
        let existing = BlobRef::new("old.html");
        assert_eq!(
            plan_large_field(None, Some(&existing)),
            SpillPlan::Keep {
                blob: Some(existing.clone())
            }
        );
        assert_eq!(
            plan_large_field(Some(""), Some(&existing)),
            SpillPlan::Keep {
                blob: Some(existing)
            }
        );
    }

    #[test]
    fn test_plan_threshold() {
        let small = "a".repeat(399 * 1024);
        let large = "a".repeat(401 * 1024);
        let exact = "a".repeat(MAX_INLINE_FIELD_BYTES);

        assert!(matches!(
            plan_large_field(Some(&small), None),
            SpillPlan::Inline { blob: None, .. }
        ));
        assert!(matches!(
            plan_large_field(Some(&exact), None),
            SpillPlan::Inline { .. }
        ));
        assert!(matches!(
            plan_large_field(Some(&large), None),
            SpillPlan::Spill { replaces: None, .. }
        ));
    }

    #[test]
    fn test_plan_measures_utf8_bytes() {
        // 'é' is two bytes: 205_000 chars is ~400.4 KiB
        let value = "é".repeat(205_000);
        assert!(matches!(
            plan_large_field(Some(&value), None),
            SpillPlan::Spill { .. }
        ));
    }

    #[test]
    fn test_plan_inline_passes_stale_reference_through() {
        let existing = BlobRef::new("old.html");
        assert_eq!(
            plan_large_field(Some("short"), Some(&existing)),
            SpillPlan::Inline {
                value: "short",
                blob: Some(existing)
            }
        );
    }

    #[tokio::test]
    async fn test_persist_spill_marks_previous_blob_stale() {
        let blobs = MemoryBlobStore::new();
        let old = blobs
            .store(Bytes::from_static(b"old"), "text/html")
            .await
            .unwrap();
        let large = "x".repeat(401 * 1024);

        let stored = persist_large_field(&blobs, Some(&large), Some(&old), "text/html")
            .await
            .unwrap();
        assert!(stored.spilled);
        assert!(stored.inline.is_none());
        assert_eq!(stored.stale, Some(old.clone()));
        let new = stored.blob.unwrap();
        assert_ne!(new, old);
        assert_eq!(blobs.get(&new).await.unwrap().0.len(), large.len());
        // Old blob is only released by the caller after the record write
        assert!(blobs.contains(&old).await);
    }

    #[tokio::test]
    async fn test_release_swallows_errors() {
        let blobs = MemoryBlobStore::new();
        let blob = blobs
            .store(Bytes::from_static(b"data"), "text/plain")
            .await
            .unwrap();
        blobs.fail_deletes(true);
        release_blob(&blobs, &blob).await;
        assert!(blobs.contains(&blob).await);

        blobs.fail_deletes(false);
        release_blobs(&blobs, &[blob.clone(), BlobRef::new("missing.bin")]).await;
        assert!(!blobs.contains(&blob).await);
    }

    #[test]
    fn test_assert_within_limit_reports_sizes() {
        let record = json!({ "title": "t", "excerpt": "x".repeat(MAX_RECORD_BYTES - 64) });
        assert!(assert_within_limit("Blog content", &record).is_ok());

        let record = json!({ "title": "t", "excerpt": "x".repeat(MAX_RECORD_BYTES) });
        let err = assert_within_limit("Blog content", &record).unwrap_err();
        match err {
            AppError::PayloadTooLarge { actual, limit, kind } => {
                assert_eq!(kind, "Blog content");
                assert_eq!(actual, serde_json::to_vec(&record).unwrap().len());
                assert_eq!(limit, MAX_RECORD_BYTES);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
