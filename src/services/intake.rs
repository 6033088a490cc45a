//! Intake of uploaded files into the pipeline.
//!
//! A batch is rejected whole when it exceeds the configured item count or
//! total decoded size. Otherwise each item is handled on its own: repeated
//! names within the batch keep the first occurrence, undecodable content is
//! skipped, and content already held by an active file is reported as a
//! duplicate instead of being stored again. Surviving items are written to
//! the content store and persisted at (Captured, DocReady), each in its own
//! transaction.

use std::collections::HashSet;

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::db;
use crate::errors::{ActionResult, AppError};
use crate::models::file::{FileMetadata, NewFile};
use crate::services::audit::{self, AuditEntry};
use crate::services::storage::ContentStore;

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IntakeRequest {
    #[validate(length(min = 1, message = "at least one file is required"))]
    pub files: Vec<IntakeItem>,
    #[validate(length(min = 1, message = "source is required"))]
    pub source: String,
    #[validate(length(min = 1, message = "actor is required"))]
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeItem {
    pub file_name: String,
    /// Base64-encoded file content.
    pub content: String,
}

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntakeStatus {
    Captured,
    Duplicate,
    DuplicateInBatch,
    Undecodable,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeOutcome {
    pub file_name: String,
    pub file_uid: Option<Uuid>,
    pub status: IntakeStatus,
}

/// Decoded size of a base64 payload without decoding it.
pub fn estimated_decoded_len(encoded: &str) -> u64 {
    let trimmed = encoded.trim();
    let padding = trimmed.bytes().rev().take_while(|b| *b == b'=').count() as u64;
    let len = trimmed.len() as u64;
    (len / 4 * 3 + (len % 4) * 3 / 4).saturating_sub(padding)
}

/// Message for a batch whose decoded size is over `max_bytes`.
pub fn size_limit_message(max_bytes: u64) -> String {
    format!("Total upload size exceeds {}", format_size(max_bytes))
}

fn format_size(bytes: u64) -> String {
    if bytes >= GIB && bytes % GIB == 0 {
        format!("{} GB", bytes / GIB)
    } else if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Batch-level limits. Breaking either rejects the whole batch.
pub fn check_batch_limits(
    count: usize,
    total_bytes: u64,
    limits: &UploadLimits,
) -> Result<(), AppError> {
    if count > limits.max_files {
        return Err(AppError::Validation(format!(
            "Maximum {} files allowed",
            limits.max_files
        )));
    }
    if total_bytes > limits.max_bytes {
        return Err(AppError::Validation(size_limit_message(limits.max_bytes)));
    }
    Ok(())
}

/// Split a batch into first occurrences and repeated names (case-insensitive).
pub fn dedupe_names(items: &[IntakeItem]) -> (Vec<&IntakeItem>, Vec<&IntakeItem>) {
    let mut seen = HashSet::new();
    items
        .iter()
        .partition(|item| seen.insert(item.file_name.trim().to_lowercase()))
}

/// Lower-cased extension with its leading dot.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.trim().rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn decode(content: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = content
        .trim()
        .split_once(";base64,")
        .map_or(content.trim(), |(_, data)| data);
    general_purpose::STANDARD.decode(payload)
}

/// Capture a batch of uploaded files.
pub async fn ingest(
    pool: &PgPool,
    store: &ContentStore,
    limits: &UploadLimits,
    req: &IntakeRequest,
) -> Result<ActionResult<Vec<IntakeOutcome>>, AppError> {
    let total: u64 = req
        .files
        .iter()
        .map(|f| estimated_decoded_len(&f.content))
        .sum();
    check_batch_limits(req.files.len(), total, limits)?;

    let (unique, repeated) = dedupe_names(&req.files);
    let mut outcomes: Vec<IntakeOutcome> = repeated
        .into_iter()
        .map(|item| {
            tracing::info!(file_name = %item.file_name, "Dropping repeated file name in batch");
            IntakeOutcome {
                file_name: item.file_name.clone(),
                file_uid: None,
                status: IntakeStatus::DuplicateInBatch,
            }
        })
        .collect();

    let mut persisted = 0;
    for item in unique {
        let outcome = match capture_one(pool, store, item, &req.source, &req.actor).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(file_name = %item.file_name, error = %e, "File intake failed");
                IntakeOutcome {
                    file_name: item.file_name.clone(),
                    file_uid: None,
                    status: IntakeStatus::Failed,
                }
            }
        };
        if outcome.status == IntakeStatus::Captured {
            persisted += 1;
        }
        outcomes.push(outcome);
    }

    tracing::info!(
        received = req.files.len(),
        persisted,
        source = %req.source,
        "Intake batch complete"
    );
    Ok(ActionResult::ok(
        format!("{persisted} files uploaded"),
        persisted,
        Some(outcomes),
    ))
}

async fn capture_one(
    pool: &PgPool,
    store: &ContentStore,
    item: &IntakeItem,
    source: &str,
    actor: &str,
) -> Result<IntakeOutcome, AppError> {
    let file_name = item.file_name.trim().to_string();
    let bytes = match decode(&item.content) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(file_name = %file_name, error = %e, "Skipping undecodable upload");
            return Ok(IntakeOutcome {
                file_name,
                file_uid: None,
                status: IntakeStatus::Undecodable,
            });
        }
    };
    let digest = checksum(&bytes);

    let mut tx = pool.begin().await?;
    if let Some(existing) = db::files::find_by_checksum(&mut *tx, &digest).await? {
        tracing::info!(
            file_name = %file_name,
            existing = %existing.file_uid,
            "Duplicate"
        );
        return Ok(IntakeOutcome {
            file_name,
            file_uid: Some(existing.file_uid),
            status: IntakeStatus::Duplicate,
        });
    }

    let at = Utc::now();
    let file_uid = Uuid::now_v7();
    let extension = file_extension(&file_name);
    let path = store
        .write(file_uid, extension.as_deref(), at.date_naive(), &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store {file_name}: {e}")))?;

    let metadata = FileMetadata {
        file_name: Some(file_name.clone()),
        ..FileMetadata::default()
    };
    let new = NewFile {
        file_uid,
        file_name: file_name.clone(),
        file_extension: extension,
        harvest_source: source.to_string(),
        metadata: serde_json::to_string(&metadata)
            .map_err(|e| AppError::Internal(e.to_string()))?,
        checksum: digest,
        file_path: path.to_string_lossy().into_owned(),
        created_by: actor.to_string(),
        created_at: at,
    };

    let persisted = async {
        let file = db::files::insert(&mut *tx, &new).await?;
        let entry = AuditEntry::for_file(&file, format!("File captured via {source}"), actor, at);
        audit::record(&mut *tx, &entry).await?;
        tx.commit().await?;
        Ok::<_, AppError>(())
    }
    .await;

    if let Err(e) = persisted {
        if let Err(cleanup) = store.remove(&path).await {
            tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove orphaned upload");
        }
        return Err(e);
    }

    tracing::debug!(file_uid = %file_uid, file_name = %file_name, "File captured");
    Ok(IntakeOutcome {
        file_name,
        file_uid: Some(file_uid),
        status: IntakeStatus::Captured,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: UploadLimits = UploadLimits {
        max_files: 50,
        max_bytes: GIB,
    };

    fn item(name: &str, content: &str) -> IntakeItem {
        IntakeItem {
            file_name: name.to_string(),
            content: content.to_string(),
        }
    }

    // -- Request validation --

    #[test]
    fn empty_batch_fails_validation() {
        let req = IntakeRequest {
            files: vec![],
            source: "portal".to_string(),
            actor: "ops".to_string(),
        };
        let err = AppError::from(req.validate().unwrap_err());
        assert_eq!(err.result_code(), "400");
        assert!(err.to_string().contains("at least one file is required"));
    }

    #[test]
    fn populated_batch_passes_validation() {
        let req = IntakeRequest {
            files: vec![item("statement.pdf", "JVBERi0=")],
            source: "portal".to_string(),
            actor: "ops".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    // -- Batch limits --

    #[test]
    fn fifty_one_items_rejected() {
        let err = check_batch_limits(51, 10, &LIMITS).unwrap_err();
        assert_eq!(err.result_code(), "400");
        assert_eq!(err.to_string(), "Validation error: Maximum 50 files allowed");
    }

    #[test]
    fn fifty_items_accepted() {
        assert!(check_batch_limits(50, 10, &LIMITS).is_ok());
    }

    #[test]
    fn oversized_batch_rejected() {
        let total = GIB + GIB / 5;
        let err = check_batch_limits(3, total, &LIMITS).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Total upload size exceeds 1 GB");
    }

    #[test]
    fn size_limit_message_names_the_limit() {
        assert_eq!(size_limit_message(MIB), "Total upload size exceeds 1 MB");
        assert_eq!(size_limit_message(GIB), "Total upload size exceeds 1 GB");
    }

    #[test]
    fn exactly_at_size_limit_is_fine() {
        assert!(check_batch_limits(1, GIB, &LIMITS).is_ok());
    }

    // -- Sizes --

    #[test]
    fn decoded_length_estimate() {
        assert_eq!(estimated_decoded_len("aGVsbG8="), 5);
        assert_eq!(estimated_decoded_len("aGVsbG8h"), 6);
        assert_eq!(estimated_decoded_len("aGk="), 2);
        assert_eq!(estimated_decoded_len(""), 0);
    }

    #[test]
    fn size_labels() {
        assert_eq!(format_size(GIB), "1 GB");
        assert_eq!(format_size(200 * MIB), "200 MB");
        assert_eq!(format_size(1500), "1500 bytes");
    }

    // -- Items --

    #[test]
    fn repeated_names_keep_first() {
        let items = vec![
            item("a.pdf", "AA=="),
            item("b.pdf", "Ag=="),
            item("A.PDF", "Aw=="),
        ];
        let (unique, repeated) = dedupe_names(&items);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].content, "AA==");
        assert_eq!(repeated.len(), 1);
        assert_eq!(repeated[0].file_name, "A.PDF");
    }

    #[test]
    fn extensions() {
        assert_eq!(file_extension("Report.PDF").as_deref(), Some(".pdf"));
        assert_eq!(file_extension("archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension(".env"), None);
    }

    #[test]
    fn decode_accepts_data_urls() {
        assert_eq!(decode("data:application/pdf;base64,aGk=").unwrap(), b"hi");
        assert_eq!(decode(" aGk= ").unwrap(), b"hi");
        assert!(decode("%%%").is_err());
    }

    #[test]
    fn checksum_is_sha256_hex() {
        assert_eq!(
            checksum(b"hi"),
            "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4"
        );
    }
}
