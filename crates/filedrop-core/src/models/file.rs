use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

use super::job::{FileDigest, StatusTransition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    /// `completed` and `failed` are final; nothing moves a record out of them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessingStatus::Processing)
    }
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProcessingStatus::Processing => write!(f, "processing"),
            ProcessingStatus::Completed => write!(f, "completed"),
            ProcessingStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Durable record describing one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FileMetadata {
    pub id: Uuid,
    /// Original client-supplied filename. Untrusted; never used to build paths.
    pub filename: String,
    pub storage_key: String,
    /// Lowercase hex SHA-256 of the content, set once processing completes
    pub sha256: Option<String>,
    pub size_bytes: Option<i64>,
    pub extension: Option<String>,
    pub status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileMetadata {
    /// A fresh record in the `processing` state.
    pub fn new_processing(id: Uuid, filename: String, storage_key: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            filename,
            storage_key,
            sha256: None,
            size_bytes: None,
            extension: None,
            status: ProcessingStatus::Processing,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a transition to a record that is still `processing`.
    ///
    /// Callers check `status.is_terminal()` first; this only writes the fields.
    pub fn apply(&mut self, transition: &StatusTransition) {
        match transition {
            StatusTransition::Completed(FileDigest {
                sha256,
                size_bytes,
                extension,
            }) => {
                self.sha256 = Some(sha256.clone());
                self.size_bytes = Some(i64::try_from(*size_bytes).unwrap_or(i64::MAX));
                self.extension = Some(extension.clone());
                self.failure_reason = None;
            }
            StatusTransition::Failed { reason } => {
                self.failure_reason = Some(reason.clone());
            }
        }
        self.status = transition.target_status();
        self.updated_at = Utc::now();
    }
}
