//! Upload quota guard
//!
//! Sizes every upload from the length of its base64 body alone, so abusive
//! payloads are turned away before anything is decoded or written to disk.

use crate::types::FileUpload;
use thiserror::Error;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Split a data URI into its media-type prefix and base64 body.
///
/// Returns `None` when the separating comma is missing.
pub fn split_data_uri(data: &str) -> Option<(&str, &str)> {
    data.split_once(',')
}

/// Exact decoded length of a padded base64 body, computed without decoding.
pub fn decoded_len(body: &str) -> usize {
    let bytes = body.as_bytes();
    let padding = bytes.iter().rev().take(2).take_while(|b| **b == b'=').count();
    (bytes.len() * 3 / 4).saturating_sub(padding)
}

/// Quota violations, reported with the exact numbers involved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("Single file size limit exceeded ({name}). Maximum allowed: {:.2} MB", megabytes(.limit))]
    FileTooLarge { name: String, limit: usize },

    #[error("Total upload quota exceeded. Total: {:.2} MB / Allowed: {:.2} MB", megabytes(.total), megabytes(.limit))]
    TotalExceeded { total: usize, limit: usize },
}

fn megabytes(bytes: &usize) -> f64 {
    *bytes as f64 / BYTES_PER_MB
}

/// Per-file and running-total upload ceilings (0 disables a ceiling)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadQuota {
    pub single_file_limit: usize,
    pub total_limit: usize,
}

impl Default for UploadQuota {
    fn default() -> Self {
        Self {
            single_file_limit: 5 * 1024 * 1024, // 5 MB
            total_limit: 50 * 1024 * 1024,      // 50 MB
        }
    }
}

impl UploadQuota {
    /// Quota with both ceilings disabled
    pub fn unlimited() -> Self {
        Self {
            single_file_limit: 0,
            total_limit: 0,
        }
    }

    /// Check every upload in order, stopping at the first violation.
    ///
    /// Entries without a `prefix,body` separator are left out of the
    /// accounting; the workspace writer skips them later.
    pub fn check(&self, files: &[FileUpload]) -> Result<usize, QuotaError> {
        let mut total = 0usize;

        for file in files {
            let Some((_, body)) = split_data_uri(&file.data) else {
                tracing::debug!(file = %file.name, "Upload without data URI separator, not counted");
                continue;
            };
            let size = decoded_len(body);

            if self.single_file_limit > 0 && size > self.single_file_limit {
                return Err(QuotaError::FileTooLarge {
                    name: file.name.clone(),
                    limit: self.single_file_limit,
                });
            }

            total = total.saturating_add(size);
            if self.total_limit > 0 && total > self.total_limit {
                return Err(QuotaError::TotalExceeded {
                    total,
                    limit: self.total_limit,
                });
            }
        }

        Ok(total)
    }
}
