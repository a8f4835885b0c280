//! Batch writer: one write call per generate run, then a refresh.

use std::collections::BTreeSet;

use tracing::{error, info};

use crate::backend::Backend;
use crate::error::GenerateError;
use crate::model::{AssignedMap, Assignment};

/// Shown when the backend rejects a write without a message of its own.
pub const GENERIC_WRITE_FAILURE: &str = "Failed to save generated lecturer assignments";

/// Result of a successful [`BatchWriter::submit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Distinct pairs sent to the backend.
    pub written: usize,
    /// Assigned map re-fetched after the write.
    pub assigned: AssignedMap,
}

pub struct BatchWriter<'a, B: Backend> {
    backend: &'a B,
}

impl<'a, B: Backend> BatchWriter<'a, B> {
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Submit all pairs in a single call, then re-fetch `refresh_ids`.
    ///
    /// Duplicate pairs are collapsed. An empty batch skips the write but still
    /// refreshes.
    ///
    /// # Errors
    ///
    /// [`GenerateError::WriteFailed`] carrying the backend's validation message
    /// (or [`GENERIC_WRITE_FAILURE`]) when the write is rejected;
    /// [`GenerateError::Backend`] when the refresh fails.
    pub fn submit(
        &self,
        pairs: &[Assignment],
        refresh_ids: &[u64],
    ) -> Result<WriteOutcome, GenerateError> {
        let unique: Vec<Assignment> = pairs
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if unique.is_empty() {
            info!("no assignments to write");
        } else {
            self.backend.assign_batch(&unique).map_err(|err| {
                error!("assign-dosen-batch failed: {err}");
                GenerateError::WriteFailed {
                    message: err
                        .backend_message()
                        .map_or_else(|| GENERIC_WRITE_FAILURE.to_string(), str::to_string),
                }
            })?;
            info!(pairs = unique.len(), "assignments written");
        }

        let assigned = if refresh_ids.is_empty() {
            AssignedMap::new()
        } else {
            self.backend.fetch_assigned(refresh_ids)?
        };

        Ok(WriteOutcome {
            written: unique.len(),
            assigned,
        })
    }

    /// Clear every lecturer from the given modules.
    ///
    /// # Errors
    ///
    /// Propagates the backend failure; nothing is retried.
    pub fn reset(&self, pbl_ids: &[u64]) -> Result<(), GenerateError> {
        if pbl_ids.is_empty() {
            return Ok(());
        }
        self.backend.reset_batch(pbl_ids)?;
        info!(modules = pbl_ids.len(), "assignments reset");
        Ok(())
    }
}
