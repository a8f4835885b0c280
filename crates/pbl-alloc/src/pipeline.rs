//! One generate run: load, check, optionally reset, allocate, write.

use pbl_core::config::AllocationConfig;
use pbl_core::model::AssignedMap;
use pbl_core::writer::BatchWriter;
use pbl_core::{Backend, GenerateError, LoadOptions, Roster};
use serde::Serialize;
use tracing::info;

use crate::allocate::{Allocation, allocate};
use crate::rank::TieBreaker;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Compute everything but never write.
    pub dry_run: bool,
    /// Clear assignments of every loaded module before allocating.
    pub reset_first: bool,
    pub load: LoadOptions,
    pub allocation: AllocationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub allocation: Allocation,
    /// Distinct pairs sent to the backend; 0 on a dry run.
    pub written: usize,
    pub dry_run: bool,
    /// Assigned map after the run (re-fetched when written).
    pub assigned: AssignedMap,
    /// Modules cleared by `reset_first`.
    pub reset_modules: usize,
}

pub struct Generator<'a, B: Backend> {
    backend: &'a B,
    options: GenerateOptions,
}

impl<'a, B: Backend> Generator<'a, B> {
    pub const fn new(backend: &'a B, options: GenerateOptions) -> Self {
        Self { backend, options }
    }

    /// Run the pipeline.
    ///
    /// # Errors
    ///
    /// Fails before any write when the roster cannot be loaded or a semester
    /// has no kelompok kecil. A rejected batch write surfaces the backend's
    /// message; unfilled teaching seats are warnings in the report, not errors.
    pub fn run(&self, tie: &mut dyn TieBreaker) -> Result<GenerationReport, GenerateError> {
        let mut roster = Roster::load(self.backend, &self.options.load)?;
        roster.check_preconditions()?;

        let writer = BatchWriter::new(self.backend);
        let mut reset_modules = 0;
        if self.options.reset_first {
            let ids = roster.module_ids();
            if self.options.dry_run {
                info!(modules = ids.len(), "dry run, ignoring existing assignments");
                roster.assigned.clear();
            } else {
                writer.reset(&ids)?;
                roster.refresh_assigned(self.backend)?;
            }
            reset_modules = ids.len();
        }

        let allocation = allocate(&roster, &self.options.allocation, tie);

        if self.options.dry_run {
            info!(
                planned = allocation.pairs().len(),
                "dry run, nothing written"
            );
            return Ok(GenerationReport {
                allocation,
                written: 0,
                dry_run: true,
                assigned: roster.assigned,
                reset_modules,
            });
        }

        let outcome = writer.submit(&allocation.pairs(), &roster.module_ids())?;
        Ok(GenerationReport {
            allocation,
            written: outcome.written,
            dry_run: false,
            assigned: outcome.assigned,
            reset_modules,
        })
    }
}
