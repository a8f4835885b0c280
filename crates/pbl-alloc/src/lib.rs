#![forbid(unsafe_code)]
//! pbl-alloc library.
//!
//! Lecturer allocation for PBL courses: load ranking, teaching quota,
//! cross-semester exclusion and the generate pipeline.
//!
//! # Conventions
//!
//! - **Purity**: [`allocate::allocate`] does no I/O; the [`pipeline`] owns
//!   every backend call.
//! - **Determinism**: randomness only enters through a [`rank::TieBreaker`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod allocate;
pub mod pipeline;
pub mod quota;
pub mod rank;
pub mod tracker;

pub use allocate::{Allocation, allocate, allocate_with_tracker};
pub use pipeline::{GenerateOptions, GenerationReport, Generator};
pub use rank::{SeededTieBreaker, StableTieBreaker, TieBreaker};
pub use tracker::CrossSemesterTracker;
