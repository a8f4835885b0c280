#![forbid(unsafe_code)]
//! pbl-core library.
//!
//! Data model, backend contract, roster loading and batch writing for the
//! PBL lecturer assignment generator.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums at the backend and generate seams,
//!   `anyhow::Result` for configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod roster;
pub mod snapshot;
pub mod writer;

pub use backend::Backend;
pub use error::{BackendError, ErrorCode, GenerateError};
pub use roster::{LoadOptions, Roster};
