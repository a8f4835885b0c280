pub mod completions;
pub mod generate;
pub mod groups;
pub mod plan;
pub mod reset;
pub mod snapshot;
pub mod status;

use std::path::Path;

use anyhow::Context as _;
use clap::Args;
use pbl_alloc::{GenerateOptions, SeededTieBreaker, StableTieBreaker, TieBreaker};
use pbl_core::config::{AllocationConfig, Config};
use pbl_core::snapshot::{RosterSnapshot, SnapshotBackend};
use pbl_core::{Backend, LoadOptions};

use crate::client::HttpBackend;
use crate::output::OutputMode;

/// Settings every command sees once flags, env, and config files are merged.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub output: OutputMode,
}

impl Context {
    pub fn http(&self) -> HttpBackend {
        HttpBackend::new(&self.config.api)
    }

    /// The live backend, or a snapshot file when one is given.
    pub fn backend(&self, snapshot: Option<&Path>) -> anyhow::Result<Box<dyn Backend>> {
        match snapshot {
            Some(path) => Ok(Box::new(open_snapshot(path)?)),
            None => Ok(Box::new(self.http())),
        }
    }

    pub fn load_options(&self, term: Option<&str>) -> LoadOptions {
        LoadOptions {
            term: term
                .map(str::to_string)
                .or_else(|| self.config.allocation.term.clone()),
        }
    }
}

pub fn open_snapshot(path: &Path) -> anyhow::Result<SnapshotBackend> {
    let snapshot = RosterSnapshot::read(path)
        .with_context(|| format!("cannot use snapshot {}", path.display()))?;
    Ok(SnapshotBackend::new(snapshot))
}

/// Allocation knobs shared by `generate` and `plan`.
#[derive(Args, Debug, Default, Clone)]
pub struct AllocationFlags {
    /// Seed for the random tie-break between equally loaded lecturers.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Break ties by lecturer id instead of randomly.
    #[arg(long, conflicts_with = "seed")]
    pub stable: bool,

    /// Term label to allocate for (`Ganjil`/`Genap`) instead of the active one.
    #[arg(long, value_name = "LABEL")]
    pub term: Option<String>,

    /// Also allocate courses whose modules already have lecturers.
    #[arg(long)]
    pub include_assigned: bool,

    /// Block-team seats per course.
    #[arg(long, value_name = "N")]
    pub team_size: Option<u32>,
}

impl AllocationFlags {
    pub fn allocation(&self, config: &AllocationConfig) -> AllocationConfig {
        let mut allocation = config.clone();
        if self.include_assigned {
            allocation.skip_assigned = false;
        }
        if let Some(team_size) = self.team_size {
            allocation.team_size = team_size;
        }
        allocation
    }

    pub fn options(&self, ctx: &Context, dry_run: bool, reset_first: bool) -> GenerateOptions {
        GenerateOptions {
            dry_run,
            reset_first,
            load: ctx.load_options(self.term.as_deref()),
            allocation: self.allocation(&ctx.config.allocation),
        }
    }

    /// `--stable` wins, then `--seed`, then the configured seed, else entropy.
    pub fn tie_breaker(&self, config: &AllocationConfig) -> Box<dyn TieBreaker> {
        if self.stable {
            return Box::new(StableTieBreaker);
        }
        match self.seed.or(config.seed) {
            Some(seed) => Box::new(SeededTieBreaker::new(seed)),
            None => Box::new(SeededTieBreaker::from_entropy()),
        }
    }
}
