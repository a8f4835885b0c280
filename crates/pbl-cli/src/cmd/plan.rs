//! `pblgen plan`: run the allocator offline against a roster snapshot.
//!
//! The snapshot is taken with `pblgen snapshot`; nothing is ever written.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use pbl_alloc::Generator;

use super::generate::render_report;
use super::{AllocationFlags, Context, open_snapshot};

/// Arguments for `pblgen plan`.
#[derive(Args, Debug, Default)]
pub struct PlanArgs {
    /// Roster snapshot written by `pblgen snapshot`.
    #[arg(long, value_name = "FILE")]
    pub snapshot: PathBuf,

    #[command(flatten)]
    pub allocation: AllocationFlags,

    /// Ignore the assignments stored in the snapshot.
    #[arg(long)]
    pub reset_first: bool,
}

/// Execute `pblgen plan`.
pub fn run_plan(args: &PlanArgs, ctx: &Context) -> anyhow::Result<()> {
    let backend = open_snapshot(&args.snapshot)?;
    let options = args.allocation.options(ctx, true, args.reset_first);
    let mut tie = args.allocation.tie_breaker(&ctx.config.allocation);

    let report = Generator::new(&backend, options)
        .run(tie.as_mut())
        .context("plan failed")?;
    render_report(ctx.output, &report)
}
