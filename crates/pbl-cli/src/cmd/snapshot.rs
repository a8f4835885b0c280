//! `pblgen snapshot`: save everything the generator reads into one JSON file.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use pbl_core::snapshot::RosterSnapshot;
use serde::Serialize;
use tracing::info;

use super::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};

/// Arguments for `pblgen snapshot`.
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Destination file.
    #[arg(long, short, value_name = "FILE")]
    pub out: PathBuf,
}

#[derive(Debug, Serialize)]
struct SnapshotOutput {
    path: String,
    tahun: String,
    courses: usize,
    lecturers: usize,
    small_group_rows: usize,
    assigned_modules: usize,
    reporting: bool,
}

/// Execute `pblgen snapshot`.
pub fn run_snapshot(args: &SnapshotArgs, ctx: &Context) -> anyhow::Result<()> {
    let snapshot = RosterSnapshot::capture(&ctx.http()).context("snapshot failed")?;
    snapshot.write(&args.out)?;
    info!(path = %args.out.display(), "snapshot written");

    let payload = SnapshotOutput {
        path: args.out.display().to_string(),
        tahun: snapshot.term.tahun.clone(),
        courses: snapshot.courses.len(),
        lecturers: snapshot.lecturers.len(),
        small_group_rows: snapshot.small_groups.len(),
        assigned_modules: snapshot.assigned.len(),
        reporting: snapshot.reporting.is_some(),
    };
    render_mode(ctx.output, &payload, render_text, render_pretty)
}

fn render_text(payload: &SnapshotOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}\tcourses={}\tlecturers={}\tgroups={}\tassigned={}",
        payload.path,
        payload.courses,
        payload.lecturers,
        payload.small_group_rows,
        payload.assigned_modules
    )
}

fn render_pretty(payload: &SnapshotOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Snapshot")?;
    pretty_kv(w, "Path", &payload.path)?;
    pretty_kv(w, "Tahun", &payload.tahun)?;
    pretty_kv(w, "Courses", payload.courses.to_string())?;
    pretty_kv(w, "Lecturers", payload.lecturers.to_string())?;
    pretty_kv(w, "Groups", format!("{} row(s)", payload.small_group_rows))?;
    pretty_kv(w, "Assigned", format!("{} module(s)", payload.assigned_modules))?;
    if !payload.reporting {
        writeln!(w, "reporting endpoint unavailable; loads will be tallied locally")?;
    }
    Ok(())
}
