//! `pblgen groups`: list kelompok kecil per semester.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use pbl_core::Backend as _;
use pbl_core::model::{SmallGroup, aggregate_groups};
use serde::Serialize;

use super::Context;
use crate::output::{pretty_section, render_mode};

/// Arguments for `pblgen groups`.
#[derive(Args, Debug, Default)]
pub struct GroupsArgs {
    /// Only show this semester.
    #[arg(long, value_name = "N")]
    pub semester: Option<u32>,

    /// Read from a roster snapshot instead of the backend.
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct GroupsOutput {
    groups: Vec<SmallGroup>,
}

/// Execute `pblgen groups`.
pub fn run_groups(args: &GroupsArgs, ctx: &Context) -> anyhow::Result<()> {
    let backend = ctx.backend(args.snapshot.as_deref())?;
    let rows = backend
        .fetch_all_small_groups()
        .context("failed to fetch kelompok kecil")?;

    let groups = aggregate_groups(&rows)
        .into_iter()
        .filter(|g| args.semester.is_none_or(|s| g.semester == s))
        .collect();
    render_mode(ctx.output, &GroupsOutput { groups }, render_text, render_pretty)
}

fn render_text(payload: &GroupsOutput, w: &mut dyn Write) -> io::Result<()> {
    for group in &payload.groups {
        writeln!(
            w,
            "{}\t{}\t{}",
            group.semester,
            group.name,
            group.members.len()
        )?;
    }
    Ok(())
}

fn render_pretty(payload: &GroupsOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Kelompok kecil")?;
    if payload.groups.is_empty() {
        return writeln!(w, "no kelompok kecil found");
    }
    let mut current = None;
    for group in &payload.groups {
        if current != Some(group.semester) {
            writeln!(w, "Semester {}", group.semester)?;
            current = Some(group.semester);
        }
        writeln!(
            w,
            "  Kelompok {:<6} {} mahasiswa",
            group.name,
            group.members.len()
        )?;
    }
    Ok(())
}
