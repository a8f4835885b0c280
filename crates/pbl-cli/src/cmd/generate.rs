//! `pblgen generate`: allocate lecturers for the active term and write them.
//!
//! Loads the roster from the live backend, refuses to run while any involved
//! semester lacks kelompok kecil, then writes every planned pair in a single
//! batch. `--dry-run` stops after allocation and prints the plan instead.

use std::io::{self, Write};

use anyhow::Context as _;
use clap::Args;
use pbl_alloc::{GenerationReport, Generator};

use super::{AllocationFlags, Context};
use crate::output::{OutputMode, id_list, pretty_kv, pretty_section, render_mode};

/// Arguments for `pblgen generate`.
#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub allocation: AllocationFlags,

    /// Compute and print the plan without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Clear existing assignments of every loaded module first.
    #[arg(long)]
    pub reset_first: bool,
}

/// Execute `pblgen generate`.
pub fn run_generate(args: &GenerateArgs, ctx: &Context) -> anyhow::Result<()> {
    let backend = ctx.http();
    let options = args.allocation.options(ctx, args.dry_run, args.reset_first);
    let mut tie = args.allocation.tie_breaker(&ctx.config.allocation);

    let report = Generator::new(&backend, options)
        .run(tie.as_mut())
        .context("generate failed")?;
    render_report(ctx.output, &report)
}

/// Print a generation report; shared with `pblgen plan`.
pub fn render_report(mode: OutputMode, report: &GenerationReport) -> anyhow::Result<()> {
    render_mode(mode, report, render_text, render_pretty)
}

fn render_text(report: &GenerationReport, w: &mut dyn Write) -> io::Result<()> {
    let allocation = &report.allocation;
    for course in &allocation.courses {
        writeln!(
            w,
            "course\t{}\tsem={}\tblok={}\tquota={}\tkoordinator={}\ttim={}\tmengajar={}",
            course.kode,
            course.semester,
            course.blok.map_or_else(|| "-".to_string(), |b| b.to_string()),
            course.quota.total(),
            course
                .coordinator
                .map_or_else(|| "-".to_string(), |id| id.to_string()),
            id_list(&course.team),
            id_list(&course.teaching),
        )?;
    }
    for slot in &allocation.warnings {
        writeln!(
            w,
            "unfilled\t{}\tsem={}\tmodul={}\t{}\t{}",
            slot.kode,
            slot.semester,
            slot.modul_ke,
            slot.label,
            slot.reasons.join("; ")
        )?;
    }
    for skipped in &allocation.skipped {
        writeln!(
            w,
            "skipped\t{}\tsem={}\t{}",
            skipped.kode,
            skipped.semester,
            skipped.reason.as_str()
        )?;
    }
    if report.dry_run {
        writeln!(w, "planned\t{}", allocation.pairs().len())
    } else {
        writeln!(w, "written\t{}", report.written)
    }
}

fn render_pretty(report: &GenerationReport, w: &mut dyn Write) -> io::Result<()> {
    let allocation = &report.allocation;
    let heading = if report.dry_run {
        "Generation plan (dry run)"
    } else {
        "Generation"
    };
    pretty_section(w, heading)?;
    pretty_kv(w, "Courses", allocation.courses.len().to_string())?;
    pretty_kv(w, "Pairs", allocation.pairs().len().to_string())?;
    if !report.dry_run {
        pretty_kv(w, "Written", report.written.to_string())?;
    }
    if report.reset_modules > 0 {
        pretty_kv(w, "Reset", format!("{} module(s)", report.reset_modules))?;
    }

    for course in &allocation.courses {
        writeln!(w)?;
        let blok = course
            .blok
            .map_or_else(String::new, |b| format!(", blok {b}"));
        writeln!(
            w,
            "{}  {} (semester {}{blok})",
            course.kode, course.nama, course.semester
        )?;
        pretty_kv(
            w,
            "  Quota",
            format!(
                "{} ({} module(s), {} kelompok)",
                course.quota.total(),
                course.modules,
                course.groups
            ),
        )?;
        pretty_kv(
            w,
            "  Koordinator",
            course
                .coordinator
                .map_or_else(|| "-".to_string(), |id| id.to_string()),
        )?;
        pretty_kv(w, "  Tim blok", id_list(&course.team))?;
        pretty_kv(w, "  Mengajar", id_list(&course.teaching))?;
    }

    if !allocation.skipped.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Skipped")?;
        for skipped in &allocation.skipped {
            writeln!(
                w,
                "  {} (semester {}): {}",
                skipped.kode,
                skipped.semester,
                skipped.reason.as_str().replace('_', " ")
            )?;
        }
    }

    if !allocation.warnings.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Unfilled teaching seats")?;
        for slot in &allocation.warnings {
            writeln!(
                w,
                "  {} semester {} modul {} {}",
                slot.kode, slot.semester, slot.modul_ke, slot.label
            )?;
            for reason in &slot.reasons {
                writeln!(w, "    - {reason}")?;
            }
        }
    }
    Ok(())
}
