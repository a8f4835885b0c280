//! `pblgen reset`: clear lecturer assignments of the active term's modules.

use std::io::{self, Write};

use anyhow::Context as _;
use clap::Args;
use pbl_core::Roster;
use pbl_core::writer::BatchWriter;
use serde::Serialize;

use super::Context;
use crate::output::{CliError, pretty_kv, pretty_section, render_mode};

/// Arguments for `pblgen reset`.
#[derive(Args, Debug, Default)]
pub struct ResetArgs {
    /// Only reset this course (repeatable). Defaults to every loaded course.
    #[arg(long = "course", value_name = "KODE")]
    pub courses: Vec<String>,

    /// Term label (`Ganjil`/`Genap`) instead of the active one.
    #[arg(long, value_name = "LABEL")]
    pub term: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResetOutput {
    courses: Vec<String>,
    modules: usize,
}

/// Execute `pblgen reset`.
pub fn run_reset(args: &ResetArgs, ctx: &Context) -> anyhow::Result<()> {
    let backend = ctx.http();
    let roster = Roster::load(&backend, &ctx.load_options(args.term.as_deref()))
        .context("failed to load roster")?;

    let selected: Vec<_> = if args.courses.is_empty() {
        roster.courses.iter().collect()
    } else {
        let mut selected = Vec::with_capacity(args.courses.len());
        for kode in &args.courses {
            let Some(course) = roster.course(kode) else {
                return Err(CliError {
                    message: format!("course '{kode}' is not part of the loaded term"),
                    suggestion: Some("Check the kode with `pblgen status`, or pass --term".to_string()),
                    error_code: None,
                }
                .into());
            };
            selected.push(course);
        }
        selected
    };

    let ids: Vec<u64> = selected.iter().flat_map(|c| c.module_ids()).collect();
    BatchWriter::new(&backend)
        .reset(&ids)
        .context("reset failed")?;

    let payload = ResetOutput {
        courses: selected
            .iter()
            .map(|c| c.mata_kuliah.kode.clone())
            .collect(),
        modules: ids.len(),
    };
    render_mode(ctx.output, &payload, render_text, render_pretty)
}

fn render_text(payload: &ResetOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "reset\t{}\t{}", payload.modules, payload.courses.join(","))
}

fn render_pretty(payload: &ResetOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Reset")?;
    pretty_kv(w, "Courses", payload.courses.join(", "))?;
    pretty_kv(w, "Modules", payload.modules.to_string())
}
