//! `pblgen status`: who is currently attached to each PBL module.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use pbl_core::Roster;
use pbl_core::model::{AssignedLecturer, CourseModules};
use serde::Serialize;

use super::Context;
use crate::output::{CliError, pretty_rule, render_mode};

/// Arguments for `pblgen status`.
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Only show this course.
    #[arg(long, value_name = "KODE")]
    pub course: Option<String>,

    /// Read from a roster snapshot instead of the backend.
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Term label (`Ganjil`/`Genap`) instead of the active one.
    #[arg(long, value_name = "LABEL")]
    pub term: Option<String>,
}

#[derive(Debug, Serialize)]
struct ModuleStatus {
    pbl_id: u64,
    modul_ke: u32,
    nama_modul: String,
    lecturers: Vec<AssignedLecturer>,
}

#[derive(Debug, Serialize)]
struct CourseStatus {
    kode: String,
    nama: String,
    semester: u32,
    blok: Option<u32>,
    modules: Vec<ModuleStatus>,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    term: Option<String>,
    courses: Vec<CourseStatus>,
}

/// Execute `pblgen status`.
pub fn run_status(args: &StatusArgs, ctx: &Context) -> anyhow::Result<()> {
    let boxed = ctx.backend(args.snapshot.as_deref())?;
    let backend = &*boxed;
    let roster = Roster::load(&backend, &ctx.load_options(args.term.as_deref()))
        .context("failed to load roster")?;

    let courses: Vec<&CourseModules> = match args.course.as_deref() {
        Some(kode) => {
            let course = roster.course(kode).ok_or_else(|| CliError {
                message: format!("course '{kode}' is not part of the loaded term"),
                suggestion: Some("Run `pblgen status` without --course to list courses".to_string()),
                error_code: None,
            })?;
            vec![course]
        }
        None => roster.courses.iter().collect(),
    };

    let payload = StatusOutput {
        term: roster.term.clone(),
        courses: courses
            .into_iter()
            .map(|course| course_status(&roster, course))
            .collect(),
    };
    render_mode(ctx.output, &payload, render_text, render_pretty)
}

fn course_status(roster: &Roster, course: &CourseModules) -> CourseStatus {
    let c = &course.mata_kuliah;
    CourseStatus {
        kode: c.kode.clone(),
        nama: c.nama.clone(),
        semester: c.semester,
        blok: c.blok,
        modules: course
            .pbls
            .iter()
            .map(|m| ModuleStatus {
                pbl_id: m.id,
                modul_ke: m.modul_ke,
                nama_modul: m.nama_modul.clone(),
                lecturers: roster.assigned.get(&m.id).cloned().unwrap_or_default(),
            })
            .collect(),
    }
}

fn lecturer_label(lecturer: &AssignedLecturer) -> String {
    let name = if lecturer.name.is_empty() {
        format!("#{}", lecturer.id)
    } else {
        format!("{} (#{})", lecturer.name, lecturer.id)
    };
    match lecturer.peran {
        Some(role) => format!("{name} [{}]", role.as_str()),
        None => name,
    }
}

fn render_text(payload: &StatusOutput, w: &mut dyn Write) -> io::Result<()> {
    for course in &payload.courses {
        for module in &course.modules {
            let ids: Vec<u64> = module.lecturers.iter().map(|l| l.id).collect();
            writeln!(
                w,
                "{}\tsem={}\tmodul={}\tpbl={}\t{}",
                course.kode,
                course.semester,
                module.modul_ke,
                module.pbl_id,
                crate::output::id_list(&ids)
            )?;
        }
    }
    Ok(())
}

fn render_pretty(payload: &StatusOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "Status ({})",
        payload.term.as_deref().unwrap_or("all terms")
    )?;
    pretty_rule(w)?;
    if payload.courses.is_empty() {
        return writeln!(w, "no courses in this term");
    }
    for course in &payload.courses {
        let blok = course
            .blok
            .map_or_else(String::new, |b| format!(", blok {b}"));
        writeln!(
            w,
            "{}  {} (semester {}{blok})",
            course.kode, course.nama, course.semester
        )?;
        for module in &course.modules {
            let lecturers = if module.lecturers.is_empty() {
                "-".to_string()
            } else {
                module
                    .lecturers
                    .iter()
                    .map(lecturer_label)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            writeln!(w, "  modul {:<3} {lecturers}", module.modul_ke)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbl_core::model::RoleType;

    #[test]
    fn lecturer_label_shows_role_when_known() {
        let lecturer = AssignedLecturer {
            id: 7,
            name: "Dr. Sari".to_string(),
            peran: Some(RoleType::Coordinator),
        };
        assert_eq!(lecturer_label(&lecturer), "Dr. Sari (#7) [koordinator]");

        let bare = AssignedLecturer {
            id: 8,
            name: String::new(),
            peran: None,
        };
        assert_eq!(lecturer_label(&bare), "#8");
    }
}
