//! Domain types for courses, modules, lecturers, small groups, and assignments.

pub mod assignment;
pub mod course;
pub mod de;
pub mod group;
pub mod lecturer;

pub use assignment::{AssignedLecturer, AssignedMap, Assignment, ReportingRow, tally_assignments};
pub use course::{Course, CourseModules, Module};
pub use group::{GroupMapping, SmallGroup, SmallGroupRow, aggregate_groups};
pub use lecturer::{Expertise, Lecturer, RoleRecord, RoleType, STANDBY_TAG};

use serde::{Deserialize, Serialize};

/// Active academic year descriptor from `GET /tahun-ajaran/active`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTerm {
    #[serde(default)]
    pub tahun: String,
    #[serde(default)]
    pub semesters: Vec<TermSemester>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSemester {
    /// `Ganjil` or `Genap`.
    pub jenis: String,
}

impl ActiveTerm {
    /// The label courses are filtered by (`semesters[0].jenis`).
    #[must_use]
    pub fn jenis(&self) -> Option<&str> {
        self.semesters
            .first()
            .map(|s| s.jenis.trim())
            .filter(|jenis| !jenis.is_empty())
    }
}
