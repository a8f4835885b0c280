//! Cross-semester exclusion for generated teaching lecturers.
//!
//! A lecturer who teaches a block in one semester may not teach the same
//! block in another semester, nor be picked twice for the same block or the
//! same semester within one run. Coordinator and block-team roles are exempt.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use pbl_core::Roster;
use pbl_core::model::RoleType;

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    /// Stored assignments show the lecturer teaching this block in `other_semester`.
    OwnsBlockElsewhere { blok: u32, other_semester: u32 },
    /// Already picked as teaching lecturer for this block earlier in the run.
    AlreadyInBlock { blok: u32 },
    /// Already picked as teaching lecturer in this semester earlier in the run.
    AlreadyInSemester { semester: u32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OwnsBlockElsewhere {
                blok,
                other_semester,
            } => write!(f, "teaches blok {blok} in semester {other_semester}"),
            Self::AlreadyInBlock { blok } => write!(f, "already teaching blok {blok} this run"),
            Self::AlreadyInSemester { semester } => {
                write!(f, "already teaching in semester {semester} this run")
            }
        }
    }
}

/// One instance per generate run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossSemesterTracker {
    /// blok → lecturer → semesters with stored teaching assignments.
    historical: HashMap<u32, HashMap<u64, BTreeSet<u32>>>,
    /// blok → lecturer → semester picked this run.
    run_blocks: HashMap<u32, HashMap<u64, u32>>,
    /// semester → lecturers picked this run.
    run_semesters: HashMap<u32, HashSet<u64>>,
}

impl CrossSemesterTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from stored assignments.
    ///
    /// An assignment counts as teaching when the backend says so, or, when it
    /// reports no role, when the lecturer holds neither coordinator nor
    /// block-team records for that course.
    #[must_use]
    pub fn from_roster(roster: &Roster) -> Self {
        let mut tracker = Self::new();
        for group in &roster.courses {
            let course = &group.mata_kuliah;
            let Some(blok) = course.blok else { continue };
            for module in &group.pbls {
                let Some(assigned) = roster.assigned.get(&module.id) else {
                    continue;
                };
                for lecturer in assigned {
                    let teaching = lecturer.peran.map_or_else(
                        || {
                            !roster
                                .lecturer(lecturer.id)
                                .is_some_and(|l| l.is_core_staff_of(&course.kode, course.semester))
                        },
                        |role| role == RoleType::Teaching,
                    );
                    if teaching {
                        tracker.note_historical(blok, course.semester, lecturer.id);
                    }
                }
            }
        }
        tracker
    }

    pub fn note_historical(&mut self, blok: u32, semester: u32, lecturer_id: u64) {
        self.historical
            .entry(blok)
            .or_default()
            .entry(lecturer_id)
            .or_default()
            .insert(semester);
    }

    /// First rule the candidate breaks, if any.
    #[must_use]
    pub fn violation(&self, lecturer_id: u64, blok: Option<u32>, semester: u32) -> Option<Violation> {
        if let Some(blok) = blok {
            let elsewhere = self
                .historical
                .get(&blok)
                .and_then(|by_lecturer| by_lecturer.get(&lecturer_id))
                .and_then(|semesters| semesters.iter().copied().find(|s| *s != semester));
            if let Some(other_semester) = elsewhere {
                return Some(Violation::OwnsBlockElsewhere {
                    blok,
                    other_semester,
                });
            }
            if self
                .run_blocks
                .get(&blok)
                .is_some_and(|picked| picked.contains_key(&lecturer_id))
            {
                return Some(Violation::AlreadyInBlock { blok });
            }
        }
        if self
            .run_semesters
            .get(&semester)
            .is_some_and(|picked| picked.contains(&lecturer_id))
        {
            return Some(Violation::AlreadyInSemester { semester });
        }
        None
    }

    /// Mark a successful pick.
    pub fn record(&mut self, lecturer_id: u64, blok: Option<u32>, semester: u32) {
        if let Some(blok) = blok {
            self.run_blocks
                .entry(blok)
                .or_default()
                .insert(lecturer_id, semester);
        }
        self.run_semesters
            .entry(semester)
            .or_default()
            .insert(lecturer_id);
    }

    /// Picks made this run as `(blok, lecturer, semester)`.
    pub fn run_picks(&self) -> impl Iterator<Item = (u32, u64, u32)> + '_ {
        self.run_blocks.iter().flat_map(|(blok, picked)| {
            picked
                .iter()
                .map(move |(lecturer, semester)| (*blok, *lecturer, *semester))
        })
    }
}
