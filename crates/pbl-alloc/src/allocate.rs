//! Role allocator: coordinator, block team, then teaching lecturers.
//!
//! # Algorithm
//!
//! Semesters are processed in ascending order, courses within a semester in
//! backend order. For each course:
//!
//! 1. The first lecturer holding a `koordinator` record for the course and
//!    semester becomes coordinator; later holders are ignored with a warning.
//! 2. Up to `team_size` distinct `tim_blok` holders (excluding the
//!    coordinator) form the block team.
//! 3. The teaching quota is `max(0, modules × groups − core_slots)` plus one
//!    seat per missing coordinator or team member.
//! 4. Teaching seats are filled from, in order: ranked non-standby lecturers
//!    whose expertise covers the course, ranked standby lecturers, then every
//!    remaining lecturer ranked most-loaded first. Each candidate must pass
//!    the [`CrossSemesterTracker`].
//! 5. Seats left empty become [`UnfilledSlot`] warnings.
//!
//! Every picked lecturer is placed on every module of the course.

use std::collections::{BTreeSet, HashSet};

use pbl_core::Roster;
use pbl_core::config::AllocationConfig;
use pbl_core::model::{Assignment, Course, CourseModules, Lecturer, RoleType};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::quota::{Quota, slot_targets};
use crate::rank::{LoadBook, Ranked, TieBreaker, rank, rank_overloaded};
use crate::tracker::{CrossSemesterTracker, Violation};

/// One `(module, lecturer)` edge with the role it was planned for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAssignment {
    pub pbl_id: u64,
    pub dosen_id: u64,
    pub role: RoleType,
    pub mata_kuliah_kode: String,
}

/// Staffing outcome for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseReport {
    pub kode: String,
    pub nama: String,
    pub semester: u32,
    pub blok: Option<u32>,
    pub modules: usize,
    pub groups: usize,
    pub coordinator: Option<u64>,
    pub team: Vec<u64>,
    pub teaching: Vec<u64>,
    pub quota: Quota,
}

/// A teaching seat nobody could take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnfilledSlot {
    pub kode: String,
    pub semester: u32,
    pub pbl_id: u64,
    pub modul_ke: u32,
    pub label: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoModules,
    AlreadyAssigned,
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoModules => "no_modules",
            Self::AlreadyAssigned => "already_assigned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCourse {
    pub kode: String,
    pub semester: u32,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub assignments: Vec<PlannedAssignment>,
    pub courses: Vec<CourseReport>,
    pub warnings: Vec<UnfilledSlot>,
    pub skipped: Vec<SkippedCourse>,
}

impl Allocation {
    /// Distinct wire pairs for the batch writer.
    #[must_use]
    pub fn pairs(&self) -> Vec<Assignment> {
        self.assignments
            .iter()
            .map(|a| Assignment {
                pbl_id: a.pbl_id,
                dosen_id: a.dosen_id,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Planned edges with the given role.
    #[must_use]
    pub fn count_role(&self, role: RoleType) -> usize {
        self.assignments.iter().filter(|a| a.role == role).count()
    }

    #[must_use]
    pub fn course(&self, kode: &str) -> Option<&CourseReport> {
        self.courses.iter().find(|c| c.kode == kode)
    }

    /// No teaching seat was left empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Allocate with a tracker seeded from the roster's stored assignments.
pub fn allocate(
    roster: &Roster,
    config: &AllocationConfig,
    tie: &mut dyn TieBreaker,
) -> Allocation {
    let mut tracker = CrossSemesterTracker::from_roster(roster);
    allocate_with_tracker(roster, config, tie, &mut tracker)
}

/// Allocate against a caller-owned tracker.
pub fn allocate_with_tracker(
    roster: &Roster,
    config: &AllocationConfig,
    tie: &mut dyn TieBreaker,
    tracker: &mut CrossSemesterTracker,
) -> Allocation {
    let mut allocator = Allocator {
        roster,
        config,
        load: LoadBook::from_roster(roster),
        tracker,
        tie,
        out: Allocation::default(),
    };
    for semester in roster.semesters() {
        let courses: Vec<&CourseModules> = roster
            .courses
            .iter()
            .filter(|group| group.mata_kuliah.semester == semester)
            .collect();
        info!(semester, courses = courses.len(), "allocating semester");
        for group in courses {
            allocator.course(group);
        }
    }
    let out = allocator.out;
    info!(
        assignments = out.assignments.len(),
        unfilled = out.warnings.len(),
        skipped = out.skipped.len(),
        "allocation finished"
    );
    out
}

/// Candidate tallies for the warning text of unfilled seats.
#[derive(Debug, Clone, Copy, Default)]
struct RejectStats {
    core_staff: usize,
    owns_block: usize,
    in_block: usize,
    in_semester: usize,
}

impl RejectStats {
    const fn note(&mut self, violation: Violation) {
        match violation {
            Violation::OwnsBlockElsewhere { .. } => self.owns_block += 1,
            Violation::AlreadyInBlock { .. } => self.in_block += 1,
            Violation::AlreadyInSemester { .. } => self.in_semester += 1,
        }
    }

    fn reasons(&self, course: &Course, quota: u32, picked: usize) -> Vec<String> {
        let mut reasons = vec![format!(
            "quota {quota} but only {picked} eligible lecturer(s)"
        )];
        let blok = course
            .blok
            .map_or_else(|| "-".to_string(), |b| b.to_string());
        if self.owns_block > 0 {
            reasons.push(format!(
                "{} lecturer(s) teach blok {blok} in another semester",
                self.owns_block
            ));
        }
        if self.in_block > 0 {
            reasons.push(format!(
                "{} lecturer(s) already teach blok {blok} in this run",
                self.in_block
            ));
        }
        if self.in_semester > 0 {
            reasons.push(format!(
                "{} lecturer(s) already teach in semester {} in this run",
                self.in_semester, course.semester
            ));
        }
        if self.core_staff > 0 {
            reasons.push(format!(
                "{} lecturer(s) are koordinator or tim blok of {}",
                self.core_staff, course.kode
            ));
        }
        reasons
    }
}

struct Selection<'r> {
    quota: usize,
    picked: Vec<&'r Lecturer>,
    considered: HashSet<u64>,
    stats: RejectStats,
}

impl Selection<'_> {
    fn is_full(&self) -> bool {
        self.picked.len() >= self.quota
    }
}

struct Allocator<'r, 't> {
    roster: &'r Roster,
    config: &'r AllocationConfig,
    load: LoadBook,
    tracker: &'t mut CrossSemesterTracker,
    tie: &'t mut dyn TieBreaker,
    out: Allocation,
}

impl<'r> Allocator<'r, '_> {
    fn skip(&mut self, course: &Course, reason: SkipReason) {
        self.out.skipped.push(SkippedCourse {
            kode: course.kode.clone(),
            semester: course.semester,
            reason,
        });
    }

    fn course(&mut self, group: &'r CourseModules) {
        let course = &group.mata_kuliah;
        if group.pbls.is_empty() {
            debug!(kode = %course.kode, "course has no modules");
            self.skip(course, SkipReason::NoModules);
            return;
        }
        if self.config.skip_assigned && self.roster.has_assignments(group) {
            info!(kode = %course.kode, "course already has lecturers, skipping");
            self.skip(course, SkipReason::AlreadyAssigned);
            return;
        }

        let coordinator = self.coordinator(course);
        let team = self.team(course, coordinator.map(|l| l.id));
        let groups = self.roster.groups_for(course);
        let quota = Quota::compute(
            group.pbls.len(),
            groups,
            self.config,
            coordinator.is_some(),
            team.len(),
        );
        debug!(
            kode = %course.kode,
            modules = group.pbls.len(),
            groups,
            quota = quota.total(),
            "teaching quota"
        );

        if let Some(lecturer) = coordinator {
            self.place(group, lecturer.id, RoleType::Coordinator);
        }
        for lecturer in &team {
            self.place(group, lecturer.id, RoleType::BlockTeam);
        }

        let excluded: HashSet<u64> = coordinator
            .iter()
            .chain(team.iter())
            .map(|l| l.id)
            .collect();
        let selection = self.teaching(course, quota.total(), &excluded);

        if !selection.is_full() {
            let reasons = selection
                .stats
                .reasons(course, quota.total(), selection.picked.len());
            for slot in slot_targets(&group.pbls, quota.total())
                .into_iter()
                .skip(selection.picked.len())
            {
                warn!(
                    kode = %course.kode,
                    semester = course.semester,
                    modul_ke = slot.modul_ke,
                    label = %slot.label,
                    "teaching seat left unfilled"
                );
                self.out.warnings.push(UnfilledSlot {
                    kode: course.kode.clone(),
                    semester: course.semester,
                    pbl_id: slot.pbl_id,
                    modul_ke: slot.modul_ke,
                    label: slot.label,
                    reasons: reasons.clone(),
                });
            }
        }

        for lecturer in &selection.picked {
            self.place(group, lecturer.id, RoleType::Teaching);
        }

        self.out.courses.push(CourseReport {
            kode: course.kode.clone(),
            nama: course.nama.clone(),
            semester: course.semester,
            blok: course.blok,
            modules: group.pbls.len(),
            groups,
            coordinator: coordinator.map(|l| l.id),
            team: team.iter().map(|l| l.id).collect(),
            teaching: selection.picked.iter().map(|l| l.id).collect(),
            quota,
        });
    }

    fn holders(&self, role: RoleType, course: &Course) -> Vec<&'r Lecturer> {
        let mut seen = HashSet::new();
        self.roster
            .lecturers
            .iter()
            .filter(|l| l.holds(role, &course.kode, course.semester))
            .filter(|l| seen.insert(l.id))
            .collect()
    }

    fn coordinator(&self, course: &Course) -> Option<&'r Lecturer> {
        let holders = self.holders(RoleType::Coordinator, course);
        match holders.len() {
            0 => warn!(kode = %course.kode, semester = course.semester, "no koordinator recorded"),
            1 => {}
            n => warn!(
                kode = %course.kode,
                semester = course.semester,
                holders = n,
                "duplicate koordinator records, keeping the first"
            ),
        }
        holders.first().copied()
    }

    fn team(&self, course: &Course, coordinator: Option<u64>) -> Vec<&'r Lecturer> {
        let mut team: Vec<&'r Lecturer> = self
            .holders(RoleType::BlockTeam, course)
            .into_iter()
            .filter(|l| Some(l.id) != coordinator)
            .collect();
        let cap = self.config.team_size as usize;
        if team.len() > cap {
            warn!(
                kode = %course.kode,
                semester = course.semester,
                holders = team.len(),
                cap,
                "more tim blok records than seats, keeping the first"
            );
            team.truncate(cap);
        }
        team
    }

    /// Put a lecturer on every module of the course.
    fn place(&mut self, group: &CourseModules, dosen_id: u64, role: RoleType) {
        for module in &group.pbls {
            self.out.assignments.push(PlannedAssignment {
                pbl_id: module.id,
                dosen_id,
                role,
                mata_kuliah_kode: group.mata_kuliah.kode.clone(),
            });
        }
        self.load
            .bump(dosen_id, u32::try_from(group.pbls.len()).unwrap_or(u32::MAX));
    }

    fn teaching(&mut self, course: &Course, quota: u32, excluded: &HashSet<u64>) -> Selection<'r> {
        let roster = self.roster;
        let required = course.keahlian_required.as_slice();
        let mut selection = Selection {
            quota: quota as usize,
            picked: Vec::new(),
            considered: HashSet::new(),
            stats: RejectStats {
                core_staff: excluded.len(),
                ..RejectStats::default()
            },
        };
        if selection.is_full() {
            return selection;
        }

        let eligible = |l: &&Lecturer| !excluded.contains(&l.id);

        let primary = rank(
            roster
                .lecturers
                .iter()
                .filter(eligible)
                .filter(|l| !l.expertise.is_standby() && l.expertise.satisfies(required)),
            &self.load,
            required,
            &mut *self.tie,
        );
        self.take("expertise", primary, course, &mut selection);

        if !selection.is_full() {
            let standby = rank(
                roster
                    .lecturers
                    .iter()
                    .filter(eligible)
                    .filter(|l| l.expertise.is_standby()),
                &self.load,
                required,
                &mut *self.tie,
            );
            self.take("standby", standby, course, &mut selection);
        }

        if !selection.is_full() {
            let rest = rank_overloaded(
                roster
                    .lecturers
                    .iter()
                    .filter(eligible)
                    .filter(|l| !selection.considered.contains(&l.id)),
                &self.load,
                required,
                &mut *self.tie,
            );
            self.take("overload", rest, course, &mut selection);
        }

        selection
    }

    fn take(
        &mut self,
        stage: &'static str,
        ranked: Vec<Ranked<'r>>,
        course: &Course,
        selection: &mut Selection<'r>,
    ) {
        for candidate in ranked {
            if selection.is_full() {
                break;
            }
            let id = candidate.lecturer.id;
            if !selection.considered.insert(id) {
                continue;
            }
            if let Some(violation) = self.tracker.violation(id, course.blok, course.semester) {
                debug!(dosen = id, kode = %course.kode, stage, %violation, "candidate rejected");
                selection.stats.note(violation);
                continue;
            }
            self.tracker.record(id, course.blok, course.semester);
            debug!(
                dosen = id,
                kode = %course.kode,
                stage,
                load = candidate.assignment_count,
                overlap = candidate.overlap,
                "teaching lecturer picked"
            );
            selection.picked.push(candidate.lecturer);
        }
    }
}
