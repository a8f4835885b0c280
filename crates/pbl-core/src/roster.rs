//! Roster loading: fetch everything one generate run needs and normalize it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::thread;

use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{BackendError, GenerateError};
use crate::model::{
    AssignedMap, Course, CourseModules, GroupMapping, Lecturer, SmallGroup, aggregate_groups,
};

/// Knobs for [`Roster::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Use this term label instead of asking the backend for the active one.
    pub term: Option<String>,
}

/// In-memory working set for one generate run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Term label the courses were filtered by, if any.
    pub term: Option<String>,
    /// Courses of the active term, in backend order, modules sorted.
    pub courses: Vec<CourseModules>,
    pub lecturers: Vec<Lecturer>,
    /// semester → kelompok kecil of that semester.
    pub small_groups: BTreeMap<u32, Vec<SmallGroup>>,
    pub group_mapping: GroupMapping,
    pub assigned: AssignedMap,
    /// Historical totals from the reporting endpoint; `None` when unavailable.
    pub reported_totals: Option<HashMap<u64, u32>>,
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

impl Roster {
    /// Fetch and normalize the roster.
    ///
    /// Courses, lecturers and the active term are fetched concurrently, then
    /// small groups and the group mapping for the semesters involved, then the
    /// current assignments and reporting totals. Only a failing reporting call
    /// is tolerated.
    pub fn load<B: Backend>(backend: &B, options: &LoadOptions) -> Result<Self, BackendError> {
        let (courses, lecturers, term) = thread::scope(|s| {
            let courses = s.spawn(|| backend.fetch_courses());
            let lecturers = s.spawn(|| backend.fetch_lecturers());
            let term = s.spawn(|| match &options.term {
                Some(term) => Ok(Some(term.clone())),
                None => backend
                    .fetch_active_term()
                    .map(|t| t.jenis().map(str::to_string)),
            });
            (join(courses), join(lecturers), join(term))
        });
        let (courses, lecturers, term) = (courses?, lecturers?, term?);

        if term.is_none() {
            warn!("active term has no semester label, loading courses of every term");
        }

        let courses: Vec<CourseModules> = courses
            .into_iter()
            .map(CourseModules::normalized)
            .filter(|group| {
                term.as_deref()
                    .is_none_or(|term| group.mata_kuliah.in_term(term))
            })
            .collect();

        let semesters: Vec<u32> = courses
            .iter()
            .map(|group| group.mata_kuliah.semester)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (rows, group_mapping) = if semesters.is_empty() {
            (Ok(BTreeMap::new()), Ok(GroupMapping::new()))
        } else {
            thread::scope(|s| {
                let rows = s.spawn(|| backend.fetch_small_groups(&semesters));
                let mapping = s.spawn(|| backend.fetch_group_mapping(&semesters));
                (join(rows), join(mapping))
            })
        };
        let (rows, group_mapping) = (rows?, group_mapping?);

        let mut small_groups: BTreeMap<u32, Vec<SmallGroup>> = BTreeMap::new();
        // Bucket by the row's own semester, not the response key it came under.
        let rows: Vec<_> = rows.into_values().flatten().collect();
        for group in aggregate_groups(&rows) {
            small_groups.entry(group.semester).or_default().push(group);
        }

        let mut roster = Self {
            term,
            courses,
            lecturers,
            small_groups,
            group_mapping,
            assigned: AssignedMap::new(),
            reported_totals: None,
        };
        roster.refresh_assigned(backend)?;

        roster.reported_totals = match backend.fetch_reporting() {
            Ok(rows) => Some(rows.into_iter().map(|r| (r.dosen_id, r.total_pbl)).collect()),
            Err(err) => {
                warn!("reporting totals unavailable, ranking on local tally only: {err}");
                None
            }
        };

        info!(
            courses = roster.courses.len(),
            modules = roster.module_ids().len(),
            lecturers = roster.lecturers.len(),
            semesters = ?semesters,
            "roster loaded"
        );
        Ok(roster)
    }

    /// Re-fetch the assigned-lecturer map for every loaded module.
    pub fn refresh_assigned<B: Backend>(&mut self, backend: &B) -> Result<(), BackendError> {
        let ids = self.module_ids();
        self.assigned = if ids.is_empty() {
            AssignedMap::new()
        } else {
            backend.fetch_assigned(&ids)?
        };
        Ok(())
    }

    /// Semesters that have at least one course, ascending.
    #[must_use]
    pub fn semesters(&self) -> Vec<u32> {
        self.courses
            .iter()
            .map(|group| group.mata_kuliah.semester)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn module_ids(&self) -> Vec<u64> {
        self.courses
            .iter()
            .flat_map(|group| group.pbls.iter().map(|module| module.id))
            .collect()
    }

    #[must_use]
    pub fn lecturer(&self, id: u64) -> Option<&Lecturer> {
        self.lecturers.iter().find(|lecturer| lecturer.id == id)
    }

    #[must_use]
    pub fn course(&self, kode: &str) -> Option<&CourseModules> {
        self.courses
            .iter()
            .find(|group| group.mata_kuliah.kode == kode)
    }

    /// Number of kelompok kecil a course is taught in.
    ///
    /// Uses the course's explicit group mapping when present, otherwise every
    /// small group of the course's semester.
    #[must_use]
    pub fn groups_for(&self, course: &Course) -> usize {
        let mapped = self
            .group_mapping
            .get(&course.semester)
            .and_then(|by_course| by_course.get(&course.kode))
            .map(|names| {
                names
                    .iter()
                    .map(|name| name.trim())
                    .filter(|name| !name.is_empty())
                    .collect::<BTreeSet<_>>()
                    .len()
            })
            .unwrap_or_default();
        if mapped > 0 {
            return mapped;
        }
        self.small_groups.get(&course.semester).map_or(0, Vec::len)
    }

    /// True when any module of the course already has lecturers.
    #[must_use]
    pub fn has_assignments(&self, group: &CourseModules) -> bool {
        group
            .pbls
            .iter()
            .any(|module| self.assigned.get(&module.id).is_some_and(|l| !l.is_empty()))
    }

    /// Hard preconditions checked before anything is written.
    ///
    /// # Errors
    ///
    /// [`GenerateError::NoCourses`] when nothing is loaded, and
    /// [`GenerateError::MissingSmallGroups`] listing every semester that has
    /// courses but no kelompok kecil.
    pub fn check_preconditions(&self) -> Result<(), GenerateError> {
        if self.courses.is_empty() {
            return Err(GenerateError::NoCourses);
        }
        let missing: Vec<u32> = self
            .semesters()
            .into_iter()
            .filter(|semester| self.small_groups.get(semester).is_none_or(Vec::is_empty))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GenerateError::MissingSmallGroups { semesters: missing })
        }
    }
}
