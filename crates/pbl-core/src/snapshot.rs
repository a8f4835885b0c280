//! Roster snapshots: the raw backend data of one moment, saved as JSON.
//!
//! `pblgen snapshot` captures one from the live backend; `pblgen plan` runs
//! the allocator against it offline through [`SnapshotBackend`], which also
//! serves as the in-memory backend in tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::{BackendError, ErrorCode};
use crate::model::{
    ActiveTerm, AssignedLecturer, AssignedMap, Assignment, CourseModules, GroupMapping, Lecturer,
    ReportingRow, SmallGroupRow,
};

/// Everything the backend would serve, as one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    #[serde(default)]
    pub term: ActiveTerm,
    #[serde(default)]
    pub courses: Vec<CourseModules>,
    #[serde(default)]
    pub lecturers: Vec<Lecturer>,
    #[serde(default)]
    pub small_groups: Vec<SmallGroupRow>,
    #[serde(default)]
    pub group_mapping: GroupMapping,
    #[serde(default)]
    pub assigned: AssignedMap,
    /// `None` models a reporting endpoint that is down.
    #[serde(default)]
    pub reporting: Option<Vec<ReportingRow>>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SnapshotError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } | Self::Parse { .. } => ErrorCode::SnapshotReadFailed,
            Self::Backend(err) => err.code(),
        }
    }
}

impl RosterSnapshot {
    /// Read a snapshot file.
    ///
    /// # Errors
    ///
    /// I/O or JSON errors, tagged with the path.
    pub fn read(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the snapshot as pretty JSON.
    ///
    /// # Errors
    ///
    /// I/O errors, tagged with the path.
    pub fn write(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json + "\n").map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Capture the raw data of a live backend, unfiltered by term.
    ///
    /// # Errors
    ///
    /// Any failing endpoint except reporting, which is recorded as `None`.
    pub fn capture<B: Backend>(backend: &B) -> Result<Self, SnapshotError> {
        let term = backend.fetch_active_term()?;
        let courses = backend.fetch_courses()?;
        let lecturers = backend.fetch_lecturers()?;
        let small_groups = backend.fetch_all_small_groups()?;

        let semesters: Vec<u32> = courses
            .iter()
            .map(|group| group.mata_kuliah.semester)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let group_mapping = if semesters.is_empty() {
            GroupMapping::new()
        } else {
            backend.fetch_group_mapping(&semesters)?
        };

        let ids: Vec<u64> = courses.iter().flat_map(CourseModules::module_ids).collect();
        let assigned = if ids.is_empty() {
            AssignedMap::new()
        } else {
            backend.fetch_assigned(&ids)?
        };

        let reporting = backend
            .fetch_reporting()
            .inspect_err(|err| tracing::warn!("reporting totals not captured: {err}"))
            .ok();

        Ok(Self {
            term,
            courses,
            lecturers,
            small_groups,
            group_mapping,
            assigned,
            reporting,
        })
    }
}

/// [`Backend`] over a [`RosterSnapshot`]; writes mutate the in-memory copy.
#[derive(Debug)]
pub struct SnapshotBackend {
    state: Mutex<RosterSnapshot>,
    writes: Mutex<Vec<Vec<Assignment>>>,
    reject_writes: Option<BackendError>,
}

impl SnapshotBackend {
    #[must_use]
    pub const fn new(snapshot: RosterSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            writes: Mutex::new(Vec::new()),
            reject_writes: None,
        }
    }

    /// Make every `assign_batch` fail with `err`.
    #[must_use]
    pub fn rejecting_writes(mut self, err: BackendError) -> Self {
        self.reject_writes = Some(err);
        self
    }

    /// Every batch passed to `assign_batch`, in call order.
    #[must_use]
    pub fn write_calls(&self) -> Vec<Vec<Assignment>> {
        lock(&self.writes).clone()
    }

    /// Current state, including applied writes.
    #[must_use]
    pub fn snapshot(&self) -> RosterSnapshot {
        lock(&self.state).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Backend for SnapshotBackend {
    fn fetch_courses(&self) -> Result<Vec<CourseModules>, BackendError> {
        Ok(lock(&self.state).courses.clone())
    }

    fn fetch_lecturers(&self) -> Result<Vec<Lecturer>, BackendError> {
        Ok(lock(&self.state).lecturers.clone())
    }

    fn fetch_active_term(&self) -> Result<ActiveTerm, BackendError> {
        Ok(lock(&self.state).term.clone())
    }

    fn fetch_all_small_groups(&self) -> Result<Vec<SmallGroupRow>, BackendError> {
        Ok(lock(&self.state).small_groups.clone())
    }

    fn fetch_small_groups(
        &self,
        semesters: &[u32],
    ) -> Result<BTreeMap<u32, Vec<SmallGroupRow>>, BackendError> {
        let state = lock(&self.state);
        let mut by_semester: BTreeMap<u32, Vec<SmallGroupRow>> = BTreeMap::new();
        for row in &state.small_groups {
            if semesters.contains(&row.semester) {
                by_semester.entry(row.semester).or_default().push(row.clone());
            }
        }
        Ok(by_semester)
    }

    fn fetch_group_mapping(&self, semesters: &[u32]) -> Result<GroupMapping, BackendError> {
        Ok(lock(&self.state)
            .group_mapping
            .iter()
            .filter(|(semester, _)| semesters.contains(semester))
            .map(|(semester, by_course)| (*semester, by_course.clone()))
            .collect())
    }

    fn fetch_assigned(&self, pbl_ids: &[u64]) -> Result<AssignedMap, BackendError> {
        Ok(lock(&self.state)
            .assigned
            .iter()
            .filter(|(id, _)| pbl_ids.contains(id))
            .map(|(id, lecturers)| (*id, lecturers.clone()))
            .collect())
    }

    fn fetch_reporting(&self) -> Result<Vec<ReportingRow>, BackendError> {
        lock(&self.state)
            .reporting
            .clone()
            .ok_or_else(|| BackendError::Status {
                path: "/reporting/dosen-pbl".to_string(),
                status: 404,
            })
    }

    fn assign_batch(&self, assignments: &[Assignment]) -> Result<(), BackendError> {
        if let Some(err) = &self.reject_writes {
            return Err(err.clone());
        }
        lock(&self.writes).push(assignments.to_vec());

        let mut state = lock(&self.state);
        for pair in assignments {
            let name = state
                .lecturers
                .iter()
                .find(|l| l.id == pair.dosen_id)
                .map(|l| l.name.clone())
                .unwrap_or_default();
            let slot = state.assigned.entry(pair.pbl_id).or_default();
            if !slot.iter().any(|l| l.id == pair.dosen_id) {
                slot.push(AssignedLecturer {
                    id: pair.dosen_id,
                    name,
                    peran: None,
                });
            }
        }
        Ok(())
    }

    fn reset_batch(&self, pbl_ids: &[u64]) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        for id in pbl_ids {
            state.assigned.remove(id);
        }
        Ok(())
    }
}
