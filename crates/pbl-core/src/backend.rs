//! The academic backend as seen by the generator.
//!
//! One method per REST endpoint. The production implementation lives in the
//! CLI (`ureq` over HTTP); [`crate::snapshot::SnapshotBackend`] serves a
//! recorded roster from a file for offline planning and tests.

use std::collections::BTreeMap;

use crate::error::BackendError;
use crate::model::{
    ActiveTerm, AssignedMap, Assignment, CourseModules, GroupMapping, Lecturer, ReportingRow,
    SmallGroupRow,
};

/// Request/response contract of the REST backend.
///
/// `Sync` because the roster loader fans independent reads out over scoped
/// threads.
pub trait Backend: Sync {
    /// `GET /pbls/all`, in backend order.
    fn fetch_courses(&self) -> Result<Vec<CourseModules>, BackendError>;

    /// `GET /users?role=dosen`.
    fn fetch_lecturers(&self) -> Result<Vec<Lecturer>, BackendError>;

    /// `GET /tahun-ajaran/active`.
    fn fetch_active_term(&self) -> Result<ActiveTerm, BackendError>;

    /// `GET /kelompok-kecil`.
    fn fetch_all_small_groups(&self) -> Result<Vec<SmallGroupRow>, BackendError>;

    /// `POST /kelompok-kecil/batch-by-semester`.
    fn fetch_small_groups(
        &self,
        semesters: &[u32],
    ) -> Result<BTreeMap<u32, Vec<SmallGroupRow>>, BackendError>;

    /// `POST /mata-kuliah/pbl-kelompok-kecil/batch-multi-semester`.
    fn fetch_group_mapping(&self, semesters: &[u32]) -> Result<GroupMapping, BackendError>;

    /// `POST /pbls/assigned-dosen-batch`.
    fn fetch_assigned(&self, pbl_ids: &[u64]) -> Result<AssignedMap, BackendError>;

    /// `GET /reporting/dosen-pbl`.
    fn fetch_reporting(&self) -> Result<Vec<ReportingRow>, BackendError>;

    /// `POST /pbls/assign-dosen-batch`.
    fn assign_batch(&self, assignments: &[Assignment]) -> Result<(), BackendError>;

    /// `POST /pbls/reset-dosen-batch`.
    fn reset_batch(&self, pbl_ids: &[u64]) -> Result<(), BackendError>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn fetch_courses(&self) -> Result<Vec<CourseModules>, BackendError> {
        (**self).fetch_courses()
    }

    fn fetch_lecturers(&self) -> Result<Vec<Lecturer>, BackendError> {
        (**self).fetch_lecturers()
    }

    fn fetch_active_term(&self) -> Result<ActiveTerm, BackendError> {
        (**self).fetch_active_term()
    }

    fn fetch_all_small_groups(&self) -> Result<Vec<SmallGroupRow>, BackendError> {
        (**self).fetch_all_small_groups()
    }

    fn fetch_small_groups(
        &self,
        semesters: &[u32],
    ) -> Result<BTreeMap<u32, Vec<SmallGroupRow>>, BackendError> {
        (**self).fetch_small_groups(semesters)
    }

    fn fetch_group_mapping(&self, semesters: &[u32]) -> Result<GroupMapping, BackendError> {
        (**self).fetch_group_mapping(semesters)
    }

    fn fetch_assigned(&self, pbl_ids: &[u64]) -> Result<AssignedMap, BackendError> {
        (**self).fetch_assigned(pbl_ids)
    }

    fn fetch_reporting(&self) -> Result<Vec<ReportingRow>, BackendError> {
        (**self).fetch_reporting()
    }

    fn assign_batch(&self, assignments: &[Assignment]) -> Result<(), BackendError> {
        (**self).assign_batch(assignments)
    }

    fn reset_batch(&self, pbl_ids: &[u64]) -> Result<(), BackendError> {
        (**self).reset_batch(pbl_ids)
    }
}
