//! Priority ranking of lecturers by current load.
//!
//! Fewest assignments first. Ties go to the lecturer whose expertise overlaps
//! the course's requirements more, then to a [`TieBreaker`].

use std::collections::HashMap;

use pbl_core::Roster;
use pbl_core::model::{Lecturer, tally_assignments};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Source of the final tie-break key. Lower keys rank first.
pub trait TieBreaker {
    fn key(&mut self, lecturer: &Lecturer) -> u64;
}

/// Random tie-break, reproducible when seeded.
#[derive(Debug, Clone)]
pub struct SeededTieBreaker {
    rng: StdRng,
}

impl SeededTieBreaker {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl TieBreaker for SeededTieBreaker {
    fn key(&mut self, _lecturer: &Lecturer) -> u64 {
        self.rng.next_u64()
    }
}

/// Deterministic tie-break on lecturer id.
#[derive(Debug, Clone, Copy, Default)]
pub struct StableTieBreaker;

impl TieBreaker for StableTieBreaker {
    fn key(&mut self, lecturer: &Lecturer) -> u64 {
        lecturer.id
    }
}

/// Running per-lecturer assignment counts for one generate run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBook {
    counts: HashMap<u64, u32>,
}

impl LoadBook {
    /// Seed from the current assigned map and, when available, reporting totals.
    ///
    /// Reporting totals are historical and already include current mappings,
    /// so the two sources are combined with `max`, not summed.
    #[must_use]
    pub fn from_roster(roster: &Roster) -> Self {
        let mut counts = tally_assignments(&roster.assigned);
        if let Some(reported) = &roster.reported_totals {
            for (id, total) in reported {
                let entry = counts.entry(*id).or_default();
                *entry = (*entry).max(*total);
            }
        }
        Self { counts }
    }

    #[must_use]
    pub fn count(&self, lecturer_id: u64) -> u32 {
        self.counts.get(&lecturer_id).copied().unwrap_or_default()
    }

    pub fn bump(&mut self, lecturer_id: u64, by: u32) {
        let entry = self.counts.entry(lecturer_id).or_default();
        *entry = entry.saturating_add(by);
    }
}

/// A lecturer annotated for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranked<'a> {
    pub lecturer: &'a Lecturer,
    pub assignment_count: u32,
    pub overlap: usize,
    tie_key: u64,
}

fn annotate<'a, I>(
    candidates: I,
    load: &LoadBook,
    required: &[String],
    tie: &mut dyn TieBreaker,
) -> Vec<Ranked<'a>>
where
    I: IntoIterator<Item = &'a Lecturer>,
{
    candidates
        .into_iter()
        .map(|lecturer| Ranked {
            lecturer,
            assignment_count: load.count(lecturer.id),
            overlap: lecturer.expertise.overlap(required),
            tie_key: tie.key(lecturer),
        })
        .collect()
}

/// Least-loaded first; ties by expertise overlap, then tie key.
pub fn rank<'a, I>(
    candidates: I,
    load: &LoadBook,
    required: &[String],
    tie: &mut dyn TieBreaker,
) -> Vec<Ranked<'a>>
where
    I: IntoIterator<Item = &'a Lecturer>,
{
    let mut ranked = annotate(candidates, load, required, tie);
    ranked.sort_by(|a, b| {
        a.assignment_count
            .cmp(&b.assignment_count)
            .then_with(|| b.overlap.cmp(&a.overlap))
            .then_with(|| a.tie_key.cmp(&b.tie_key))
    });
    ranked
}

/// Most-loaded first, for the last-resort fill that accepts overloading.
pub fn rank_overloaded<'a, I>(
    candidates: I,
    load: &LoadBook,
    required: &[String],
    tie: &mut dyn TieBreaker,
) -> Vec<Ranked<'a>>
where
    I: IntoIterator<Item = &'a Lecturer>,
{
    let mut ranked = annotate(candidates, load, required, tie);
    ranked.sort_by(|a, b| {
        b.assignment_count
            .cmp(&a.assignment_count)
            .then_with(|| b.overlap.cmp(&a.overlap))
            .then_with(|| a.tie_key.cmp(&b.tie_key))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbl_core::model::{AssignedLecturer, Expertise};

    fn lecturer(id: u64, tags: &[&str]) -> Lecturer {
        Lecturer {
            id,
            name: format!("Dosen {id}"),
            expertise: Expertise::from_tags(tags.iter().copied()),
            roles: vec![],
        }
    }

    fn ids(ranked: &[Ranked<'_>]) -> Vec<u64> {
        ranked.iter().map(|r| r.lecturer.id).collect()
    }

    #[test]
    fn load_book_takes_max_of_local_and_reported() {
        let mut roster = Roster::default();
        let a = AssignedLecturer {
            id: 1,
            name: String::new(),
            peran: None,
        };
        roster.assigned.insert(10, vec![a.clone()]);
        roster.assigned.insert(11, vec![a]);
        roster.reported_totals = Some([(1, 1), (2, 6)].into_iter().collect());

        let load = LoadBook::from_roster(&roster);
        assert_eq!(load.count(1), 2, "local tally wins when larger");
        assert_eq!(load.count(2), 6, "reported total wins when larger");
        assert_eq!(load.count(3), 0);
    }

    #[test]
    fn missing_reporting_falls_back_to_local_tally() {
        let mut roster = Roster::default();
        roster.assigned.insert(
            10,
            vec![AssignedLecturer {
                id: 4,
                name: String::new(),
                peran: None,
            }],
        );
        let load = LoadBook::from_roster(&roster);
        assert_eq!(load.count(4), 1);
    }

    #[test]
    fn rank_orders_by_load_then_overlap_then_tie() {
        let lecturers = [
            lecturer(1, &["bedah"]),
            lecturer(2, &["ai", "data"]),
            lecturer(3, &["ai"]),
            lecturer(4, &[]),
        ];
        let mut load = LoadBook::default();
        load.bump(1, 3);

        let required = vec!["AI".to_string(), "Data".to_string()];
        let ranked = rank(&lecturers, &load, &required, &mut StableTieBreaker);
        assert_eq!(ids(&ranked), vec![2, 3, 4, 1]);
        assert_eq!(ranked[0].overlap, 2);
        assert_eq!(ranked[3].assignment_count, 3);
    }

    #[test]
    fn overloaded_ranking_is_descending() {
        let lecturers = [lecturer(1, &[]), lecturer(2, &[]), lecturer(3, &[])];
        let mut load = LoadBook::default();
        load.bump(2, 5);
        load.bump(3, 1);
        let ranked = rank_overloaded(&lecturers, &load, &[], &mut StableTieBreaker);
        assert_eq!(ids(&ranked), vec![2, 3, 1]);
    }

    #[test]
    fn seeded_tie_break_is_reproducible() {
        let lecturers: Vec<Lecturer> = (1..=8).map(|id| lecturer(id, &[])).collect();
        let load = LoadBook::default();
        let first = ids(&rank(&lecturers, &load, &[], &mut SeededTieBreaker::new(42)));
        let second = ids(&rank(&lecturers, &load, &[], &mut SeededTieBreaker::new(42)));
        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=8).collect::<Vec<_>>());
    }
}
