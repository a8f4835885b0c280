use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::de;

/// One row of kelompok kecil data as the backend sends it.
///
/// Older endpoints return one row per student (`mahasiswa_id`); newer ones
/// return one row per group with a `mahasiswa_ids` list. Both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmallGroupRow {
    #[serde(default, deserialize_with = "de::opt_u64_lenient")]
    pub id: Option<u64>,
    #[serde(deserialize_with = "de::u32_lenient")]
    pub semester: u32,
    #[serde(deserialize_with = "de::string_lenient")]
    pub nama_kelompok: String,
    #[serde(default, deserialize_with = "de::opt_u64_lenient")]
    pub mahasiswa_id: Option<u64>,
    #[serde(default)]
    pub mahasiswa_ids: Vec<u64>,
}

/// A kelompok kecil with its members, aggregated from rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmallGroup {
    pub semester: u32,
    pub name: String,
    pub members: Vec<u64>,
}

/// Aggregate rows into groups keyed by `(semester, nama_kelompok)`.
///
/// Output is ordered by semester, then by group name using natural number
/// ordering so `"2"` sorts before `"10"`.
#[must_use]
pub fn aggregate_groups(rows: &[SmallGroupRow]) -> Vec<SmallGroup> {
    let mut groups: BTreeMap<(u32, NaturalKey), BTreeSet<u64>> = BTreeMap::new();
    for row in rows {
        let name = row.nama_kelompok.trim();
        if name.is_empty() {
            continue;
        }
        let members = groups
            .entry((row.semester, NaturalKey::new(name)))
            .or_default();
        members.extend(row.mahasiswa_id);
        members.extend(row.mahasiswa_ids.iter().copied());
    }

    groups
        .into_iter()
        .map(|((semester, key), members)| SmallGroup {
            semester,
            name: key.raw,
            members: members.into_iter().collect(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NaturalKey {
    number: Option<u64>,
    raw: String,
}

impl NaturalKey {
    fn new(raw: &str) -> Self {
        Self {
            number: raw.parse().ok(),
            raw: raw.to_string(),
        }
    }
}

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.number, other.number) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// semester → course code → kelompok kecil names mapped to that course.
pub type GroupMapping = BTreeMap<u32, BTreeMap<String, Vec<String>>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<SmallGroupRow> {
        serde_json::from_value(value).expect("rows should decode")
    }

    #[test]
    fn per_student_rows_are_aggregated() {
        let rows = rows(json!([
            {"id": 1, "semester": 1, "nama_kelompok": "1", "mahasiswa_id": 100},
            {"id": 2, "semester": "1", "nama_kelompok": "1", "mahasiswa_id": 101},
            {"id": 3, "semester": 1, "nama_kelompok": "2", "mahasiswa_id": 102},
            {"id": 4, "semester": 3, "nama_kelompok": "1", "mahasiswa_id": 300}
        ]));
        let groups = aggregate_groups(&rows);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].members, vec![100, 101]);
        assert_eq!(groups[1].name, "2");
        assert_eq!(groups[2].semester, 3);
    }

    #[test]
    fn per_group_rows_and_natural_order() {
        let rows = rows(json!([
            {"semester": 1, "nama_kelompok": "10", "mahasiswa_ids": [5, 4]},
            {"semester": 1, "nama_kelompok": 2, "mahasiswa_ids": [1]},
            {"semester": 1, "nama_kelompok": "Remedial", "mahasiswa_ids": []},
            {"semester": 1, "nama_kelompok": "  ", "mahasiswa_ids": [9]}
        ]));
        let groups = aggregate_groups(&rows);
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["2", "10", "Remedial"]);
        assert_eq!(groups[1].members, vec![4, 5]);
    }
}
