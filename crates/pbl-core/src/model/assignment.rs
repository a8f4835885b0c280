use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::de;
use super::lecturer::RoleType;

/// A `(pbl_id, dosen_id)` edge as written by `POST /pbls/assign-dosen-batch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Assignment {
    pub pbl_id: u64,
    pub dosen_id: u64,
}

/// A lecturer already attached to a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedLecturer {
    #[serde(deserialize_with = "de::u64_lenient")]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Role as reported by the backend, when it reports one.
    #[serde(default, alias = "role", deserialize_with = "opt_role")]
    pub peran: Option<RoleType>,
}

/// pbl id → lecturers assigned to that module.
pub type AssignedMap = BTreeMap<u64, Vec<AssignedLecturer>>;

/// Number of modules each lecturer is assigned to in `assigned`.
#[must_use]
pub fn tally_assignments(assigned: &AssignedMap) -> HashMap<u64, u32> {
    let mut counts: HashMap<u64, u32> = HashMap::new();
    for lecturers in assigned.values() {
        for lecturer in lecturers {
            *counts.entry(lecturer.id).or_default() += 1;
        }
    }
    counts
}

/// Historical per-lecturer totals from `GET /reporting/dosen-pbl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingRow {
    #[serde(alias = "id", deserialize_with = "de::u64_lenient")]
    pub dosen_id: u64,
    #[serde(
        default,
        alias = "total_pbl_assignments",
        alias = "total",
        deserialize_with = "de::u32_lenient"
    )]
    pub total_pbl: u32,
}

fn opt_role<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RoleType>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(RoleType::parse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assigned_map_decodes_string_keys_and_optional_roles() {
        let map: AssignedMap = serde_json::from_value(json!({
            "11": [
                {"id": 1, "name": "A", "peran": "koordinator"},
                {"id": "2", "name": "B"}
            ],
            "12": [{"id": 1, "name": "A", "role": "Dosen_Mengajar"}]
        }))
        .expect("assigned map should decode");

        assert_eq!(map[&11][0].peran, Some(RoleType::Coordinator));
        assert_eq!(map[&11][1].peran, None);
        assert_eq!(map[&12][0].peran, Some(RoleType::Teaching));
    }

    #[test]
    fn tally_counts_modules_per_lecturer() {
        let a = AssignedLecturer {
            id: 1,
            name: "A".to_string(),
            peran: None,
        };
        let b = AssignedLecturer {
            id: 2,
            name: "B".to_string(),
            peran: None,
        };
        let mut map = AssignedMap::new();
        map.insert(10, vec![a.clone(), b]);
        map.insert(11, vec![a]);
        map.insert(12, vec![]);

        let counts = tally_assignments(&map);
        assert_eq!(counts[&1], 2);
        assert_eq!(counts[&2], 1);
        assert!(!counts.contains_key(&3));
    }

    #[test]
    fn reporting_row_accepts_aliases() {
        let row: ReportingRow =
            serde_json::from_value(json!({"id": "4", "total_pbl_assignments": "9"}))
                .expect("row should decode");
        assert_eq!(row, ReportingRow { dosen_id: 4, total_pbl: 9 });
    }
}
