use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::de;

/// Tag that marks a lecturer as fallback-only.
pub const STANDBY_TAG: &str = "standby";

/// Role a lecturer holds on a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoleType {
    #[serde(rename = "koordinator")]
    Coordinator,
    #[serde(rename = "tim_blok")]
    BlockTeam,
    #[serde(rename = "dosen_mengajar", alias = "mengajar")]
    Teaching,
}

impl RoleType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coordinator => "koordinator",
            Self::BlockTeam => "tim_blok",
            Self::Teaching => "dosen_mengajar",
        }
    }

    /// Parse a wire role name, tolerating case and stray whitespace.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "koordinator" => Some(Self::Coordinator),
            "tim_blok" | "tim blok" => Some(Self::BlockTeam),
            "dosen_mengajar" | "mengajar" => Some(Self::Teaching),
            _ => None,
        }
    }

    /// Coordinator and block team are seeded by admins, never generated.
    #[must_use]
    pub const fn is_core_staff(self) -> bool {
        matches!(self, Self::Coordinator | Self::BlockTeam)
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `dosen_peran` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub tipe_peran: RoleType,
    pub mata_kuliah_kode: String,
    #[serde(default, deserialize_with = "de::opt_u32_lenient")]
    pub semester: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_u32_lenient")]
    pub blok: Option<u32>,
}

impl RoleRecord {
    /// True when this record is the given role on `kode` in `semester`.
    ///
    /// Records without a semester match every semester of the course.
    #[must_use]
    pub fn matches(&self, role: RoleType, kode: &str, semester: u32) -> bool {
        self.tipe_peran == role
            && self.mata_kuliah_kode == kode
            && self.semester.is_none_or(|s| s == semester)
    }
}

/// Canonical expertise tag set, normalized once at ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expertise(BTreeSet<String>);

impl Expertise {
    /// Build from raw tags: trimmed, lower-cased, empties dropped.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            tags.into_iter()
                .map(|tag| tag.as_ref().trim().to_lowercase())
                .filter(|tag| !tag.is_empty())
                .collect(),
        )
    }

    #[must_use]
    pub fn is_standby(&self) -> bool {
        self.0.contains(STANDBY_TAG)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of required tags matched by at least one expertise tag.
    ///
    /// Matching is case-insensitive substring containment in either direction,
    /// so `"ai"` matches `"ai & data"` and `"kardiologi anak"` matches
    /// `"kardiologi"`.
    #[must_use]
    pub fn overlap<S: AsRef<str>>(&self, required: &[S]) -> usize {
        required
            .iter()
            .map(|tag| tag.as_ref().trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .filter(|tag| {
                self.0
                    .iter()
                    .any(|own| own.contains(tag.as_str()) || tag.contains(own.as_str()))
            })
            .count()
    }

    /// Eligibility filter: no requirement means everyone qualifies.
    #[must_use]
    pub fn satisfies<S: AsRef<str>>(&self, required: &[S]) -> bool {
        let has_requirement = required.iter().any(|tag| !tag.as_ref().trim().is_empty());
        !has_requirement || self.overlap(required) > 0
    }
}

impl Serialize for Expertise {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Expertise {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?.unwrap_or(Value::Null);
        Ok(Self::from_tags(de::split_tags(&value)))
    }
}

/// A dosen as returned by `GET /users?role=dosen`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecturer {
    #[serde(deserialize_with = "de::u64_lenient")]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "keahlian")]
    pub expertise: Expertise,
    #[serde(default, alias = "dosen_peran", deserialize_with = "role_records")]
    pub roles: Vec<RoleRecord>,
}

impl Lecturer {
    #[must_use]
    pub fn holds(&self, role: RoleType, kode: &str, semester: u32) -> bool {
        self.roles.iter().any(|r| r.matches(role, kode, semester))
    }

    /// Coordinator or block-team member of `kode` in `semester`.
    #[must_use]
    pub fn is_core_staff_of(&self, kode: &str, semester: u32) -> bool {
        self.holds(RoleType::Coordinator, kode, semester)
            || self.holds(RoleType::BlockTeam, kode, semester)
    }
}

/// Decode `dosen_peran`, skipping records with an unknown role type.
fn role_records<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<RoleRecord>, D::Error> {
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut records = Vec::with_capacity(raw.len());
    for value in raw {
        let role = value
            .get("tipe_peran")
            .and_then(Value::as_str)
            .and_then(RoleType::parse);
        let Some(role) = role else {
            tracing::warn!(record = %value, "skipping dosen_peran record with unknown tipe_peran");
            continue;
        };
        let mut value = value;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("tipe_peran".to_string(), Value::String(role.as_str().to_string()));
        }
        match serde_json::from_value::<RoleRecord>(value) {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!("skipping malformed dosen_peran record: {err}"),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lecturer(value: Value) -> Lecturer {
        serde_json::from_value(value).expect("lecturer should decode")
    }

    #[test]
    fn expertise_is_normalized_from_any_shape() {
        let a = lecturer(json!({"id": 1, "name": "A", "keahlian": "[\" AI \",\"Data Mining\"]"}));
        let b = lecturer(json!({"id": 2, "name": "B", "keahlian": ["ai", "DATA MINING"]}));
        let c = lecturer(json!({"id": "3", "name": "C", "keahlian": "AI, data mining"}));
        assert_eq!(a.expertise, b.expertise);
        assert_eq!(b.expertise, c.expertise);
        assert_eq!(c.id, 3);
    }

    #[test]
    fn expertise_serializes_as_sorted_normalized_tags() {
        let l = lecturer(json!({"id": 1, "keahlian": "Data, AI, data"}));
        assert_eq!(serde_json::to_value(&l.expertise).expect("serialize"), json!(["ai", "data"]));
    }

    #[test]
    fn standby_tag_detected() {
        let l = lecturer(json!({"id": 1, "keahlian": "Standby"}));
        assert!(l.expertise.is_standby());
        let l = lecturer(json!({"id": 2, "keahlian": null}));
        assert!(!l.expertise.is_standby());
        assert!(l.expertise.is_empty());
    }

    #[test]
    fn overlap_uses_case_insensitive_substrings() {
        let e = Expertise::from_tags(["Kardiologi Anak", "AI"]);
        assert_eq!(e.overlap(&["kardiologi", "ai", "bedah"]), 2);
        assert_eq!(e.overlap(&["ai research"]), 1, "own tag contained in required tag");
        assert_eq!(e.overlap::<&str>(&[]), 0);
    }

    #[test]
    fn empty_requirement_is_satisfied_by_everyone() {
        let e = Expertise::default();
        assert!(e.satisfies::<&str>(&[]));
        assert!(e.satisfies(&["  "]));
        assert!(!e.satisfies(&["AI"]));
    }

    #[test]
    fn roles_decode_and_unknown_types_are_skipped() {
        let l = lecturer(json!({
            "id": 7,
            "name": "Dr. K",
            "dosen_peran": [
                {"tipe_peran": "Koordinator", "mata_kuliah_kode": "MK101", "semester": "1", "blok": 1},
                {"tipe_peran": "tim_blok", "mata_kuliah_kode": "MK102", "semester": 3},
                {"tipe_peran": "rektor", "mata_kuliah_kode": "MK101", "semester": 1}
            ]
        }));
        assert_eq!(l.roles.len(), 2);
        assert!(l.holds(RoleType::Coordinator, "MK101", 1));
        assert!(!l.holds(RoleType::Coordinator, "MK101", 3));
        assert!(l.is_core_staff_of("MK102", 3));
        assert!(!l.is_core_staff_of("MK102", 1));
    }

    #[test]
    fn record_without_semester_matches_any_semester() {
        let record = RoleRecord {
            tipe_peran: RoleType::BlockTeam,
            mata_kuliah_kode: "MK1".to_string(),
            semester: None,
            blok: None,
        };
        assert!(record.matches(RoleType::BlockTeam, "MK1", 5));
        assert!(!record.matches(RoleType::Coordinator, "MK1", 5));
    }

    #[test]
    fn snapshot_round_trip_keeps_canonical_tags() {
        let l = lecturer(json!({"id": 1, "name": "A", "keahlian": "AI, Standby"}));
        let encoded = serde_json::to_value(&l).expect("encode");
        assert_eq!(encoded["expertise"], json!(["ai", "standby"]));
        let decoded: Lecturer = serde_json::from_value(encoded).expect("decode");
        assert_eq!(decoded, l);
    }
}
