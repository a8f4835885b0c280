use serde::{Deserialize, Serialize};

use super::de;

/// A mata kuliah that runs PBL modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub kode: String,
    #[serde(default)]
    pub nama: String,
    #[serde(deserialize_with = "de::u32_lenient")]
    pub semester: u32,
    /// Term label (`Ganjil`, `Genap`, ...) matched against the active term.
    #[serde(default)]
    pub periode: String,
    #[serde(default, deserialize_with = "de::opt_u32_lenient")]
    pub blok: Option<u32>,
    #[serde(
        default,
        alias = "keahlian",
        deserialize_with = "de::string_list"
    )]
    pub keahlian_required: Vec<String>,
}

impl Course {
    /// True when the course belongs to the given term label.
    ///
    /// Courses without a `periode` are treated as belonging to every term.
    #[must_use]
    pub fn in_term(&self, term: &str) -> bool {
        let periode = self.periode.trim();
        periode.is_empty() || periode.eq_ignore_ascii_case(term.trim())
    }
}

/// One PBL module of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(deserialize_with = "de::u64_lenient")]
    pub id: u64,
    pub mata_kuliah_kode: String,
    #[serde(deserialize_with = "de::u32_lenient")]
    pub modul_ke: u32,
    #[serde(default, alias = "judul")]
    pub nama_modul: String,
}

/// A course together with its modules, as grouped by `GET /pbls/all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseModules {
    pub mata_kuliah: Course,
    #[serde(default)]
    pub pbls: Vec<Module>,
}

impl CourseModules {
    /// Sort modules by `modul_ke` and drop modules filed under another course.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let kode = self.mata_kuliah.kode.clone();
        self.pbls.retain(|module| {
            let keep = module.mata_kuliah_kode == kode;
            if !keep {
                tracing::warn!(
                    course = %kode,
                    module = module.id,
                    owner = %module.mata_kuliah_kode,
                    "module grouped under the wrong course, ignoring"
                );
            }
            keep
        });
        self.pbls.sort_by_key(|module| (module.modul_ke, module.id));
        self
    }

    #[must_use]
    pub fn module_ids(&self) -> Vec<u64> {
        self.pbls.iter().map(|module| module.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CourseModules {
        serde_json::from_value(json!({
            "mata_kuliah": {
                "kode": "MK101",
                "nama": "Blok Kardiovaskular",
                "semester": "1",
                "periode": "Ganjil",
                "blok": 2,
                "keahlian_required": "[\"Kardiologi\", \"Fisiologi\"]"
            },
            "pbls": [
                {"id": 12, "mata_kuliah_kode": "MK101", "modul_ke": "2", "nama_modul": "Gagal jantung"},
                {"id": 11, "mata_kuliah_kode": "MK101", "modul_ke": 1, "nama_modul": "Hipertensi"},
                {"id": 99, "mata_kuliah_kode": "MK999", "modul_ke": 1, "nama_modul": "Salah tempat"}
            ]
        }))
        .expect("course should decode")
    }

    #[test]
    fn decodes_lenient_course_payload() {
        let group = sample();
        assert_eq!(group.mata_kuliah.semester, 1);
        assert_eq!(group.mata_kuliah.blok, Some(2));
        assert_eq!(
            group.mata_kuliah.keahlian_required,
            vec!["Kardiologi", "Fisiologi"]
        );
    }

    #[test]
    fn normalized_sorts_modules_and_drops_foreign_ones() {
        let group = sample().normalized();
        assert_eq!(group.module_ids(), vec![11, 12]);
    }

    #[test]
    fn term_matching_is_case_insensitive_and_permissive_when_blank() {
        let mut course = sample().mata_kuliah;
        assert!(course.in_term("ganjil"));
        assert!(!course.in_term("Genap"));
        course.periode = "  ".to_string();
        assert!(course.in_term("Genap"));
    }
}
