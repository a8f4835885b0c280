//! Blocking REST client for the academic backend.

use std::collections::BTreeMap;
use std::time::Duration;

use pbl_core::config::ApiConfig;
use pbl_core::model::{
    ActiveTerm, AssignedMap, Assignment, CourseModules, GroupMapping, Lecturer, ReportingRow,
    SmallGroupRow,
};
use pbl_core::{Backend, BackendError};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// [`Backend`] over HTTP, one request per call.
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json")
            .set("User-Agent", concat!("pblgen/", env!("CARGO_PKG_VERSION")));
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request
    }

    fn get_value(&self, path: &str) -> Result<Value, BackendError> {
        debug!(path, "GET");
        let response = self
            .request("GET", path)
            .call()
            .map_err(|err| map_error(path, err))?;
        read_body(path, response)
    }

    fn post_value(&self, path: &str, body: &Value) -> Result<Value, BackendError> {
        debug!(path, "POST");
        let response = self
            .request("POST", path)
            .send_json(body)
            .map_err(|err| map_error(path, err))?;
        read_body(path, response)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        decode(path, unwrap_data(self.get_value(path)?))
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, BackendError> {
        decode(path, unwrap_data(self.post_value(path, body)?))
    }
}

fn read_body(path: &str, response: ureq::Response) -> Result<Value, BackendError> {
    let text = response.into_string().map_err(|err| BackendError::Transport {
        path: path.to_string(),
        reason: err.to_string(),
    })?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|err| BackendError::Decode {
        path: path.to_string(),
        reason: err.to_string(),
    })
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|err| BackendError::Decode {
        path: path.to_string(),
        reason: err.to_string(),
    })
}

/// Translate a ureq failure, keeping the backend's `message` when it sent one.
fn map_error(path: &str, err: ureq::Error) -> BackendError {
    match err {
        ureq::Error::Status(status, response) => {
            let message = response
                .into_string()
                .ok()
                .and_then(|body| serde_json::from_str::<Value>(&body).ok())
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
                .filter(|message| !message.trim().is_empty());
            match message {
                Some(message) => BackendError::Rejected { status, message },
                None => BackendError::Status {
                    path: path.to_string(),
                    status,
                },
            }
        }
        ureq::Error::Transport(transport) => BackendError::Transport {
            path: path.to_string(),
            reason: transport.to_string(),
        },
    }
}

/// Keys that may sit next to `data` in a response envelope or a Laravel paginator.
const ENVELOPE_KEYS: &[&str] = &[
    "success",
    "status",
    "message",
    "meta",
    "links",
    "current_page",
    "first_page_url",
    "from",
    "last_page",
    "last_page_url",
    "next_page_url",
    "path",
    "per_page",
    "prev_page_url",
    "to",
    "total",
];

fn is_envelope(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("data")
        && map
            .keys()
            .all(|key| key == "data" || ENVELOPE_KEYS.contains(&key.as_str()))
}

/// `{"data": ...}` envelopes and paginators are unwrapped; bare bodies pass through.
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if is_envelope(&map) => {
            if map.get("next_page_url").is_some_and(|next| !next.is_null()) {
                warn!(
                    total = ?map.get("total"),
                    "response is paginated, only the first page is used"
                );
            }
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// `/pbls/all` is keyed by course code; keep the backend's key order.
fn decode_courses(path: &str, value: Value) -> Result<Vec<CourseModules>, BackendError> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(_, group)| decode::<CourseModules>(path, group))
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .map(|group| decode::<CourseModules>(path, group))
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(BackendError::Decode {
            path: path.to_string(),
            reason: format!("expected an object of courses, got {other}"),
        }),
    }
}

/// Rows keyed by semester, or a flat list bucketed by each row's semester.
fn decode_groups_by_semester(
    path: &str,
    value: Value,
) -> Result<BTreeMap<u32, Vec<SmallGroupRow>>, BackendError> {
    let mut by_semester: BTreeMap<u32, Vec<SmallGroupRow>> = BTreeMap::new();
    let rows: Vec<SmallGroupRow> = match value {
        Value::Object(map) => {
            let mut rows = Vec::new();
            for (_, bucket) in map {
                rows.extend(decode::<Vec<SmallGroupRow>>(path, bucket)?);
            }
            rows
        }
        Value::Null => Vec::new(),
        other => decode(path, other)?,
    };
    for row in rows {
        by_semester.entry(row.semester).or_default().push(row);
    }
    Ok(by_semester)
}

/// Group names as strings, numbers, or `{nama_kelompok}` objects.
fn group_names(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => obj.get("nama_kelompok").map(|name| match name {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }),
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        other => pbl_core::model::de::split_tags(other),
    }
}

fn decode_mapping(path: &str, value: Value) -> Result<GroupMapping, BackendError> {
    let by_semester = match value {
        Value::Object(map) => map,
        Value::Null => return Ok(GroupMapping::new()),
        _ => {
            warn!(path, "unexpected group mapping shape, ignoring");
            return Ok(GroupMapping::new());
        }
    };
    let mut mapping = GroupMapping::new();
    for (semester, courses) in by_semester {
        let semester: u32 = semester.trim().parse().map_err(|_| BackendError::Decode {
            path: path.to_string(),
            reason: format!("semester key {semester:?} is not a number"),
        })?;
        let entry = mapping.entry(semester).or_default();
        if let Value::Object(courses) = courses {
            for (kode, names) in courses {
                entry.insert(kode, group_names(&names));
            }
        }
    }
    Ok(mapping)
}

/// `/users` may return a bare list or a paginated envelope.
fn decode_lecturers(path: &str, value: Value) -> Result<Vec<Lecturer>, BackendError> {
    match value {
        Value::Null => Ok(Vec::new()),
        other => decode(path, other),
    }
}

/// No active tahun ajaran comes back as `null` or an empty body.
fn decode_term(path: &str, value: Value) -> Result<ActiveTerm, BackendError> {
    match value {
        Value::Null => Ok(ActiveTerm::default()),
        other => decode(path, other),
    }
}

impl Backend for HttpBackend {
    fn fetch_courses(&self) -> Result<Vec<CourseModules>, BackendError> {
        const PATH: &str = "/pbls/all";
        decode_courses(PATH, unwrap_data(self.get_value(PATH)?))
    }

    fn fetch_lecturers(&self) -> Result<Vec<Lecturer>, BackendError> {
        const PATH: &str = "/users?role=dosen";
        decode_lecturers(PATH, unwrap_data(self.get_value(PATH)?))
    }

    fn fetch_active_term(&self) -> Result<ActiveTerm, BackendError> {
        const PATH: &str = "/tahun-ajaran/active";
        decode_term(PATH, unwrap_data(self.get_value(PATH)?))
    }

    fn fetch_all_small_groups(&self) -> Result<Vec<SmallGroupRow>, BackendError> {
        self.get("/kelompok-kecil")
    }

    fn fetch_small_groups(
        &self,
        semesters: &[u32],
    ) -> Result<BTreeMap<u32, Vec<SmallGroupRow>>, BackendError> {
        const PATH: &str = "/kelompok-kecil/batch-by-semester";
        let body = self.post_value(PATH, &json!({ "semesters": semesters }))?;
        decode_groups_by_semester(PATH, unwrap_data(body))
    }

    fn fetch_group_mapping(&self, semesters: &[u32]) -> Result<GroupMapping, BackendError> {
        const PATH: &str = "/mata-kuliah/pbl-kelompok-kecil/batch-multi-semester";
        let body = self.post_value(PATH, &json!({ "semesters": semesters }))?;
        decode_mapping(PATH, unwrap_data(body))
    }

    fn fetch_assigned(&self, pbl_ids: &[u64]) -> Result<AssignedMap, BackendError> {
        self.post("/pbls/assigned-dosen-batch", &json!({ "pbl_ids": pbl_ids }))
    }

    fn fetch_reporting(&self) -> Result<Vec<ReportingRow>, BackendError> {
        self.get("/reporting/dosen-pbl")
    }

    fn assign_batch(&self, assignments: &[Assignment]) -> Result<(), BackendError> {
        self.post_value(
            "/pbls/assign-dosen-batch",
            &json!({ "assignments": assignments }),
        )
        .map(drop)
    }

    fn reset_batch(&self, pbl_ids: &[u64]) -> Result<(), BackendError> {
        self.post_value("/pbls/reset-dosen-batch", &json!({ "pbl_ids": pbl_ids }))
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_with_message_becomes_rejection() {
        let response = ureq::Response::new(422, "Unprocessable Entity", r#"{"message":"Dosen tidak ditemukan"}"#)
            .expect("response");
        let err = map_error("/pbls/assign-dosen-batch", ureq::Error::Status(422, response));
        assert_eq!(
            err,
            BackendError::Rejected {
                status: 422,
                message: "Dosen tidak ditemukan".to_string()
            }
        );
    }

    #[test]
    fn status_without_message_keeps_path() {
        let response = ureq::Response::new(500, "Internal Server Error", "<html>oops</html>")
            .expect("response");
        let err = map_error("/pbls/all", ureq::Error::Status(500, response));
        assert_eq!(
            err,
            BackendError::Status {
                path: "/pbls/all".to_string(),
                status: 500
            }
        );
    }

    #[test]
    fn courses_keep_backend_order() {
        let body = json!({
            "MK3": {"mata_kuliah": {"kode": "MK3", "semester": 3}, "pbls": []},
            "MK1": {"mata_kuliah": {"kode": "MK1", "semester": 1}, "pbls": []}
        });
        let courses = decode_courses("/pbls/all", body).expect("decode");
        let kodes: Vec<&str> = courses.iter().map(|c| c.mata_kuliah.kode.as_str()).collect();
        assert_eq!(kodes, vec!["MK3", "MK1"]);
    }

    #[test]
    fn data_envelope_is_unwrapped() {
        let body = unwrap_data(json!({"data": [{"id": 1, "name": "A"}], "total": 1}));
        let lecturers = decode_lecturers("/users", body).expect("decode");
        assert_eq!(lecturers[0].id, 1);

        let bare = unwrap_data(json!({"semesters": [{"jenis": "Genap"}]}));
        assert!(bare.get("semesters").is_some());
    }

    #[test]
    fn paginator_body_is_unwrapped() {
        let body = unwrap_data(json!({
            "current_page": 1,
            "data": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}],
            "first_page_url": "http://localhost/api/users?page=1",
            "from": 1,
            "last_page": 1,
            "last_page_url": "http://localhost/api/users?page=1",
            "links": [],
            "next_page_url": null,
            "path": "http://localhost/api/users",
            "per_page": 15,
            "prev_page_url": null,
            "to": 2,
            "total": 2
        }));
        let lecturers = decode_lecturers("/users?role=dosen", body).expect("decode");
        assert_eq!(lecturers.iter().map(|l| l.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn objects_with_domain_keys_are_not_unwrapped() {
        let body = json!({"data": 1, "kode": "MK1"});
        assert_eq!(unwrap_data(body.clone()), body);
    }

    #[test]
    fn missing_active_term_loads_every_term() {
        let term = decode_term("/tahun-ajaran/active", unwrap_data(Value::Null)).expect("null");
        assert_eq!(term, ActiveTerm::default());
        assert!(term.jenis().is_none());

        let wrapped = decode_term("/tahun-ajaran/active", unwrap_data(json!({"data": null})))
            .expect("empty envelope");
        assert!(wrapped.jenis().is_none());

        let active = decode_term(
            "/tahun-ajaran/active",
            unwrap_data(json!({"success": true, "data": {"tahun": "2025/2026", "semesters": [{"jenis": "Genap"}]}})),
        )
        .expect("active");
        assert_eq!(active.jenis(), Some("Genap"));
    }

    #[test]
    fn groups_by_semester_accepts_map_and_list() {
        let map = json!({
            "1": [{"semester": 1, "nama_kelompok": "1", "mahasiswa_id": 5}],
            "3": [{"semester": "3", "nama_kelompok": "2", "mahasiswa_id": 6}]
        });
        let by_semester = decode_groups_by_semester("/x", map).expect("map");
        assert_eq!(by_semester.keys().copied().collect::<Vec<_>>(), vec![1, 3]);

        let list = json!([{"semester": 5, "nama_kelompok": "1"}]);
        let by_semester = decode_groups_by_semester("/x", list).expect("list");
        assert_eq!(by_semester[&5].len(), 1);
    }

    #[test]
    fn mapping_accepts_mixed_name_shapes() {
        let body = json!({
            "1": {"MK1": ["1", 2, {"nama_kelompok": "3"}]},
            "3": {"MK3": "4, 5"}
        });
        let mapping = decode_mapping("/x", body).expect("decode");
        assert_eq!(mapping[&1]["MK1"], vec!["1", "2", "3"]);
        assert_eq!(mapping[&3]["MK3"], vec!["4", "5"]);
        assert!(decode_mapping("/x", json!({"ganjil": {}})).is_err());
    }

    #[test]
    fn token_and_base_url_are_normalized() {
        let backend = HttpBackend::new(&ApiConfig {
            base_url: "http://localhost:8000/api/".to_string(),
            token: Some("  ".to_string()),
            timeout_secs: 5,
        });
        assert_eq!(backend.base_url, "http://localhost:8000/api");
        assert!(backend.token.is_none());
    }
}
