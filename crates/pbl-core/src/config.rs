use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-level config file, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = ".pblgen.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    /// Preferred output mode (`pretty`, `text`, `json`).
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Block-team seats per course; core staff is this plus one coordinator.
    #[serde(default = "default_team_size")]
    pub team_size: u32,
    /// Leave courses that already have lecturers untouched.
    #[serde(default = "default_true")]
    pub skip_assigned: bool,
    /// Seed for the random tie-break; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Term label override (`Ganjil`/`Genap`) instead of the backend's active term.
    #[serde(default)]
    pub term: Option<String>,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            team_size: default_team_size(),
            skip_assigned: default_true(),
            seed: None,
            term: None,
        }
    }
}

impl AllocationConfig {
    /// Coordinator seat plus block-team seats.
    #[must_use]
    pub const fn core_slots(&self) -> u32 {
        self.team_size.saturating_add(1)
    }
}

/// Parse a config file.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Candidate config files, most specific first.
#[must_use]
pub fn config_candidates(project_root: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![project_root.join(PROJECT_CONFIG_FILE)];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("pblgen/config.toml"));
    }
    candidates
}

/// Load the first existing config file, or defaults when there is none.
///
/// An explicit path must exist.
pub fn load_config(project_root: &Path, explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config_file(path);
    }

    for path in config_candidates(project_root) {
        if path.exists() {
            tracing::debug!("using config {}", path.display());
            return load_config_file(&path);
        }
    }

    Ok(Config::default())
}

/// Apply `PBLGEN_API_URL`, `PBLGEN_TOKEN` and `FORMAT` from `lookup`.
///
/// `lookup` is `std::env::var(..).ok()` in production and a map in tests.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("PBLGEN_API_URL").filter(|v| !v.trim().is_empty()) {
        config.api.base_url = url;
    }
    if let Some(token) = lookup("PBLGEN_TOKEN").filter(|v| !v.trim().is_empty()) {
        config.api.token = Some(token);
    }
    if let Some(format) = lookup("FORMAT").filter(|v| !v.trim().is_empty()) {
        config.output = Some(format);
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_team_size() -> u32 {
    4
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_staffing_shape() {
        let cfg = Config::default();
        assert_eq!(cfg.allocation.team_size, 4);
        assert_eq!(cfg.allocation.core_slots(), 5);
        assert!(cfg.allocation.skip_assigned);
        assert!(cfg.allocation.seed.is_none());
        assert_eq!(cfg.api.timeout_secs, 30);
        assert!(cfg.api.token.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://akademik.example.ac.id/api\"\n\n[allocation]\nteam_size = 3\nseed = 7\n",
        )
        .expect("write config");

        let cfg = load_config(dir.path(), None).expect("config loads");
        assert_eq!(cfg.api.base_url, "https://akademik.example.ac.id/api");
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.allocation.team_size, 3);
        assert_eq!(cfg.allocation.core_slots(), 4);
        assert_eq!(cfg.allocation.seed, Some(7));
        assert!(cfg.allocation.skip_assigned);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[allocation\nteam_size = ").expect("write config");
        let err = load_config(dir.path(), Some(&path)).expect_err("must fail");
        assert!(format!("{err:#}").contains("Failed to parse"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        assert!(load_config(dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("PBLGEN_API_URL", "http://10.0.0.5/api"),
            ("PBLGEN_TOKEN", "secret"),
            ("FORMAT", ""),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg, |key| env.get(key).map(ToString::to_string));
        assert_eq!(cfg.api.base_url, "http://10.0.0.5/api");
        assert_eq!(cfg.api.token.as_deref(), Some("secret"));
        assert!(cfg.output.is_none(), "blank values are ignored");
    }
}
