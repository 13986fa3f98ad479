//! Application settings.
//!
//! Layered lowest to highest: built-in defaults, `config/default.toml`,
//! `config/{ICU_HELPER_ENV}.toml`, then `ICU_HELPER_*` environment variables.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;

use crate::core::presets::PresetTable;

pub const ENV_PREFIX: &str = "ICU_HELPER";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Where drafts are written when no explicit path is given.
    pub draft_dir: PathBuf,
    /// Drug presets; replaces the built-in table when present.
    pub presets: PresetTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            draft_dir: PathBuf::from("drafts"),
            presets: PresetTable::default(),
        }
    }
}

/// Load settings relative to the working directory.
pub fn load() -> Result<Settings, ConfigError> {
    let env = std::env::var(format!("{}_ENV", ENV_PREFIX)).unwrap_or_else(|_| "development".into());
    load_from(Path::new("config"), &env)
}

/// Load settings from `config_dir`, using `{env}.toml` as the override file.
pub fn load_from(config_dir: &Path, env: &str) -> Result<Settings, ConfigError> {
    build(config_dir, env, None)
}

/// `vars` stands in for the process environment when given.
fn build(config_dir: &Path, env: &str, vars: Option<Map<String, String>>) -> Result<Settings, ConfigError> {
    let default_file = config_dir.join("default");
    let env_file = config_dir.join(env);

    Config::builder()
        .add_source(File::with_name(&default_file.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_file.to_string_lossy()).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).source(vars))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::presets::DoseUnit;

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_from(dir.path(), "test").unwrap();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.presets, PresetTable::default());
    }

    #[test]
    fn environment_file_overrides_default_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), "log_level = \"warn\"\ndraft_dir = \"/tmp/a\"\n").unwrap();
        std::fs::write(dir.path().join("ward.toml"), "draft_dir = \"/tmp/b\"\n").unwrap();

        let settings = load_from(dir.path(), "ward").unwrap();
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.draft_dir, PathBuf::from("/tmp/b"));
    }

    #[test]
    fn environment_variables_beat_both_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), "log_level = \"warn\"\n").unwrap();
        std::fs::write(dir.path().join("ward.toml"), "log_level = \"error\"\n").unwrap();

        let mut vars = Map::new();
        vars.insert("ICU_HELPER_LOG_LEVEL".to_string(), "debug".to_string());
        vars.insert("ICU_HELPER_DRAFT_DIR".to_string(), "/srv/drafts".to_string());

        let settings = build(dir.path(), "ward", Some(vars)).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.draft_dir, PathBuf::from("/srv/drafts"));
    }

    #[test]
    fn preset_table_is_replaced_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[[presets]]
name = "Norepinephrine"
drug_mg = 5.0
solvent_ml = 50.0
unit = "ug/kg/min"
threshold = 0.5
"#,
        )
        .unwrap();

        let settings = load_from(dir.path(), "none").unwrap();
        assert_eq!(settings.presets.len(), 1);
        let norepinephrine = settings.presets.get("norepinephrine").unwrap();
        assert_eq!(norepinephrine.threshold, Some(0.5));
        assert_eq!(norepinephrine.unit, DoseUnit::McgPerKgPerMin);
    }
}
