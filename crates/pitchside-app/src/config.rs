// Configuration loading and validation (config/pitchside.toml).

use pitchside_core::squad::formation::Formation;
use pitchside_core::squad::state::PositionPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub squad: SquadConfig,
    pub formation: Formation,
    pub position_policy: PositionPolicy,
    pub latency_ms: u64,
    /// As written in the file; see `resolve_db_path`.
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// pitchside.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    squad: SquadConfig,
    #[serde(default)]
    lineup: LineupSection,
    #[serde(default)]
    service: ServiceSection,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquadConfig {
    pub team_id: String,
    pub squad_csv: String,
    pub transfers_csv: String,
    pub default_formation: String,
    pub transfer_budget: f64,
    pub wage_space: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LineupSection {
    /// `permissive` or `strict`; absent means permissive.
    #[serde(default)]
    position_policy: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ServiceSection {
    #[serde(default)]
    latency_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: String,
}

impl Config {
    /// Database file location. An empty `database.path` falls back to the
    /// platform data directory, then to the working directory.
    pub fn resolve_db_path(&self) -> PathBuf {
        if !self.db_path.trim().is_empty() {
            return PathBuf::from(&self.db_path);
        }
        match directories::ProjectDirs::from("", "", "pitchside") {
            Some(dirs) => dirs.data_dir().join("pitchside.db"),
            None => PathBuf::from("pitchside.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/pitchside.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("pitchside.toml");
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let formation = Formation::from_id(&file.squad.default_formation).ok_or_else(|| {
        ConfigError::ValidationError {
            field: "squad.default_formation".into(),
            message: format!("unknown formation '{}'", file.squad.default_formation),
        }
    })?;

    let position_policy = match file.lineup.position_policy.as_deref() {
        None => PositionPolicy::default(),
        Some(raw) => PositionPolicy::from_str_policy(raw).ok_or_else(|| {
            ConfigError::ValidationError {
                field: "lineup.position_policy".into(),
                message: format!("unknown position policy '{raw}'; use permissive or strict"),
            }
        })?,
    };

    let config = Config {
        squad: file.squad,
        formation,
        position_policy,
        latency_ms: file.service.latency_ms,
        db_path: file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            // Never overwrite a user's edited copy.
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Load config relative to the working directory, copying defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let squad = &config.squad;

    let required: &[(&str, &str)] = &[
        ("squad.team_id", &squad.team_id),
        ("squad.squad_csv", &squad.squad_csv),
        ("squad.transfers_csv", &squad.transfers_csv),
    ];
    for (name, val) in required {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    let money: &[(&str, f64)] = &[
        ("squad.transfer_budget", squad.transfer_budget),
        ("squad.wage_space", squad.wage_space),
    ];
    for (name, val) in money {
        if !val.is_finite() || *val < 0.0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be >= 0, got {val}"),
            });
        }
    }

    if config.latency_ms > 10_000 {
        return Err(ConfigError::ValidationError {
            field: "service.latency_ms".into(),
            message: format!("must be at most 10000, got {}", config.latency_ms),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Crate root holding `defaults/`, whether tests run from the crate or
    /// the workspace root.
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/pitchside-app/defaults").exists() {
            cwd.join("crates/pitchside-app")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    fn defaults_text() -> String {
        fs::read_to_string(project_root().join("defaults/pitchside.toml")).unwrap()
    }

    /// Fresh temp dir with `config/pitchside.toml` holding `text`.
    fn with_config(name: &str, text: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/pitchside.toml"), text).unwrap();
        tmp
    }

    fn expect_field(err: ConfigError, expected: &str) {
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = with_config("pitchside_cfg_defaults", &defaults_text());
        let config = load_config_from(&tmp).expect("defaults should load");

        assert_eq!(config.squad.team_id, "ars");
        assert_eq!(config.squad.squad_csv, "data/squad.csv");
        assert_eq!(config.squad.transfers_csv, "data/transfers.csv");
        assert_eq!(config.formation, Formation::F433);
        assert_eq!(config.position_policy, PositionPolicy::Permissive);
        assert_eq!(config.latency_ms, 150);
        assert!((config.squad.transfer_budget - 75.0).abs() < f64::EPSILON);
        assert_eq!(config.db_path, "pitchside.db");
        assert_eq!(config.resolve_db_path(), PathBuf::from("pitchside.db"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_once() {
        let tmp = std::env::temp_dir().join("pitchside_cfg_copy");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/pitchside.toml"), defaults_text()).unwrap();
        fs::write(tmp.join("defaults/extra.toml.example"), "x = 1").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config/pitchside.toml")]);
        assert!(!tmp.join("config/extra.toml.example").exists());

        // A user edit survives a second run.
        fs::write(tmp.join("config/pitchside.toml"), "edited").unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(tmp.join("config/pitchside.toml")).unwrap(),
            "edited"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_without_any_dirs_fails() {
        let tmp = std::env::temp_dir().join("pitchside_cfg_nothing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        let err = ensure_config_files(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultsCopyError { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let tmp = std::env::temp_dir().join("pitchside_cfg_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let tmp = with_config("pitchside_cfg_malformed", "[squad\nteam_id = ");
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_policy() {
        let text = defaults_text().replace(
            "position_policy = \"permissive\"",
            "position_policy = \"loose\"",
        );
        let tmp = with_config("pitchside_cfg_policy", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "lineup.position_policy");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_lineup_section_is_permissive() {
        let text = defaults_text()
            .replace("[lineup]", "")
            .replace("position_policy = \"permissive\"", "");
        let tmp = with_config("pitchside_cfg_no_lineup", &text);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.position_policy, PositionPolicy::Permissive);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn strict_policy_and_dashless_formation() {
        let text = defaults_text()
            .replace("position_policy = \"permissive\"", "position_policy = \"strict\"")
            .replace("default_formation = \"4-3-3\"", "default_formation = \"442\"");
        let tmp = with_config("pitchside_cfg_strict", &text);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.position_policy, PositionPolicy::Strict);
        assert_eq!(config.formation, Formation::F442);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_formation() {
        let text = defaults_text().replace(
            "default_formation = \"4-3-3\"",
            "default_formation = \"4-6-0\"",
        );
        let tmp = with_config("pitchside_cfg_formation", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "squad.default_formation");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_negative_budget() {
        let text = defaults_text().replace("transfer_budget = 75.0", "transfer_budget = -1.0");
        let tmp = with_config("pitchside_cfg_budget", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "squad.transfer_budget");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_team_id() {
        let text = defaults_text().replace("team_id = \"ars\"", "team_id = \"\"");
        let tmp = with_config("pitchside_cfg_team", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "squad.team_id");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_excessive_latency() {
        let text = defaults_text().replace("latency_ms = 150", "latency_ms = 60000");
        let tmp = with_config("pitchside_cfg_latency", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "service.latency_ms");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn empty_db_path_uses_data_dir() {
        let text = defaults_text().replace("path = \"pitchside.db\"", "path = \"\"");
        let tmp = with_config("pitchside_cfg_dbpath", &text);
        let config = load_config_from(&tmp).unwrap();
        let resolved = config.resolve_db_path();
        assert!(resolved.ends_with("pitchside.db"));
        let _ = fs::remove_dir_all(&tmp);
    }
}
