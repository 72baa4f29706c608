use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use {
    anyhow::Context,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::SnaplistConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "snaplist.toml",
    "snaplist.yaml",
    "snaplist.yml",
    "snaplist.json",
];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Lock guarding config read-modify-write cycles.
static CONFIG_SAVE_LOCK: Mutex<()> = Mutex::new(());

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Use `path` as the config directory for everything: `snaplist.toml`,
/// `credentials.json` and `defaults.json`. Replaces any previous override.
pub fn set_config_dir(path: PathBuf) {
    *lock(&CONFIG_DIR_OVERRIDE) = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *lock(&CONFIG_DIR_OVERRIDE) = None;
}

fn config_dir_override() -> Option<PathBuf> {
    lock(&CONFIG_DIR_OVERRIDE).clone()
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

/// The per-user config directory: the override, or `~/.config/snaplist/`.
///
/// Falls back to `./.snaplist` when no home directory can be resolved.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = config_dir_override() {
        return dir;
    }
    home_dir()
        .map(|h| h.join(".config").join("snaplist"))
        .unwrap_or_else(|| PathBuf::from(".snaplist"))
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<SnaplistConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./snaplist.{toml,yaml,yml,json}`
/// 2. `~/.config/snaplist/snaplist.{toml,yaml,yml,json}`
///
/// When nothing is found the defaults are written to the user-global path and
/// returned. A file that fails to parse is reported and replaced by defaults
/// in memory only.
pub fn discover_and_load() -> SnaplistConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, writing default config");
        let config = SnaplistConfig::default();
        if let Err(e) = write_default_config(&config) {
            warn!(error = %e, "failed to write default config file");
        }
        return config;
    };

    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        SnaplistConfig::default()
    })
}

/// When an override is set only that directory is searched.
fn find_config_file() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    match config_dir_override() {
        Some(dir) => dirs.push(dir),
        None => {
            dirs.push(PathBuf::new());
            dirs.push(config_dir());
        },
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.exists())
}

/// The config file in use, or where one would be written.
pub fn config_file_path() -> PathBuf {
    find_config_file().unwrap_or_else(|| config_dir().join("snaplist.toml"))
}

/// Load the current config, apply `f`, and save it back under a process-wide
/// lock. Returns the path written to.
pub fn update_config(f: impl FnOnce(&mut SnaplistConfig)) -> anyhow::Result<PathBuf> {
    let _guard = lock(&CONFIG_SAVE_LOCK);
    let mut config = discover_and_load();
    f(&mut config);
    save_config_inner(&config)
}

/// Write `config` to the discovered config path (TOML when none exists yet).
pub fn save_config(config: &SnaplistConfig) -> anyhow::Result<PathBuf> {
    let _guard = lock(&CONFIG_SAVE_LOCK);
    save_config_inner(config)
}

fn save_config_inner(config: &SnaplistConfig) -> anyhow::Result<PathBuf> {
    let path = config_file_path();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, render_config(config, &path)?)?;
    debug!(path = %path.display(), "saved config");
    Ok(path)
}

fn write_default_config(config: &SnaplistConfig) -> anyhow::Result<()> {
    let path = config_dir().join("snaplist.toml");
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, render_config(config, &path)?)?;
    debug!(path = %path.display(), "wrote default config file");
    Ok(())
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

fn render_config(config: &SnaplistConfig, path: &Path) -> anyhow::Result<String> {
    match extension(path) {
        "yaml" | "yml" => Ok(serde_yaml::to_string(config)?),
        "json" => Ok(serde_json::to_string_pretty(config)?),
        _ => toml::to_string_pretty(config).context("serialize config"),
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<SnaplistConfig> {
    match extension(path) {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        ext => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_format() {
        let toml_cfg = parse_config("[server]\nport = 7000\n", Path::new("a.toml")).unwrap();
        assert_eq!(toml_cfg.server.port, 7000);

        let yaml_cfg = parse_config("http:\n  timeout_secs: 5\n", Path::new("a.yaml")).unwrap();
        assert_eq!(yaml_cfg.http.timeout_secs, 5);

        let json_cfg =
            parse_config(r#"{"updates":{"check_on_start":false}}"#, Path::new("a.json")).unwrap();
        assert!(!json_cfg.updates.check_on_start);

        assert!(parse_config("", Path::new("a.ini")).is_err());
    }

    #[test]
    fn load_config_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("snaplist.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn render_then_parse_keeps_values() {
        let mut cfg = SnaplistConfig::default();
        cfg.server.port = 5050;
        cfg.server.public_host = Some("192.168.1.20".into());
        let path = Path::new("snaplist.toml");
        let back = parse_config(&render_config(&cfg, path).unwrap(), path).unwrap();
        assert_eq!(back.server.port, 5050);
        assert_eq!(back.server.public_host.as_deref(), Some("192.168.1.20"));
    }
}
