//! Engine configuration: an explicit struct instead of ambient globals.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration handed to [`crate::Engine::open`].
///
/// `database: None` opens an in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    pub database: Option<PathBuf>,
}

impl EngineConfig {
    pub fn in_memory() -> Self {
        Self { database: None }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            database: Some(path.into()),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("rowmap.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<EngineConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: EngineConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &EngineConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rowmap.toml");

        let config = EngineConfig::file("/var/lib/app/app.db");
        write_config(&path, &config, false).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database, config.database);
    }

    #[test]
    fn test_write_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rowmap.toml");

        write_config(&path, &EngineConfig::in_memory(), false).unwrap();
        assert!(write_config(&path, &EngineConfig::in_memory(), false).is_err());
        write_config(&path, &EngineConfig::in_memory(), true).unwrap();
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_file_config_opens_on_disk_engine() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("data").join("app.db");
        ensure_db_dir(&db_path).unwrap();

        let engine = crate::Engine::open(&EngineConfig::file(&db_path)).unwrap();
        engine
            .execute("CREATE TABLE t (id TEXT PRIMARY KEY)", &[])
            .unwrap();
        assert!(db_path.exists());
    }
}
