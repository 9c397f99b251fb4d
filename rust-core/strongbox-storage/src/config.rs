// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage configuration.
//
// Built from defaults, then overridden by `STRONGBOX_*` environment
// variables or a YAML config file supplied by the host application.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strongbox_core::RegistrationMode;
use thiserror::Error;

/// Errors raised while building a [`StorageConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable or config key holds an unusable value.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The selected backend needs a setting that was not given.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(String),
}

/// Which backend the engine stores through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Json,
    Yaml,
    Mysql,
    Sqlite,
    Postgres,
    Mongodb,
    Redb,
    Memory,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Json => "json",
            BackendKind::Yaml => "yaml",
            BackendKind::Mysql => "mysql",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Postgres => "postgres",
            BackendKind::Mongodb => "mongodb",
            BackendKind::Redb => "redb",
            BackendKind::Memory => "memory",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(BackendKind::Json),
            "yaml" | "yml" => Ok(BackendKind::Yaml),
            "mysql" | "mariadb" => Ok(BackendKind::Mysql),
            "sqlite" => Ok(BackendKind::Sqlite),
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "mongodb" | "mongo" => Ok(BackendKind::Mongodb),
            "redb" => Ok(BackendKind::Redb),
            "memory" | "in-memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relational connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Connection URL. SQLite falls back to a file under the data root.
    pub url: Option<String>,
    /// Pool size.
    pub max_connections: u32,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

/// MongoDB connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "strongbox".to_string(),
        }
    }
}

/// Everything needed to open a backend and register its engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    /// Root folder for the file backends, the SQLite default and redb.
    pub data_root: PathBuf,
    pub sql: SqlConfig,
    pub mongo: MongoConfig,
    pub registration: RegistrationMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            data_root: PathBuf::from("data"),
            sql: SqlConfig::default(),
            mongo: MongoConfig::default(),
            registration: RegistrationMode::default(),
        }
    }
}

fn parsed<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
        reason: e.to_string(),
    })
}

impl StorageConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `STRONGBOX_*` key. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get("STRONGBOX_BACKEND") {
            config.backend = parsed("STRONGBOX_BACKEND", value)?;
        }
        if let Some(value) = get("STRONGBOX_DATA_DIR") {
            config.data_root = PathBuf::from(value);
        }
        if let Some(value) = get("STRONGBOX_SQL_URL") {
            config.sql.url = Some(value);
        }
        if let Some(value) = get("STRONGBOX_SQL_MAX_CONNECTIONS") {
            config.sql.max_connections = parsed("STRONGBOX_SQL_MAX_CONNECTIONS", value)?;
        }
        if let Some(value) = get("STRONGBOX_MONGO_URI") {
            config.mongo.uri = value;
        }
        if let Some(value) = get("STRONGBOX_MONGO_DATABASE") {
            config.mongo.database = value;
        }
        if let Some(value) = get("STRONGBOX_REGISTRATION") {
            config.registration = parsed("STRONGBOX_REGISTRATION", value)?;
        }

        Ok(config)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// The SQL URL for the selected backend.
    ///
    /// SQLite defaults to `<data_root>/strongbox.db`; MySQL and PostgreSQL
    /// have no default.
    pub fn sql_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.sql.url {
            return Ok(url.clone());
        }
        match self.backend {
            BackendKind::Sqlite => Ok(format!(
                "sqlite://{}?mode=rwc",
                self.data_root.join("strongbox.db").display()
            )),
            _ => Err(ConfigError::Missing("STRONGBOX_SQL_URL")),
        }
    }

    /// Path of the redb database file.
    pub fn redb_path(&self) -> PathBuf {
        self.data_root.join("strongbox.redb")
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StorageConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, StorageConfig::default());
        assert_eq!(config.backend, BackendKind::Json);
        assert_eq!(config.data_root, PathBuf::from("data"));
        assert_eq!(config.sql.max_connections, 5);
        assert_eq!(config.mongo.database, "strongbox");
        assert_eq!(config.registration, RegistrationMode::Concrete);
    }

    #[test]
    fn test_env_overrides() {
        let config = StorageConfig::from_lookup(lookup(&[
            ("STRONGBOX_BACKEND", "Postgres"),
            ("STRONGBOX_DATA_DIR", "/var/lib/strongbox"),
            ("STRONGBOX_SQL_URL", "postgres://localhost/app"),
            ("STRONGBOX_SQL_MAX_CONNECTIONS", "12"),
            ("STRONGBOX_MONGO_DATABASE", "app"),
            ("STRONGBOX_REGISTRATION", "dual"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Postgres);
        assert_eq!(config.data_root, PathBuf::from("/var/lib/strongbox"));
        assert_eq!(config.sql_url().unwrap(), "postgres://localhost/app");
        assert_eq!(config.sql.max_connections, 12);
        assert_eq!(config.mongo.database, "app");
        assert_eq!(config.registration, RegistrationMode::Dual);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = StorageConfig::from_lookup(lookup(&[("STRONGBOX_BACKEND", "  ")])).unwrap();
        assert_eq!(config.backend, BackendKind::Json);
    }

    #[test]
    fn test_invalid_values() {
        let err = StorageConfig::from_lookup(lookup(&[("STRONGBOX_BACKEND", "cassandra")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "STRONGBOX_BACKEND"));

        let err = StorageConfig::from_lookup(lookup(&[("STRONGBOX_SQL_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("many"));
    }

    #[test]
    fn test_sql_url_defaults() {
        let mut config = StorageConfig {
            backend: BackendKind::Sqlite,
            data_root: PathBuf::from("store"),
            ..StorageConfig::default()
        };
        let url = config.sql_url().unwrap();
        assert!(url.starts_with("sqlite://store"));
        assert!(url.ends_with("strongbox.db?mode=rwc"));

        config.backend = BackendKind::Mysql;
        assert!(matches!(config.sql_url(), Err(ConfigError::Missing(_))));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_config() {
        let config = StorageConfig::from_yaml_str(
            "backend: mongodb\nmongo:\n  uri: mongodb://db:27017\nregistration: detached\n",
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::Mongodb);
        assert_eq!(config.mongo.uri, "mongodb://db:27017");
        assert_eq!(config.mongo.database, "strongbox");
        assert_eq!(config.registration, RegistrationMode::Detached);
        assert_eq!(config.data_root, PathBuf::from("data"));

        assert!(matches!(
            StorageConfig::from_yaml_str("backend: [1, 2]"),
            Err(ConfigError::Parse(_))
        ));
    }
}
