//! Endpoint and runtime settings, read from the environment.
//!
//! `DATABASE_URL` wins over the individual `DB_*` variables. Every loader
//! takes a lookup closure so tests never touch the process environment.

use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::Serialize;
use url::Url;

use crate::bootstrap::SeedPolicy;
use crate::error::{BootstrapError, Result};

pub const DEFAULT_HOST: &str = "db";
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD: &str = "rootpassword";
pub const DEFAULT_DATABASE: &str = "contacts_db";
pub const DEFAULT_SQLITE_DATABASE: &str = "contacts_db.sqlite";
pub const DEFAULT_MAINTENANCE_DATABASE: &str = "postgres";

const MAX_IDENTIFIER_LEN: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    MySql,
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn default_port(self) -> u16 {
        match self {
            Backend::MySql => 3306,
            Backend::Postgres => 5432,
            Backend::Sqlite => 0,
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            Backend::MySql => "mysql",
            Backend::Postgres => "postgres",
            Backend::Sqlite => "sqlite",
        }
    }
}

impl FromStr for Backend {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Backend::MySql),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(BootstrapError::InvalidConfig(format!(
                "unknown database backend: {other}"
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Database name, or the file path for SQLite.
    pub database: String,
    /// PostgreSQL database connected to while creating `database`.
    pub maintenance_database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::MySql,
            host: DEFAULT_HOST.to_string(),
            port: Backend::MySql.default_port(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            maintenance_database: DEFAULT_MAINTENANCE_DATABASE.to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: Backend::Sqlite,
            host: String::new(),
            port: 0,
            user: String::new(),
            password: String::new(),
            database: path.into(),
            maintenance_database: String::new(),
        }
    }

    pub fn from_url(raw: &str) -> Result<Self> {
        if let Some(rest) = raw.strip_prefix("sqlite:") {
            let rest = rest.strip_prefix("//").unwrap_or(rest);
            let path = rest.split('?').next().unwrap_or_default();
            if path.is_empty() {
                return Err(BootstrapError::InvalidConfig(format!(
                    "sqlite url has no database path: {raw}"
                )));
            }
            return Ok(Self::sqlite(path));
        }

        let url = Url::parse(raw)
            .map_err(|e| BootstrapError::InvalidConfig(format!("invalid DATABASE_URL: {e}")))?;
        let backend: Backend = url.scheme().parse()?;
        let decode = |s: &str| percent_decode_str(s).decode_utf8_lossy().into_owned();

        let mut config = Self {
            backend,
            port: url.port().unwrap_or(backend.default_port()),
            ..Self::default()
        };
        if let Some(host) = url.host_str() {
            config.host = host.to_string();
        }
        if !url.username().is_empty() {
            config.user = decode(url.username());
        }
        if let Some(password) = url.password() {
            config.password = decode(password);
        }
        let database = url.path().trim_start_matches('/');
        if !database.is_empty() {
            config.database = decode(database);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            return Self::from_url(&url);
        }

        let backend = match lookup("DB_BACKEND") {
            Some(value) => value.parse()?,
            None => Backend::default(),
        };
        if backend == Backend::Sqlite {
            let path = lookup("DB_NAME").unwrap_or_else(|| DEFAULT_SQLITE_DATABASE.to_string());
            return Ok(Self::sqlite(path));
        }

        let port = match lookup("DB_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|e| {
                BootstrapError::InvalidConfig(format!("invalid DB_PORT {value:?}: {e}"))
            })?,
            None => backend.default_port(),
        };

        let config = Self {
            backend,
            host: lookup("DB_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            user: lookup("DB_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: lookup("DB_PASSWORD").unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
            database: lookup("DB_NAME").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            maintenance_database: lookup("DB_MAINTENANCE_NAME")
                .unwrap_or_else(|| DEFAULT_MAINTENANCE_DATABASE.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Server database names are spliced into DDL, so only plain identifiers
    /// are accepted.
    pub fn validate(&self) -> Result<()> {
        if self.backend == Backend::Sqlite {
            return Ok(());
        }
        for name in [&self.database, &self.maintenance_database] {
            check_identifier(name)?;
        }
        if self.host.is_empty() {
            return Err(BootstrapError::InvalidConfig("database host is empty".into()));
        }
        Ok(())
    }

    /// URL of the server without the target database selected.
    pub fn server_url(&self) -> Result<String> {
        match self.backend {
            Backend::MySql => Ok(self.base_url()?.to_string()),
            Backend::Postgres => {
                let mut url = self.base_url()?;
                url.set_path(&format!("/{}", self.maintenance_database));
                Ok(url.to_string())
            }
            Backend::Sqlite => self.database_url(),
        }
    }

    /// URL that connects straight into the target database.
    pub fn database_url(&self) -> Result<String> {
        match self.backend {
            Backend::Sqlite if self.is_in_memory() => Ok("sqlite::memory:".to_string()),
            Backend::Sqlite => Ok(format!("sqlite://{}?mode=rwc", self.database)),
            Backend::MySql | Backend::Postgres => {
                let mut url = self.base_url()?;
                url.set_path(&format!("/{}", self.database));
                Ok(url.to_string())
            }
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.backend == Backend::Sqlite && self.database == ":memory:"
    }

    fn base_url(&self) -> Result<Url> {
        let invalid = |what: &str| {
            BootstrapError::InvalidConfig(format!("cannot build {} url: {what}", self.backend))
        };
        let mut url = Url::parse(&format!(
            "{}://{}:{}",
            self.backend.scheme(),
            self.host,
            self.port
        ))
        .map_err(|e| invalid(&e.to_string()))?;
        url.set_username(&self.user)
            .map_err(|()| invalid("bad user"))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|()| invalid("bad password"))?;
        }
        Ok(url)
    }
}

fn check_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BootstrapError::InvalidConfig(format!(
            "database name must be 1-{MAX_IDENTIFIER_LEN} ASCII letters, digits or underscores: {name:?}"
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub seed_policy: SeedPolicy,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let seed_policy = match lookup("SEED_POLICY") {
            Some(value) => value.parse()?,
            None => SeedPolicy::default(),
        };
        let defaults = LoggingConfig::default();
        let logging = LoggingConfig {
            level: lookup("LOG_LEVEL").unwrap_or(defaults.level),
            format: lookup("LOG_FORMAT").unwrap_or(defaults.format),
        };
        Ok(Self {
            database: DatabaseConfig::from_lookup(&lookup)?,
            seed_policy,
            logging,
        })
    }
}
