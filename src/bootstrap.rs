//! The bootstrap sequence: create the database, select it, create the
//! `contacts` table, then seed it.
//!
//! Every step runs in order over a single connection. Nothing is retried and
//! nothing is wrapped in a transaction; the seed insert is one statement, so
//! it lands all-or-nothing on its own.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use sqlx::{AnyConnection, Connection};
use tracing::{info, instrument};

use crate::config::{Backend, DatabaseConfig, Settings};
use crate::contact::{Contact, SEED_CONTACTS};
use crate::error::{BootstrapError, Result};
use crate::schema;

/// Decides whether the seed rows are inserted on a given run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedPolicy {
    /// Seed only when this run created the table.
    #[default]
    OnCreate,
    /// Insert on every run. Fails with a duplicate phone number once the
    /// table already holds the seed rows.
    Always,
}

impl SeedPolicy {
    pub fn should_seed(self, table_created: bool) -> bool {
        match self {
            SeedPolicy::OnCreate => table_created,
            SeedPolicy::Always => true,
        }
    }
}

impl FromStr for SeedPolicy {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on-create" | "on_create" | "oncreate" => Ok(SeedPolicy::OnCreate),
            "always" => Ok(SeedPolicy::Always),
            other => Err(BootstrapError::InvalidConfig(format!(
                "unknown seed policy: {other}"
            ))),
        }
    }
}

impl fmt::Display for SeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedPolicy::OnCreate => f.write_str("on-create"),
            SeedPolicy::Always => f.write_str("always"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub backend: Backend,
    pub database: String,
    pub database_created: bool,
    pub table_created: bool,
    pub seed_policy: SeedPolicy,
    pub seeded: u64,
    /// Table contents after the run, ordered by id.
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone)]
pub struct Bootstrapper {
    config: DatabaseConfig,
    seed_policy: SeedPolicy,
}

impl Bootstrapper {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            seed_policy: SeedPolicy::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.database.clone()).with_seed_policy(settings.seed_policy)
    }

    pub fn with_seed_policy(mut self, seed_policy: SeedPolicy) -> Self {
        self.seed_policy = seed_policy;
        self
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    #[instrument(
        skip(self),
        fields(backend = %self.config.backend, database = %self.config.database)
    )]
    pub async fn run(&self) -> Result<BootstrapReport> {
        self.config.validate()?;
        for seed in &SEED_CONTACTS {
            seed.validate()?;
        }
        sqlx::any::install_default_drivers();

        let backend = self.config.backend;
        let (mut conn, database_created) = self.open().await?;
        info!(database_created, "database ready");

        let table_created = schema::create_contacts_table(&mut conn, backend).await?;
        info!(table_created, "contacts table ready");

        let seeded = if self.seed_policy.should_seed(table_created) {
            let seeded = schema::insert_contacts(&mut conn, backend, &SEED_CONTACTS).await?;
            info!(seeded, "seed contacts inserted");
            seeded
        } else {
            info!(policy = %self.seed_policy, "table already existed, skipping seed");
            0
        };

        let contacts = schema::fetch_contacts(&mut conn).await?;
        conn.close().await?;

        Ok(BootstrapReport {
            backend,
            database: self.config.database.clone(),
            database_created,
            table_created,
            seed_policy: self.seed_policy,
            seeded,
            contacts,
        })
    }

    /// Runs the create-database and select-database steps, returning a
    /// connection scoped to the target database.
    async fn open(&self) -> Result<(AnyConnection, bool)> {
        let backend = self.config.backend;
        let name = self.config.database.as_str();

        match backend {
            Backend::MySql => {
                let mut conn = AnyConnection::connect(&self.config.server_url()?).await?;
                let created = schema::create_database(&mut conn, backend, name).await?;
                schema::use_database(&mut conn, backend, name).await?;
                Ok((conn, created))
            }
            Backend::Postgres => {
                // a postgres session cannot switch databases, so reconnect
                let mut admin = AnyConnection::connect(&self.config.server_url()?).await?;
                let created = schema::create_database(&mut admin, backend, name).await?;
                admin.close().await?;
                let conn = AnyConnection::connect(&self.config.database_url()?).await?;
                Ok((conn, created))
            }
            Backend::Sqlite => {
                let created =
                    self.config.is_in_memory() || tokio::fs::metadata(name).await.is_err();
                let conn = AnyConnection::connect(&self.config.database_url()?).await?;
                Ok((conn, created))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_create_only_seeds_new_tables() {
        assert!(SeedPolicy::OnCreate.should_seed(true));
        assert!(!SeedPolicy::OnCreate.should_seed(false));
        assert!(SeedPolicy::Always.should_seed(false));
    }

    #[test]
    fn seed_policy_parses_and_prints() {
        assert_eq!("on_create".parse::<SeedPolicy>().unwrap(), SeedPolicy::OnCreate);
        assert_eq!(" Always ".parse::<SeedPolicy>().unwrap(), SeedPolicy::Always);
        assert_eq!(SeedPolicy::OnCreate.to_string(), "on-create");
        assert!("sometimes".parse::<SeedPolicy>().is_err());
    }

    #[tokio::test]
    async fn rejects_invalid_config_before_connecting() {
        let config = DatabaseConfig {
            database: "contacts-db".to_string(),
            ..DatabaseConfig::default()
        };
        let err = Bootstrapper::new(config).run().await.unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidConfig(_)));
    }
}
