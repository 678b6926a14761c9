//! Bootstraps the `contacts` database: creates the database and table if
//! they are missing and inserts the seed contacts.

pub mod bootstrap;
pub mod config;
pub mod contact;
pub mod error;
pub mod logging;
pub mod schema;

pub use bootstrap::{BootstrapReport, Bootstrapper, SeedPolicy};
pub use config::{Backend, DatabaseConfig, LoggingConfig, Settings};
pub use contact::{Contact, NewContact, SEED_CONTACTS};
pub use error::{BootstrapError, Result};
