//! DDL and seed DML for the `contacts` table, rendered per backend.
//!
//! DDL goes through the plain-text protocol (`Executor::execute` with a bare
//! `&str`) because MySQL refuses `USE` and `CREATE DATABASE` as prepared
//! statements. Only the seed insert and lookups carry bind parameters.

use sqlx::{AnyConnection, Executor};
use tracing::debug;

use crate::config::Backend;
use crate::contact::{
    Contact, NewContact, FIRST_NAME_MAX_LEN, LAST_NAME_MAX_LEN, PHONE_NUMBER_MAX_LEN,
};
use crate::error::Result;

pub const TABLE_NAME: &str = "contacts";

const SELECT_CONTACTS: &str =
    "SELECT id, first_name, last_name, phone_number FROM contacts ORDER BY id";
const COUNT_CONTACTS: &str = "SELECT COUNT(*) FROM contacts";

/// Returns `None` for SQLite, where opening the file creates the database.
pub fn database_exists_sql(backend: Backend) -> Option<&'static str> {
    match backend {
        Backend::MySql => {
            Some("SELECT COUNT(*) FROM information_schema.schemata WHERE schema_name = ?")
        }
        Backend::Postgres => Some("SELECT COUNT(*) FROM pg_database WHERE datname = $1"),
        Backend::Sqlite => None,
    }
}

/// `name` must already have passed `DatabaseConfig::validate`.
pub fn create_database_sql(backend: Backend, name: &str) -> Option<String> {
    match backend {
        Backend::MySql => Some(format!("CREATE DATABASE IF NOT EXISTS `{name}`")),
        // no IF NOT EXISTS on postgres; callers check pg_database first
        Backend::Postgres => Some(format!("CREATE DATABASE \"{name}\"")),
        Backend::Sqlite => None,
    }
}

pub fn use_database_sql(backend: Backend, name: &str) -> Option<String> {
    match backend {
        Backend::MySql => Some(format!("USE `{name}`")),
        Backend::Postgres | Backend::Sqlite => None,
    }
}

pub fn table_exists_sql(backend: Backend) -> &'static str {
    match backend {
        Backend::MySql => {
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = 'contacts'"
        }
        Backend::Postgres => {
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = 'contacts'"
        }
        Backend::Sqlite => {
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'contacts'"
        }
    }
}

pub fn create_table_sql(backend: Backend) -> String {
    match backend {
        Backend::MySql => format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
    id BIGINT NOT NULL AUTO_INCREMENT,
    first_name VARCHAR({FIRST_NAME_MAX_LEN}) NOT NULL,
    last_name VARCHAR({LAST_NAME_MAX_LEN}) NOT NULL,
    phone_number VARCHAR({PHONE_NUMBER_MAX_LEN}) NOT NULL,
    PRIMARY KEY (id),
    UNIQUE KEY uq_contacts_phone_number (phone_number)
)"
        ),
        Backend::Postgres => format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    first_name VARCHAR({FIRST_NAME_MAX_LEN}) NOT NULL,
    last_name VARCHAR({LAST_NAME_MAX_LEN}) NOT NULL,
    phone_number VARCHAR({PHONE_NUMBER_MAX_LEN}) NOT NULL,
    CONSTRAINT uq_contacts_phone_number UNIQUE (phone_number)
)"
        ),
        // AUTOINCREMENT keeps sqlite from reusing the ids of deleted rows
        Backend::Sqlite => format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL CHECK (length(first_name) <= {FIRST_NAME_MAX_LEN}),
    last_name TEXT NOT NULL CHECK (length(last_name) <= {LAST_NAME_MAX_LEN}),
    phone_number TEXT NOT NULL UNIQUE CHECK (length(phone_number) <= {PHONE_NUMBER_MAX_LEN})
)"
        ),
    }
}

/// One multi-row `INSERT`, so a single duplicate rejects every row.
pub fn insert_sql(backend: Backend, rows: usize) -> String {
    let tuples: Vec<String> = (0..rows)
        .map(|row| {
            let base = row * 3;
            format!(
                "({}, {}, {})",
                placeholder(backend, base + 1),
                placeholder(backend, base + 2),
                placeholder(backend, base + 3)
            )
        })
        .collect();
    format!(
        "INSERT INTO {TABLE_NAME} (first_name, last_name, phone_number) VALUES {}",
        tuples.join(", ")
    )
}

fn placeholder(backend: Backend, position: usize) -> String {
    match backend {
        Backend::Postgres => format!("${position}"),
        Backend::MySql | Backend::Sqlite => "?".to_string(),
    }
}

pub async fn database_exists(
    conn: &mut AnyConnection,
    backend: Backend,
    name: &str,
) -> Result<bool> {
    let Some(sql) = database_exists_sql(backend) else {
        return Ok(true);
    };
    let count: i64 = sqlx::query_scalar(sql).bind(name).fetch_one(&mut *conn).await?;
    Ok(count > 0)
}

/// Creates `name` unless it exists. Returns whether it was created.
pub async fn create_database(
    conn: &mut AnyConnection,
    backend: Backend,
    name: &str,
) -> Result<bool> {
    let Some(sql) = create_database_sql(backend, name) else {
        return Ok(false);
    };
    if database_exists(conn, backend, name).await? {
        return Ok(false);
    }
    debug!(%sql, "creating database");
    conn.execute(sql.as_str()).await?;
    Ok(true)
}

pub async fn use_database(conn: &mut AnyConnection, backend: Backend, name: &str) -> Result<()> {
    if let Some(sql) = use_database_sql(backend, name) {
        debug!(%sql, "selecting database");
        conn.execute(sql.as_str()).await?;
    }
    Ok(())
}

pub async fn table_exists(conn: &mut AnyConnection, backend: Backend) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(table_exists_sql(backend))
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Creates the `contacts` table unless it exists. Returns whether it was
/// created.
pub async fn create_contacts_table(conn: &mut AnyConnection, backend: Backend) -> Result<bool> {
    if table_exists(conn, backend).await? {
        return Ok(false);
    }
    let sql = create_table_sql(backend);
    debug!(%sql, "creating table");
    conn.execute(sql.as_str()).await?;
    Ok(true)
}

pub async fn insert_contacts(
    conn: &mut AnyConnection,
    backend: Backend,
    rows: &[NewContact<'_>],
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let sql = insert_sql(backend, rows.len());
    debug!(%sql, rows = rows.len(), "inserting contacts");

    let mut query = sqlx::query(&sql);
    for row in rows {
        query = query
            .bind(row.first_name)
            .bind(row.last_name)
            .bind(row.phone_number);
    }
    let result = query.execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

pub async fn count_contacts(conn: &mut AnyConnection) -> Result<i64> {
    let count = sqlx::query_scalar(COUNT_CONTACTS)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn fetch_contacts(conn: &mut AnyConnection) -> Result<Vec<Contact>> {
    let contacts = sqlx::query_as::<_, Contact>(SELECT_CONTACTS)
        .fetch_all(&mut *conn)
        .await?;
    Ok(contacts)
}
