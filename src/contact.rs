use serde::Serialize;

use crate::error::{BootstrapError, Result};

pub const FIRST_NAME_MAX_LEN: usize = 50;
pub const LAST_NAME_MAX_LEN: usize = 50;
pub const PHONE_NUMBER_MAX_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

/// A contact row before the storage layer assigns its `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewContact<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: &'a str,
}

/// Rows inserted when the `contacts` table is first created, in id order.
pub const SEED_CONTACTS: [NewContact<'static>; 4] = [
    NewContact {
        first_name: "John",
        last_name: "Doe",
        phone_number: "050-1234567",
    },
    NewContact {
        first_name: "Jane",
        last_name: "Smith",
        phone_number: "052-9876543",
    },
    NewContact {
        first_name: "David",
        last_name: "Cohen",
        phone_number: "054-5551234",
    },
    NewContact {
        first_name: "Sarah",
        last_name: "Levi",
        phone_number: "053-7778899",
    },
];

impl NewContact<'_> {
    /// Checks the same limits the `contacts` columns enforce.
    pub fn validate(&self) -> Result<()> {
        check_field("first_name", self.first_name, FIRST_NAME_MAX_LEN)?;
        check_field("last_name", self.last_name, LAST_NAME_MAX_LEN)?;
        check_field("phone_number", self.phone_number, PHONE_NUMBER_MAX_LEN)
    }
}

fn check_field(name: &str, value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BootstrapError::InvalidContact(format!("{name} is required")));
    }
    let len = value.chars().count();
    if len > max_len {
        return Err(BootstrapError::InvalidContact(format!(
            "{name} is {len} characters, max is {max_len}"
        )));
    }
    Ok(())
}
