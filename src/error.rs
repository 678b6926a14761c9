use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Duplicate phone number: {0}")]
    DuplicatePhoneNumber(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid contact: {0}")]
    InvalidContact(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl BootstrapError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicatePhoneNumber(_))
    }
}

impl From<sqlx::Error> for BootstrapError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                // `phone_number` is the only unique column besides the generated id
                ErrorKind::UniqueViolation => {
                    return Self::DuplicatePhoneNumber(db_err.message().to_string())
                }
                ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    return Self::ConstraintViolation(db_err.message().to_string())
                }
                _ => {}
            }
        }
        Self::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_pass_through() {
        let err = BootstrapError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, BootstrapError::Database(sqlx::Error::RowNotFound)));
        assert!(!err.is_duplicate());
    }

    #[test]
    fn display_keeps_engine_message() {
        let err = BootstrapError::DuplicatePhoneNumber(
            "Duplicate entry '050-1234567' for key 'phone_number'".to_string(),
        );
        assert_eq!(
            err.to_string(),
            "Duplicate phone number: Duplicate entry '050-1234567' for key 'phone_number'"
        );
        assert!(err.is_duplicate());
    }
}
