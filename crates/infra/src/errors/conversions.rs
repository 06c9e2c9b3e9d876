//! Conversions from external infrastructure errors into domain errors.

use roundtable_domain::RoundtableError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub RoundtableError);

impl From<InfraError> for RoundtableError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<RoundtableError> for InfraError {
    fn from(value: RoundtableError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoRoundtableError {
    fn into_roundtable(self) -> RoundtableError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → RoundtableError */
/* -------------------------------------------------------------------------- */

impl IntoRoundtableError for SqlError {
    fn into_roundtable(self) -> RoundtableError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        RoundtableError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        RoundtableError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        RoundtableError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        RoundtableError::Database("foreign key constraint violation".into())
                    }
                    _ => RoundtableError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                RoundtableError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                RoundtableError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                RoundtableError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                RoundtableError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(parameter_name) => {
                RoundtableError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => RoundtableError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => RoundtableError::Database("invalid SQL query".into()),
            other => RoundtableError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_roundtable())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → RoundtableError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(RoundtableError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
