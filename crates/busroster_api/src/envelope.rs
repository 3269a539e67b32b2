//! Response envelopes and handler error mapping.
//!
//! # Invariants
//! - `ok == false` always carries a non-empty `error_code`.
//! - Envelopes are plain data; no handler panics to produce one.

use busroster_core::{DbError, RepoError, ValidationError};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Result envelope for mutating commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    /// Id of the created or affected record, when there is one.
    pub record_id: Option<String>,
    pub message: String,
    pub error_code: Option<String>,
}

impl ActionResponse {
    pub(crate) fn success(message: impl Into<String>, record_id: Option<String>) -> Self {
        Self {
            ok: true,
            record_id,
            message: message.into(),
            error_code: None,
        }
    }

    pub(crate) fn failure(operation: &str, err: &ApiError) -> Self {
        Self {
            ok: false,
            record_id: None,
            message: format!("{operation} failed: {err}"),
            error_code: Some(err.code().to_string()),
        }
    }
}

/// Result envelope for read-only queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub message: String,
    pub error_code: Option<String>,
}

impl<T> QueryResponse<T> {
    pub(crate) fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            data: Some(data),
            message: message.into(),
            error_code: None,
        }
    }

    pub(crate) fn failure(operation: &str, err: &ApiError) -> Self {
        Self {
            ok: false,
            data: None,
            message: format!("{operation} failed: {err}"),
            error_code: Some(err.code().to_string()),
        }
    }
}

/// Failure inside a command handler, before it becomes an envelope.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request field (bad UUID, unknown enum label, ...).
    InvalidInput(String),
    Open(DbError),
    Repo(RepoError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Open(_) => "db_open_failed",
            Self::Repo(err) => err.code(),
        }
    }

    /// Whether the request itself was at fault, as opposed to storage.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidInput(_) => true,
            Self::Open(_) => false,
            Self::Repo(err) => err.is_client_error(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "{message}"),
            Self::Open(err) => write!(f, "database open failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidInput(_) => None,
            Self::Open(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::Repo(RepoError::Validation(value))
    }
}

impl From<DbError> for ApiError {
    fn from(value: DbError) -> Self {
        Self::Open(value)
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::{ActionResponse, ApiError, QueryResponse};
    use busroster_core::{RepoError, ValidationError};

    #[test]
    fn failures_carry_codes() {
        let err = ApiError::from(ValidationError::EmptyStudentId);
        let action = ActionResponse::failure("on_add_student", &err);
        assert!(!action.ok);
        assert_eq!(action.error_code.as_deref(), Some("validation_error"));
        assert!(action.message.starts_with("on_add_student failed:"));

        let query: QueryResponse<u32> =
            QueryResponse::failure("on_attendance", &ApiError::InvalidInput("bad".into()));
        assert_eq!(query.error_code.as_deref(), Some("invalid_input"));
        assert_eq!(query.data, None);
    }

    #[test]
    fn client_and_storage_failures_are_told_apart() {
        assert!(ApiError::InvalidInput("bad".into()).is_client_error());
        assert!(ApiError::from(ValidationError::EmptyStudentId).is_client_error());
        assert!(!ApiError::from(RepoError::InvalidData("corrupt row".into())).is_client_error());
    }

    #[test]
    fn envelopes_serialize_with_stable_keys() {
        let value =
            serde_json::to_value(ActionResponse::success("Seeded.", Some("101".into()))).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["record_id"], "101");
        assert!(value["error_code"].is_null());
    }
}
