use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{error, warn};

/// Field name -> message map attached to `VALIDATION` responses.
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

/// Every failure the API can answer with, mapped 1:1 onto the wire codes
/// the pages understand.
#[derive(Debug)]
pub enum ServiceError {
    /// Client input broke a contract; carries a message, a field map, or both
    Validation {
        message: Option<String>,
        fields: FieldErrors,
    },

    /// Addressed resource does not exist
    NotFound,

    /// No session cookie, or the token is unknown
    Unauthorized,

    /// The session existed but sat idle past the limit
    SessionExpired,

    /// Login throttled for this client
    Locked { seconds_left: u64 },

    /// The database predates the feature migration
    MigrationRequired,

    /// Database operation failed
    Database(sqlx::Error),

    /// Filesystem operation failed
    Io(std::io::Error),

    /// Broken internal assumption
    Internal(String),
}

impl ServiceError {
    pub fn validation_msg(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: Some(message.into()),
            fields: FieldErrors::new(),
        }
    }

    pub fn validation_fields(fields: FieldErrors) -> Self {
        ServiceError::Validation {
            message: None,
            fields,
        }
    }

    /// Single-field variant of [`validation_fields`].
    ///
    /// [`validation_fields`]: ServiceError::validation_fields
    pub fn field(name: &'static str, message: &'static str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name, message);
        ServiceError::validation_fields(fields)
    }

    pub fn invalid_id() -> Self {
        ServiceError::validation_msg("ID inválido")
    }
}

/// Objects created by the feature migration. A "does not exist" database
/// error naming one of these means the migration was never run, which gets
/// its own wire code so operators see the fix immediately.
const MIGRATION_OBJECTS: [&str; 6] = [
    "prioridades",
    "trabajos_log",
    "comentarios",
    "prioridad_id",
    "fecha_objetivo",
    "responsable_",
];

pub fn is_migration_missing(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = err else {
        return false;
    };
    let msg = db.message().to_lowercase();
    msg.contains("does not exist") && MIGRATION_OBJECTS.iter().any(|o| msg.contains(o))
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if is_migration_missing(&err) {
            ServiceError::MigrationRequired
        } else {
            ServiceError::Database(err)
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Io(err)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation { message, fields } => match message {
                Some(m) => write!(f, "Validation error: {}", m),
                None => write!(f, "Validation error in {} field(s)", fields.len()),
            },
            ServiceError::NotFound => write!(f, "Not found"),
            ServiceError::Unauthorized => write!(f, "Session required"),
            ServiceError::SessionExpired => write!(f, "Session expired"),
            ServiceError::Locked { seconds_left } => {
                write!(f, "Login locked for {}s", seconds_left)
            }
            ServiceError::MigrationRequired => write!(f, "Feature migration missing"),
            ServiceError::Database(e) => write!(f, "Database error: {}", e),
            ServiceError::Io(e) => write!(f, "IO error: {}", e),
            ServiceError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized | ServiceError::SessionExpired => StatusCode::UNAUTHORIZED,
            ServiceError::Locked { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::MigrationRequired
            | ServiceError::Database(_)
            | ServiceError::Io(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Validation { message, fields } => {
                warn!("Validation rejected: {}", self);
                let mut body = json!({ "ok": false, "error": "VALIDATION" });
                if let Some(m) = message {
                    body["message"] = json!(m);
                }
                if !fields.is_empty() {
                    body["fields"] = json!(fields);
                }
                HttpResponse::BadRequest().json(body)
            }
            ServiceError::NotFound => {
                HttpResponse::NotFound().json(json!({ "ok": false, "error": "NOT_FOUND" }))
            }
            ServiceError::Unauthorized => HttpResponse::Unauthorized().json(json!({
                "ok": false,
                "error": "UNAUTHORIZED",
                "message": "Sesión requerida",
            })),
            ServiceError::SessionExpired => HttpResponse::Unauthorized().json(json!({
                "ok": false,
                "error": "SESSION_EXPIRED",
                "message": "Sesión expirada por inactividad",
            })),
            ServiceError::Locked { seconds_left } => {
                warn!("Login locked, {}s remaining", seconds_left);
                HttpResponse::TooManyRequests().json(json!({
                    "ok": false,
                    "error": "LOCKED",
                    "message": format!("Demasiados intentos. Intenta nuevamente en {}s.", seconds_left),
                }))
            }
            ServiceError::MigrationRequired => {
                error!("Schema is missing feature objects; run the pending migrations");
                HttpResponse::InternalServerError().json(json!({
                    "ok": false,
                    "error": "MIGRATION_REQUIRED",
                    "message": "Falta ejecutar la migración 0002_add_features",
                }))
            }
            ServiceError::Database(e) => {
                error!("Database error: {}", e);
                HttpResponse::InternalServerError()
                    .json(json!({ "ok": false, "error": "SERVER_ERROR" }))
            }
            ServiceError::Io(e) => {
                error!("IO error: {}", e);
                HttpResponse::InternalServerError()
                    .json(json!({ "ok": false, "error": "SERVER_ERROR" }))
            }
            ServiceError::Internal(msg) => {
                error!("Internal error: {}", msg);
                HttpResponse::InternalServerError()
                    .json(json!({ "ok": false, "error": "SERVER_ERROR" }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ServiceError::invalid_id().status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::SessionExpired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Locked { seconds_left: 3 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ServiceError::MigrationRequired.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn migration_detection_needs_both_signals() {
        // plain RowNotFound is not a schema problem
        assert!(!is_migration_missing(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn field_helper_builds_a_single_entry_map() {
        let err = ServiceError::field("estado_id", "Estado inválido.");
        let ServiceError::Validation { message, fields } = err else {
            panic!("expected validation variant");
        };
        assert_eq!(message, None);
        assert_eq!(fields.get("estado_id"), Some(&"Estado inválido."));
    }
}
