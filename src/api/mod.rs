pub mod adjuntos;
pub mod auth;
pub mod catalogos;
pub mod comentarios;
pub mod error;
pub mod health;
pub mod logs;
pub mod reportes;
pub mod response;
pub mod trabajos;
pub mod validation;

use actix_web::web::{scope, ServiceConfig};

use crate::api::error::ServiceError;
use crate::validators;

/// Path ids arrive as text; anything that is not a positive integer maps to
/// the uniform `ID inválido` rejection instead of the router's 404.
pub(crate) fn parse_id(raw: &str) -> Result<i32, ServiceError> {
    validators::to_int_or_null(Some(raw))
        .filter(|id| *id > 0)
        .ok_or_else(ServiceError::invalid_id)
}

/// Session-guarded surface; every route under `/api` extracts `AuthedStaff`.
pub fn api_config(config: &mut ServiceConfig) {
    config.service(
        scope("/api")
            .configure(trabajos::trabajos_config)
            .configure(adjuntos::adjuntos_config)
            .configure(comentarios::comentarios_config)
            .configure(logs::logs_config)
            .configure(reportes::reportes_config)
            .configure(catalogos::catalogos_config),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_plain_positive_integers() {
        assert_eq!(parse_id("7").unwrap(), 7);
        assert_eq!(parse_id("12.0").unwrap(), 12);
    }

    #[test]
    fn parse_id_rejects_junk_zero_and_negatives() {
        for raw in ["abc", "", "0", "-3", "1.5", "1e9999"] {
            assert!(parse_id(raw).is_err(), "{raw} should be rejected");
        }
    }
}
