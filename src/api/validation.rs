use actix_web::HttpResponse;
use serde_json::json;

fn fields_response(fields: serde_json::Map<String, serde_json::Value>) -> actix_web::Error {
    actix_web::error::InternalError::from_response(
        "",
        HttpResponse::BadRequest().json(json!({
            "ok": false,
            "error": "VALIDATION",
            "fields": fields,
        })),
    )
    .into()
}

fn message_response(message: &str) -> actix_web::Error {
    actix_web::error::InternalError::from_response(
        "",
        HttpResponse::BadRequest().json(json!({
            "ok": false,
            "error": "VALIDATION",
            "message": message,
        })),
    )
    .into()
}

/// Creates a configured JsonConfig with standardized error handling for the
/// validated JSON extractors. Keeps rejected bodies inside the envelope
/// instead of actix's plain-text default.
pub fn json_config() -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default().error_handler(|err, _req| match err {
        actix_web_validator::Error::Validate(validation_errors) => {
            let mut fields = serde_json::Map::new();

            for (field, errors) in validation_errors.field_errors() {
                let message = errors
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "Valor inválido.".to_string());
                fields.insert(field.to_string(), json!(message));
            }

            fields_response(fields)
        }
        _ => message_response("Cuerpo JSON inválido"),
    })
}

/// Same envelope for the plain `web::Json` extractors.
pub fn json_body_config() -> actix_web::web::JsonConfig {
    actix_web::web::JsonConfig::default()
        .error_handler(|_err, _req| message_response("Cuerpo JSON inválido"))
}
