use actix_web::web::{Data, Path, ServiceConfig};
use actix_web::{get, HttpResponse};
use serde::Serialize;
use serde_json::Value;
use sqlx::{Pool, Postgres};

use crate::api::auth::AuthedStaff;
use crate::api::error::ServiceError;
use crate::api::{parse_id, response};
use crate::db::log_repository::LogRepository;
use crate::db::models::LogRow;

/// Trail entry as the detail page consumes it. `detalle` is stored as a JSON
/// string; rows that predate the current format come back as plain strings.
#[derive(Debug, Serialize)]
pub struct LogOut {
    pub id: i32,
    pub accion: String,
    pub detalle: Option<Value>,
    pub actor_nombre: Option<String>,
    pub actor_correo: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub fecha: String,
}

impl From<LogRow> for LogOut {
    fn from(row: LogRow) -> Self {
        let detalle = row
            .detalle
            .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::String(raw)));
        Self {
            id: row.id,
            accion: row.accion,
            detalle,
            actor_nombre: row.actor_nombre,
            actor_correo: row.actor_correo,
            ip: row.ip,
            user_agent: row.user_agent,
            fecha: row.fecha,
        }
    }
}

#[get("/trabajos/{id}/logs")]
async fn list_logs(
    _staff: AuthedStaff,
    pool: Data<Pool<Postgres>>,
    path: Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_id(&path)?;
    let rows = LogRepository::list_for_trabajo(&pool, id).await?;
    let data: Vec<LogOut> = rows.into_iter().map(LogOut::from).collect();
    Ok(response::ok(data))
}

pub fn logs_config(config: &mut ServiceConfig) {
    config.service(list_logs);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(detalle: Option<&str>) -> LogRow {
        LogRow {
            id: 7,
            accion: "EDITADO".into(),
            detalle: detalle.map(String::from),
            actor_nombre: Some("SSGG".into()),
            actor_correo: None,
            ip: Some("10.0.0.1".into()),
            user_agent: None,
            fecha: "2024-05-01 12:30:00".into(),
        }
    }

    #[test]
    fn detalle_parses_as_json_object() {
        let out = LogOut::from(row(Some(r#"{"estado_id":3}"#)));
        assert_eq!(out.detalle, Some(serde_json::json!({ "estado_id": 3 })));
    }

    #[test]
    fn detalle_that_is_not_json_stays_a_string() {
        let out = LogOut::from(row(Some("cambio manual")));
        assert_eq!(out.detalle, Some(Value::String("cambio manual".into())));
        assert_eq!(LogOut::from(row(None)).detalle, None);
    }
}
