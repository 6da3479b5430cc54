use actix_web::web::{Data, Json, Path, ServiceConfig};
use actix_web::{delete, get, post, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::{Pool, Postgres};

use crate::api::auth::AuthedStaff;
use crate::api::error::ServiceError;
use crate::api::{parse_id, response};
use crate::audit::{AuditAction, AuditLogger, RequestMeta};
use crate::config::DefaultIdentity;
use crate::db::comentario_repository::ComentarioRepository;
use crate::db::models::ComentarioRow;
use crate::db::trabajo_repository::TrabajoRepository;
use crate::time;
use crate::validators;

const MAX_COMENTARIO_CHARS: usize = 2000;
const MAX_AUTOR_NOMBRE_CHARS: usize = 100;
const MAX_AUTOR_CORREO_CHARS: usize = 150;
const AUDIT_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ComentarioBody {
    pub comentario: Option<String>,
    pub autor_nombre: Option<String>,
    pub autor_correo: Option<String>,
}

pub struct ComentarioService {
    pool: Pool<Postgres>,
    audit: AuditLogger,
    defaults: DefaultIdentity,
}

impl ComentarioService {
    pub fn new(pool: Pool<Postgres>, audit: AuditLogger, defaults: DefaultIdentity) -> Self {
        Self {
            pool,
            audit,
            defaults,
        }
    }

    pub async fn list(&self, trabajo_id: i32) -> Result<Vec<ComentarioRow>, ServiceError> {
        Ok(ComentarioRepository::list_for_trabajo(&self.pool, trabajo_id).await?)
    }

    pub async fn add(
        &self,
        trabajo_id: i32,
        body: &ComentarioBody,
        meta: &RequestMeta,
    ) -> Result<i32, ServiceError> {
        if !TrabajoRepository::exists(&self.pool, trabajo_id).await? {
            return Err(ServiceError::NotFound);
        }

        let comentario = match validators::trimmed_or_null(body.comentario.as_deref()) {
            Some(texto) => validators::clamp_string(&texto, MAX_COMENTARIO_CHARS),
            None => return Err(ServiceError::validation_msg("El comentario es obligatorio.")),
        };

        let autor_nombre = validators::trimmed_or_null(body.autor_nombre.as_deref())
            .map(|v| validators::clamp_string(&v, MAX_AUTOR_NOMBRE_CHARS))
            .or_else(|| self.defaults.nombre.clone());
        let autor_correo = validators::trimmed_or_null(body.autor_correo.as_deref())
            .map(|v| validators::clamp_string(&v, MAX_AUTOR_CORREO_CHARS))
            .or_else(|| self.defaults.correo.clone());

        let id = ComentarioRepository::insert(
            &self.pool,
            trabajo_id,
            &comentario,
            autor_nombre.as_deref(),
            autor_correo.as_deref(),
            time::now_local(),
        )
        .await?;

        let snippet = validators::clamp_string(&comentario, AUDIT_SNIPPET_CHARS);
        self.audit.log(
            trabajo_id,
            AuditAction::ComentarioAgregado,
            json!({ "comentario": snippet }),
            meta,
        );

        Ok(id)
    }

    pub async fn delete(&self, id: i32, meta: &RequestMeta) -> Result<(), ServiceError> {
        let row = ComentarioRepository::get(&self.pool, id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        ComentarioRepository::delete(&self.pool, id).await?;

        let snippet = validators::clamp_string(&row.comentario, AUDIT_SNIPPET_CHARS);
        self.audit.log(
            row.trabajo_id,
            AuditAction::ComentarioEliminado,
            json!({ "comentario_id": id, "comentario": snippet }),
            meta,
        );

        Ok(())
    }
}

#[get("/trabajos/{id}/comentarios")]
async fn list_comentarios(
    _staff: AuthedStaff,
    service: Data<ComentarioService>,
    path: Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_id(&path)?;
    let rows = service.list(id).await?;
    Ok(response::ok(rows))
}

#[post("/trabajos/{id}/comentarios")]
async fn add_comentario(
    _staff: AuthedStaff,
    service: Data<ComentarioService>,
    req: HttpRequest,
    path: Path<String>,
    body: Json<ComentarioBody>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_id(&path)?;
    let meta = RequestMeta::from_request(&req);
    let comentario_id = service.add(id, &body, &meta).await?;
    Ok(response::created(json!({ "id": comentario_id })))
}

#[delete("/comentarios/{id}")]
async fn delete_comentario(
    _staff: AuthedStaff,
    service: Data<ComentarioService>,
    req: HttpRequest,
    path: Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_id(&path)?;
    let meta = RequestMeta::from_request(&req);
    service.delete(id, &meta).await?;
    Ok(response::ok_empty())
}

pub fn comentarios_config(config: &mut ServiceConfig) {
    config
        .service(list_comentarios)
        .service(add_comentario)
        .service(delete_comentario);
}
