use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::http::header;
use actix_web::web::{Data, Json, Path, Query, ServiceConfig};
use actix_web::{get, patch, post, put, HttpRequest, HttpResponse};
use actix_web_validator::Json as ValidatedJson;
use serde_json::json;
use tracing::warn;

use super::dto::{EstadoPatchBody, NumOrStr, TrabajoPayload};
use super::export;
use super::service::{TrabajoService, UploadFile};
use crate::api::auth::AuthedStaff;
use crate::api::error::ServiceError;
use crate::api::{parse_id, response};
use crate::audit::RequestMeta;
use crate::config::Config;
use crate::db::filter::FilterParams;
use crate::uploads;

/// Per-category file caps, matching what the pages offer.
const MAX_ANTES: usize = 2;
const MAX_DESPUES: usize = 2;
const MAX_EVIDENCIA: usize = 20;

/// Create form: the shared payload as text fields plus the three file
/// categories. Unknown fields are ignored.
#[derive(Debug, MultipartForm)]
pub struct TrabajoForm {
    pub descripcion: Option<Text<String>>,
    pub proveedor: Option<Text<String>>,
    pub orden_compra: Option<Text<String>>,
    pub valor_neto: Option<Text<String>>,
    pub solicitado_por: Option<Text<String>>,
    pub observaciones: Option<Text<String>>,
    pub ubicacion_id: Option<Text<String>>,
    pub tipo_id: Option<Text<String>>,
    pub prioridad_id: Option<Text<String>>,
    pub fecha_reparacion: Option<Text<String>>,
    pub fecha_objetivo: Option<Text<String>>,
    pub creado_por_nombre: Option<Text<String>>,
    pub creado_por_correo: Option<Text<String>>,
    pub responsable_nombre: Option<Text<String>>,
    pub responsable_correo: Option<Text<String>>,
    pub antes: Vec<TempFile>,
    pub despues: Vec<TempFile>,
    pub evidencia: Vec<TempFile>,
}

/// Upload-only form for `POST /trabajos/{id}/adjuntos`.
#[derive(Debug, MultipartForm)]
pub struct AdjuntosForm {
    pub antes: Vec<TempFile>,
    pub despues: Vec<TempFile>,
    pub evidencia: Vec<TempFile>,
}

fn text(field: &Option<Text<String>>) -> Option<String> {
    field.as_ref().map(|t| t.0.clone())
}

fn form_payload(form: &TrabajoForm) -> TrabajoPayload {
    TrabajoPayload {
        descripcion: text(&form.descripcion),
        proveedor: text(&form.proveedor),
        orden_compra: text(&form.orden_compra),
        valor_neto: text(&form.valor_neto).map(NumOrStr::Str),
        solicitado_por: text(&form.solicitado_por),
        observaciones: text(&form.observaciones),
        ubicacion_id: text(&form.ubicacion_id).map(NumOrStr::Str),
        tipo_id: text(&form.tipo_id).map(NumOrStr::Str),
        estado_id: None,
        prioridad_id: text(&form.prioridad_id).map(NumOrStr::Str),
        fecha_reparacion: text(&form.fecha_reparacion),
        fecha_objetivo: text(&form.fecha_objetivo),
        creado_por_nombre: text(&form.creado_por_nombre),
        creado_por_correo: text(&form.creado_por_correo),
        responsable_nombre: text(&form.responsable_nombre),
        responsable_correo: text(&form.responsable_correo),
    }
}

/// Boundary pass over the received files. Disallowed MIME types are dropped
/// with a warning and the request continues without them; too many files in
/// a category or an oversized file reject the whole request.
async fn collect_files(
    groups: [(&'static str, Vec<TempFile>, usize); 3],
    max_bytes: usize,
) -> Result<Vec<UploadFile>, ServiceError> {
    let mut out = Vec::new();

    for (tipo, files, cap) in groups {
        if files.len() > cap {
            return Err(ServiceError::validation_msg(format!(
                "Máximo {cap} archivos para '{tipo}'."
            )));
        }

        for file in files {
            let mime = file
                .content_type
                .as_ref()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_default();

            if !uploads::is_allowed_mime(&mime) {
                warn!(
                    file = file.file_name.as_deref().unwrap_or("?"),
                    mime, "Dropping attachment with disallowed type"
                );
                continue;
            }

            if file.size > max_bytes {
                return Err(ServiceError::validation_msg(format!(
                    "'{}' supera el tamaño máximo permitido.",
                    file.file_name.as_deref().unwrap_or(tipo)
                )));
            }

            let bytes = tokio::fs::read(file.file.path()).await?;
            out.push(UploadFile {
                tipo,
                bytes,
                mime,
                original_name: file.file_name.clone(),
            });
        }
    }

    Ok(out)
}

#[get("/trabajos")]
async fn list_trabajos(
    _staff: AuthedStaff,
    service: Data<TrabajoService>,
    query: Query<FilterParams>,
) -> Result<HttpResponse, ServiceError> {
    let (data, meta) = service.list(&query).await?;
    Ok(response::ok_page(data, meta))
}

#[get("/trabajos/export.csv")]
async fn export_csv(
    _staff: AuthedStaff,
    service: Data<TrabajoService>,
    query: Query<FilterParams>,
) -> Result<HttpResponse, ServiceError> {
    let rows = service.export_rows(&query).await?;
    let body = export::render_csv(&rows);
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export::CSV_FILENAME),
        ))
        .body(body))
}

#[get("/trabajos/export.xlsx")]
async fn export_xlsx(
    _staff: AuthedStaff,
    service: Data<TrabajoService>,
    query: Query<FilterParams>,
) -> Result<HttpResponse, ServiceError> {
    let rows = service.export_rows(&query).await?;
    let body = export::render_xlsx(&rows)
        .map_err(|e| ServiceError::Internal(format!("xlsx build failed: {e}")))?;
    Ok(HttpResponse::Ok()
        .content_type(export::XLSX_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export::XLSX_FILENAME),
        ))
        .body(body))
}

#[post("/trabajos")]
async fn create_trabajo(
    _staff: AuthedStaff,
    service: Data<TrabajoService>,
    config: Data<Config>,
    req: HttpRequest,
    MultipartForm(form): MultipartForm<TrabajoForm>,
) -> Result<HttpResponse, ServiceError> {
    let meta = RequestMeta::from_request(&req);
    let payload = form_payload(&form);
    let files = collect_files(
        [
            ("antes", form.antes, MAX_ANTES),
            ("despues", form.despues, MAX_DESPUES),
            ("evidencia", form.evidencia, MAX_EVIDENCIA),
        ],
        config.upload_max_bytes(),
    )
    .await?;

    let created = service.create(&payload, files, &meta).await?;
    Ok(response::created(created))
}

#[get("/trabajos/{id}")]
async fn get_trabajo(
    _staff: AuthedStaff,
    service: Data<TrabajoService>,
    path: Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_id(&path)?;
    let detail = service.get(id).await?;
    Ok(response::ok(detail))
}

#[put("/trabajos/{id}")]
async fn update_trabajo(
    _staff: AuthedStaff,
    service: Data<TrabajoService>,
    req: HttpRequest,
    path: Path<String>,
    body: Json<TrabajoPayload>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_id(&path)?;
    let meta = RequestMeta::from_request(&req);
    service.update(id, &body, &meta).await?;
    Ok(response::ok_empty())
}

#[patch("/trabajos/{id}/estado")]
async fn patch_estado(
    _staff: AuthedStaff,
    service: Data<TrabajoService>,
    req: HttpRequest,
    path: Path<String>,
    body: ValidatedJson<EstadoPatchBody>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_id(&path)?;
    let meta = RequestMeta::from_request(&req);
    let patched = service.patch_estado(id, body.estado_id, &meta).await?;
    Ok(response::ok(patched))
}

#[post("/trabajos/{id}/adjuntos")]
async fn add_adjuntos(
    _staff: AuthedStaff,
    service: Data<TrabajoService>,
    config: Data<Config>,
    req: HttpRequest,
    path: Path<String>,
    MultipartForm(form): MultipartForm<AdjuntosForm>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_id(&path)?;
    let meta = RequestMeta::from_request(&req);
    let files = collect_files(
        [
            ("antes", form.antes, MAX_ANTES),
            ("despues", form.despues, MAX_DESPUES),
            ("evidencia", form.evidencia, MAX_EVIDENCIA),
        ],
        config.upload_max_bytes(),
    )
    .await?;

    let adjuntos = service.add_adjuntos(id, files, &meta).await?;
    Ok(response::created(json!({ "adjuntos": adjuntos })))
}

/// Fixed paths must register before the `{id}` patterns or the matcher
/// would swallow `export.csv` as an id.
pub fn trabajos_config(config: &mut ServiceConfig) {
    config
        .service(list_trabajos)
        .service(export_csv)
        .service(export_xlsx)
        .service(create_trabajo)
        .service(get_trabajo)
        .service(update_trabajo)
        .service(patch_estado)
        .service(add_adjuntos);
}
