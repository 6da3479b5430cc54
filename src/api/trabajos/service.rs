use std::sync::Arc;

use serde_json::json;
use sqlx::{Pool, Postgres};
use tracing::{info, warn};

use super::dto::{
    validate_payload, CreatedTrabajo, EstadoPatched, PayloadMode, TrabajoDetailOut, TrabajoOut,
    TrabajoPayload, TrabajoValues,
};
use crate::api::error::ServiceError;
use crate::api::response::PageMeta;
use crate::audit::{AuditAction, AuditLogger, RequestMeta};
use crate::config::DefaultIdentity;
use crate::db::capabilities::SchemaCapabilities;
use crate::db::catalogs::{is_nombre_cerrado, CatalogCache, ESTADO_PENDIENTE};
use crate::db::filter::{FilterParams, Pagination, RangePolicy, TrabajoFilter};
use crate::db::models::AdjuntoRow;
use crate::db::adjunto_repository::AdjuntoRepository;
use crate::db::trabajo_repository::TrabajoRepository;
use crate::time;
use crate::uploads::UploadStore;

/// One attachment already past the boundary checks, ready to persist.
#[derive(Debug)]
pub struct UploadFile {
    /// Category tag: `antes`, `despues` or `evidencia`.
    pub tipo: &'static str,
    pub bytes: Vec<u8>,
    pub mime: String,
    pub original_name: Option<String>,
}

/// Business logic of the trabajos resource.
pub struct TrabajoService {
    pool: Pool<Postgres>,
    catalogs: Arc<CatalogCache>,
    uploads: Arc<UploadStore>,
    audit: AuditLogger,
    caps: SchemaCapabilities,
    defaults: DefaultIdentity,
}

impl TrabajoService {
    pub fn new(
        pool: Pool<Postgres>,
        catalogs: Arc<CatalogCache>,
        uploads: Arc<UploadStore>,
        audit: AuditLogger,
        caps: SchemaCapabilities,
        defaults: DefaultIdentity,
    ) -> Self {
        Self {
            pool,
            catalogs,
            uploads,
            audit,
            caps,
            defaults,
        }
    }

    pub async fn list(
        &self,
        params: &FilterParams,
    ) -> Result<(Vec<TrabajoOut>, PageMeta), ServiceError> {
        let filter = TrabajoFilter::build(params, RangePolicy::None);
        let pagination = Pagination::from_params(params);

        let total = TrabajoRepository::count(&self.pool, &filter).await?;
        let rows = TrabajoRepository::list(&self.pool, &filter, &pagination).await?;

        let now = time::now_local();
        let data = rows
            .into_iter()
            .map(|row| TrabajoOut::derive(row, now))
            .collect();

        Ok((
            data,
            PageMeta {
                total,
                page: pagination.page,
                page_size: pagination.page_size,
            },
        ))
    }

    /// Same filter as [`list`], without pagination. Feeds both exports.
    ///
    /// [`list`]: TrabajoService::list
    pub async fn export_rows(&self, params: &FilterParams) -> Result<Vec<TrabajoOut>, ServiceError> {
        let filter = TrabajoFilter::build(params, RangePolicy::None);
        let rows = TrabajoRepository::export(&self.pool, &filter).await?;
        let now = time::now_local();
        Ok(rows
            .into_iter()
            .map(|row| TrabajoOut::derive(row, now))
            .collect())
    }

    pub async fn get(&self, id: i32) -> Result<TrabajoDetailOut, ServiceError> {
        let row = TrabajoRepository::get(&self.pool, id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let adjuntos = AdjuntoRepository::list_for_trabajo(&self.pool, &self.caps, id).await?;
        Ok(TrabajoDetailOut::from_row(row, adjuntos))
    }

    pub async fn create(
        &self,
        payload: &TrabajoPayload,
        files: Vec<UploadFile>,
        meta: &RequestMeta,
    ) -> Result<CreatedTrabajo, ServiceError> {
        let mut values =
            validate_payload(payload, PayloadMode::Create).map_err(ServiceError::validation_fields)?;
        self.fill_default_identity(&mut values);

        let snapshot = self.catalogs.load(false).await?;
        let estado_id = snapshot.estado_id_by_nombre(ESTADO_PENDIENTE).ok_or_else(|| {
            ServiceError::Internal(format!("estado '{ESTADO_PENDIENTE}' missing from catalog"))
        })?;

        let id =
            TrabajoRepository::insert(&self.pool, time::now_local(), &values, estado_id).await?;
        info!("Trabajo {} creado", id);

        let adjuntos = self.store_files(id, files).await?;

        self.audit.log(
            id,
            AuditAction::Creado,
            json!({
                "tipo_id": values.tipo_id,
                "ubicacion_id": values.ubicacion_id,
                "prioridad_id": values.prioridad_id,
                "fecha_objetivo": values.fecha_objetivo,
            }),
            meta,
        );
        if !adjuntos.is_empty() {
            self.audit.log(
                id,
                AuditAction::AdjuntoSubido,
                json!({ "count": adjuntos.len() }),
                meta,
            );
        }

        Ok(CreatedTrabajo { id, adjuntos })
    }

    pub async fn update(
        &self,
        id: i32,
        payload: &TrabajoPayload,
        meta: &RequestMeta,
    ) -> Result<(), ServiceError> {
        let values =
            validate_payload(payload, PayloadMode::Update).map_err(ServiceError::validation_fields)?;

        let affected = TrabajoRepository::update(&self.pool, id, &values).await?;
        if affected == 0 {
            return Err(ServiceError::NotFound);
        }

        let resumen: String = values.descripcion.chars().take(200).collect();
        self.audit
            .log(id, AuditAction::Editado, json!({ "descripcion": resumen }), meta);
        Ok(())
    }

    /// Status transition. Any catalog status is reachable from any other;
    /// closing stamps `fecha_cierre`, reopening clears it.
    pub async fn patch_estado(
        &self,
        id: i32,
        estado_id: i32,
        meta: &RequestMeta,
    ) -> Result<EstadoPatched, ServiceError> {
        let anterior = TrabajoRepository::estado_id_of(&self.pool, id).await?;
        let cerrado = self.resolve_cerrado(estado_id).await?;
        let fecha_cierre = cerrado.then(time::now_local);

        let affected = TrabajoRepository::patch_estado(&self.pool, id, estado_id, fecha_cierre).await?;
        if affected == 0 {
            return Err(ServiceError::NotFound);
        }

        self.audit.log(
            id,
            AuditAction::EstadoCambiado,
            json!({ "from": anterior, "to": estado_id, "cerrado": cerrado }),
            meta,
        );
        Ok(EstadoPatched { estado_id, cerrado })
    }

    /// Is `estado_id` the terminal status? An id the snapshot does not know
    /// may postdate it, so one forced refresh runs before rejecting.
    async fn resolve_cerrado(&self, estado_id: i32) -> Result<bool, ServiceError> {
        let snapshot = self.catalogs.load(false).await?;
        if let Some(nombre) = snapshot.estado_nombre_by_id(estado_id) {
            return Ok(is_nombre_cerrado(nombre));
        }

        let refreshed = self.catalogs.load(true).await?;
        match refreshed.estado_nombre_by_id(estado_id) {
            Some(nombre) => Ok(is_nombre_cerrado(nombre)),
            None => Err(ServiceError::field("estado_id", "Estado inválido.")),
        }
    }

    pub async fn add_adjuntos(
        &self,
        id: i32,
        files: Vec<UploadFile>,
        meta: &RequestMeta,
    ) -> Result<Vec<AdjuntoRow>, ServiceError> {
        if !TrabajoRepository::exists(&self.pool, id).await? {
            return Err(ServiceError::NotFound);
        }

        let saved = self.store_files(id, files).await?;
        if !saved.is_empty() {
            self.audit.log(
                id,
                AuditAction::AdjuntoSubido,
                json!({ "count": saved.len() }),
                meta,
            );
        }
        Ok(saved)
    }

    pub async fn delete_adjunto(
        &self,
        adjunto_id: i32,
        meta: &RequestMeta,
    ) -> Result<(), ServiceError> {
        let adjunto = AdjuntoRepository::get(&self.pool, adjunto_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        AdjuntoRepository::delete(&self.pool, adjunto_id).await?;
        self.uploads.delete_by_ruta(&adjunto.ruta_archivo).await;

        self.audit.log(
            adjunto.trabajo_id,
            AuditAction::AdjuntoEliminado,
            json!({ "adjunto_id": adjunto_id, "ruta": adjunto.ruta_archivo }),
            meta,
        );
        Ok(())
    }

    /// Persist each file then its metadata row. When the row insert fails
    /// the just-written file is unlinked, so disk and table stay in step.
    async fn store_files(
        &self,
        trabajo_id: i32,
        files: Vec<UploadFile>,
    ) -> Result<Vec<AdjuntoRow>, ServiceError> {
        let mut saved = Vec::with_capacity(files.len());
        for file in files {
            let ruta = self.uploads.save(trabajo_id, &file.bytes, &file.mime).await?;
            let id = match AdjuntoRepository::insert(
                &self.pool,
                &self.caps,
                trabajo_id,
                &ruta,
                file.tipo,
                file.original_name.as_deref(),
                time::now_local(),
            )
            .await
            {
                Ok(id) => id,
                Err(e) => {
                    warn!("Adjunto insert failed, removing {}: {}", ruta, e);
                    self.uploads.delete_by_ruta(&ruta).await;
                    return Err(e.into());
                }
            };
            saved.push(AdjuntoRow {
                id,
                ruta_archivo: ruta,
                tipo: file.tipo.to_string(),
                original_name: file.original_name,
            });
        }
        Ok(saved)
    }

    fn fill_default_identity(&self, values: &mut TrabajoValues) {
        if values.creado_por_nombre.is_none() {
            values.creado_por_nombre = self.defaults.nombre.clone();
        }
        if values.creado_por_correo.is_none() {
            values.creado_por_correo = self.defaults.correo.clone();
        }
    }
}
