//! Row types the repositories read with `query_as`.
//!
//! Field names match the column aliases in the SQL exactly; anything the
//! wire needs in a different shape is re-mapped in the DTO layer.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// One listado/export row before the derived fields are attached.
#[derive(Debug, FromRow)]
pub struct TrabajoListRow {
    pub id: i32,
    pub fecha_creacion: NaiveDateTime,
    pub proveedor: Option<String>,
    pub descripcion: String,
    pub orden_compra: Option<String>,
    pub valor_neto: Option<Decimal>,
    pub fecha_reparacion: Option<NaiveDate>,
    pub solicitado_por: Option<String>,
    pub fecha_cierre: Option<NaiveDateTime>,
    pub prioridad_id: Option<i32>,
    pub fecha_objetivo: Option<NaiveDate>,
    pub responsable_nombre: Option<String>,
    pub responsable_correo: Option<String>,
    pub estado: String,
    pub tipo: String,
    pub ubicacion: String,
    pub prioridad: Option<String>,
}

/// Full detail row, ids and resolved catalog names side by side.
#[derive(Debug, FromRow)]
pub struct TrabajoDetailRow {
    pub id: i32,
    pub fecha_creacion: NaiveDateTime,
    pub creado_por_nombre: Option<String>,
    pub creado_por_correo: Option<String>,
    pub proveedor: Option<String>,
    pub descripcion: String,
    pub ubicacion_id: i32,
    pub orden_compra: Option<String>,
    pub valor_neto: Option<Decimal>,
    pub tipo_id: i32,
    pub estado_id: i32,
    pub fecha_reparacion: Option<NaiveDate>,
    pub solicitado_por: Option<String>,
    pub observaciones: Option<String>,
    pub fecha_cierre: Option<NaiveDateTime>,
    pub prioridad_id: Option<i32>,
    pub fecha_objetivo: Option<NaiveDate>,
    pub responsable_nombre: Option<String>,
    pub responsable_correo: Option<String>,
    pub estado_nombre: String,
    pub tipo_nombre: String,
    pub ubicacion_nombre: String,
    pub prioridad_nombre: Option<String>,
}

/// Attachment as listed under a trabajo and echoed after an upload.
#[derive(Debug, Serialize, FromRow)]
pub struct AdjuntoRow {
    pub id: i32,
    pub ruta_archivo: String,
    pub tipo: String,
    pub original_name: Option<String>,
}

/// Just enough of an attachment to delete it.
#[derive(Debug, FromRow)]
pub struct AdjuntoRefRow {
    pub id: i32,
    pub trabajo_id: i32,
    pub ruta_archivo: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ComentarioRow {
    pub id: i32,
    pub comentario: String,
    pub autor_nombre: Option<String>,
    pub autor_correo: Option<String>,
    pub fecha_creacion: String,
}

#[derive(Debug, FromRow)]
pub struct ComentarioRefRow {
    pub id: i32,
    pub trabajo_id: i32,
    pub comentario: String,
}

#[derive(Debug, FromRow)]
pub struct LogRow {
    pub id: i32,
    pub accion: String,
    pub detalle: Option<String>,
    pub actor_nombre: Option<String>,
    pub actor_correo: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub fecha: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CatalogItem {
    pub id: i32,
    pub nombre: String,
}

/// Counters of the report header.
#[derive(Debug, FromRow)]
pub struct KpiRow {
    pub total: i64,
    pub abiertos: i64,
    pub cerrados_rango: i64,
    pub atrasados_sla: i64,
}

/// Closure statistics, both `None` when nothing closed in range.
#[derive(Debug, FromRow)]
pub struct CierreStatsRow {
    pub avg_dias_cierre: Option<f64>,
    pub median_dias_cierre: Option<f64>,
}

/// One bucket of a grouped report dimension.
#[derive(Debug, FromRow)]
pub struct BreakdownRow {
    pub nombre: String,
    pub total: i64,
}

#[derive(Debug, FromRow)]
pub struct ProveedorRow {
    pub proveedor: String,
    pub total: i64,
    pub monto_total: Decimal,
}
