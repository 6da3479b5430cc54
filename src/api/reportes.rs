use actix_web::web::{Data, Query, ServiceConfig};
use actix_web::{get, HttpResponse};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Pool, Postgres};

use crate::api::auth::AuthedStaff;
use crate::api::error::ServiceError;
use crate::api::response;
use crate::db::filter::{FilterParams, RangePolicy, TrabajoFilter};
use crate::db::models::{BreakdownRow, ProveedorRow};
use crate::db::report_repository::ReportRepository;
use crate::time;

#[derive(Debug, Serialize)]
struct ReportRange {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReportKpis {
    total: i64,
    abiertos: i64,
    cerrados_rango: i64,
    atrasados_sla: i64,
    avg_dias_cierre: Option<f64>,
    median_dias_cierre: Option<f64>,
}

#[derive(Debug, Serialize)]
struct Bucket {
    nombre: String,
    total: i64,
}

impl From<BreakdownRow> for Bucket {
    fn from(row: BreakdownRow) -> Self {
        Self {
            nombre: row.nombre,
            total: row.total,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProveedorOut {
    proveedor: String,
    total: i64,
    monto_total: Decimal,
}

impl From<ProveedorRow> for ProveedorOut {
    fn from(row: ProveedorRow) -> Self {
        Self {
            proveedor: row.proveedor,
            total: row.total,
            monto_total: row.monto_total,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportData {
    range: ReportRange,
    kpis: ReportKpis,
    #[serde(rename = "porEstado")]
    por_estado: Vec<Bucket>,
    #[serde(rename = "porTipo")]
    por_tipo: Vec<Bucket>,
    #[serde(rename = "porUbicacion")]
    por_ubicacion: Vec<Bucket>,
    #[serde(rename = "porPrioridad")]
    por_prioridad: Vec<Bucket>,
    #[serde(rename = "topProveedores")]
    top_proveedores: Vec<ProveedorOut>,
}

/// All panels run against the exact same predicate, so the numbers agree
/// with each other and with the filtered listing.
#[get("/reportes/resumen")]
async fn resumen(
    _staff: AuthedStaff,
    pool: Data<Pool<Postgres>>,
    query: Query<FilterParams>,
) -> Result<HttpResponse, ServiceError> {
    let filter = TrabajoFilter::build(&query, RangePolicy::Last30Days);
    let today = time::today();

    let (kpis, cierre, por_estado, por_tipo, por_ubicacion, por_prioridad, top_proveedores) = tokio::try_join!(
        ReportRepository::kpis(&pool, &filter, today),
        ReportRepository::cierre_stats(&pool, &filter),
        ReportRepository::por_estado(&pool, &filter),
        ReportRepository::por_tipo(&pool, &filter),
        ReportRepository::por_ubicacion(&pool, &filter),
        ReportRepository::por_prioridad(&pool, &filter),
        ReportRepository::top_proveedores(&pool, &filter),
    )?;

    let data = ReportData {
        range: ReportRange {
            from: filter.from.map(|d| d.format("%Y-%m-%d").to_string()),
            to: filter.to.map(|d| d.format("%Y-%m-%d").to_string()),
        },
        kpis: ReportKpis {
            total: kpis.total,
            abiertos: kpis.abiertos,
            cerrados_rango: kpis.cerrados_rango,
            atrasados_sla: kpis.atrasados_sla,
            avg_dias_cierre: cierre.avg_dias_cierre,
            median_dias_cierre: cierre.median_dias_cierre,
        },
        por_estado: por_estado.into_iter().map(Bucket::from).collect(),
        por_tipo: por_tipo.into_iter().map(Bucket::from).collect(),
        por_ubicacion: por_ubicacion.into_iter().map(Bucket::from).collect(),
        por_prioridad: por_prioridad.into_iter().map(Bucket::from).collect(),
        top_proveedores: top_proveedores.into_iter().map(ProveedorOut::from).collect(),
    };

    Ok(response::ok(data))
}

pub fn reportes_config(config: &mut ServiceConfig) {
    config.service(resumen);
}
