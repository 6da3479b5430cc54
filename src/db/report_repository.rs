use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::db::filter::TrabajoFilter;
use crate::db::models::{BreakdownRow, CierreStatsRow, KpiRow, ProveedorRow};

/// Aggregation queries behind the report. Each one reuses the shared filter
/// verbatim, so every panel describes the same population.
pub struct ReportRepository;

impl ReportRepository {
    /// Header counters. "Overdue" compares the SLA date against today and
    /// only counts still-open rows.
    pub async fn kpis(
        pool: &Pool<Postgres>,
        filter: &TrabajoFilter,
        today: NaiveDate,
    ) -> Result<KpiRow, sqlx::Error> {
        let n = filter.next_placeholder();
        let sql = format!(
            r#"
            WITH f AS (
                SELECT t.fecha_objetivo, e.nombre AS estado
                FROM trabajos_urgentes t
                INNER JOIN estados e ON e.id = t.estado_id
                {}
            )
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN LOWER(estado) <> 'cerrado' THEN 1 ELSE 0 END), 0) AS abiertos,
                COALESCE(SUM(CASE WHEN LOWER(estado) = 'cerrado' THEN 1 ELSE 0 END), 0) AS cerrados_rango,
                COALESCE(SUM(CASE WHEN LOWER(estado) <> 'cerrado'
                                   AND fecha_objetivo IS NOT NULL
                                   AND fecha_objetivo < ${n}
                              THEN 1 ELSE 0 END), 0) AS atrasados_sla
            FROM f
            "#,
            filter.where_sql()
        );
        filter
            .apply_as(sqlx::query_as::<_, KpiRow>(&sql))
            .bind(today)
            .fetch_one(pool)
            .await
    }

    /// Average and median days-to-close over rows closed within the filter.
    pub async fn cierre_stats(
        pool: &Pool<Postgres>,
        filter: &TrabajoFilter,
    ) -> Result<CierreStatsRow, sqlx::Error> {
        let sql = format!(
            r#"
            WITH f AS (
                SELECT t.fecha_creacion, t.fecha_cierre
                FROM trabajos_urgentes t
                {}
            )
            SELECT
                AVG((fecha_cierre::date - fecha_creacion::date))::float8 AS avg_dias_cierre,
                PERCENTILE_CONT(0.5) WITHIN GROUP (
                    ORDER BY (fecha_cierre::date - fecha_creacion::date)
                ) AS median_dias_cierre
            FROM f
            WHERE fecha_cierre IS NOT NULL
            "#,
            filter.where_sql()
        );
        filter
            .apply_as(sqlx::query_as::<_, CierreStatsRow>(&sql))
            .fetch_one(pool)
            .await
    }

    pub async fn por_estado(
        pool: &Pool<Postgres>,
        filter: &TrabajoFilter,
    ) -> Result<Vec<BreakdownRow>, sqlx::Error> {
        Self::grouped(pool, filter, "INNER JOIN estados e ON e.id = t.estado_id", "e.nombre").await
    }

    pub async fn por_tipo(
        pool: &Pool<Postgres>,
        filter: &TrabajoFilter,
    ) -> Result<Vec<BreakdownRow>, sqlx::Error> {
        Self::grouped(
            pool,
            filter,
            "INNER JOIN tipos_solicitud ti ON ti.id = t.tipo_id",
            "ti.nombre",
        )
        .await
    }

    pub async fn por_ubicacion(
        pool: &Pool<Postgres>,
        filter: &TrabajoFilter,
    ) -> Result<Vec<BreakdownRow>, sqlx::Error> {
        Self::grouped(
            pool,
            filter,
            "INNER JOIN ubicaciones u ON u.id = t.ubicacion_id",
            "u.nombre",
        )
        .await
    }

    /// Null priority becomes an explicit bucket instead of disappearing.
    pub async fn por_prioridad(
        pool: &Pool<Postgres>,
        filter: &TrabajoFilter,
    ) -> Result<Vec<BreakdownRow>, sqlx::Error> {
        Self::grouped(
            pool,
            filter,
            "LEFT JOIN prioridades p ON p.id = t.prioridad_id",
            "COALESCE(p.nombre, 'Sin prioridad')",
        )
        .await
    }

    async fn grouped(
        pool: &Pool<Postgres>,
        filter: &TrabajoFilter,
        join: &str,
        name_expr: &str,
    ) -> Result<Vec<BreakdownRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {name_expr} AS nombre, COUNT(*) AS total \
             FROM trabajos_urgentes t {join} {} \
             GROUP BY {name_expr} ORDER BY total DESC, nombre ASC",
            filter.where_sql()
        );
        filter
            .apply_as(sqlx::query_as::<_, BreakdownRow>(&sql))
            .fetch_all(pool)
            .await
    }

    /// Top ten providers by billed amount; blank provider names collapse
    /// into a placeholder bucket.
    pub async fn top_proveedores(
        pool: &Pool<Postgres>,
        filter: &TrabajoFilter,
    ) -> Result<Vec<ProveedorRow>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT
                COALESCE(NULLIF(TRIM(t.proveedor), ''), '—') AS proveedor,
                COUNT(*) AS total,
                SUM(COALESCE(t.valor_neto, 0)) AS monto_total
            FROM trabajos_urgentes t
            {}
            GROUP BY COALESCE(NULLIF(TRIM(t.proveedor), ''), '—')
            ORDER BY monto_total DESC, total DESC
            LIMIT 10
            "#,
            filter.where_sql()
        );
        filter
            .apply_as(sqlx::query_as::<_, ProveedorRow>(&sql))
            .fetch_all(pool)
            .await
    }
}
