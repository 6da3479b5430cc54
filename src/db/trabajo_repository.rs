use chrono::NaiveDateTime;
use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::api::trabajos::dto::TrabajoValues;
use crate::db::filter::{Pagination, TrabajoFilter};
use crate::db::models::{TrabajoDetailRow, TrabajoListRow};

/// Columns of the listado/export selects, joined against the catalogs.
const LIST_SELECT: &str = r#"
    SELECT
        t.id, t.fecha_creacion, t.proveedor, t.descripcion, t.orden_compra,
        t.valor_neto, t.fecha_reparacion, t.solicitado_por, t.fecha_cierre,
        t.prioridad_id, t.fecha_objetivo, t.responsable_nombre, t.responsable_correo,
        e.nombre AS estado, ti.nombre AS tipo, u.nombre AS ubicacion, p.nombre AS prioridad
    FROM trabajos_urgentes t
    INNER JOIN estados e ON e.id = t.estado_id
    INNER JOIN tipos_solicitud ti ON ti.id = t.tipo_id
    INNER JOIN ubicaciones u ON u.id = t.ubicacion_id
    LEFT JOIN prioridades p ON p.id = t.prioridad_id
"#;

/// Repository for the `trabajos_urgentes` table.
pub struct TrabajoRepository;

impl TrabajoRepository {
    /// Count matching rows; the filter only touches base-table columns, so
    /// no joins are needed here.
    pub async fn count(pool: &Pool<Postgres>, filter: &TrabajoFilter) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) FROM trabajos_urgentes t {}",
            filter.where_sql()
        );
        filter
            .apply_scalar(sqlx::query_scalar::<_, i64>(&sql))
            .fetch_one(pool)
            .await
    }

    pub async fn list(
        pool: &Pool<Postgres>,
        filter: &TrabajoFilter,
        pagination: &Pagination,
    ) -> Result<Vec<TrabajoListRow>, sqlx::Error> {
        let n = filter.next_placeholder();
        let sql = format!(
            "{LIST_SELECT} {} ORDER BY t.fecha_creacion DESC LIMIT ${n} OFFSET ${}",
            filter.where_sql(),
            n + 1
        );
        debug!(page = pagination.page, page_size = pagination.page_size, "Listing trabajos");
        filter
            .apply_as(sqlx::query_as::<_, TrabajoListRow>(&sql))
            .bind(pagination.page_size)
            .bind(pagination.offset())
            .fetch_all(pool)
            .await
    }

    /// Unpaginated variant feeding the CSV/XLSX exports.
    pub async fn export(
        pool: &Pool<Postgres>,
        filter: &TrabajoFilter,
    ) -> Result<Vec<TrabajoListRow>, sqlx::Error> {
        let sql = format!(
            "{LIST_SELECT} {} ORDER BY t.fecha_creacion DESC",
            filter.where_sql()
        );
        filter
            .apply_as(sqlx::query_as::<_, TrabajoListRow>(&sql))
            .fetch_all(pool)
            .await
    }

    pub async fn get(
        pool: &Pool<Postgres>,
        id: i32,
    ) -> Result<Option<TrabajoDetailRow>, sqlx::Error> {
        sqlx::query_as::<_, TrabajoDetailRow>(
            r#"
            SELECT
                t.id, t.fecha_creacion, t.creado_por_nombre, t.creado_por_correo,
                t.proveedor, t.descripcion, t.ubicacion_id, t.orden_compra,
                t.valor_neto, t.tipo_id, t.estado_id, t.fecha_reparacion,
                t.solicitado_por, t.observaciones, t.fecha_cierre,
                t.prioridad_id, t.fecha_objetivo, t.responsable_nombre, t.responsable_correo,
                e.nombre AS estado_nombre, ti.nombre AS tipo_nombre,
                u.nombre AS ubicacion_nombre, p.nombre AS prioridad_nombre
            FROM trabajos_urgentes t
            INNER JOIN estados e ON e.id = t.estado_id
            INNER JOIN tipos_solicitud ti ON ti.id = t.tipo_id
            INNER JOIN ubicaciones u ON u.id = t.ubicacion_id
            LEFT JOIN prioridades p ON p.id = t.prioridad_id
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Insert a new trabajo and return its id. The status is always the
    /// server-resolved initial one, never what the client sent.
    pub async fn insert(
        pool: &Pool<Postgres>,
        fecha_creacion: NaiveDateTime,
        values: &TrabajoValues,
        estado_id: i32,
    ) -> Result<i32, sqlx::Error> {
        debug!(tipo_id = values.tipo_id, ubicacion_id = values.ubicacion_id, "Inserting trabajo");

        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO trabajos_urgentes (
                fecha_creacion, creado_por_nombre, creado_por_correo, proveedor,
                descripcion, ubicacion_id, orden_compra, valor_neto, tipo_id,
                estado_id, fecha_reparacion, solicitado_por, observaciones,
                prioridad_id, fecha_objetivo, responsable_nombre, responsable_correo
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING id
            "#,
        )
        .bind(fecha_creacion)
        .bind(values.creado_por_nombre.as_deref())
        .bind(values.creado_por_correo.as_deref())
        .bind(values.proveedor.as_deref())
        .bind(&values.descripcion)
        .bind(values.ubicacion_id)
        .bind(values.orden_compra.as_deref())
        .bind(values.valor_neto)
        .bind(values.tipo_id)
        .bind(estado_id)
        .bind(values.fecha_reparacion)
        .bind(values.solicitado_por.as_deref())
        .bind(values.observaciones.as_deref())
        .bind(values.prioridad_id)
        .bind(values.fecha_objetivo)
        .bind(values.responsable_nombre.as_deref())
        .bind(values.responsable_correo.as_deref())
        .fetch_one(pool)
        .await
    }

    /// Full-row update; the status and closure date are untouched, those
    /// move only through [`patch_estado`].
    ///
    /// [`patch_estado`]: TrabajoRepository::patch_estado
    pub async fn update(
        pool: &Pool<Postgres>,
        id: i32,
        values: &TrabajoValues,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE trabajos_urgentes SET
                creado_por_nombre = $2, creado_por_correo = $3, proveedor = $4,
                descripcion = $5, ubicacion_id = $6, orden_compra = $7,
                valor_neto = $8, tipo_id = $9, fecha_reparacion = $10,
                solicitado_por = $11, observaciones = $12, prioridad_id = $13,
                fecha_objetivo = $14, responsable_nombre = $15, responsable_correo = $16
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(values.creado_por_nombre.as_deref())
        .bind(values.creado_por_correo.as_deref())
        .bind(values.proveedor.as_deref())
        .bind(&values.descripcion)
        .bind(values.ubicacion_id)
        .bind(values.orden_compra.as_deref())
        .bind(values.valor_neto)
        .bind(values.tipo_id)
        .bind(values.fecha_reparacion)
        .bind(values.solicitado_por.as_deref())
        .bind(values.observaciones.as_deref())
        .bind(values.prioridad_id)
        .bind(values.fecha_objetivo)
        .bind(values.responsable_nombre.as_deref())
        .bind(values.responsable_correo.as_deref())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn estado_id_of(pool: &Pool<Postgres>, id: i32) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT estado_id FROM trabajos_urgentes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move the status; `fecha_cierre` is set when closing and cleared when
    /// reopening.
    pub async fn patch_estado(
        pool: &Pool<Postgres>,
        id: i32,
        estado_id: i32,
        fecha_cierre: Option<NaiveDateTime>,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE trabajos_urgentes SET estado_id = $2, fecha_cierre = $3 WHERE id = $1")
                .bind(id)
                .bind(estado_id)
                .bind(fecha_cierre)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn exists(pool: &Pool<Postgres>, id: i32) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM trabajos_urgentes WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
