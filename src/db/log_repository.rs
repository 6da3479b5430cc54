use sqlx::{Pool, Postgres};

use crate::audit::AuditEntry;
use crate::db::models::LogRow;

/// Repository for the `trabajos_log` audit table.
pub struct LogRepository;

impl LogRepository {
    pub async fn insert(pool: &Pool<Postgres>, entry: &AuditEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO trabajos_log
                (trabajo_id, accion, detalle, actor_nombre, actor_correo, ip, user_agent, fecha)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.trabajo_id)
        .bind(entry.accion.as_str())
        .bind(entry.detalle.as_deref())
        .bind(entry.actor_nombre.as_deref())
        .bind(entry.actor_correo.as_deref())
        .bind(entry.ip.as_deref())
        .bind(entry.user_agent.as_deref())
        .bind(entry.fecha)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Newest first, the order the detail page shows the trail.
    pub async fn list_for_trabajo(
        pool: &Pool<Postgres>,
        trabajo_id: i32,
    ) -> Result<Vec<LogRow>, sqlx::Error> {
        sqlx::query_as::<_, LogRow>(
            r#"
            SELECT id, accion, detalle, actor_nombre, actor_correo, ip, user_agent,
                   to_char(fecha, 'YYYY-MM-DD HH24:MI:SS') AS fecha
            FROM trabajos_log
            WHERE trabajo_id = $1
            ORDER BY id DESC
            "#,
        )
        .bind(trabajo_id)
        .fetch_all(pool)
        .await
    }
}
