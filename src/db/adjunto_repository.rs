use chrono::NaiveDateTime;
use sqlx::{Pool, Postgres};

use crate::db::capabilities::SchemaCapabilities;
use crate::db::models::{AdjuntoRefRow, AdjuntoRow};

/// Repository for the `adjuntos` table. Insert and select shapes follow the
/// columns the connected database actually has.
pub struct AdjuntoRepository;

impl AdjuntoRepository {
    pub fn insert_sql(caps: &SchemaCapabilities) -> String {
        let mut cols = vec!["trabajo_id", "ruta_archivo", caps.adjunto_tipo_column()];
        if caps.adjuntos_original_name {
            cols.push("original_name");
        }
        if caps.adjuntos_fecha_subida {
            cols.push("fecha_subida");
        }
        let placeholders: Vec<String> = (1..=cols.len()).map(|n| format!("${n}")).collect();
        format!(
            "INSERT INTO adjuntos ({}) VALUES ({}) RETURNING id",
            cols.join(", "),
            placeholders.join(", ")
        )
    }

    pub fn select_sql(caps: &SchemaCapabilities) -> String {
        let original = if caps.adjuntos_original_name {
            "original_name"
        } else {
            "NULL::varchar"
        };
        format!(
            "SELECT id, ruta_archivo, {} AS tipo, {} AS original_name \
             FROM adjuntos WHERE trabajo_id = $1 ORDER BY id DESC",
            caps.adjunto_tipo_column(),
            original
        )
    }

    pub async fn insert(
        pool: &Pool<Postgres>,
        caps: &SchemaCapabilities,
        trabajo_id: i32,
        ruta_archivo: &str,
        tipo: &str,
        original_name: Option<&str>,
        fecha_subida: NaiveDateTime,
    ) -> Result<i32, sqlx::Error> {
        let sql = Self::insert_sql(caps);
        let mut query = sqlx::query_scalar::<_, i32>(&sql)
            .bind(trabajo_id)
            .bind(ruta_archivo)
            .bind(tipo);
        if caps.adjuntos_original_name {
            query = query.bind(original_name);
        }
        if caps.adjuntos_fecha_subida {
            query = query.bind(fecha_subida);
        }
        query.fetch_one(pool).await
    }

    pub async fn list_for_trabajo(
        pool: &Pool<Postgres>,
        caps: &SchemaCapabilities,
        trabajo_id: i32,
    ) -> Result<Vec<AdjuntoRow>, sqlx::Error> {
        let sql = Self::select_sql(caps);
        sqlx::query_as::<_, AdjuntoRow>(&sql)
            .bind(trabajo_id)
            .fetch_all(pool)
            .await
    }

    pub async fn get(pool: &Pool<Postgres>, id: i32) -> Result<Option<AdjuntoRefRow>, sqlx::Error> {
        sqlx::query_as::<_, AdjuntoRefRow>(
            "SELECT id, trabajo_id, ruta_archivo FROM adjuntos WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &Pool<Postgres>, id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM adjuntos WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sql_matches_the_full_schema() {
        let caps = SchemaCapabilities::full();
        assert_eq!(
            AdjuntoRepository::insert_sql(&caps),
            "INSERT INTO adjuntos (trabajo_id, ruta_archivo, tipo, original_name, fecha_subida) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id"
        );
    }

    #[test]
    fn insert_sql_shrinks_on_a_legacy_schema() {
        let caps = SchemaCapabilities {
            adjuntos_tipo_adjunto: true,
            adjuntos_original_name: false,
            adjuntos_fecha_subida: false,
            ..SchemaCapabilities::full()
        };
        assert_eq!(
            AdjuntoRepository::insert_sql(&caps),
            "INSERT INTO adjuntos (trabajo_id, ruta_archivo, tipo_adjunto) \
             VALUES ($1, $2, $3) RETURNING id"
        );
    }

    #[test]
    fn select_sql_aliases_missing_columns_to_null() {
        let caps = SchemaCapabilities {
            adjuntos_original_name: false,
            ..SchemaCapabilities::full()
        };
        let sql = AdjuntoRepository::select_sql(&caps);
        assert!(sql.contains("NULL::varchar AS original_name"));
        assert!(sql.contains("tipo AS tipo"));
        assert!(sql.ends_with("ORDER BY id DESC"));
    }
}
