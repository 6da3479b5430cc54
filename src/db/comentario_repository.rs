use chrono::NaiveDateTime;
use sqlx::{Pool, Postgres};

use crate::db::models::{ComentarioRefRow, ComentarioRow};

/// Repository for the `comentarios` table.
pub struct ComentarioRepository;

impl ComentarioRepository {
    pub async fn list_for_trabajo(
        pool: &Pool<Postgres>,
        trabajo_id: i32,
    ) -> Result<Vec<ComentarioRow>, sqlx::Error> {
        sqlx::query_as::<_, ComentarioRow>(
            r#"
            SELECT id, comentario, autor_nombre, autor_correo,
                   to_char(fecha_creacion, 'YYYY-MM-DD HH24:MI:SS') AS fecha_creacion
            FROM comentarios
            WHERE trabajo_id = $1
            ORDER BY id DESC
            "#,
        )
        .bind(trabajo_id)
        .fetch_all(pool)
        .await
    }

    pub async fn insert(
        pool: &Pool<Postgres>,
        trabajo_id: i32,
        comentario: &str,
        autor_nombre: Option<&str>,
        autor_correo: Option<&str>,
        fecha_creacion: NaiveDateTime,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO comentarios (trabajo_id, comentario, autor_nombre, autor_correo, fecha_creacion)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(trabajo_id)
        .bind(comentario)
        .bind(autor_nombre)
        .bind(autor_correo)
        .bind(fecha_creacion)
        .fetch_one(pool)
        .await
    }

    pub async fn get(
        pool: &Pool<Postgres>,
        id: i32,
    ) -> Result<Option<ComentarioRefRow>, sqlx::Error> {
        sqlx::query_as::<_, ComentarioRefRow>(
            "SELECT id, trabajo_id, comentario FROM comentarios WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &Pool<Postgres>, id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comentarios WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
