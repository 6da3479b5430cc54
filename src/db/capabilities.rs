use sqlx::{Pool, Postgres};

/// Which optional schema objects this database has, resolved once at
/// startup. Installations that never ran the feature migration keep working:
/// the attachment SQL adapts its shape instead of probing per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaCapabilities {
    pub prioridades: bool,
    pub trabajos_log: bool,
    pub comentarios: bool,
    /// Legacy installations named the attachment category column
    /// `tipo_adjunto` instead of `tipo`.
    pub adjuntos_tipo_adjunto: bool,
    pub adjuntos_original_name: bool,
    pub adjuntos_fecha_subida: bool,
}

impl SchemaCapabilities {
    /// Everything the embedded migrations create; what [`detect`] reports on
    /// a freshly migrated database.
    ///
    /// [`detect`]: SchemaCapabilities::detect
    pub fn full() -> Self {
        Self {
            prioridades: true,
            trabajos_log: true,
            comentarios: true,
            adjuntos_tipo_adjunto: false,
            adjuntos_original_name: true,
            adjuntos_fecha_subida: true,
        }
    }

    pub async fn detect(pool: &Pool<Postgres>) -> Result<Self, sqlx::Error> {
        let row: (bool, bool, bool, bool, bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM information_schema.tables
                        WHERE table_schema = current_schema() AND table_name = 'prioridades'),
                EXISTS (SELECT 1 FROM information_schema.tables
                        WHERE table_schema = current_schema() AND table_name = 'trabajos_log'),
                EXISTS (SELECT 1 FROM information_schema.tables
                        WHERE table_schema = current_schema() AND table_name = 'comentarios'),
                EXISTS (SELECT 1 FROM information_schema.columns
                        WHERE table_schema = current_schema() AND table_name = 'adjuntos'
                          AND column_name = 'tipo_adjunto'),
                EXISTS (SELECT 1 FROM information_schema.columns
                        WHERE table_schema = current_schema() AND table_name = 'adjuntos'
                          AND column_name = 'original_name'),
                EXISTS (SELECT 1 FROM information_schema.columns
                        WHERE table_schema = current_schema() AND table_name = 'adjuntos'
                          AND column_name = 'fecha_subida')
            "#,
        )
        .fetch_one(pool)
        .await?;

        Ok(Self {
            prioridades: row.0,
            trabajos_log: row.1,
            comentarios: row.2,
            adjuntos_tipo_adjunto: row.3,
            adjuntos_original_name: row.4,
            adjuntos_fecha_subida: row.5,
        })
    }

    /// Name of the column holding the attachment category tag.
    pub fn adjunto_tipo_column(&self) -> &'static str {
        if self.adjuntos_tipo_adjunto {
            "tipo_adjunto"
        } else {
            "tipo"
        }
    }
}
