//! Catálogos con caché en memoria.
//!
//! Estados, tipos, ubicaciones and prioridades change rarely; the cache
//! serves an immutable snapshot and refetches everything after the TTL.
//! Racing refreshes may both hit the store, but the swap is whole-snapshot,
//! so readers never observe a partially loaded catalog.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::{Pool, Postgres};
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::capabilities::SchemaCapabilities;
use crate::db::models::CatalogItem;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

pub const ESTADO_PENDIENTE: &str = "Pendiente";
pub const ESTADO_CERRADO: &str = "Cerrado";

/// Case-insensitive check against the terminal status name.
pub fn is_nombre_cerrado(nombre: &str) -> bool {
    nombre.to_lowercase() == ESTADO_CERRADO.to_lowercase()
}

#[derive(Debug, Serialize)]
pub struct CatalogSnapshot {
    #[serde(skip)]
    loaded_at: Instant,
    pub estados: Vec<CatalogItem>,
    pub tipos: Vec<CatalogItem>,
    pub ubicaciones: Vec<CatalogItem>,
    pub prioridades: Vec<CatalogItem>,
}

impl CatalogSnapshot {
    pub fn estado_id_by_nombre(&self, nombre: &str) -> Option<i32> {
        let wanted = nombre.to_lowercase();
        self.estados
            .iter()
            .find(|e| e.nombre.to_lowercase() == wanted)
            .map(|e| e.id)
    }

    pub fn estado_nombre_by_id(&self, id: i32) -> Option<&str> {
        self.estados
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.nombre.as_str())
    }

    pub fn is_estado_cerrado(&self, id: i32) -> bool {
        self.estado_nombre_by_id(id).is_some_and(is_nombre_cerrado)
    }
}

pub struct CatalogCache {
    pool: Pool<Postgres>,
    caps: SchemaCapabilities,
    ttl: Duration,
    inner: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl CatalogCache {
    pub fn new(pool: Pool<Postgres>, caps: SchemaCapabilities, ttl: Duration) -> Self {
        Self {
            pool,
            caps,
            ttl,
            inner: RwLock::new(None),
        }
    }

    /// Returns a snapshot younger than the TTL, refetching when stale or
    /// when `force` is set.
    pub async fn load(&self, force: bool) -> Result<Arc<CatalogSnapshot>, sqlx::Error> {
        if !force {
            if let Some(snap) = self.inner.read().await.as_ref() {
                if snap.loaded_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(snap));
                }
            }
        }

        debug!(force, "Refreshing catalog snapshot");
        let snap = Arc::new(self.fetch().await?);
        *self.inner.write().await = Some(Arc::clone(&snap));
        Ok(snap)
    }

    async fn fetch(&self) -> Result<CatalogSnapshot, sqlx::Error> {
        let estados_fut = sqlx::query_as::<_, CatalogItem>("SELECT id, nombre FROM estados ORDER BY id")
            .fetch_all(&self.pool);
        let tipos_fut =
            sqlx::query_as::<_, CatalogItem>("SELECT id, nombre FROM tipos_solicitud ORDER BY id")
                .fetch_all(&self.pool);
        let ubicaciones_fut =
            sqlx::query_as::<_, CatalogItem>("SELECT id, nombre FROM ubicaciones ORDER BY nombre")
                .fetch_all(&self.pool);
        let prioridades_fut = async {
            if self.caps.prioridades {
                sqlx::query_as::<_, CatalogItem>("SELECT id, nombre FROM prioridades ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
            } else {
                Ok(Vec::new())
            }
        };

        let (estados, tipos, ubicaciones, prioridades) =
            tokio::try_join!(estados_fut, tipos_fut, ubicaciones_fut, prioridades_fut)?;

        Ok(CatalogSnapshot {
            loaded_at: Instant::now(),
            estados,
            tipos,
            ubicaciones,
            prioridades,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i32, nombre: &str) -> CatalogItem {
        CatalogItem {
            id,
            nombre: nombre.to_string(),
        }
    }

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            loaded_at: Instant::now(),
            estados: vec![
                item(1, "Pendiente"),
                item(2, "En curso"),
                item(4, "Cerrado"),
            ],
            tipos: vec![item(1, "Reparación")],
            ubicaciones: vec![item(1, "Bodega")],
            prioridades: vec![],
        }
    }

    #[test]
    fn estado_lookup_ignores_case() {
        let snap = snapshot();
        assert_eq!(snap.estado_id_by_nombre("pendiente"), Some(1));
        assert_eq!(snap.estado_id_by_nombre("PENDIENTE"), Some(1));
        assert_eq!(snap.estado_id_by_nombre("Inexistente"), None);
    }

    #[test]
    fn cerrado_check_uses_the_status_name() {
        let snap = snapshot();
        assert!(snap.is_estado_cerrado(4));
        assert!(!snap.is_estado_cerrado(1));
        assert!(!snap.is_estado_cerrado(99));
    }

    #[test]
    fn nombre_cerrado_is_case_insensitive() {
        assert!(is_nombre_cerrado("cerrado"));
        assert!(is_nombre_cerrado("CERRADO"));
        assert!(!is_nombre_cerrado("En curso"));
    }
}
