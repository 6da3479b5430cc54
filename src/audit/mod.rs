//! Bitácora de acciones.
//!
//! Audit writes never sit on the request path: handlers enqueue entries on a
//! bounded channel and a background worker drains them into `trabajos_log`.
//! A full queue or a failed insert costs an entry, never a request.

pub mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use actix_web::http::header;
use actix_web::HttpRequest;
use chrono::NaiveDateTime;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::time;

const MAX_USER_AGENT_CHARS: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Creado,
    Editado,
    EstadoCambiado,
    AdjuntoSubido,
    AdjuntoEliminado,
    ComentarioAgregado,
    ComentarioEliminado,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Creado => "CREADO",
            AuditAction::Editado => "EDITADO",
            AuditAction::EstadoCambiado => "ESTADO_CAMBIADO",
            AuditAction::AdjuntoSubido => "ADJUNTO_SUBIDO",
            AuditAction::AdjuntoEliminado => "ADJUNTO_ELIMINADO",
            AuditAction::ComentarioAgregado => "COMENTARIO_AGREGADO",
            AuditAction::ComentarioEliminado => "COMENTARIO_ELIMINADO",
        }
    }
}

/// One row bound for `trabajos_log`.
#[derive(Debug)]
pub struct AuditEntry {
    pub trabajo_id: i32,
    pub accion: AuditAction,
    pub detalle: Option<String>,
    pub actor_nombre: Option<String>,
    pub actor_correo: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub fecha: NaiveDateTime,
}

/// Client metadata captured per request for the trail.
#[derive(Debug, Default, Clone)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    /// Takes the first `X-Forwarded-For` hop when present, else the peer
    /// address. The user agent is clamped to the column width.
    pub fn from_request(req: &HttpRequest) -> Self {
        let ip = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| req.peer_addr().map(|a| a.ip().to_string()));

        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.chars().take(MAX_USER_AGENT_CHARS).collect::<String>())
            .filter(|v| !v.is_empty());

        Self { ip, user_agent }
    }
}

/// Cheap handle shared across handlers; `log` is fire-and-forget.
#[derive(Clone)]
pub struct AuditLogger {
    tx: mpsc::Sender<AuditEntry>,
    actor_nombre: Option<String>,
    actor_correo: Option<String>,
    dropped: Arc<AtomicU64>,
}

impl AuditLogger {
    /// Builds the logger plus the receiving end for the drain worker.
    pub fn channel(
        capacity: usize,
        actor_nombre: Option<String>,
        actor_correo: Option<String>,
    ) -> (Self, mpsc::Receiver<AuditEntry>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                actor_nombre,
                actor_correo,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Queues one entry. Never fails: when the channel is full or closed the
    /// entry is counted as dropped and the caller continues untouched.
    pub fn log(&self, trabajo_id: i32, accion: AuditAction, detalle: Value, meta: &RequestMeta) {
        let detalle = (!detalle.is_null()).then(|| detalle.to_string());
        let entry = AuditEntry {
            trabajo_id,
            accion,
            detalle,
            actor_nombre: self.actor_nombre.clone(),
            actor_correo: self.actor_correo.clone(),
            ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            fecha: time::now_local(),
        };
        if self.tx.try_send(entry).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                trabajo_id,
                accion = accion.as_str(),
                "audit queue unavailable, entry dropped"
            );
        }
    }

    /// Entries lost to a full or closed queue since startup.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> RequestMeta {
        RequestMeta {
            ip: Some("10.0.0.1".into()),
            user_agent: Some("tests".into()),
        }
    }

    #[test]
    fn action_names_match_the_stored_vocabulary() {
        assert_eq!(AuditAction::Creado.as_str(), "CREADO");
        assert_eq!(AuditAction::EstadoCambiado.as_str(), "ESTADO_CAMBIADO");
        assert_eq!(
            AuditAction::ComentarioEliminado.as_str(),
            "COMENTARIO_ELIMINADO"
        );
    }

    #[actix_web::test]
    async fn log_delivers_entries_in_order() {
        let (logger, mut rx) = AuditLogger::channel(4, Some("SSGG".into()), None);
        logger.log(1, AuditAction::Creado, json!({ "tipo_id": 2 }), &meta());
        logger.log(1, AuditAction::Editado, Value::Null, &meta());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.accion, AuditAction::Creado);
        assert_eq!(first.detalle.as_deref(), Some(r#"{"tipo_id":2}"#));
        assert_eq!(first.actor_nombre.as_deref(), Some("SSGG"));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.accion, AuditAction::Editado);
        assert_eq!(second.detalle, None);
        assert_eq!(logger.dropped(), 0);
    }

    #[actix_web::test]
    async fn full_queue_only_bumps_the_counter() {
        let (logger, rx) = AuditLogger::channel(1, None, None);
        logger.log(1, AuditAction::Creado, Value::Null, &meta());
        logger.log(2, AuditAction::Creado, Value::Null, &meta());
        logger.log(3, AuditAction::Creado, Value::Null, &meta());
        assert_eq!(logger.dropped(), 2);
        drop(rx);

        // closed channel is also silent
        logger.log(4, AuditAction::Creado, Value::Null, &meta());
        assert_eq!(logger.dropped(), 3);
    }
}
