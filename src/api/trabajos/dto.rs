//! Payloads y respuestas del recurso trabajos.
//!
//! Create and update share one payload and one validation pass; the pages
//! submit the same field names via multipart (create) and JSON (update).

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::error::FieldErrors;
use crate::db::catalogs::is_nombre_cerrado;
use crate::db::models::{AdjuntoRow, TrabajoDetailRow, TrabajoListRow};
use crate::time;
use crate::validators::{
    clamp_string, is_iso_date, is_non_empty, is_valid_email, to_decimal_or_null, to_int_or_null,
    trimmed_or_null,
};

const MAX_TEXT: usize = 4000;
const MAX_NAME: usize = 100;
const MAX_EMAIL: usize = 150;
const MAX_PROVEEDOR: usize = 150;
const MAX_ORDEN_COMPRA: usize = 50;

/// Id-like fields arrive as JSON numbers from the detail page and as text
/// from the multipart form; both are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumOrStr {
    Num(serde_json::Number),
    Str(String),
}

impl NumOrStr {
    pub fn as_string(&self) -> String {
        match self {
            NumOrStr::Num(n) => n.to_string(),
            NumOrStr::Str(s) => s.clone(),
        }
    }
}

fn opt_int(v: &Option<NumOrStr>) -> Option<i32> {
    let raw = v.as_ref()?.as_string();
    to_int_or_null(Some(&raw))
}

/// Everything the pages may send for a trabajo. All optional; validation
/// decides what is actually required.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TrabajoPayload {
    pub descripcion: Option<String>,
    pub proveedor: Option<String>,
    pub orden_compra: Option<String>,
    pub valor_neto: Option<NumOrStr>,
    pub solicitado_por: Option<String>,
    pub observaciones: Option<String>,
    pub ubicacion_id: Option<NumOrStr>,
    pub tipo_id: Option<NumOrStr>,
    pub estado_id: Option<NumOrStr>,
    pub prioridad_id: Option<NumOrStr>,
    pub fecha_reparacion: Option<String>,
    pub fecha_objetivo: Option<String>,
    pub creado_por_nombre: Option<String>,
    pub creado_por_correo: Option<String>,
    pub responsable_nombre: Option<String>,
    pub responsable_correo: Option<String>,
}

/// Normalized, validated values ready for the repository.
#[derive(Debug, Clone)]
pub struct TrabajoValues {
    pub creado_por_nombre: Option<String>,
    pub creado_por_correo: Option<String>,
    pub proveedor: Option<String>,
    pub descripcion: String,
    pub ubicacion_id: i32,
    pub orden_compra: Option<String>,
    pub valor_neto: Option<Decimal>,
    pub tipo_id: i32,
    pub estado_id: Option<i32>,
    pub fecha_reparacion: Option<NaiveDate>,
    pub solicitado_por: Option<String>,
    pub observaciones: Option<String>,
    pub prioridad_id: Option<i32>,
    pub fecha_objetivo: Option<NaiveDate>,
    pub responsable_nombre: Option<String>,
    pub responsable_correo: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// The server picks the initial status; a client-sent one is ignored.
    Create,
    /// A valid status id is required.
    Update,
}

/// Normalize and validate the shared payload. Any populated field map
/// blocks the write; messages are the ones the pages display verbatim.
pub fn validate_payload(
    payload: &TrabajoPayload,
    mode: PayloadMode,
) -> Result<TrabajoValues, FieldErrors> {
    let mut fields = FieldErrors::new();

    let descripcion = clamp_string(payload.descripcion.as_deref().unwrap_or(""), MAX_TEXT);
    if !is_non_empty(&descripcion) {
        fields.insert("descripcion", "La descripción es obligatoria.");
    }

    let ubicacion_id = opt_int(&payload.ubicacion_id).filter(|v| *v > 0);
    if ubicacion_id.is_none() {
        fields.insert("ubicacion_id", "Selecciona una ubicación.");
    }

    let tipo_id = opt_int(&payload.tipo_id).filter(|v| *v > 0);
    if tipo_id.is_none() {
        fields.insert("tipo_id", "Selecciona un tipo.");
    }

    let estado_id = opt_int(&payload.estado_id).filter(|v| *v > 0);
    if mode == PayloadMode::Update && estado_id.is_none() {
        fields.insert("estado_id", "Selecciona un estado.");
    }

    let valor_raw = payload.valor_neto.as_ref().map(NumOrStr::as_string);
    let valor_neto = to_decimal_or_null(valor_raw.as_deref());
    if valor_raw.as_deref().is_some_and(is_non_empty) && valor_neto.is_none() {
        fields.insert("valor_neto", "Valor neto inválido.");
    }

    let creado_por_correo = email_field(
        payload.creado_por_correo.as_deref(),
        "creado_por_correo",
        "Correo inválido.",
        &mut fields,
    );
    let responsable_correo = email_field(
        payload.responsable_correo.as_deref(),
        "responsable_correo",
        "Correo de responsable inválido.",
        &mut fields,
    );

    let fecha_reparacion = date_field(
        payload.fecha_reparacion.as_deref(),
        "fecha_reparacion",
        "Fecha inválida.",
        &mut fields,
    );
    let fecha_objetivo = date_field(
        payload.fecha_objetivo.as_deref(),
        "fecha_objetivo",
        "Fecha objetivo inválida.",
        &mut fields,
    );

    if !fields.is_empty() {
        return Err(fields);
    }

    Ok(TrabajoValues {
        creado_por_nombre: trimmed_or_null(payload.creado_por_nombre.as_deref())
            .map(|v| clamp_string(&v, MAX_NAME)),
        creado_por_correo,
        proveedor: trimmed_or_null(payload.proveedor.as_deref())
            .map(|v| clamp_string(&v, MAX_PROVEEDOR)),
        descripcion,
        ubicacion_id: ubicacion_id.unwrap_or_default(),
        orden_compra: trimmed_or_null(payload.orden_compra.as_deref())
            .map(|v| clamp_string(&v, MAX_ORDEN_COMPRA)),
        valor_neto,
        // both ids checked Some above; a populated field map already returned
        tipo_id: tipo_id.unwrap_or_default(),
        estado_id,
        fecha_reparacion,
        solicitado_por: trimmed_or_null(payload.solicitado_por.as_deref())
            .map(|v| clamp_string(&v, MAX_NAME)),
        observaciones: trimmed_or_null(payload.observaciones.as_deref())
            .map(|v| clamp_string(&v, MAX_TEXT)),
        prioridad_id: opt_int(&payload.prioridad_id).filter(|v| *v > 0),
        fecha_objetivo,
        responsable_nombre: trimmed_or_null(payload.responsable_nombre.as_deref())
            .map(|v| clamp_string(&v, MAX_NAME)),
        responsable_correo,
    })
}

/// Optional email: blank passes as absent, non-blank must look like a mail.
fn email_field(
    raw: Option<&str>,
    name: &'static str,
    message: &'static str,
    fields: &mut FieldErrors,
) -> Option<String> {
    let value = trimmed_or_null(raw)?;
    if is_valid_email(&value) {
        Some(clamp_string(&value, MAX_EMAIL))
    } else {
        fields.insert(name, message);
        None
    }
}

/// Optional ISO date: wrong shape or an impossible calendar day both reject.
fn date_field(
    raw: Option<&str>,
    name: &'static str,
    message: &'static str,
    fields: &mut FieldErrors,
) -> Option<NaiveDate> {
    let value = trimmed_or_null(raw)?;
    if !is_iso_date(&value) {
        fields.insert(name, message);
        return None;
    }
    match NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            fields.insert(name, message);
            None
        }
    }
}

/// Body of `PATCH /api/trabajos/{id}/estado`.
#[derive(Debug, Deserialize, Validate)]
pub struct EstadoPatchBody {
    #[validate(range(min = 1, message = "Estado inválido."))]
    pub estado_id: i32,
}

/// One listado/export row with the derived fields attached.
#[derive(Debug, Serialize)]
pub struct TrabajoOut {
    pub id: i32,
    pub fecha_creacion: String,
    pub proveedor: Option<String>,
    pub descripcion: String,
    pub orden_compra: Option<String>,
    pub valor_neto: Option<Decimal>,
    pub fecha_reparacion: Option<NaiveDate>,
    pub solicitado_por: Option<String>,
    pub fecha_cierre: Option<String>,
    pub prioridad_id: Option<i32>,
    pub fecha_objetivo: Option<NaiveDate>,
    pub responsable_nombre: Option<String>,
    pub responsable_correo: Option<String>,
    pub estado: String,
    pub tipo: String,
    pub ubicacion: String,
    pub prioridad: Option<String>,
    pub dias_abierto: i64,
    pub atrasado: bool,
}

impl TrabajoOut {
    /// `dias_abierto` counts whole days since creation, floored at zero.
    /// `atrasado` holds when an SLA date exists, the day after it has
    /// started, and the trabajo is not closed.
    pub fn derive(row: TrabajoListRow, now: NaiveDateTime) -> Self {
        let dias_abierto = (now - row.fecha_creacion).num_days().max(0);
        let atrasado = row
            .fecha_objetivo
            .is_some_and(|fo| !is_nombre_cerrado(&row.estado) && now > time::day_end(fo));

        Self {
            id: row.id,
            fecha_creacion: time::format_datetime(row.fecha_creacion),
            proveedor: row.proveedor,
            descripcion: row.descripcion,
            orden_compra: row.orden_compra,
            valor_neto: row.valor_neto,
            fecha_reparacion: row.fecha_reparacion,
            solicitado_por: row.solicitado_por,
            fecha_cierre: row.fecha_cierre.map(time::format_datetime),
            prioridad_id: row.prioridad_id,
            fecha_objetivo: row.fecha_objetivo,
            responsable_nombre: row.responsable_nombre,
            responsable_correo: row.responsable_correo,
            estado: row.estado,
            tipo: row.tipo,
            ubicacion: row.ubicacion,
            prioridad: row.prioridad,
            dias_abierto,
            atrasado,
        }
    }
}

/// Full detail as the edit page consumes it.
#[derive(Debug, Serialize)]
pub struct TrabajoDetailOut {
    pub id: i32,
    pub fecha_creacion: String,
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
    pub fecha_cierre: Option<String>,
    pub prioridad_id: Option<i32>,
    pub fecha_objetivo: Option<NaiveDate>,
    pub responsable_nombre: Option<String>,
    pub responsable_correo: Option<String>,
    pub estado_nombre: String,
    pub tipo_nombre: String,
    pub ubicacion_nombre: String,
    pub prioridad_nombre: Option<String>,
    pub adjuntos: Vec<AdjuntoRow>,
}

impl TrabajoDetailOut {
    pub fn from_row(row: TrabajoDetailRow, adjuntos: Vec<AdjuntoRow>) -> Self {
        Self {
            id: row.id,
            fecha_creacion: time::format_datetime(row.fecha_creacion),
            creado_por_nombre: row.creado_por_nombre,
            creado_por_correo: row.creado_por_correo,
            proveedor: row.proveedor,
            descripcion: row.descripcion,
            ubicacion_id: row.ubicacion_id,
            orden_compra: row.orden_compra,
            valor_neto: row.valor_neto,
            tipo_id: row.tipo_id,
            estado_id: row.estado_id,
            fecha_reparacion: row.fecha_reparacion,
            solicitado_por: row.solicitado_por,
            observaciones: row.observaciones,
            fecha_cierre: row.fecha_cierre.map(time::format_datetime),
            prioridad_id: row.prioridad_id,
            fecha_objetivo: row.fecha_objetivo,
            responsable_nombre: row.responsable_nombre,
            responsable_correo: row.responsable_correo,
            estado_nombre: row.estado_nombre,
            tipo_nombre: row.tipo_nombre,
            ubicacion_nombre: row.ubicacion_nombre,
            prioridad_nombre: row.prioridad_nombre,
            adjuntos,
        }
    }
}

/// Response of `POST /api/trabajos`.
#[derive(Debug, Serialize)]
pub struct CreatedTrabajo {
    pub id: i32,
    pub adjuntos: Vec<AdjuntoRow>,
}

/// Response of `PATCH /api/trabajos/{id}/estado`.
#[derive(Debug, Serialize)]
pub struct EstadoPatched {
    pub estado_id: i32,
    pub cerrado: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base_payload() -> TrabajoPayload {
        TrabajoPayload {
            descripcion: Some("Cambio de luminaria".into()),
            ubicacion_id: Some(NumOrStr::Str("2".into())),
            tipo_id: Some(NumOrStr::Num(serde_json::Number::from(1))),
            ..TrabajoPayload::default()
        }
    }

    #[test]
    fn minimal_create_payload_passes() {
        let values = validate_payload(&base_payload(), PayloadMode::Create).unwrap();
        assert_eq!(values.descripcion, "Cambio de luminaria");
        assert_eq!(values.ubicacion_id, 2);
        assert_eq!(values.tipo_id, 1);
        assert_eq!(values.estado_id, None);
        assert_eq!(values.valor_neto, None);
    }

    #[test]
    fn missing_required_fields_collect_all_messages() {
        let err = validate_payload(&TrabajoPayload::default(), PayloadMode::Create).unwrap_err();
        assert_eq!(
            err.get("descripcion"),
            Some(&"La descripción es obligatoria.")
        );
        assert_eq!(err.get("ubicacion_id"), Some(&"Selecciona una ubicación."));
        assert_eq!(err.get("tipo_id"), Some(&"Selecciona un tipo."));
        assert_eq!(err.get("estado_id"), None);
    }

    #[test]
    fn update_mode_requires_a_status() {
        let err = validate_payload(&base_payload(), PayloadMode::Update).unwrap_err();
        assert_eq!(err.get("estado_id"), Some(&"Selecciona un estado."));

        let mut p = base_payload();
        p.estado_id = Some(NumOrStr::Str("4".into()));
        let values = validate_payload(&p, PayloadMode::Update).unwrap();
        assert_eq!(values.estado_id, Some(4));
    }

    #[test]
    fn blank_description_is_rejected() {
        let mut p = base_payload();
        p.descripcion = Some("   ".into());
        let err = validate_payload(&p, PayloadMode::Create).unwrap_err();
        assert!(err.contains_key("descripcion"));
    }

    #[test]
    fn valor_neto_accepts_comma_and_rejects_junk() {
        let mut p = base_payload();
        p.valor_neto = Some(NumOrStr::Str("1234,56".into()));
        let values = validate_payload(&p, PayloadMode::Create).unwrap();
        assert_eq!(values.valor_neto, Some(Decimal::new(123_456, 2)));

        p.valor_neto = Some(NumOrStr::Str("doce".into()));
        let err = validate_payload(&p, PayloadMode::Create).unwrap_err();
        assert_eq!(err.get("valor_neto"), Some(&"Valor neto inválido."));

        // blank counts as absent, not invalid
        p.valor_neto = Some(NumOrStr::Str("  ".into()));
        assert!(validate_payload(&p, PayloadMode::Create).is_ok());
    }

    #[test]
    fn emails_validate_only_when_present() {
        let mut p = base_payload();
        p.creado_por_correo = Some("no-es-correo".into());
        p.responsable_correo = Some("resp@empresa".into());
        let err = validate_payload(&p, PayloadMode::Create).unwrap_err();
        assert_eq!(err.get("creado_por_correo"), Some(&"Correo inválido."));
        assert_eq!(
            err.get("responsable_correo"),
            Some(&"Correo de responsable inválido.")
        );

        p.creado_por_correo = Some("ana@empresa.cl".into());
        p.responsable_correo = None;
        let values = validate_payload(&p, PayloadMode::Create).unwrap();
        assert_eq!(values.creado_por_correo.as_deref(), Some("ana@empresa.cl"));
    }

    #[test]
    fn dates_reject_bad_shape_and_impossible_days() {
        let mut p = base_payload();
        p.fecha_reparacion = Some("31-01-2024".into());
        let err = validate_payload(&p, PayloadMode::Create).unwrap_err();
        assert_eq!(err.get("fecha_reparacion"), Some(&"Fecha inválida."));

        p.fecha_reparacion = Some("2024-02-31".into());
        let err = validate_payload(&p, PayloadMode::Create).unwrap_err();
        assert_eq!(err.get("fecha_reparacion"), Some(&"Fecha inválida."));

        p.fecha_reparacion = Some("2024-02-29".into());
        p.fecha_objetivo = Some("2024-13-01".into());
        let err = validate_payload(&p, PayloadMode::Create).unwrap_err();
        assert_eq!(err.get("fecha_objetivo"), Some(&"Fecha objetivo inválida."));
        assert!(!err.contains_key("fecha_reparacion"));
    }

    #[test]
    fn prioridad_junk_nulls_silently() {
        let mut p = base_payload();
        p.prioridad_id = Some(NumOrStr::Str("abc".into()));
        let values = validate_payload(&p, PayloadMode::Create).unwrap();
        assert_eq!(values.prioridad_id, None);

        p.prioridad_id = Some(NumOrStr::Str("2".into()));
        let values = validate_payload(&p, PayloadMode::Create).unwrap();
        assert_eq!(values.prioridad_id, Some(2));
    }

    #[test]
    fn strings_are_trimmed_and_blank_becomes_null() {
        let mut p = base_payload();
        p.proveedor = Some("  Ferretería Sur  ".into());
        p.orden_compra = Some("   ".into());
        let values = validate_payload(&p, PayloadMode::Create).unwrap();
        assert_eq!(values.proveedor.as_deref(), Some("Ferretería Sur"));
        assert_eq!(values.orden_compra, None);
    }

    fn list_row(fecha_creacion: NaiveDateTime) -> TrabajoListRow {
        TrabajoListRow {
            id: 1,
            fecha_creacion,
            proveedor: None,
            descripcion: "x".into(),
            orden_compra: None,
            valor_neto: None,
            fecha_reparacion: None,
            solicitado_por: None,
            fecha_cierre: None,
            prioridad_id: None,
            fecha_objetivo: None,
            responsable_nombre: None,
            responsable_correo: None,
            estado: "Pendiente".into(),
            tipo: "Reparación".into(),
            ubicacion: "Bodega".into(),
            prioridad: None,
        }
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn dias_abierto_floors_at_zero_and_counts_whole_days() {
        let now = dt("2024-03-10 12:00:00");
        let row = list_row(dt("2024-03-01 13:00:00"));
        assert_eq!(TrabajoOut::derive(row, now).dias_abierto, 8);

        let future = list_row(dt("2024-03-11 00:00:00"));
        assert_eq!(TrabajoOut::derive(future, now).dias_abierto, 0);
    }

    #[test]
    fn atrasado_needs_open_state_and_a_past_sla_day() {
        let now = dt("2024-03-10 00:00:01");
        let mut row = list_row(dt("2024-03-01 08:00:00"));
        row.fecha_objetivo = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert!(TrabajoOut::derive(row, now).atrasado);

        // still inside the SLA day
        let mut row = list_row(dt("2024-03-01 08:00:00"));
        row.fecha_objetivo = NaiveDate::from_ymd_opt(2024, 3, 10);
        assert!(!TrabajoOut::derive(row, now).atrasado);

        // closed rows never count, whatever the casing
        let mut row = list_row(dt("2024-03-01 08:00:00"));
        row.fecha_objetivo = NaiveDate::from_ymd_opt(2024, 3, 9);
        row.estado = "CERRADO".into();
        assert!(!TrabajoOut::derive(row, now).atrasado);

        // no SLA date, never overdue
        let row = list_row(dt("2024-03-01 08:00:00"));
        assert!(!TrabajoOut::derive(row, now).atrasado);
    }

    #[test]
    fn derive_formats_timestamps_for_the_wire() {
        let row = list_row(dt("2024-03-01 08:05:09"));
        let out = TrabajoOut::derive(row, dt("2024-03-02 10:00:00"));
        assert_eq!(out.fecha_creacion, "2024-03-01 08:05:09");
        assert_eq!(out.fecha_cierre, None);
    }
}
