//! Render de exportaciones del listado.
//!
//! CSV targets the local Excel convention: `;` separator and a UTF-8 BOM so
//! accented text opens correctly. XLSX carries the same columns with Spanish
//! headers and light formatting.

use std::borrow::Cow;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{DocProperties, Format, Workbook, XlsxError};

use super::dto::TrabajoOut;

pub const CSV_FILENAME: &str = "trabajos_urgentes_ssgg.csv";
pub const XLSX_FILENAME: &str = "trabajos_urgentes_ssgg.xlsx";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const CSV_SEPARATOR: char = ';';

const CSV_HEADERS: [&str; 17] = [
    "id",
    "fecha_creacion",
    "estado",
    "tipo",
    "ubicacion",
    "prioridad",
    "proveedor",
    "descripcion",
    "orden_compra",
    "valor_neto",
    "solicitado_por",
    "fecha_reparacion",
    "fecha_objetivo",
    "responsable_nombre",
    "responsable_correo",
    "dias_abierto",
    "atrasado",
];

const XLSX_COLUMNS: [(&str, f64); 17] = [
    ("ID", 8.0),
    ("Fecha creación", 20.0),
    ("Estado", 14.0),
    ("Tipo", 16.0),
    ("Ubicación", 20.0),
    ("Prioridad", 12.0),
    ("Proveedor", 20.0),
    ("Descripción", 45.0),
    ("OC", 12.0),
    ("Valor neto", 14.0),
    ("Solicitado por", 18.0),
    ("Fecha reparación", 16.0),
    ("Fecha objetivo", 16.0),
    ("Responsable", 18.0),
    ("Correo responsable", 24.0),
    ("Días abierto", 12.0),
    ("Atrasado", 10.0),
];

/// Quote only when the field contains the separator, a quote or a line
/// break; embedded quotes are doubled.
fn escape_csv(v: &str) -> Cow<'_, str> {
    if v.contains([CSV_SEPARATOR, '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", v.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(v)
    }
}

fn opt(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

fn date(v: &Option<NaiveDate>) -> String {
    v.map(|d| d.to_string()).unwrap_or_default()
}

pub fn render_csv(rows: &[TrabajoOut]) -> String {
    let mut out = String::from('\u{feff}');
    out.push_str(&CSV_HEADERS.join(";"));
    out.push('\n');

    for r in rows {
        let valor = r.valor_neto.map(|v| v.to_string()).unwrap_or_default();
        let record = [
            r.id.to_string(),
            r.fecha_creacion.clone(),
            r.estado.clone(),
            r.tipo.clone(),
            r.ubicacion.clone(),
            opt(&r.prioridad),
            opt(&r.proveedor),
            r.descripcion.clone(),
            opt(&r.orden_compra),
            valor,
            opt(&r.solicitado_por),
            date(&r.fecha_reparacion),
            date(&r.fecha_objetivo),
            opt(&r.responsable_nombre),
            opt(&r.responsable_correo),
            r.dias_abierto.to_string(),
            r.atrasado.to_string(),
        ];
        let line: Vec<Cow<'_, str>> = record.iter().map(|v| escape_csv(v)).collect();
        out.push_str(&line.join(";"));
        out.push('\n');
    }

    out
}

pub fn render_xlsx(rows: &[TrabajoOut]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    workbook.set_properties(&DocProperties::new().set_author("Trabajos Urgentes SSGG"));

    let sheet = workbook.add_worksheet();
    sheet.set_name("Trabajos")?;

    let bold = Format::new().set_bold();
    for (col, (header, width)) in XLSX_COLUMNS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    sheet.autofilter(0, 0, 0, (XLSX_COLUMNS.len() - 1) as u16)?;

    for (i, r) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_number(row, 0, r.id as f64)?;
        sheet.write_string(row, 1, &r.fecha_creacion)?;
        sheet.write_string(row, 2, &r.estado)?;
        sheet.write_string(row, 3, &r.tipo)?;
        sheet.write_string(row, 4, &r.ubicacion)?;
        sheet.write_string(row, 5, r.prioridad.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 6, r.proveedor.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 7, &r.descripcion)?;
        sheet.write_string(row, 8, r.orden_compra.as_deref().unwrap_or(""))?;
        if let Some(valor) = r.valor_neto.as_ref().and_then(ToPrimitive::to_f64) {
            sheet.write_number(row, 9, valor)?;
        }
        sheet.write_string(row, 10, r.solicitado_por.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 11, &date(&r.fecha_reparacion))?;
        sheet.write_string(row, 12, &date(&r.fecha_objetivo))?;
        sheet.write_string(row, 13, r.responsable_nombre.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 14, r.responsable_correo.as_deref().unwrap_or(""))?;
        sheet.write_number(row, 15, r.dias_abierto as f64)?;
        sheet.write_string(row, 16, if r.atrasado { "SI" } else { "NO" })?;
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn row() -> TrabajoOut {
        TrabajoOut {
            id: 12,
            fecha_creacion: "2024-03-01 08:05:09".into(),
            proveedor: Some("Ferretería; Sur".into()),
            descripcion: "Cambio de \"luminaria\"\nurgente".into(),
            orden_compra: None,
            valor_neto: Some(Decimal::new(123_456, 2)),
            fecha_reparacion: None,
            solicitado_por: Some("Ana".into()),
            fecha_cierre: None,
            prioridad_id: None,
            fecha_objetivo: chrono::NaiveDate::from_ymd_opt(2024, 3, 9),
            responsable_nombre: None,
            responsable_correo: None,
            estado: "Pendiente".into(),
            tipo: "Reparación".into(),
            ubicacion: "Bodega".into(),
            prioridad: None,
            dias_abierto: 3,
            atrasado: true,
        }
    }

    #[test]
    fn csv_starts_with_bom_and_headers() {
        let csv = render_csv(&[]);
        assert!(csv.starts_with('\u{feff}'));
        let header = csv.trim_start_matches('\u{feff}').lines().next().unwrap();
        assert_eq!(header.split(';').count(), 17);
        assert!(header.starts_with("id;fecha_creacion;estado"));
        assert!(header.ends_with("dias_abierto;atrasado"));
    }

    #[test]
    fn csv_quotes_separator_quote_and_newline() {
        let csv = render_csv(&[row()]);
        let data_line_start = csv
            .lines()
            .nth(1)
            .unwrap();
        assert!(data_line_start.contains("\"Ferretería; Sur\""));
        // the embedded newline keeps the field quoted across physical lines
        assert!(csv.contains("\"Cambio de \"\"luminaria\"\"\nurgente\""));
        assert!(csv.contains(";1234.56;"));
        assert!(csv.contains(";2024-03-09;"));
        assert!(csv.contains(";true\n"));
    }

    #[test]
    fn csv_empty_optionals_render_as_empty_fields() {
        let mut r = row();
        r.proveedor = None;
        r.descripcion = "plano".into();
        r.valor_neto = None;
        r.atrasado = false;
        let csv = render_csv(&[r]);
        let line = csv.lines().nth(1).unwrap();
        assert_eq!(line.split(';').count(), 17);
        assert!(line.ends_with(";3;false"));
    }

    #[test]
    fn xlsx_renders_to_a_non_empty_zip() {
        let bytes = render_xlsx(&[row()]).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn xlsx_handles_an_empty_listado() {
        assert!(render_xlsx(&[]).is_ok());
    }
}
