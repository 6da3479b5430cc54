//! Filtro compartido del listado, los exports y los reportes.
//!
//! Builds the `WHERE` clause once as ordered predicate/bind pairs; every
//! statement that reuses the filter gets the same `$n` numbering and a fresh
//! copy of the bind values. Malformed parameters degrade into "filter
//! absent", they never fail the request.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::Postgres;

use crate::time;
use crate::validators::{is_iso_date, to_int_or_null, trimmed_or_null};

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MIN_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Text columns the free-text search spans, all on the base table.
const SEARCH_COLUMNS: [&str; 7] = [
    "t.descripcion",
    "t.proveedor",
    "t.orden_compra",
    "t.solicitado_por",
    "t.creado_por_nombre",
    "t.creado_por_correo",
    "t.observaciones",
];

/// Raw query parameters as the pages send them. Everything is optional, and
/// everything arrives as text.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FilterParams {
    pub search: Option<String>,
    pub estado: Option<String>,
    pub tipo: Option<String>,
    pub ubicacion: Option<String>,
    pub prioridad: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

/// One bound value; cloned into each statement that reuses the filter.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(i32),
    Text(String),
    DateTime(NaiveDateTime),
}

/// What to do when neither date bound was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePolicy {
    /// Listado and exports: no bound means no date predicate.
    None,
    /// Reports default to the trailing 30 days ending today.
    Last30Days,
}

#[derive(Debug, Clone)]
pub struct TrabajoFilter {
    clauses: Vec<String>,
    binds: Vec<BindValue>,
    /// Resolved date bounds, echoed by the report endpoint.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TrabajoFilter {
    pub fn build(params: &FilterParams, policy: RangePolicy) -> Self {
        let mut filter = TrabajoFilter {
            clauses: Vec::new(),
            binds: Vec::new(),
            from: None,
            to: None,
        };

        if let Some(search) = trimmed_or_null(params.search.as_deref()) {
            let n = filter.push_bind(BindValue::Text(format!("%{}%", search)));
            let ors: Vec<String> = SEARCH_COLUMNS
                .iter()
                .map(|col| format!("{col} ILIKE ${n}"))
                .collect();
            filter.clauses.push(format!("({})", ors.join(" OR ")));
        }

        filter.push_id_clause("t.estado_id", params.estado.as_deref());
        filter.push_id_clause("t.tipo_id", params.tipo.as_deref());
        filter.push_id_clause("t.ubicacion_id", params.ubicacion.as_deref());
        filter.push_id_clause("t.prioridad_id", params.prioridad.as_deref());

        let mut from = parse_iso_date(params.from.as_deref());
        let mut to = parse_iso_date(params.to.as_deref());
        if from.is_none() && to.is_none() && policy == RangePolicy::Last30Days {
            let today = time::today();
            from = Some(today - chrono::Duration::days(30));
            to = Some(today);
        }

        if let Some(d) = from {
            let n = filter.push_bind(BindValue::DateTime(time::day_start(d)));
            filter.clauses.push(format!("t.fecha_creacion >= ${n}"));
            filter.from = Some(d);
        }
        if let Some(d) = to {
            let n = filter.push_bind(BindValue::DateTime(time::day_end(d)));
            filter.clauses.push(format!("t.fecha_creacion <= ${n}"));
            filter.to = Some(d);
        }

        filter
    }

    fn push_id_clause(&mut self, column: &str, raw: Option<&str>) {
        if let Some(id) = to_int_or_null(raw).filter(|id| *id > 0) {
            let n = self.push_bind(BindValue::Int(id));
            self.clauses.push(format!("{column} = ${n}"));
        }
    }

    fn push_bind(&mut self, value: BindValue) -> usize {
        self.binds.push(value);
        self.binds.len()
    }

    /// `WHERE p1 AND p2 ...`, or empty when nothing filtered.
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// First `$n` free for statement-specific binds (limit, offset, dates).
    pub fn next_placeholder(&self) -> usize {
        self.binds.len() + 1
    }

    pub fn apply_as<'q, O>(
        &self,
        mut query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        for bind in &self.binds {
            query = match bind {
                BindValue::Int(v) => query.bind(*v),
                BindValue::Text(v) => query.bind(v.clone()),
                BindValue::DateTime(v) => query.bind(*v),
            };
        }
        query
    }

    pub fn apply_scalar<'q, O>(
        &self,
        mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    ) -> QueryScalar<'q, Postgres, O, PgArguments> {
        for bind in &self.binds {
            query = match bind {
                BindValue::Int(v) => query.bind(*v),
                BindValue::Text(v) => query.bind(v.clone()),
                BindValue::DateTime(v) => query.bind(*v),
            };
        }
        query
    }

    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }
}

fn parse_iso_date(raw: Option<&str>) -> Option<NaiveDate> {
    let s = trimmed_or_null(raw)?;
    if !is_iso_date(&s) {
        return None;
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Page / pageSize with the documented defaults and clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    pub fn from_params(params: &FilterParams) -> Self {
        let page = to_int_or_null(params.page.as_deref())
            .map(i64::from)
            .unwrap_or(1)
            .max(1);
        let page_size = to_int_or_null(params.page_size.as_deref())
            .map(i64::from)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}
