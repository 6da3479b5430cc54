//! Envoltura JSON común: `{ok:true, data}` con `meta` opcional de paginado.

use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<PageMeta>,
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        ok: true,
        data: Some(data),
        meta: None,
    })
}

/// Bare `{ok:true}`, used by writes that return nothing.
pub fn ok_empty() -> HttpResponse {
    HttpResponse::Ok().json(Envelope::<()> {
        ok: true,
        data: None,
        meta: None,
    })
}

pub fn ok_page<T: Serialize>(data: T, meta: PageMeta) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        ok: true,
        data: Some(data),
        meta: Some(meta),
    })
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope {
        ok: true,
        data: Some(data),
        meta: None,
    })
}
