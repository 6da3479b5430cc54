use actix_web::web::{Data, ServiceConfig};
use actix_web::{get, HttpResponse};

use crate::api::auth::AuthedStaff;
use crate::api::error::ServiceError;
use crate::api::response;
use crate::db::catalogs::CatalogCache;

/// Dropdown data for the pages, served from the snapshot so the four lookup
/// tables are not re-read on every render.
#[get("/catalogos")]
async fn catalogos(
    _staff: AuthedStaff,
    cache: Data<CatalogCache>,
) -> Result<HttpResponse, ServiceError> {
    let snapshot = cache.load(false).await?;
    Ok(response::ok(&*snapshot))
}

pub fn catalogos_config(config: &mut ServiceConfig) {
    config.service(catalogos);
}
