use actix_web::web::{Data, Path, ServiceConfig};
use actix_web::{delete, HttpRequest, HttpResponse};

use crate::api::auth::AuthedStaff;
use crate::api::error::ServiceError;
use crate::api::trabajos::TrabajoService;
use crate::api::{parse_id, response};
use crate::audit::RequestMeta;

#[delete("/adjuntos/{id}")]
async fn delete_adjunto(
    _staff: AuthedStaff,
    service: Data<TrabajoService>,
    req: HttpRequest,
    path: Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_id(&path)?;
    let meta = RequestMeta::from_request(&req);
    service.delete_adjunto(id, &meta).await?;
    Ok(response::ok_empty())
}

pub fn adjuntos_config(config: &mut ServiceConfig) {
    config.service(delete_adjunto);
}
