//! Borde de sesión del API.
//!
//! One shared key, opaque cookie sessions with idle expiry, and per-client
//! login throttling. Handlers opt in by taking [`AuthedStaff`] as a
//! parameter; everything under `/api` does.

pub mod handlers;
pub mod lockout;
pub mod session;

pub use handlers::auth_config;
pub use lockout::LoginLock;
pub use session::{SessionCheck, SessionStore, SESSION_COOKIE};

use actix_web::dev::Payload;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::api::error::ServiceError;

/// Proof that the request carries a live session.
pub struct AuthedStaff;

impl FromRequest for AuthedStaff {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(store) = req.app_data::<Data<SessionStore>>() else {
            return ready(Err(ServiceError::Internal(
                "session store not configured".to_string(),
            )));
        };

        let outcome = match req.cookie(SESSION_COOKIE) {
            None => Err(ServiceError::Unauthorized),
            Some(cookie) => match store.touch(cookie.value()) {
                SessionCheck::Active => Ok(AuthedStaff),
                SessionCheck::Expired => Err(ServiceError::SessionExpired),
                SessionCheck::Unknown => Err(ServiceError::Unauthorized),
            },
        };
        ready(outcome)
    }
}
