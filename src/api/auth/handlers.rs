use actix_web::cookie::{Cookie, SameSite};
use actix_web::web::{scope, Data, Json, ServiceConfig};
use actix_web::{post, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::lockout::LoginLock;
use super::session::{SessionStore, SESSION_COOKIE};
use crate::api::error::ServiceError;
use crate::audit::RequestMeta;
use crate::config::Config;

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub clave: Option<String>,
}

/// Throttling key for this client: forwarded-for/peer ip, or a shared
/// bucket when neither is known.
pub fn client_key(req: &HttpRequest) -> String {
    RequestMeta::from_request(req)
        .ip
        .unwrap_or_else(|| "unknown".to_string())
}

/// Constant-time comparison; length mismatch still returns in uniform time
/// for equal-length inputs.
fn clave_matches(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[post("/login")]
async fn login(
    req: HttpRequest,
    store: Data<SessionStore>,
    lock: Data<LoginLock>,
    config: Data<Config>,
    body: Json<LoginBody>,
) -> Result<HttpResponse, ServiceError> {
    let key = client_key(&req);

    if let Some(remaining) = lock.locked_for(&key) {
        return Err(ServiceError::Locked {
            seconds_left: remaining.as_secs_f64().ceil() as u64,
        });
    }

    let clave = body.clave.as_deref().unwrap_or("").trim();
    if clave.is_empty() {
        return Err(ServiceError::validation_msg("Debes ingresar la clave."));
    }

    if !clave_matches(clave, &config.app_clave) {
        lock.record_failure(&key);
        warn!("Failed login attempt from {}", key);
        return Ok(HttpResponse::Unauthorized().json(json!({
            "ok": false,
            "error": "INVALID",
            "message": "Clave incorrecta.",
        })));
    }

    lock.reset(&key);
    let token = store.open();
    info!("Session opened for {}", key);

    let cookie = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();

    Ok(HttpResponse::Ok().cookie(cookie).json(json!({ "ok": true })))
}

#[post("/logout")]
async fn logout(req: HttpRequest, store: Data<SessionStore>) -> HttpResponse {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        store.close(cookie.value());
    }

    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();

    HttpResponse::Ok()
        .cookie(removal)
        .json(json!({ "ok": true }))
}

pub fn auth_config(config: &mut ServiceConfig) {
    config.service(scope("/auth").service(login).service(logout));
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::{get, test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::api::auth::AuthedStaff;

    #[get("/probe")]
    async fn probe(_staff: AuthedStaff) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    fn test_config(clave: &str, max_attempts: u32) -> Config {
        Config {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            max_db_connections: 1,
            log_dir: "logs".into(),
            uploads_dir: "uploads".into(),
            upload_max_mb: 5,
            app_clave: clave.to_string(),
            max_login_attempts: max_attempts,
            login_lock_minutes: 15,
            session_idle_minutes: 30,
            default_creado_por_nombre: String::new(),
            default_creado_por_correo: String::new(),
            audit_queue_capacity: 8,
        }
    }

    #[test]
    fn clave_comparison_is_exact() {
        assert!(clave_matches("secreta", "secreta"));
        assert!(!clave_matches("secreta", "secretA"));
        assert!(!clave_matches("secret", "secreta"));
        assert!(!clave_matches("", "secreta"));
    }

    #[actix_web::test]
    async fn wrong_clave_is_rejected_and_locks_after_the_cap() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(test_config("secreta", 2)))
                .app_data(Data::new(SessionStore::new(Duration::from_secs(60))))
                .app_data(Data::new(LoginLock::new(2, Duration::from_secs(600))))
                .configure(auth_config),
        )
        .await;

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({ "clave": "nope" }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["ok"], false);
            assert_eq!(body["error"], "INVALID");
            assert_eq!(body["message"], "Clave incorrecta.");
        }

        // lock engaged: even the right key bounces now
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "clave": "secreta" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "LOCKED");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Demasiados intentos"));
    }

    #[actix_web::test]
    async fn missing_clave_is_a_validation_error() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(test_config("secreta", 5)))
                .app_data(Data::new(SessionStore::new(Duration::from_secs(60))))
                .app_data(Data::new(LoginLock::new(5, Duration::from_secs(600))))
                .configure(auth_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "clave": "   " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "VALIDATION");
        assert_eq!(body["message"], "Debes ingresar la clave.");
    }

    #[actix_web::test]
    async fn login_sets_a_cookie_that_authorizes_api_calls() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(test_config("secreta", 5)))
                .app_data(Data::new(SessionStore::new(Duration::from_secs(60))))
                .app_data(Data::new(LoginLock::new(5, Duration::from_secs(600))))
                .configure(auth_config)
                .service(probe),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/probe").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "UNAUTHORIZED");
        assert_eq!(body["message"], "Sesión requerida");

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({ "clave": "secreta" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .expect("session cookie")
            .into_owned();

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/probe")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        // logout closes the session server-side
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/logout")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/probe")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn idle_sessions_expire() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(test_config("secreta", 5)))
                .app_data(Data::new(SessionStore::new(Duration::from_millis(40))))
                .app_data(Data::new(LoginLock::new(5, Duration::from_secs(600))))
                .configure(auth_config)
                .service(probe),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({ "clave": "secreta" }))
                .to_request(),
        )
        .await;
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .expect("session cookie")
            .into_owned();

        tokio::time::sleep(Duration::from_millis(80)).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/probe")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "SESSION_EXPIRED");
        assert_eq!(body["message"], "Sesión expirada por inactividad");
    }
}
