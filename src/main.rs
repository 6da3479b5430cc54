use std::sync::Arc;

use actix_multipart::form::MultipartFormConfig;
use actix_web::{web, App, HttpServer};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod api;
mod audit;
mod config;
mod db;
mod shutdown;
mod time;
mod uploads;
mod validators;

use crate::api::auth::{auth_config, LoginLock, SessionStore};
use crate::api::comentarios::ComentarioService;
use crate::api::health::health_config;
use crate::api::trabajos::TrabajoService;
use crate::api::{api_config, validation};
use crate::audit::worker::AuditWorker;
use crate::audit::AuditLogger;
use crate::db::capabilities::SchemaCapabilities;
use crate::db::catalogs::{self, CatalogCache};
use crate::shutdown::ShutdownCoordinator;
use crate::uploads::UploadStore;

/// JSON bodies are small; multipart uploads have their own ceiling.
const JSON_PAYLOAD_LIMIT: usize = 1024 * 1024;

#[derive(Parser)]
#[command(name = "trabajos-urgentes", about = "Registro de trabajos urgentes de servicios generales")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations and exit
    Migrate,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Load configuration from environment
    let config = config::Config::from_env().expect("Failed to load configuration");

    // Create logs directory if it doesn't exist
    std::fs::create_dir_all(&config.log_dir).expect("Failed to create logs directory");

    // Initialize file-based logging with daily rotation and level separation
    // Log files will be created as: logs/info.2024-12-22.log, logs/error.2024-12-22.log, etc.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // Create daily rotating file appenders for each log level
    let info_file = tracing_appender::rolling::daily(&config.log_dir, "info.log");
    let warn_file = tracing_appender::rolling::daily(&config.log_dir, "warn.log");
    let error_file = tracing_appender::rolling::daily(&config.log_dir, "error.log");
    let debug_file = tracing_appender::rolling::daily(&config.log_dir, "debug.log");

    // Create layers for each log level
    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let warn_layer = tracing_subscriber::fmt::layer()
        .with_writer(warn_file)
        .with_ansi(false)
        .with_filter(LevelFilter::WARN);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let debug_layer = tracing_subscriber::fmt::layer()
        .with_writer(debug_file)
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG);

    // Create console/stdout layer for terminal output
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    // Initialize the subscriber with all layers (including console)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(warn_layer)
        .with(error_layer)
        .with(debug_layer)
        .init();

    // Get database connection pool
    let pool = db::connection::get_pool(&config.database_url, config.max_db_connections)
        .await
        .expect("Failed to connect to database");

    // Run migrations on startup (auto-migrate when starting server)
    db::migrations::run(&pool)
        .await
        .expect("Failed to run database migrations");

    if let Some(Command::Migrate) = cli.command {
        info!("Migrations applied, exiting");
        pool.close().await;
        return Ok(());
    }

    info!("Starting trabajos-urgentes application");
    info!("Configuration loaded successfully:");
    info!("  - Bind address: {}:{}", config.host, config.port);
    info!("  - Max database connections: {}", config.max_db_connections);
    info!("  - Uploads directory: {}", config.uploads_dir);
    info!("  - Upload limit per file: {} MB", config.upload_max_mb);
    info!("  - Audit queue capacity: {}", config.audit_queue_capacity);

    // Resolve which optional schema objects this database has; the
    // attachment SQL and the catalog loader shape themselves around it.
    let caps = SchemaCapabilities::detect(&pool)
        .await
        .expect("Failed to inspect database schema");
    info!("Schema capabilities: {:?}", caps);

    std::fs::create_dir_all(&config.uploads_dir).expect("Failed to create uploads directory");

    let identity = config.identity();

    // Audit channel plus its drain worker
    let (audit_logger, audit_rx) = AuditLogger::channel(
        config.audit_queue_capacity,
        identity.nombre.clone(),
        identity.correo.clone(),
    );
    let audit_worker = tokio::spawn(AuditWorker::new(pool.clone(), audit_rx).run());

    // Shared state, built once and cloned into each server worker
    let catalog_cache = web::Data::new(CatalogCache::new(pool.clone(), caps, catalogs::DEFAULT_TTL));
    let upload_store = Arc::new(UploadStore::new(config.uploads_dir.clone()));
    let session_store = web::Data::new(SessionStore::new(config.session_idle()));
    let login_lock = web::Data::new(LoginLock::new(
        config.max_login_attempts,
        config.login_lock(),
    ));
    let trabajo_service = web::Data::new(TrabajoService::new(
        pool.clone(),
        catalog_cache.clone().into_inner(),
        upload_store.clone(),
        audit_logger.clone(),
        caps,
        identity.clone(),
    ));
    let comentario_service = web::Data::new(ComentarioService::new(
        pool.clone(),
        audit_logger.clone(),
        identity.clone(),
    ));
    let audit_data = web::Data::new(audit_logger.clone());
    let config_data = web::Data::new(config.clone());
    let server_pool = pool.clone();

    let upload_total_limit = config.upload_max_bytes() * 24;

    let server = HttpServer::new(move || {
        // Configure payload size limits globally
        let payload_config = web::PayloadConfig::default().limit(JSON_PAYLOAD_LIMIT);
        let multipart_config = MultipartFormConfig::default().total_limit(upload_total_limit);

        App::new()
            .app_data(web::Data::new(server_pool.clone())) // Share DB pool across workers
            .app_data(config_data.clone())
            .app_data(session_store.clone())
            .app_data(login_lock.clone())
            .app_data(catalog_cache.clone())
            .app_data(trabajo_service.clone())
            .app_data(comentario_service.clone())
            .app_data(audit_data.clone())
            .app_data(payload_config)
            .app_data(multipart_config)
            .app_data(validation::json_config()) // Validated JSON extractors
            .app_data(validation::json_body_config()) // Plain JSON extractors
            .configure(health_config)
            .configure(auth_config)
            .configure(api_config)
    });

    info!("Server starting on http://{}:{}", config.host, config.port);

    let server = server.bind((config.host.as_str(), config.port))?.run();

    // Get server handle for graceful shutdown
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let coordinator = ShutdownCoordinator::new(
        server_handle,
        server_task,
        audit_logger,
        audit_worker,
        pool,
    );

    coordinator.wait_for_shutdown().await
}
