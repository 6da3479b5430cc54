pub mod adjunto_repository;
pub mod capabilities;
pub mod catalogs;
pub mod comentario_repository;
pub mod connection;
pub mod filter;
pub mod log_repository;
pub mod migrations;
pub mod models;
pub mod report_repository;
pub mod trabajo_repository;
