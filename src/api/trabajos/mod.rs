pub mod dto;
pub mod export;
pub mod handlers;
pub mod service;

pub use handlers::trabajos_config;
pub use service::TrabajoService;
