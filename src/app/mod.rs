pub mod config;

pub use config::{AppConfig, BackendConfig, UIConfig, DEFAULT_API_BASE};
