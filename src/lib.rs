pub mod app;
pub mod chat;
pub mod client;
pub mod error;
pub mod platform;

pub use error::{Error, Result};
