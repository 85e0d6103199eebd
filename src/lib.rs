pub mod config;
pub mod error;
pub mod gt06;
pub mod server;
pub mod sink;

pub use error::{AppError, Result};
