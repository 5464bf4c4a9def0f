pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod migrations;
pub mod models;
pub mod services;
pub mod store;
pub mod units;
pub mod version;

pub use error::{AppError, ErrorKind, Result};
pub use services::Trainlog;
