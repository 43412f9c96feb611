// src/lib.rs
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod logging;
pub mod repository;
pub mod service;
pub mod utils;

// Re-export commonly used types
pub use config::PrivacyConfig;
pub use error::{PrivacyError, PrivacyResult};
