// src/domain/mod.rs
pub mod consent_model;
pub mod deletion_request_model;
pub mod export_request_model;
pub mod privacy_log_model;
pub mod retention_policy_model;
pub mod user_model;
