// src/repository/mod.rs
//
// Abstract store interfaces. The engine must not assume any specific
// persistence technology; a relational adapter, the in-memory adapter in
// `infrastructure`, or anything else can sit behind these traits.

pub mod consent_repository;
pub mod deletion_request_repository;
pub mod export_request_repository;
pub mod privacy_log_repository;
pub mod retention_policy_repository;
pub mod user_repository;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
