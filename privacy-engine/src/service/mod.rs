// src/service/mod.rs
pub mod consent_service;
pub mod deletion_service;
pub mod encryption_service;
pub mod export_service;
pub mod maintenance_service;
pub mod notification_service;
pub mod retention_service;
pub mod storage_service;
