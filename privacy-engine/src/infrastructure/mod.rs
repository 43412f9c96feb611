// src/infrastructure/mod.rs
pub mod memory;
