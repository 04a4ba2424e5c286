//! Utility modules

pub mod memory_storage;
pub mod validation;
