//! Posting: declarative rules, line assembly and orchestration

pub mod engine;
pub mod registry;
pub mod service;

pub use engine::*;
pub use registry::*;
pub use service::*;
