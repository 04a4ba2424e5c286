//! Account determination: specificity matching and rule configuration

pub mod matcher;
pub mod rules;

pub use matcher::*;
pub use rules::*;
