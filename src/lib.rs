//! # Posting Core
//!
//! A rule-driven account determination and auto-posting library turning
//! business documents into balanced journal entries.
//!
//! ## Features
//!
//! - **Account determination**: Most-specific-match resolution of accounts
//!   from business dimensions such as warehouse, category, or branch
//! - **Posting rules**: Per-document-type templates pairing amount sources
//!   with debit/credit roles and account sources
//! - **Fact extraction**: Built-in extractors for goods receipts, invoices,
//!   deliveries, and cash documents
//! - **Posting engine**: Pure assembly of journal rows with a balance report
//!   and per-fact skip diagnostics
//! - **Storage abstraction**: Database-agnostic design with trait-based
//!   storage and a unit-of-work boundary
//!
//! ## Quick Start
//!
//! ```rust
//! use posting_core::{PostingService, MemoryStore, MemoryLedger};
//!
//! let storage = MemoryStore::new();
//! let sink = MemoryLedger::new();
//! let service = PostingService::new(storage, sink);
//! // Seed determination headers and posting rules, then post documents.
//! ```

pub mod config;
pub mod determination;
pub mod extract;
pub mod posting;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::{CompanySeed, HeaderSeed, RuleSeed};
pub use determination::matcher::{best_rule, candidate_keys, canonical_key, DEFAULT_KEY};
pub use determination::rules::{DeterminationHeader, DeterminationManager, DeterminationRule};
pub use extract::{
    BusinessDocument, DocumentHeader, ExtractorRegistry, FactExtractor, SourceDocument,
};
pub use posting::engine::{assemble, BalanceReport, PostingRun, SkippedFact};
pub use posting::registry::{AccountSource, PostingRule, RuleRegistry};
pub use posting::service::{PostingOutcome, PostingService};
pub use traits::*;
pub use types::*;
pub use utils::memory_storage::{FixedCosts, MemoryLedger, MemoryStore};
