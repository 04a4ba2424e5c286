//! Traits for storage abstraction and external collaborators
//!
//! The matcher and engine are pure functions over data the caller fetched;
//! these traits are the seams where that data comes from. Any backend
//! (PostgreSQL, SQLite, in-memory, ...) can plug in by implementing them.
//! Every read is scoped to a company: cross-company leakage of rules or
//! accounts would silently select the wrong account, so isolation here is a
//! correctness requirement, not just a privacy one.

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::determination::rules::{DeterminationHeader, DeterminationRule};
use crate::posting::engine::PostingRun;
use crate::posting::registry::PostingRule;
use crate::types::{DocumentSnapshot, PostingFact, PostingResult};

/// Storage for determination headers and their rules
#[async_trait]
pub trait DeterminationStore: Send + Sync {
    /// Save (insert or replace) a determination header
    async fn save_header(&mut self, header: &DeterminationHeader) -> PostingResult<()>;

    /// Look up a company's header by transaction key
    async fn get_header(
        &self,
        company_id: &str,
        transaction_key: &str,
    ) -> PostingResult<Option<DeterminationHeader>>;

    /// Save (insert or replace) a determination rule
    async fn save_rule(&mut self, rule: &DeterminationRule) -> PostingResult<()>;

    /// All rules belonging to a header
    async fn rules_for_header(&self, header_id: &str) -> PostingResult<Vec<DeterminationRule>>;
}

/// Storage for declarative posting rules
#[async_trait]
pub trait PostingRuleStore: Send + Sync {
    /// Save (insert or replace) a posting rule
    async fn save_posting_rule(&mut self, rule: &PostingRule) -> PostingResult<()>;

    /// All rules (active or not) for a company's document type; ordering is
    /// the registry's concern
    async fn posting_rules(
        &self,
        company_id: &str,
        document_type: &str,
    ) -> PostingResult<Vec<PostingRule>>;
}

/// Storage for extracted posting facts
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Replace all facts for `(doc_id, app_code)` with the given set.
    ///
    /// Delete-then-recreate in one atomic step; this is what makes fact
    /// extraction idempotent.
    async fn replace_facts(
        &mut self,
        doc_id: &str,
        app_code: &str,
        facts: Vec<PostingFact>,
    ) -> PostingResult<()>;

    /// All facts for a document, regardless of app code
    async fn facts_for_document(&self, doc_id: &str) -> PostingResult<Vec<PostingFact>>;
}

/// Explicit transactional scope around extract -> match -> post -> persist.
///
/// `begin` marks a restore point; `rollback` returns the stores to it and
/// `commit` discards it. One scope wraps the whole posting sequence for a
/// document so the ledger never observes a half-posted state. Serializing
/// concurrent posting attempts for the same document is the caller's job
/// (advisory lock or a uniqueness constraint in the backend).
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&mut self) -> PostingResult<()>;
    async fn commit(&mut self) -> PostingResult<()>;
    async fn rollback(&mut self) -> PostingResult<()>;
}

/// Outbound contract to the ledger-persistence collaborator.
///
/// Invoked exactly once per successful posting run, inside the same atomic
/// scope as fact extraction, or not at all.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    /// Commit the assembled rows as a single atomic journal document and
    /// return its id
    async fn create_journal_entry(
        &mut self,
        document: &DocumentSnapshot,
        transaction_app_code: &str,
        transaction_id: &str,
        run: &PostingRun,
    ) -> PostingResult<String>;
}

/// External inventory-valuation collaborator supplying per-product costs
#[async_trait]
pub trait CostProvider: Send + Sync {
    /// Unit cost of a product, optionally narrowed to a warehouse.
    /// `None` when the valuation subsystem has no cost for the product.
    async fn unit_cost(
        &self,
        company_id: &str,
        product_id: &str,
        warehouse_id: Option<&str>,
    ) -> PostingResult<Option<BigDecimal>>;
}
