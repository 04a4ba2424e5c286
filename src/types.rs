//! Core types and data structures for the posting engine

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Business family a determination header belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeterminationType {
    /// Sales-side determinations (revenue, receivables)
    Sale,
    /// Purchase-side determinations (expenses, payables)
    Purchase,
    /// Inventory movement determinations
    Inventory,
    /// Fixed-asset determinations
    FixedAsset,
}

/// Whether a posting rule consumes document-header totals or per-line amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleLevel {
    Header,
    Line,
}

/// Which monetary figure on the document a posting rule consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmountSource {
    Cost,
    Sales,
    Tax,
    Total,
    Cash,
    Bank,
}

/// Ledger side a posting rule writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Debit,
    Credit,
}

/// Semantic label for a ledger leg's business meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleKey {
    /// Goods-received-not-invoiced clearing account
    Grni,
    /// Delivered-not-invoiced clearing account
    Doni,
    Payable,
    Receivable,
    TaxInput,
    TaxOutput,
    Inventory,
    Revenue,
    Expense,
    Cash,
    Bank,
}

impl RoleKey {
    /// Roles whose lines carry the fact's taxable base forward
    pub fn is_tax(&self) -> bool {
        matches!(self, RoleKey::TaxInput | RoleKey::TaxOutput)
    }

    /// Reconciliation type for lines that participate in later
    /// document-matching; `None` for roles that never reconcile.
    pub fn reconciliation_type(&self) -> Option<&'static str> {
        match self {
            RoleKey::Grni => Some("gr-ap"),
            RoleKey::Payable => Some("ap-payment"),
            RoleKey::Receivable => Some("ar-payment"),
            RoleKey::Doni => Some("deli-ar"),
            _ => None,
        }
    }
}

/// Subledger dimension a fact (and its resulting line) is tracked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingBy {
    Product,
    Account,
    Employee,
}

/// Reference from a fact to the entity it is tracked against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRef {
    pub tracking_by: TrackingBy,
    pub tracking_id: String,
}

impl TrackingRef {
    pub fn product(id: impl Into<String>) -> Self {
        Self {
            tracking_by: TrackingBy::Product,
            tracking_id: id.into(),
        }
    }

    pub fn account(id: impl Into<String>) -> Self {
        Self {
            tracking_by: TrackingBy::Account,
            tracking_id: id.into(),
        }
    }

    pub fn employee(id: impl Into<String>) -> Self {
        Self {
            tracking_by: TrackingBy::Employee,
            tracking_id: id.into(),
        }
    }
}

/// Contextual dimensions used for account determination.
///
/// A `BTreeMap` keeps the keys sorted, which makes the canonical search key
/// independent of insertion order by construction.
pub type MatchCriteria = BTreeMap<String, String>;

/// Normalized, replaceable snapshot of one monetary figure extracted from a
/// source document, ready to be matched against posting rules.
///
/// Facts for a given `(doc_id, app_code)` are fully replaced every time the
/// extractor runs; they are not append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingFact {
    /// Source document id
    pub doc_id: String,
    /// Application code of the source document kind (e.g. "goods_receipt")
    pub app_code: String,
    /// Owning company; all lookups are scoped to it
    pub company_id: String,
    pub rule_level: RuleLevel,
    pub amount_source: AmountSource,
    /// Monetary value; zero or negative values never become lines
    pub value: BigDecimal,
    /// Taxable base, propagated to lines only for tax roles
    pub taxable_value: Option<BigDecimal>,
    pub tracking: Option<TrackingRef>,
    /// Set when the value was converted from a foreign-currency amount
    pub is_foreign_currency: bool,
}

impl PostingFact {
    /// Create a fact with just the matching coordinates and a value
    pub fn new(
        doc_id: impl Into<String>,
        app_code: impl Into<String>,
        company_id: impl Into<String>,
        rule_level: RuleLevel,
        amount_source: AmountSource,
        value: BigDecimal,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            app_code: app_code.into(),
            company_id: company_id.into(),
            rule_level,
            amount_source,
            value,
            taxable_value: None,
            tracking: None,
            is_foreign_currency: false,
        }
    }

    pub fn with_taxable(mut self, taxable_value: BigDecimal) -> Self {
        self.taxable_value = Some(taxable_value);
        self
    }

    pub fn with_tracking(mut self, tracking: TrackingRef) -> Self {
        self.tracking = Some(tracking);
        self
    }

    pub fn foreign_currency(mut self) -> Self {
        self.is_foreign_currency = true;
        self
    }
}

/// One assembled ledger line, before persistence.
///
/// Exactly one of `debit`/`credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRow {
    pub account: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_ref: Option<String>,
    pub is_fc: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxable_value: Option<BigDecimal>,
    pub use_for_recon: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_for_recon_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl JournalRow {
    /// Amount of the row regardless of side
    pub fn amount(&self) -> &BigDecimal {
        if self.debit > BigDecimal::from(0) {
            &self.debit
        } else {
            &self.credit
        }
    }
}

/// Snapshot of the source document identity handed to the ledger sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: String,
    pub code: String,
    pub title: String,
    pub date_created: chrono::NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_approved: Option<chrono::NaiveDateTime>,
}

/// Errors that can occur in the posting engine
#[derive(Debug, thiserror::Error)]
pub enum PostingError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("No posting rules configured for '{0}'")]
    ConfigurationMissing(String),
    #[error("No posting facts found for document '{0}'")]
    DataMissing(String),
    #[error("Account could not be resolved for rule '{0}'")]
    AccountUnresolved(String),
    #[error("Unsupported account source type: {0}")]
    UnsupportedSourceType(String),
    #[error("Duplicate search rule '{search_rule}' for header '{header_id}'")]
    DuplicateSearchRule {
        header_id: String,
        search_rule: String,
    },
    #[error("Determination header not found: {0}")]
    HeaderNotFound(String),
    #[error("Ledger persistence failed: {0}")]
    Ledger(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for posting operations
pub type PostingResult<T> = Result<T, PostingError>;
