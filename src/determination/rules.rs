//! Determination headers and rules
//!
//! A [`DeterminationHeader`] identifies a family of account-determination
//! decisions for one company (e.g. "INVENTORY_ACCOUNT" for inventory
//! postings). Its child [`DeterminationRule`]s map concrete dimension
//! combinations to resolved accounts. Headers are created once during setup
//! and rarely mutated.

use serde::{Deserialize, Serialize};

use crate::determination::matcher::{best_rule, canonical_key};
use crate::traits::DeterminationStore;
use crate::types::{DeterminationType, MatchCriteria, PostingError, PostingResult};

/// A family of account-determination decisions, scoped to a company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminationHeader {
    pub id: String,
    pub company_id: String,
    /// Logical key looked up by posting rules, e.g. "INVENTORY_ACCOUNT"
    pub transaction_key: String,
    pub determination_type: DeterminationType,
}

impl DeterminationHeader {
    pub fn new(
        id: impl Into<String>,
        company_id: impl Into<String>,
        transaction_key: impl Into<String>,
        determination_type: DeterminationType,
    ) -> Self {
        Self {
            id: id.into(),
            company_id: company_id.into(),
            transaction_key: transaction_key.into(),
            determination_type,
        }
    }
}

/// A resolved mapping from a dimension combination to an account.
///
/// `search_rule` and `priority` are derived from `match_criteria` and
/// recomputed on every save; they can never be set independently. Uniqueness
/// holds on `(header_id, search_rule)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminationRule {
    pub id: String,
    pub header_id: String,
    match_criteria: MatchCriteria,
    /// Secondary exact-match discriminator; empty for most rules
    #[serde(default)]
    pub modifier: String,
    /// Resolved general-ledger account
    pub account: String,
    #[serde(default)]
    search_rule: String,
    #[serde(default)]
    priority: usize,
}

impl DeterminationRule {
    /// Create a rule; the search key and priority are derived immediately
    pub fn new(
        id: impl Into<String>,
        header_id: impl Into<String>,
        match_criteria: MatchCriteria,
        modifier: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        let mut rule = Self {
            id: id.into(),
            header_id: header_id.into(),
            match_criteria,
            modifier: modifier.into(),
            account: account.into(),
            search_rule: String::new(),
            priority: 0,
        };
        rule.recompute();
        rule
    }

    /// Canonical search key derived from the criteria
    pub fn search_rule(&self) -> &str {
        &self.search_rule
    }

    /// Specificity: the number of dimensions this rule matches
    pub fn priority(&self) -> usize {
        self.priority
    }

    pub fn match_criteria(&self) -> &MatchCriteria {
        &self.match_criteria
    }

    /// Replace the criteria; derived fields follow
    pub fn set_match_criteria(&mut self, criteria: MatchCriteria) {
        self.match_criteria = criteria;
        self.recompute();
    }

    /// Recompute `search_rule` and `priority` from the criteria.
    ///
    /// Called on every save so deserialized rules can never carry stale or
    /// hand-edited derived fields.
    pub fn recompute(&mut self) {
        self.search_rule = canonical_key(&self.match_criteria);
        self.priority = self.match_criteria.len();
    }
}

/// Manager for determination configuration, wrapping a store
pub struct DeterminationManager<S: DeterminationStore> {
    storage: S,
}

impl<S: DeterminationStore> DeterminationManager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create a determination header
    pub async fn create_header(&mut self, header: DeterminationHeader) -> PostingResult<()> {
        if header.transaction_key.trim().is_empty() {
            return Err(PostingError::Validation(
                "Transaction key cannot be empty".to_string(),
            ));
        }
        self.storage.save_header(&header).await
    }

    /// Save a rule under a header.
    ///
    /// Recomputes the derived fields and enforces uniqueness of
    /// `(header_id, search_rule)` across the header's existing rules.
    pub async fn save_rule(&mut self, mut rule: DeterminationRule) -> PostingResult<()> {
        rule.recompute();

        if rule.account.trim().is_empty() {
            return Err(PostingError::Validation(format!(
                "Rule '{}' has no account",
                rule.id
            )));
        }

        let existing = self.storage.rules_for_header(&rule.header_id).await?;
        let duplicate = existing
            .iter()
            .any(|r| r.id != rule.id && r.search_rule == rule.search_rule);
        if duplicate {
            return Err(PostingError::DuplicateSearchRule {
                header_id: rule.header_id.clone(),
                search_rule: rule.search_rule.clone(),
            });
        }

        self.storage.save_rule(&rule).await
    }

    /// Resolve the account for a transaction key and context.
    ///
    /// Loads the company's header and its rules, then delegates to the
    /// specificity matcher. Returns `None` when no header or no rule
    /// matches; the caller decides whether that is an error.
    pub async fn determine_account(
        &self,
        company_id: &str,
        transaction_key: &str,
        context: &MatchCriteria,
        modifier: &str,
    ) -> PostingResult<Option<DeterminationRule>> {
        let header = match self.storage.get_header(company_id, transaction_key).await? {
            Some(header) => header,
            None => {
                tracing::debug!(
                    company_id,
                    transaction_key,
                    "no determination header configured"
                );
                return Ok(None);
            }
        };

        let rules = self.storage.rules_for_header(&header.id).await?;
        Ok(best_rule(&rules, context, modifier).cloned())
    }
}
