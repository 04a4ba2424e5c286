//! Posting rule registry
//!
//! Declarative instructions describing which ledger legs a document type
//! produces. Rules are created at configuration time per document type and
//! are effectively immutable during normal operation.

use serde::{Deserialize, Serialize};

use crate::determination::matcher::best_rule;
use crate::determination::rules::DeterminationRule;
use crate::traits::{DeterminationStore, PostingRuleStore};
use crate::types::{
    AmountSource, MatchCriteria, PostingError, PostingResult, RoleKey, RuleLevel, Side,
};

/// How a posting rule finds its account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountSource {
    /// A fixed account reference stored on the rule
    Fixed { account: String },
    /// Dynamic lookup through the determination matcher, keyed by the
    /// header's transaction key and the posting context
    Lookup { transaction_key: String },
}

/// Declarative posting instruction belonging to a document type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRule {
    pub id: String,
    pub company_id: String,
    /// Document type this rule belongs to, e.g. "GRN_PURCHASE"
    pub document_type: String,
    pub rule_level: RuleLevel,
    pub amount_source: AmountSource,
    pub role_key: RoleKey,
    pub side: Side,
    /// Tie-break and ledger-line emission order; lower emits first.
    /// Matters for audit readability, not correctness.
    pub priority: u32,
    pub account_source: AccountSource,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl PostingRule {
    /// Fixed-account rule
    #[allow(clippy::too_many_arguments)]
    pub fn fixed(
        id: impl Into<String>,
        company_id: impl Into<String>,
        document_type: impl Into<String>,
        rule_level: RuleLevel,
        amount_source: AmountSource,
        role_key: RoleKey,
        side: Side,
        priority: u32,
        account: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            company_id: company_id.into(),
            document_type: document_type.into(),
            rule_level,
            amount_source,
            role_key,
            side,
            priority,
            account_source: AccountSource::Fixed {
                account: account.into(),
            },
            active: true,
        }
    }

    /// Lookup rule resolving through a determination header
    #[allow(clippy::too_many_arguments)]
    pub fn lookup(
        id: impl Into<String>,
        company_id: impl Into<String>,
        document_type: impl Into<String>,
        rule_level: RuleLevel,
        amount_source: AmountSource,
        role_key: RoleKey,
        side: Side,
        priority: u32,
        transaction_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            company_id: company_id.into(),
            document_type: document_type.into(),
            rule_level,
            amount_source,
            role_key,
            side,
            priority,
            account_source: AccountSource::Lookup {
                transaction_key: transaction_key.into(),
            },
            active: true,
        }
    }
}

/// Resolve the account for a rule against already-fetched determination rules.
///
/// Pure over its inputs: `determination_rules` must be the rules of the
/// header named by the rule's lookup key. Fixed rules ignore both extra
/// arguments. Returns `Ok(None)` when a lookup finds nothing; the engine
/// treats that as a skipped line.
pub fn resolve_account(
    rule: &PostingRule,
    determination_rules: &[DeterminationRule],
    context: &MatchCriteria,
) -> PostingResult<Option<String>> {
    match &rule.account_source {
        AccountSource::Fixed { account } => {
            if account.trim().is_empty() {
                return Err(PostingError::UnsupportedSourceType(format!(
                    "fixed rule '{}' carries an empty account",
                    rule.id
                )));
            }
            Ok(Some(account.clone()))
        }
        AccountSource::Lookup { .. } => {
            Ok(best_rule(determination_rules, context, "").map(|r| r.account.clone()))
        }
    }
}

/// Registry over the posting-rule store, scoped reads per company
pub struct RuleRegistry<S> {
    storage: S,
}

impl<S: PostingRuleStore> RuleRegistry<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Save a rule after basic configuration validation
    pub async fn save_rule(&mut self, rule: PostingRule) -> PostingResult<()> {
        if rule.document_type.trim().is_empty() {
            return Err(PostingError::Validation(format!(
                "Posting rule '{}' has no document type",
                rule.id
            )));
        }
        self.storage.save_posting_rule(&rule).await
    }

    /// All active rules for a document type, ascending by priority.
    ///
    /// The order governs ledger-line emission order.
    pub async fn rules_for(
        &self,
        company_id: &str,
        document_type: &str,
    ) -> PostingResult<Vec<PostingRule>> {
        let mut rules = self.storage.posting_rules(company_id, document_type).await?;
        rules.retain(|r| r.active);
        rules.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        Ok(rules)
    }
}

impl<S: PostingRuleStore + DeterminationStore> RuleRegistry<S> {
    /// Resolve a rule's account, fetching the lookup header's rules when
    /// needed. The storage-facing counterpart of [`resolve_account`].
    pub async fn resolve_account(
        &self,
        rule: &PostingRule,
        context: &MatchCriteria,
    ) -> PostingResult<Option<String>> {
        match &rule.account_source {
            AccountSource::Fixed { .. } => resolve_account(rule, &[], context),
            AccountSource::Lookup { transaction_key } => {
                let header = match self
                    .storage
                    .get_header(&rule.company_id, transaction_key)
                    .await?
                {
                    Some(header) => header,
                    None => {
                        tracing::warn!(
                            rule_id = %rule.id,
                            transaction_key = %transaction_key,
                            "lookup rule points at a missing determination header"
                        );
                        return Ok(None);
                    }
                };
                let rules = self.storage.rules_for_header(&header.id).await?;
                resolve_account(rule, &rules, context)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStore;

    fn line_cost_rule(id: &str, priority: u32, side: Side, account: &str) -> PostingRule {
        PostingRule::fixed(
            id,
            "co1",
            "GRN_PURCHASE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Inventory,
            side,
            priority,
            account,
        )
    }

    #[tokio::test]
    async fn rules_for_orders_by_priority() {
        let mut registry = RuleRegistry::new(MemoryStore::new());
        registry
            .save_rule(line_cost_rule("b", 20, Side::Credit, "33881"))
            .await
            .unwrap();
        registry
            .save_rule(line_cost_rule("a", 10, Side::Debit, "1561"))
            .await
            .unwrap();

        let rules = registry.rules_for("co1", "GRN_PURCHASE").await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, "a");
        assert_eq!(rules[1].id, "b");
    }

    #[tokio::test]
    async fn rules_for_skips_inactive_and_foreign_company_rules() {
        let mut registry = RuleRegistry::new(MemoryStore::new());
        let mut inactive = line_cost_rule("a", 10, Side::Debit, "1561");
        inactive.active = false;
        registry.save_rule(inactive).await.unwrap();

        let mut other_company = line_cost_rule("b", 20, Side::Credit, "33881");
        other_company.company_id = "co2".to_string();
        registry.save_rule(other_company).await.unwrap();

        let rules = registry.rules_for("co1", "GRN_PURCHASE").await.unwrap();
        assert!(rules.is_empty());
    }

    #[tokio::test]
    async fn rules_for_unknown_document_type_is_empty() {
        let registry = RuleRegistry::new(MemoryStore::new());
        let rules = registry.rules_for("co1", "UNKNOWN_DOC_TYPE").await.unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn fixed_rule_resolves_to_its_account() {
        let rule = line_cost_rule("a", 10, Side::Debit, "1561");
        let account = resolve_account(&rule, &[], &MatchCriteria::new()).unwrap();
        assert_eq!(account.as_deref(), Some("1561"));
    }

    #[test]
    fn lookup_rule_resolves_through_the_matcher() {
        let rule = PostingRule::lookup(
            "a",
            "co1",
            "GRN_PURCHASE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Inventory,
            Side::Debit,
            10,
            "INVENTORY_ACCOUNT",
        );

        let det_rules = vec![DeterminationRule::new(
            "r1",
            "hdr1",
            MatchCriteria::new(),
            "",
            "1561",
        )];
        let account = resolve_account(&rule, &det_rules, &MatchCriteria::new()).unwrap();
        assert_eq!(account.as_deref(), Some("1561"));

        // No matching determination rule: unresolved, not an error
        let account = resolve_account(&rule, &[], &MatchCriteria::new()).unwrap();
        assert!(account.is_none());
    }

    #[test]
    fn fixed_rule_with_empty_account_is_unsupported() {
        let rule = line_cost_rule("a", 10, Side::Debit, "  ");
        let err = resolve_account(&rule, &[], &MatchCriteria::new()).unwrap_err();
        assert!(matches!(err, PostingError::UnsupportedSourceType(_)));
    }
}
