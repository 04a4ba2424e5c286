//! Validation utilities

use crate::determination::rules::DeterminationRule;
use crate::posting::registry::PostingRule;
use crate::types::{PostingError, PostingResult};
use std::collections::HashSet;

/// Validate that an account ID is valid
pub fn validate_account_id(account_id: &str) -> PostingResult<()> {
    if account_id.trim().is_empty() {
        return Err(PostingError::Validation(
            "Account ID cannot be empty".to_string(),
        ));
    }

    if account_id.len() > 50 {
        return Err(PostingError::Validation(
            "Account ID cannot exceed 50 characters".to_string(),
        ));
    }

    // Check for valid characters (alphanumeric, dashes, underscores)
    if !account_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(PostingError::Validation(
            "Account ID can only contain alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate that a transaction key is valid
pub fn validate_transaction_key(transaction_key: &str) -> PostingResult<()> {
    if transaction_key.trim().is_empty() {
        return Err(PostingError::Validation(
            "Transaction key cannot be empty".to_string(),
        ));
    }

    if transaction_key.len() > 100 {
        return Err(PostingError::Validation(
            "Transaction key cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a document type is valid
pub fn validate_document_type(document_type: &str) -> PostingResult<()> {
    if document_type.trim().is_empty() {
        return Err(PostingError::Validation(
            "Document type cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Check a batch of determination rules for colliding search rules.
///
/// Two rules under the same header with the same derived search rule would
/// make determination ambiguous, so a batch carrying such a pair is rejected
/// before any of it is saved.
pub fn validate_rule_batch(rules: &[DeterminationRule]) -> PostingResult<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        validate_account_id(&rule.account)?;
        let key = (rule.header_id.clone(), rule.search_rule().to_string());
        if !seen.insert(key) {
            return Err(PostingError::DuplicateSearchRule {
                header_id: rule.header_id.clone(),
                search_rule: rule.search_rule().to_string(),
            });
        }
    }
    Ok(())
}

/// Check a batch of posting rules for colliding priorities.
///
/// Priorities order journal rows within a document type, so two active rules
/// sharing one makes the output order storage-dependent.
pub fn validate_posting_rule_batch(rules: &[PostingRule]) -> PostingResult<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        validate_document_type(&rule.document_type)?;
        if !rule.active {
            continue;
        }
        let key = (
            rule.company_id.clone(),
            rule.document_type.clone(),
            rule.priority,
        );
        if !seen.insert(key) {
            return Err(PostingError::Validation(format!(
                "Duplicate priority {} for active posting rules on document type '{}'",
                rule.priority, rule.document_type
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AmountSource, MatchCriteria, RoleKey, RuleLevel, Side};

    #[test]
    fn test_account_id_rules() {
        assert!(validate_account_id("1561").is_ok());
        assert!(validate_account_id("acc-payable_01").is_ok());
        assert!(validate_account_id("").is_err());
        assert!(validate_account_id("   ").is_err());
        assert!(validate_account_id("bad account").is_err());
    }

    #[test]
    fn test_rule_batch_rejects_duplicate_search_rules() {
        let mut criteria = MatchCriteria::new();
        criteria.insert("warehouse_id".to_string(), "w1".to_string());

        let a = DeterminationRule::new("r1", "h1", criteria.clone(), "", "1561");
        let b = DeterminationRule::new("r2", "h1", criteria.clone(), "", "1562");
        assert!(matches!(
            validate_rule_batch(&[a.clone(), b]),
            Err(PostingError::DuplicateSearchRule { .. })
        ));

        // Same criteria under a different header is fine
        let c = DeterminationRule::new("r3", "h2", criteria, "", "1563");
        assert!(validate_rule_batch(&[a, c]).is_ok());
    }

    #[test]
    fn test_posting_rule_batch_rejects_duplicate_priorities() {
        let a = PostingRule::fixed(
            "p1",
            "co1",
            "GRN_PURCHASE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Inventory,
            Side::Debit,
            10,
            "1561",
        );
        let mut b = a.clone();
        b.id = "p2".to_string();
        b.side = Side::Credit;
        assert!(validate_posting_rule_batch(&[a.clone(), b.clone()]).is_err());

        // An inactive rule does not collide
        b.active = false;
        assert!(validate_posting_rule_batch(&[a, b]).is_ok());
    }
}
