//! Posting engine
//!
//! Matches posting facts against a document type's rules in priority order
//! and assembles the ordered debit/credit line lists. The engine is a pure
//! transform: it holds no state and performs no persistence, and it does
//! not verify that the assembled run balances — see [`BalanceReport`].

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::posting::registry::PostingRule;
use crate::types::{JournalRow, PostingFact, PostingResult, Side, TrackingBy};

/// Assembled output of one posting run, before persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PostingRun {
    pub debit_rows: Vec<JournalRow>,
    pub credit_rows: Vec<JournalRow>,
    /// Facts a matched rule could not produce a line for (unresolved
    /// account). Kept observable rather than failing the run.
    pub skipped: Vec<SkippedFact>,
}

/// Record of a fact that matched a rule but produced no line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFact {
    pub rule_id: String,
    pub doc_id: String,
    pub reason: String,
}

impl PostingRun {
    pub fn is_empty(&self) -> bool {
        self.debit_rows.is_empty() && self.credit_rows.is_empty()
    }

    pub fn total_debit(&self) -> BigDecimal {
        self.debit_rows.iter().map(|r| &r.debit).sum()
    }

    pub fn total_credit(&self) -> BigDecimal {
        self.credit_rows.iter().map(|r| &r.credit).sum()
    }

    /// Post-hoc balance diagnostic.
    ///
    /// The engine itself never rejects an unbalanced run; whether silent
    /// imbalance (e.g. from an unresolved account skipping one leg) is
    /// tolerable is a configuration-trust question. This report makes it
    /// observable so callers can log or alert on it.
    pub fn balance_report(&self) -> BalanceReport {
        let total_debit = self.total_debit();
        let total_credit = self.total_credit();
        BalanceReport {
            is_balanced: total_debit == total_credit,
            total_debit,
            total_credit,
            skipped_facts: self.skipped.len(),
        }
    }
}

/// Result of [`PostingRun::balance_report`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub is_balanced: bool,
    pub skipped_facts: usize,
}

/// Assemble ledger rows by matching facts against rules in priority order.
///
/// `rules` must already be ordered (ascending priority, as returned by the
/// registry); the output lists preserve that order. For each rule, every
/// fact with the same rule level and amount source and a positive value
/// produces one row on the rule's side. `resolve` maps a (rule, fact) pair
/// to an account; `Ok(None)` skips the fact with a warning and a
/// [`SkippedFact`] entry, while `Err` aborts the whole run (infrastructure
/// failure, not a missing configuration).
pub fn assemble<F>(
    rules: &[PostingRule],
    facts: &[PostingFact],
    mut resolve: F,
) -> PostingResult<PostingRun>
where
    F: FnMut(&PostingRule, &PostingFact) -> PostingResult<Option<String>>,
{
    let zero = BigDecimal::from(0);
    let mut run = PostingRun::default();

    for rule in rules {
        let matching = facts
            .iter()
            .filter(|f| f.rule_level == rule.rule_level && f.amount_source == rule.amount_source);

        for fact in matching {
            if fact.value <= zero {
                tracing::debug!(
                    rule_id = %rule.id,
                    doc_id = %fact.doc_id,
                    "skipping non-positive fact value"
                );
                continue;
            }

            let account = match resolve(rule, fact)? {
                Some(account) => account,
                None => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        doc_id = %fact.doc_id,
                        role = ?rule.role_key,
                        "account unresolved; fact skipped"
                    );
                    run.skipped.push(SkippedFact {
                        rule_id: rule.id.clone(),
                        doc_id: fact.doc_id.clone(),
                        reason: "account unresolved".to_string(),
                    });
                    continue;
                }
            };

            let row = build_row(rule, fact, account);
            match rule.side {
                Side::Debit => run.debit_rows.push(row),
                Side::Credit => run.credit_rows.push(row),
            }
        }
    }

    Ok(run)
}

fn build_row(rule: &PostingRule, fact: &PostingFact, account: String) -> JournalRow {
    let zero = BigDecimal::from(0);
    let (debit, credit) = match rule.side {
        Side::Debit => (fact.value.clone(), zero),
        Side::Credit => (zero, fact.value.clone()),
    };

    let mut row = JournalRow {
        account,
        debit,
        credit,
        product_ref: None,
        partner_ref: None,
        employee_ref: None,
        is_fc: fact.is_foreign_currency,
        // The taxable base only travels on tax legs
        taxable_value: if rule.role_key.is_tax() {
            fact.taxable_value.clone()
        } else {
            None
        },
        use_for_recon: rule.role_key.reconciliation_type().is_some(),
        use_for_recon_type: rule.role_key.reconciliation_type().map(str::to_string),
        description: None,
    };

    if let Some(tracking) = &fact.tracking {
        match tracking.tracking_by {
            TrackingBy::Product => row.product_ref = Some(tracking.tracking_id.clone()),
            TrackingBy::Account => row.partner_ref = Some(tracking.tracking_id.clone()),
            TrackingBy::Employee => row.employee_ref = Some(tracking.tracking_id.clone()),
        }
    }

    row
}
