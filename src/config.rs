//! Seed configuration for a company's posting setup.
//!
//! A [`CompanySeed`] bundles the determination headers, determination rules,
//! and posting rules a company needs before any document can post. Seeds are
//! plain serde structures, so they load from JSON fixtures or a provisioning
//! payload, and apply atomically through the unit of work.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::determination::rules::{DeterminationHeader, DeterminationRule};
use crate::posting::registry::PostingRule;
use crate::traits::{DeterminationStore, PostingRuleStore, UnitOfWork};
use crate::types::{DeterminationType, MatchCriteria, PostingResult};
use crate::utils::validation::{validate_posting_rule_batch, validate_rule_batch};

/// One determination rule inside a seed, before derived fields exist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSeed {
    pub id: String,
    #[serde(default)]
    pub modifier: String,
    #[serde(default)]
    pub match_criteria: MatchCriteria,
    pub account: String,
}

/// A determination header together with its rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderSeed {
    pub id: String,
    pub transaction_key: String,
    pub determination_type: DeterminationType,
    #[serde(default)]
    pub rules: Vec<RuleSeed>,
}

/// Full posting configuration for one company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySeed {
    pub company_id: String,
    #[serde(default)]
    pub determination: Vec<HeaderSeed>,
    #[serde(default)]
    pub posting_rules: Vec<PostingRule>,
}

impl CompanySeed {
    pub fn new(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            determination: Vec::new(),
            posting_rules: Vec::new(),
        }
    }

    pub fn with_header(mut self, header: HeaderSeed) -> Self {
        self.determination.push(header);
        self
    }

    pub fn with_posting_rule(mut self, rule: PostingRule) -> Self {
        self.posting_rules.push(rule);
        self
    }

    /// Validate the whole seed without touching storage.
    ///
    /// Checks for duplicate search rules within each header and duplicate
    /// priorities among active posting rules.
    pub fn validate(&self) -> PostingResult<()> {
        let rules: Vec<DeterminationRule> = self
            .determination
            .iter()
            .flat_map(|h| h.rules.iter().map(|r| self.build_rule(h, r)))
            .collect();
        validate_rule_batch(&rules)?;
        validate_posting_rule_batch(&self.scoped_posting_rules())?;
        Ok(())
    }

    /// Apply the seed inside a unit of work.
    ///
    /// Nothing is written if validation fails; a storage error mid-apply
    /// rolls everything back.
    pub async fn apply<S>(&self, storage: &mut S) -> PostingResult<()>
    where
        S: DeterminationStore + PostingRuleStore + UnitOfWork,
    {
        self.validate()?;

        storage.begin().await?;
        match self.apply_inner(storage).await {
            Ok(()) => {
                storage.commit().await?;
                info!(
                    company_id = %self.company_id,
                    headers = self.determination.len(),
                    posting_rules = self.posting_rules.len(),
                    "applied company seed"
                );
                Ok(())
            }
            Err(err) => {
                storage.rollback().await?;
                Err(err)
            }
        }
    }

    async fn apply_inner<S>(&self, storage: &mut S) -> PostingResult<()>
    where
        S: DeterminationStore + PostingRuleStore,
    {
        for header_seed in &self.determination {
            let header = DeterminationHeader::new(
                &header_seed.id,
                &self.company_id,
                &header_seed.transaction_key,
                header_seed.determination_type,
            );
            storage.save_header(&header).await?;

            for rule_seed in &header_seed.rules {
                let rule = self.build_rule(header_seed, rule_seed);
                storage.save_rule(&rule).await?;
            }
        }

        for rule in self.scoped_posting_rules() {
            storage.save_posting_rule(&rule).await?;
        }

        Ok(())
    }

    fn build_rule(&self, header: &HeaderSeed, seed: &RuleSeed) -> DeterminationRule {
        DeterminationRule::new(
            &seed.id,
            &header.id,
            seed.match_criteria.clone(),
            &seed.modifier,
            &seed.account,
        )
    }

    // Posting rules in a seed belong to the seed's company regardless of
    // what their own company_id field says.
    fn scoped_posting_rules(&self) -> Vec<PostingRule> {
        self.posting_rules
            .iter()
            .cloned()
            .map(|mut r| {
                r.company_id = self.company_id.clone();
                r
            })
            .collect()
    }
}
