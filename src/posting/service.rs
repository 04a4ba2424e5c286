//! Posting orchestration
//!
//! Wires the registry, fact store, engine and ledger sink together for one
//! document. The whole sequence extract -> match -> post -> persist runs
//! inside a single unit of work: any failure rolls everything back so the
//! ledger never observes a half-posted document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::determination::rules::DeterminationRule;
use crate::extract::{FactExtractor, SourceDocument};
use crate::posting::engine::{assemble, PostingRun};
use crate::posting::registry::{resolve_account, AccountSource, PostingRule, RuleRegistry};
use crate::traits::{
    DeterminationStore, FactStore, LedgerSink, PostingRuleStore, UnitOfWork,
};
use crate::types::{
    DocumentSnapshot, MatchCriteria, PostingFact, PostingResult, TrackingBy,
};

/// Result of a successful posting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingOutcome {
    pub run: PostingRun,
    /// Id of the committed journal document; `None` when the run produced
    /// no rows and nothing was persisted
    pub ledger_doc_id: Option<String>,
}

/// Orchestrates posting for one document at a time.
///
/// Execution is synchronous per invocation; the service does not serialize
/// concurrent attempts for the same document — callers provide that (an
/// advisory lock or the backend's uniqueness constraint).
pub struct PostingService<S, L> {
    registry: RuleRegistry<S>,
    storage: S,
    sink: L,
}

impl<S, L> PostingService<S, L>
where
    S: PostingRuleStore + DeterminationStore + FactStore + UnitOfWork + Clone,
    L: LedgerSink,
{
    pub fn new(storage: S, sink: L) -> Self {
        Self {
            registry: RuleRegistry::new(storage.clone()),
            storage,
            sink,
        }
    }

    pub fn registry(&mut self) -> &mut RuleRegistry<S> {
        &mut self.registry
    }

    /// Extract facts from a document and post them, all in one atomic scope.
    ///
    /// Returns `Ok(None)` when the document type has no posting rules (not
    /// configured for auto-posting; nothing is written) or when extraction
    /// produced no facts. Any error rolls back both the fact replacement
    /// and the ledger write before propagating.
    pub async fn extract_and_post<E>(
        &mut self,
        extractor: &E,
        doc: &E::Doc,
        context: &MatchCriteria,
    ) -> PostingResult<Option<PostingOutcome>>
    where
        E: FactExtractor,
    {
        self.storage.begin().await?;
        match self.extract_and_post_inner(extractor, doc, context).await {
            Ok(outcome) => {
                self.storage.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!(
                    doc_id = %doc.id(),
                    app_code = %doc.app_code(),
                    error = %err,
                    "posting failed; rolling back"
                );
                self.storage.rollback().await?;
                Err(err)
            }
        }
    }

    async fn extract_and_post_inner<E>(
        &mut self,
        extractor: &E,
        doc: &E::Doc,
        context: &MatchCriteria,
    ) -> PostingResult<Option<PostingOutcome>>
    where
        E: FactExtractor,
    {
        let rules = self
            .registry
            .rules_for(doc.company_id(), doc.document_type())
            .await?;
        if rules.is_empty() {
            tracing::info!(
                doc_id = %doc.id(),
                document_type = %doc.document_type(),
                "document type not configured for auto-posting"
            );
            return Ok(None);
        }

        let facts = extractor.facts(doc).await?;
        self.storage
            .replace_facts(doc.id(), doc.app_code(), facts)
            .await?;

        self.post_prepared(&doc.snapshot(), doc.company_id(), doc.app_code(), rules, context)
            .await
    }

    /// Post a document whose facts were already pushed.
    ///
    /// Follows the same recovery contract as [`Self::extract_and_post`]:
    /// missing rules or missing facts log and return `Ok(None)` with no
    /// ledger call; errors roll back the scope.
    pub async fn post(
        &mut self,
        document: &DocumentSnapshot,
        company_id: &str,
        app_code: &str,
        document_type: &str,
        context: &MatchCriteria,
    ) -> PostingResult<Option<PostingOutcome>> {
        self.storage.begin().await?;
        let rules = match self.registry.rules_for(company_id, document_type).await {
            Ok(rules) => rules,
            Err(err) => {
                self.storage.rollback().await?;
                return Err(err);
            }
        };
        if rules.is_empty() {
            tracing::info!(
                doc_id = %document.id,
                document_type,
                "no posting rules configured; nothing to post"
            );
            self.storage.commit().await?;
            return Ok(None);
        }

        match self
            .post_prepared(document, company_id, app_code, rules, context)
            .await
        {
            Ok(outcome) => {
                self.storage.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!(
                    doc_id = %document.id,
                    document_type,
                    error = %err,
                    "posting failed; rolling back"
                );
                self.storage.rollback().await?;
                Err(err)
            }
        }
    }

    async fn post_prepared(
        &mut self,
        document: &DocumentSnapshot,
        company_id: &str,
        app_code: &str,
        rules: Vec<PostingRule>,
        context: &MatchCriteria,
    ) -> PostingResult<Option<PostingOutcome>> {
        let facts: Vec<PostingFact> = self
            .storage
            .facts_for_document(&document.id)
            .await?
            .into_iter()
            .filter(|f| f.company_id == company_id)
            .collect();
        if facts.is_empty() {
            tracing::info!(
                doc_id = %document.id,
                "no posting facts for document; nothing to post"
            );
            return Ok(None);
        }

        let lookup_rules = self.prefetch_lookup_rules(company_id, &rules).await?;

        let run = assemble(&rules, &facts, |rule, fact| {
            let ctx = fact_context(context, fact);
            match &rule.account_source {
                AccountSource::Fixed { .. } => resolve_account(rule, &[], &ctx),
                AccountSource::Lookup { transaction_key } => {
                    let det_rules = lookup_rules
                        .get(transaction_key)
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    resolve_account(rule, det_rules, &ctx)
                }
            }
        })?;

        let report = run.balance_report();
        if !report.is_balanced {
            tracing::warn!(
                doc_id = %document.id,
                total_debit = %report.total_debit,
                total_credit = %report.total_credit,
                skipped_facts = report.skipped_facts,
                "posting run is unbalanced"
            );
        }

        if run.is_empty() {
            tracing::info!(doc_id = %document.id, "posting run produced no rows");
            return Ok(Some(PostingOutcome {
                run,
                ledger_doc_id: None,
            }));
        }

        let ledger_doc_id = self
            .sink
            .create_journal_entry(document, app_code, &document.id, &run)
            .await?;
        tracing::info!(
            doc_id = %document.id,
            ledger_doc_id = %ledger_doc_id,
            debit_rows = run.debit_rows.len(),
            credit_rows = run.credit_rows.len(),
            "journal entry created"
        );

        Ok(Some(PostingOutcome {
            run,
            ledger_doc_id: Some(ledger_doc_id),
        }))
    }

    /// Fetch the determination rules behind every lookup key once, so the
    /// engine can run as a pure function over the prefetched data.
    async fn prefetch_lookup_rules(
        &self,
        company_id: &str,
        rules: &[PostingRule],
    ) -> PostingResult<HashMap<String, Vec<DeterminationRule>>> {
        let mut map: HashMap<String, Vec<DeterminationRule>> = HashMap::new();
        for rule in rules {
            if let AccountSource::Lookup { transaction_key } = &rule.account_source {
                if map.contains_key(transaction_key) {
                    continue;
                }
                match self.storage.get_header(company_id, transaction_key).await? {
                    Some(header) => {
                        let det_rules = self.storage.rules_for_header(&header.id).await?;
                        map.insert(transaction_key.clone(), det_rules);
                    }
                    None => {
                        tracing::warn!(
                            rule_id = %rule.id,
                            transaction_key = %transaction_key,
                            "lookup rule points at a missing determination header"
                        );
                    }
                }
            }
        }
        Ok(map)
    }
}

/// Per-fact resolution context: the caller's document context plus the
/// product dimension when the fact is product-tracked.
fn fact_context(base: &MatchCriteria, fact: &PostingFact) -> MatchCriteria {
    let mut ctx = base.clone();
    if let Some(tracking) = &fact.tracking {
        if tracking.tracking_by == TrackingBy::Product {
            ctx.insert("product_id".to_string(), tracking.tracking_id.clone());
        }
    }
    ctx
}
