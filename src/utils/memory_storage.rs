//! In-memory storage implementation for testing and development

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::determination::rules::{DeterminationHeader, DeterminationRule};
use crate::posting::engine::PostingRun;
use crate::posting::registry::PostingRule;
use crate::traits::*;
use crate::types::{DocumentSnapshot, PostingError, PostingFact, PostingResult};

#[derive(Debug, Clone, Default)]
struct State {
    headers: HashMap<String, DeterminationHeader>,
    determination_rules: HashMap<String, DeterminationRule>,
    posting_rules: HashMap<String, PostingRule>,
    facts: Vec<PostingFact>,
}

/// In-memory store backing every repository trait plus the unit of work.
///
/// Clones share the same underlying state, so the managers a service builds
/// from clones all observe the same data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    snapshot: Arc<RwLock<Option<State>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            snapshot: Arc::new(RwLock::new(None)),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        *self.state.write().unwrap() = State::default();
        *self.snapshot.write().unwrap() = None;
    }

    /// All stored facts, for assertions
    pub fn all_facts(&self) -> Vec<PostingFact> {
        self.state.read().unwrap().facts.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeterminationStore for MemoryStore {
    async fn save_header(&mut self, header: &DeterminationHeader) -> PostingResult<()> {
        self.state
            .write()
            .unwrap()
            .headers
            .insert(header.id.clone(), header.clone());
        Ok(())
    }

    async fn get_header(
        &self,
        company_id: &str,
        transaction_key: &str,
    ) -> PostingResult<Option<DeterminationHeader>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .headers
            .values()
            .find(|h| h.company_id == company_id && h.transaction_key == transaction_key)
            .cloned())
    }

    async fn save_rule(&mut self, rule: &DeterminationRule) -> PostingResult<()> {
        self.state
            .write()
            .unwrap()
            .determination_rules
            .insert(rule.id.clone(), rule.clone());
        Ok(())
    }

    async fn rules_for_header(&self, header_id: &str) -> PostingResult<Vec<DeterminationRule>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .determination_rules
            .values()
            .filter(|r| r.header_id == header_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PostingRuleStore for MemoryStore {
    async fn save_posting_rule(&mut self, rule: &PostingRule) -> PostingResult<()> {
        self.state
            .write()
            .unwrap()
            .posting_rules
            .insert(rule.id.clone(), rule.clone());
        Ok(())
    }

    async fn posting_rules(
        &self,
        company_id: &str,
        document_type: &str,
    ) -> PostingResult<Vec<PostingRule>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .posting_rules
            .values()
            .filter(|r| r.company_id == company_id && r.document_type == document_type)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FactStore for MemoryStore {
    async fn replace_facts(
        &mut self,
        doc_id: &str,
        app_code: &str,
        facts: Vec<PostingFact>,
    ) -> PostingResult<()> {
        // Delete-then-insert under one write lock keeps the swap atomic
        let mut state = self.state.write().unwrap();
        state
            .facts
            .retain(|f| !(f.doc_id == doc_id && f.app_code == app_code));
        state.facts.extend(facts);
        Ok(())
    }

    async fn facts_for_document(&self, doc_id: &str) -> PostingResult<Vec<PostingFact>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .facts
            .iter()
            .filter(|f| f.doc_id == doc_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn begin(&mut self) -> PostingResult<()> {
        let state = self.state.read().unwrap().clone();
        *self.snapshot.write().unwrap() = Some(state);
        Ok(())
    }

    async fn commit(&mut self) -> PostingResult<()> {
        *self.snapshot.write().unwrap() = None;
        Ok(())
    }

    async fn rollback(&mut self) -> PostingResult<()> {
        let snapshot = self.snapshot.write().unwrap().take();
        match snapshot {
            Some(state) => {
                *self.state.write().unwrap() = state;
                Ok(())
            }
            None => Err(PostingError::Storage(
                "rollback without an open unit of work".to_string(),
            )),
        }
    }
}

/// One committed journal document held by [`MemoryLedger`]
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: String,
    pub document: DocumentSnapshot,
    pub transaction_app_code: String,
    pub transaction_id: String,
    pub run: PostingRun,
}

/// Ledger sink double capturing committed journal documents
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
    fail: bool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            fail: false,
        }
    }

    /// A sink whose every write fails, for exercising rollback paths
    pub fn failing() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            fail: true,
        }
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.read().unwrap().clone()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerSink for MemoryLedger {
    async fn create_journal_entry(
        &mut self,
        document: &DocumentSnapshot,
        transaction_app_code: &str,
        transaction_id: &str,
        run: &PostingRun,
    ) -> PostingResult<String> {
        if self.fail {
            return Err(PostingError::Ledger("sink unavailable".to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.entries.write().unwrap().push(LedgerEntry {
            id: id.clone(),
            document: document.clone(),
            transaction_app_code: transaction_app_code.to_string(),
            transaction_id: transaction_id.to_string(),
            run: run.clone(),
        });
        Ok(id)
    }
}

/// Cost provider double with a fixed per-product cost table
#[derive(Debug, Clone, Default)]
pub struct FixedCosts {
    costs: HashMap<String, BigDecimal>,
}

impl FixedCosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cost(mut self, product_id: impl Into<String>, cost: BigDecimal) -> Self {
        self.costs.insert(product_id.into(), cost);
        self
    }
}

#[async_trait]
impl CostProvider for FixedCosts {
    async fn unit_cost(
        &self,
        _company_id: &str,
        product_id: &str,
        _warehouse_id: Option<&str>,
    ) -> PostingResult<Option<BigDecimal>> {
        Ok(self.costs.get(product_id).cloned())
    }
}
