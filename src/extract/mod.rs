//! Fact extraction
//!
//! One adapter per source-document kind converts a concrete business
//! transaction into the normalized posting facts the engine consumes.
//! Extraction is idempotent: facts for a `(doc_id, app_code)` pair are
//! fully replaced on every run, never appended.

pub mod cash;
pub mod delivery;
pub mod goods_receipt;
pub mod invoices;

pub use cash::*;
pub use delivery::*;
pub use goods_receipt::*;
pub use invoices::*;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::traits::{CostProvider, FactStore, PostingRuleStore, UnitOfWork};
use crate::types::{DocumentSnapshot, PostingFact, PostingResult};

/// Inbound contract every source document satisfies
pub trait SourceDocument: Send + Sync {
    fn id(&self) -> &str;
    fn code(&self) -> &str;
    fn title(&self) -> &str;
    fn company_id(&self) -> &str;
    /// Model code of the document kind, e.g. "goods_receipt"
    fn app_code(&self) -> &str;
    /// Posting-rule key of the document kind, e.g. "GRN_PURCHASE"
    fn document_type(&self) -> &str;
    fn date_created(&self) -> NaiveDateTime;
    fn date_approved(&self) -> Option<NaiveDateTime>;

    /// Identity snapshot handed to the ledger sink
    fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            id: self.id().to_string(),
            code: self.code().to_string(),
            title: self.title().to_string(),
            date_created: self.date_created(),
            date_approved: self.date_approved(),
        }
    }
}

/// Identity fields shared by every source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub id: String,
    pub code: String,
    pub title: String,
    pub company_id: String,
    pub date_created: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_approved: Option<NaiveDateTime>,
}

/// Adapter converting one document kind into posting facts
#[async_trait]
pub trait FactExtractor: Send + Sync {
    type Doc: SourceDocument;

    /// App code this adapter handles
    fn app_code(&self) -> &'static str;

    /// Compute the full fact set for the document. Pure with respect to
    /// storage; collaborator lookups (costing) are allowed.
    async fn facts(&self, doc: &Self::Doc) -> PostingResult<Vec<PostingFact>>;
}

/// Extract a document's facts and replace the stored set, atomically.
///
/// Returns `Ok(false)` without writing anything when the document type has
/// no posting rules (not configured for auto-posting). Any failure rolls
/// the scope back so a partial fact set is never left behind.
pub async fn push_facts<E, S>(extractor: &E, doc: &E::Doc, storage: &mut S) -> PostingResult<bool>
where
    E: FactExtractor,
    S: FactStore + PostingRuleStore + UnitOfWork,
{
    let rules = storage
        .posting_rules(doc.company_id(), doc.document_type())
        .await?;
    if !rules.iter().any(|r| r.active) {
        tracing::info!(
            doc_id = %doc.id(),
            document_type = %doc.document_type(),
            "document type not configured for auto-posting; facts not pushed"
        );
        return Ok(false);
    }

    storage.begin().await?;
    let result = async {
        let facts = extractor.facts(doc).await?;
        storage.replace_facts(doc.id(), doc.app_code(), facts).await
    }
    .await;

    match result {
        Ok(()) => {
            storage.commit().await?;
            Ok(true)
        }
        Err(err) => {
            tracing::error!(
                doc_id = %doc.id(),
                app_code = %doc.app_code(),
                error = %err,
                "fact extraction failed; rolling back"
            );
            storage.rollback().await?;
            Err(err)
        }
    }
}

/// Any document kind the suite posts automatically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessDocument {
    GoodsReceipt(GoodsReceipt),
    ApInvoice(ApInvoice),
    ArInvoice(ArInvoice),
    Delivery(DeliveryNote),
    CashIn(CashReceipt),
    CashOut(CashPayment),
}

impl BusinessDocument {
    pub fn app_code(&self) -> &str {
        match self {
            BusinessDocument::GoodsReceipt(d) => d.app_code(),
            BusinessDocument::ApInvoice(d) => d.app_code(),
            BusinessDocument::ArInvoice(d) => d.app_code(),
            BusinessDocument::Delivery(d) => d.app_code(),
            BusinessDocument::CashIn(d) => d.app_code(),
            BusinessDocument::CashOut(d) => d.app_code(),
        }
    }
}

/// Registry of the built-in adapters, selected by app code.
///
/// The enum dispatch is exhaustive: adding a document kind forces a new
/// adapter arm here.
pub struct ExtractorRegistry<C: CostProvider + Clone> {
    goods_receipt: GoodsReceiptExtractor<C>,
    ap_invoice: ApInvoiceExtractor,
    ar_invoice: ArInvoiceExtractor,
    delivery: DeliveryExtractor<C>,
    cash_in: CashInExtractor,
    cash_out: CashOutExtractor,
}

impl<C: CostProvider + Clone> ExtractorRegistry<C> {
    /// Build the registry; cost-consuming adapters share the provider
    pub fn new(costs: C) -> Self {
        Self {
            goods_receipt: GoodsReceiptExtractor::new(costs.clone()),
            ap_invoice: ApInvoiceExtractor,
            ar_invoice: ArInvoiceExtractor,
            delivery: DeliveryExtractor::new(costs),
            cash_in: CashInExtractor,
            cash_out: CashOutExtractor,
        }
    }

    /// Push facts for any supported document through the shared pipeline
    pub async fn push<S>(&self, doc: &BusinessDocument, storage: &mut S) -> PostingResult<bool>
    where
        S: FactStore + PostingRuleStore + UnitOfWork,
    {
        match doc {
            BusinessDocument::GoodsReceipt(d) => push_facts(&self.goods_receipt, d, storage).await,
            BusinessDocument::ApInvoice(d) => push_facts(&self.ap_invoice, d, storage).await,
            BusinessDocument::ArInvoice(d) => push_facts(&self.ar_invoice, d, storage).await,
            BusinessDocument::Delivery(d) => push_facts(&self.delivery, d, storage).await,
            BusinessDocument::CashIn(d) => push_facts(&self.cash_in, d, storage).await,
            BusinessDocument::CashOut(d) => push_facts(&self.cash_out, d, storage).await,
        }
    }
}

/// Convert a document amount into company currency.
///
/// Returns the adjusted amount and whether an adjustment happened; a rate
/// of exactly 1 is treated as local currency.
pub(crate) fn exchange_adjust(
    amount: &BigDecimal,
    exchange_rate: Option<&BigDecimal>,
) -> (BigDecimal, bool) {
    match exchange_rate {
        Some(rate) if *rate != BigDecimal::from(1) => (amount * rate, true),
        _ => (amount.clone(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_adjust_multiplies_foreign_amounts() {
        let (value, is_fc) =
            exchange_adjust(&BigDecimal::from(100), Some(&BigDecimal::from(25)));
        assert_eq!(value, BigDecimal::from(2500));
        assert!(is_fc);
    }

    #[test]
    fn exchange_adjust_passes_local_amounts_through() {
        let (value, is_fc) = exchange_adjust(&BigDecimal::from(100), None);
        assert_eq!(value, BigDecimal::from(100));
        assert!(!is_fc);

        let (value, is_fc) =
            exchange_adjust(&BigDecimal::from(100), Some(&BigDecimal::from(1)));
        assert_eq!(value, BigDecimal::from(100));
        assert!(!is_fc);
    }
}
