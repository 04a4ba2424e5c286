//! Goods-receipt adapter
//!
//! A goods receipt books received stock at valuation cost: one LINE/COST
//! fact per received line, valued through the inventory-costing
//! collaborator and tracked by product.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::extract::{DocumentHeader, FactExtractor, SourceDocument};
use crate::traits::CostProvider;
use crate::types::{AmountSource, PostingFact, PostingResult, RuleLevel, TrackingRef};

/// Posting-rule key for goods receipts
pub const GRN_DOCUMENT_TYPE: &str = "GRN_PURCHASE";
/// App code of the goods-receipt document kind
pub const GRN_APP_CODE: &str = "goods_receipt";

/// A received line item, valued through the cost provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsReceiptLine {
    pub product_id: String,
    pub quantity: BigDecimal,
}

/// Goods receipt document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsReceipt {
    pub header: DocumentHeader,
    pub warehouse_id: String,
    pub supplier_id: String,
    pub lines: Vec<GoodsReceiptLine>,
}

impl SourceDocument for GoodsReceipt {
    fn id(&self) -> &str {
        &self.header.id
    }
    fn code(&self) -> &str {
        &self.header.code
    }
    fn title(&self) -> &str {
        &self.header.title
    }
    fn company_id(&self) -> &str {
        &self.header.company_id
    }
    fn app_code(&self) -> &str {
        GRN_APP_CODE
    }
    fn document_type(&self) -> &str {
        GRN_DOCUMENT_TYPE
    }
    fn date_created(&self) -> NaiveDateTime {
        self.header.date_created
    }
    fn date_approved(&self) -> Option<NaiveDateTime> {
        self.header.date_approved
    }
}

/// Extractor for goods receipts
pub struct GoodsReceiptExtractor<C: CostProvider> {
    costs: C,
}

impl<C: CostProvider> GoodsReceiptExtractor<C> {
    pub fn new(costs: C) -> Self {
        Self { costs }
    }
}

#[async_trait]
impl<C: CostProvider> FactExtractor for GoodsReceiptExtractor<C> {
    type Doc = GoodsReceipt;

    fn app_code(&self) -> &'static str {
        GRN_APP_CODE
    }

    async fn facts(&self, doc: &GoodsReceipt) -> PostingResult<Vec<PostingFact>> {
        let mut facts = Vec::with_capacity(doc.lines.len());

        for line in &doc.lines {
            let unit_cost = self
                .costs
                .unit_cost(
                    doc.company_id(),
                    &line.product_id,
                    Some(&doc.warehouse_id),
                )
                .await?;

            let unit_cost = match unit_cost {
                Some(cost) => cost,
                None => {
                    tracing::warn!(
                        doc_id = %doc.id(),
                        product_id = %line.product_id,
                        "no valuation cost for product; line not extracted"
                    );
                    continue;
                }
            };

            facts.push(
                PostingFact::new(
                    doc.id(),
                    doc.app_code(),
                    doc.company_id(),
                    RuleLevel::Line,
                    AmountSource::Cost,
                    &line.quantity * &unit_cost,
                )
                .with_tracking(TrackingRef::product(line.product_id.clone())),
            );
        }

        Ok(facts)
    }
}
