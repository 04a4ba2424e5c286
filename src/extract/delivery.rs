//! Delivery-note adapter
//!
//! A delivery issues stock before the customer invoice exists: one
//! LINE/COST fact per delivered line at valuation cost, which typically
//! feeds an inventory-credit / DONI-debit rule pair.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::extract::{DocumentHeader, FactExtractor, SourceDocument};
use crate::traits::CostProvider;
use crate::types::{AmountSource, PostingFact, PostingResult, RuleLevel, TrackingRef};

pub const DELIVERY_DOCUMENT_TYPE: &str = "DELIVERY";
pub const DELIVERY_APP_CODE: &str = "delivery";

/// A delivered line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLine {
    pub product_id: String,
    pub quantity: BigDecimal,
}

/// Delivery note document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryNote {
    pub header: DocumentHeader,
    pub warehouse_id: String,
    pub customer_id: String,
    pub lines: Vec<DeliveryLine>,
}

impl SourceDocument for DeliveryNote {
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
        DELIVERY_APP_CODE
    }
    fn document_type(&self) -> &str {
        DELIVERY_DOCUMENT_TYPE
    }
    fn date_created(&self) -> NaiveDateTime {
        self.header.date_created
    }
    fn date_approved(&self) -> Option<NaiveDateTime> {
        self.header.date_approved
    }
}

/// Extractor for delivery notes
pub struct DeliveryExtractor<C: CostProvider> {
    costs: C,
}

impl<C: CostProvider> DeliveryExtractor<C> {
    pub fn new(costs: C) -> Self {
        Self { costs }
    }
}

#[async_trait]
impl<C: CostProvider> FactExtractor for DeliveryExtractor<C> {
    type Doc = DeliveryNote;

    fn app_code(&self) -> &'static str {
        DELIVERY_APP_CODE
    }

    async fn facts(&self, doc: &DeliveryNote) -> PostingResult<Vec<PostingFact>> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::FixedCosts;

    #[tokio::test]
    async fn delivery_lines_are_costed_facts() {
        let costs = FixedCosts::new().with_cost("p1", BigDecimal::from(30));
        let extractor = DeliveryExtractor::new(costs);

        let doc = DeliveryNote {
            header: DocumentHeader {
                id: "del1".to_string(),
                code: "DEL-001".to_string(),
                title: "Delivery to customer".to_string(),
                company_id: "co1".to_string(),
                date_created: chrono::NaiveDate::from_ymd_opt(2024, 3, 2)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                date_approved: None,
            },
            warehouse_id: "wh1".to_string(),
            customer_id: "cust1".to_string(),
            lines: vec![DeliveryLine {
                product_id: "p1".to_string(),
                quantity: BigDecimal::from(3),
            }],
        };

        let facts = extractor.facts(&doc).await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, BigDecimal::from(90));
        assert_eq!(facts[0].amount_source, AmountSource::Cost);
    }
}
