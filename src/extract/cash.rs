//! Cash-in and cash-out adapters
//!
//! Cash documents split their total between a cash drawer amount and a
//! bank amount: one HEADER fact per non-empty bucket plus a partner-tracked
//! TOTAL fact.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::extract::{DocumentHeader, FactExtractor, SourceDocument};
use crate::types::{AmountSource, PostingFact, PostingResult, RuleLevel, TrackingRef};

pub const CASH_IN_DOCUMENT_TYPE: &str = "CASH_IN";
pub const CASH_IN_APP_CODE: &str = "cash_in";
pub const CASH_OUT_DOCUMENT_TYPE: &str = "CASH_OUT";
pub const CASH_OUT_APP_CODE: &str = "cash_out";

/// Incoming payment (customer receipt)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashReceipt {
    pub header: DocumentHeader,
    pub partner_id: String,
    pub cash_amount: BigDecimal,
    pub bank_amount: BigDecimal,
}

impl SourceDocument for CashReceipt {
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
        CASH_IN_APP_CODE
    }
    fn document_type(&self) -> &str {
        CASH_IN_DOCUMENT_TYPE
    }
    fn date_created(&self) -> NaiveDateTime {
        self.header.date_created
    }
    fn date_approved(&self) -> Option<NaiveDateTime> {
        self.header.date_approved
    }
}

/// Outgoing payment (supplier payment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashPayment {
    pub header: DocumentHeader,
    pub partner_id: String,
    pub cash_amount: BigDecimal,
    pub bank_amount: BigDecimal,
}

impl SourceDocument for CashPayment {
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
        CASH_OUT_APP_CODE
    }
    fn document_type(&self) -> &str {
        CASH_OUT_DOCUMENT_TYPE
    }
    fn date_created(&self) -> NaiveDateTime {
        self.header.date_created
    }
    fn date_approved(&self) -> Option<NaiveDateTime> {
        self.header.date_approved
    }
}

/// Shared split extraction for both cash directions
fn cash_facts(
    doc: &impl SourceDocument,
    partner_id: &str,
    cash_amount: &BigDecimal,
    bank_amount: &BigDecimal,
) -> Vec<PostingFact> {
    let zero = BigDecimal::from(0);
    let mut facts = Vec::with_capacity(3);

    if *cash_amount > zero {
        facts.push(PostingFact::new(
            doc.id(),
            doc.app_code(),
            doc.company_id(),
            RuleLevel::Header,
            AmountSource::Cash,
            cash_amount.clone(),
        ));
    }
    if *bank_amount > zero {
        facts.push(PostingFact::new(
            doc.id(),
            doc.app_code(),
            doc.company_id(),
            RuleLevel::Header,
            AmountSource::Bank,
            bank_amount.clone(),
        ));
    }

    facts.push(
        PostingFact::new(
            doc.id(),
            doc.app_code(),
            doc.company_id(),
            RuleLevel::Header,
            AmountSource::Total,
            cash_amount + bank_amount,
        )
        .with_tracking(TrackingRef::account(partner_id)),
    );

    facts
}

/// Extractor for incoming payments
pub struct CashInExtractor;

#[async_trait]
impl FactExtractor for CashInExtractor {
    type Doc = CashReceipt;

    fn app_code(&self) -> &'static str {
        CASH_IN_APP_CODE
    }

    async fn facts(&self, doc: &CashReceipt) -> PostingResult<Vec<PostingFact>> {
        Ok(cash_facts(doc, &doc.partner_id, &doc.cash_amount, &doc.bank_amount))
    }
}

/// Extractor for outgoing payments
pub struct CashOutExtractor;

#[async_trait]
impl FactExtractor for CashOutExtractor {
    type Doc = CashPayment;

    fn app_code(&self) -> &'static str {
        CASH_OUT_APP_CODE
    }

    async fn facts(&self, doc: &CashPayment) -> PostingResult<Vec<PostingFact>> {
        Ok(cash_facts(doc, &doc.partner_id, &doc.cash_amount, &doc.bank_amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackingBy;

    fn receipt(cash: i64, bank: i64) -> CashReceipt {
        CashReceipt {
            header: DocumentHeader {
                id: "rcpt1".to_string(),
                code: "CR-001".to_string(),
                title: "Customer payment".to_string(),
                company_id: "co1".to_string(),
                date_created: chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
                    .unwrap()
                    .and_hms_opt(11, 0, 0)
                    .unwrap(),
                date_approved: None,
            },
            partner_id: "cust1".to_string(),
            cash_amount: BigDecimal::from(cash),
            bank_amount: BigDecimal::from(bank),
        }
    }

    #[tokio::test]
    async fn split_payment_produces_cash_bank_and_total_facts() {
        let facts = CashInExtractor.facts(&receipt(300, 700)).await.unwrap();
        assert_eq!(facts.len(), 3);
        assert_eq!(facts[0].amount_source, AmountSource::Cash);
        assert_eq!(facts[0].value, BigDecimal::from(300));
        assert_eq!(facts[1].amount_source, AmountSource::Bank);
        assert_eq!(facts[1].value, BigDecimal::from(700));
        assert_eq!(facts[2].amount_source, AmountSource::Total);
        assert_eq!(facts[2].value, BigDecimal::from(1000));

        let tracking = facts[2].tracking.as_ref().unwrap();
        assert_eq!(tracking.tracking_by, TrackingBy::Account);
        assert_eq!(tracking.tracking_id, "cust1");
    }

    #[tokio::test]
    async fn empty_buckets_emit_no_facts() {
        let facts = CashInExtractor.facts(&receipt(0, 1000)).await.unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].amount_source, AmountSource::Bank);
        assert_eq!(facts[1].amount_source, AmountSource::Total);
    }
}
