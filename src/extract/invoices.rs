//! AP and AR invoice adapters
//!
//! Invoices produce HEADER facts from document totals (tax and grand
//! total) and one LINE fact per item (net amount on the purchase side,
//! sales amount on the sales side). Amounts on foreign-currency invoices
//! are converted with the document's exchange rate and marked as such.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::extract::{exchange_adjust, DocumentHeader, FactExtractor, SourceDocument};
use crate::types::{AmountSource, PostingFact, PostingResult, RuleLevel, TrackingRef};

pub const AP_INVOICE_DOCUMENT_TYPE: &str = "AP_INVOICE";
pub const AP_INVOICE_APP_CODE: &str = "ap_invoice";
pub const AR_INVOICE_DOCUMENT_TYPE: &str = "SALES_INVOICE";
pub const AR_INVOICE_APP_CODE: &str = "ar_invoice";

/// One invoice item; `product_id` is absent for service lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Net amount of the line, in document currency
    pub net_amount: BigDecimal,
}

/// Supplier invoice (accounts payable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApInvoice {
    pub header: DocumentHeader,
    pub supplier_id: String,
    /// Exchange rate to company currency; absent for local invoices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<BigDecimal>,
    pub net_total: BigDecimal,
    pub tax_total: BigDecimal,
    pub grand_total: BigDecimal,
    pub lines: Vec<InvoiceLine>,
}

impl SourceDocument for ApInvoice {
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
        AP_INVOICE_APP_CODE
    }
    fn document_type(&self) -> &str {
        AP_INVOICE_DOCUMENT_TYPE
    }
    fn date_created(&self) -> NaiveDateTime {
        self.header.date_created
    }
    fn date_approved(&self) -> Option<NaiveDateTime> {
        self.header.date_approved
    }
}

/// Customer invoice (accounts receivable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArInvoice {
    pub header: DocumentHeader,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<BigDecimal>,
    pub net_total: BigDecimal,
    pub tax_total: BigDecimal,
    pub grand_total: BigDecimal,
    pub lines: Vec<InvoiceLine>,
}

impl SourceDocument for ArInvoice {
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
        AR_INVOICE_APP_CODE
    }
    fn document_type(&self) -> &str {
        AR_INVOICE_DOCUMENT_TYPE
    }
    fn date_created(&self) -> NaiveDateTime {
        self.header.date_created
    }
    fn date_approved(&self) -> Option<NaiveDateTime> {
        self.header.date_approved
    }
}

/// Shared header extraction: one TAX fact and one partner-tracked TOTAL fact
fn header_facts(
    doc: &impl SourceDocument,
    partner_id: &str,
    net_total: &BigDecimal,
    tax_total: &BigDecimal,
    grand_total: &BigDecimal,
    exchange_rate: Option<&BigDecimal>,
) -> Vec<PostingFact> {
    let (tax_value, tax_fc) = exchange_adjust(tax_total, exchange_rate);
    let (taxable, _) = exchange_adjust(net_total, exchange_rate);
    let (total_value, total_fc) = exchange_adjust(grand_total, exchange_rate);

    let mut tax_fact = PostingFact::new(
        doc.id(),
        doc.app_code(),
        doc.company_id(),
        RuleLevel::Header,
        AmountSource::Tax,
        tax_value,
    )
    .with_taxable(taxable);
    if tax_fc {
        tax_fact = tax_fact.foreign_currency();
    }

    let mut total_fact = PostingFact::new(
        doc.id(),
        doc.app_code(),
        doc.company_id(),
        RuleLevel::Header,
        AmountSource::Total,
        total_value,
    )
    .with_tracking(TrackingRef::account(partner_id));
    if total_fc {
        total_fact = total_fact.foreign_currency();
    }

    vec![tax_fact, total_fact]
}

/// Shared line extraction in the given amount source
fn line_facts(
    doc: &impl SourceDocument,
    amount_source: AmountSource,
    lines: &[InvoiceLine],
    exchange_rate: Option<&BigDecimal>,
) -> Vec<PostingFact> {
    lines
        .iter()
        .map(|line| {
            let (value, is_fc) = exchange_adjust(&line.net_amount, exchange_rate);
            let mut fact = PostingFact::new(
                doc.id(),
                doc.app_code(),
                doc.company_id(),
                RuleLevel::Line,
                amount_source,
                value,
            );
            if let Some(product_id) = &line.product_id {
                fact = fact.with_tracking(TrackingRef::product(product_id.clone()));
            }
            if is_fc {
                fact = fact.foreign_currency();
            }
            fact
        })
        .collect()
}

/// Extractor for supplier invoices
pub struct ApInvoiceExtractor;

#[async_trait]
impl FactExtractor for ApInvoiceExtractor {
    type Doc = ApInvoice;

    fn app_code(&self) -> &'static str {
        AP_INVOICE_APP_CODE
    }

    async fn facts(&self, doc: &ApInvoice) -> PostingResult<Vec<PostingFact>> {
        let rate = doc.exchange_rate.as_ref();
        let mut facts = header_facts(
            doc,
            &doc.supplier_id,
            &doc.net_total,
            &doc.tax_total,
            &doc.grand_total,
            rate,
        );
        facts.extend(line_facts(doc, AmountSource::Cost, &doc.lines, rate));
        Ok(facts)
    }
}

/// Extractor for customer invoices
pub struct ArInvoiceExtractor;

#[async_trait]
impl FactExtractor for ArInvoiceExtractor {
    type Doc = ArInvoice;

    fn app_code(&self) -> &'static str {
        AR_INVOICE_APP_CODE
    }

    async fn facts(&self, doc: &ArInvoice) -> PostingResult<Vec<PostingFact>> {
        let rate = doc.exchange_rate.as_ref();
        let mut facts = header_facts(
            doc,
            &doc.customer_id,
            &doc.net_total,
            &doc.tax_total,
            &doc.grand_total,
            rate,
        );
        facts.extend(line_facts(doc, AmountSource::Sales, &doc.lines, rate));
        Ok(facts)
    }
}
