//! End-to-end posting flows against the in-memory storage

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use posting_core::extract::cash::{CashInExtractor, CashReceipt};
use posting_core::extract::goods_receipt::{
    GoodsReceipt, GoodsReceiptExtractor, GoodsReceiptLine,
};
use posting_core::extract::invoices::{ApInvoice, ApInvoiceExtractor, InvoiceLine};
use posting_core::*;

fn date(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn doc_header(id: &str, company_id: &str) -> DocumentHeader {
    DocumentHeader {
        id: id.to_string(),
        code: format!("DOC/{id}"),
        title: format!("Document {id}"),
        company_id: company_id.to_string(),
        date_created: date(1),
        date_approved: Some(date(2)),
    }
}

fn criteria(pairs: &[(&str, &str)]) -> MatchCriteria {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Inventory lookup with a warehouse-specific account plus a default,
/// and the two standard GRN posting rules.
fn grn_seed(company_id: &str) -> CompanySeed {
    CompanySeed::new(company_id)
        .with_header(HeaderSeed {
            id: format!("{company_id}-h-inv"),
            transaction_key: "INVENTORY".to_string(),
            determination_type: DeterminationType::Inventory,
            rules: vec![
                RuleSeed {
                    id: format!("{company_id}-inv-default"),
                    modifier: String::new(),
                    match_criteria: MatchCriteria::new(),
                    account: "1560".to_string(),
                },
                RuleSeed {
                    id: format!("{company_id}-inv-w1"),
                    modifier: String::new(),
                    match_criteria: criteria(&[("warehouse_id", "w1")]),
                    account: "1561".to_string(),
                },
            ],
        })
        .with_posting_rule(PostingRule::lookup(
            format!("{company_id}-grn-dr"),
            company_id,
            "GRN_PURCHASE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Inventory,
            Side::Debit,
            10,
            "INVENTORY",
        ))
        .with_posting_rule(PostingRule::fixed(
            format!("{company_id}-grn-cr"),
            company_id,
            "GRN_PURCHASE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Grni,
            Side::Credit,
            20,
            "33881",
        ))
}

fn grn(id: &str, company_id: &str, quantity: i64) -> GoodsReceipt {
    GoodsReceipt {
        header: doc_header(id, company_id),
        warehouse_id: "w1".to_string(),
        supplier_id: "sup1".to_string(),
        lines: vec![GoodsReceiptLine {
            product_id: "p1".to_string(),
            quantity: BigDecimal::from(quantity),
        }],
    }
}

#[tokio::test]
async fn test_grn_posts_balanced_journal() {
    let mut storage = MemoryStore::new();
    grn_seed("co1").apply(&mut storage).await.unwrap();

    let sink = MemoryLedger::new();
    let mut service = PostingService::new(storage, sink.clone());
    let extractor = GoodsReceiptExtractor::new(
        FixedCosts::new().with_cost("p1", BigDecimal::from(50)),
    );

    let outcome = service
        .extract_and_post(&extractor, &grn("grn1", "co1", 20), &criteria(&[("warehouse_id", "w1")]))
        .await
        .unwrap()
        .unwrap();

    // 20 x 50 on both sides, warehouse-specific inventory account
    assert_eq!(outcome.run.debit_rows.len(), 1);
    assert_eq!(outcome.run.credit_rows.len(), 1);
    assert_eq!(outcome.run.debit_rows[0].account, "1561");
    assert_eq!(outcome.run.debit_rows[0].debit, BigDecimal::from(1000));
    assert_eq!(outcome.run.credit_rows[0].account, "33881");
    assert_eq!(outcome.run.credit_rows[0].credit, BigDecimal::from(1000));

    let report = outcome.run.balance_report();
    assert!(report.is_balanced);
    assert_eq!(report.skipped_facts, 0);

    // Exactly one ledger write, carrying the snapshot and the run
    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(Some(entries[0].id.clone()), outcome.ledger_doc_id);
    assert_eq!(entries[0].document.id, "grn1");
    assert_eq!(entries[0].transaction_app_code, "goods_receipt");
}

#[tokio::test]
async fn test_unconfigured_document_type_posts_nothing() {
    // No seed at all: the document type has no posting rules
    let storage = MemoryStore::new();
    let sink = MemoryLedger::new();
    let mut service = PostingService::new(storage.clone(), sink.clone());
    let extractor = GoodsReceiptExtractor::new(
        FixedCosts::new().with_cost("p1", BigDecimal::from(50)),
    );

    let outcome = service
        .extract_and_post(&extractor, &grn("grn1", "co1", 20), &MatchCriteria::new())
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert!(sink.entries().is_empty());
    assert!(storage.facts_for_document("grn1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unresolved_account_is_skipped_and_reported() {
    // Lookup key with a header but no rules at all: resolution yields nothing
    let mut storage = MemoryStore::new();
    let seed = CompanySeed::new("co1")
        .with_header(HeaderSeed {
            id: "h-empty".to_string(),
            transaction_key: "INVENTORY".to_string(),
            determination_type: DeterminationType::Inventory,
            rules: vec![],
        })
        .with_posting_rule(PostingRule::lookup(
            "grn-dr",
            "co1",
            "GRN_PURCHASE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Inventory,
            Side::Debit,
            10,
            "INVENTORY",
        ))
        .with_posting_rule(PostingRule::fixed(
            "grn-cr",
            "co1",
            "GRN_PURCHASE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Grni,
            Side::Credit,
            20,
            "33881",
        ));
    seed.apply(&mut storage).await.unwrap();

    let sink = MemoryLedger::new();
    let mut service = PostingService::new(storage, sink.clone());
    let extractor = GoodsReceiptExtractor::new(
        FixedCosts::new().with_cost("p1", BigDecimal::from(50)),
    );

    let outcome = service
        .extract_and_post(&extractor, &grn("grn1", "co1", 20), &MatchCriteria::new())
        .await
        .unwrap()
        .unwrap();

    // The credit side still posted; the debit fact is recorded as skipped
    assert!(outcome.run.debit_rows.is_empty());
    assert_eq!(outcome.run.credit_rows.len(), 1);
    assert_eq!(outcome.run.skipped.len(), 1);
    assert_eq!(outcome.run.skipped[0].rule_id, "grn-dr");

    let report = outcome.run.balance_report();
    assert!(!report.is_balanced);
    assert_eq!(report.skipped_facts, 1);
}

#[tokio::test]
async fn test_reposting_replaces_facts_instead_of_appending() {
    let mut storage = MemoryStore::new();
    grn_seed("co1").apply(&mut storage).await.unwrap();

    let sink = MemoryLedger::new();
    let mut service = PostingService::new(storage.clone(), sink.clone());
    let extractor = GoodsReceiptExtractor::new(
        FixedCosts::new().with_cost("p1", BigDecimal::from(50)),
    );
    let context = criteria(&[("warehouse_id", "w1")]);

    service
        .extract_and_post(&extractor, &grn("grn1", "co1", 20), &context)
        .await
        .unwrap()
        .unwrap();

    // Repost after the quantity was corrected
    let outcome = service
        .extract_and_post(&extractor, &grn("grn1", "co1", 30), &context)
        .await
        .unwrap()
        .unwrap();

    let facts = storage.facts_for_document("grn1").await.unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].value, BigDecimal::from(1500));
    assert_eq!(outcome.run.debit_rows[0].debit, BigDecimal::from(1500));
}

#[tokio::test]
async fn test_ledger_failure_rolls_back_the_fact_replacement() {
    let mut storage = MemoryStore::new();
    grn_seed("co1").apply(&mut storage).await.unwrap();

    let mut service = PostingService::new(storage.clone(), MemoryLedger::failing());
    let extractor = GoodsReceiptExtractor::new(
        FixedCosts::new().with_cost("p1", BigDecimal::from(50)),
    );

    let result = service
        .extract_and_post(&extractor, &grn("grn1", "co1", 20), &criteria(&[("warehouse_id", "w1")]))
        .await;

    assert!(matches!(result, Err(PostingError::Ledger(_))));
    // The whole scope rolled back: no facts remain for the document
    assert!(storage.facts_for_document("grn1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_companies_do_not_see_each_others_rules() {
    let mut storage = MemoryStore::new();
    grn_seed("co1").apply(&mut storage).await.unwrap();

    let sink = MemoryLedger::new();
    let mut service = PostingService::new(storage, sink.clone());
    let extractor = GoodsReceiptExtractor::new(
        FixedCosts::new().with_cost("p1", BigDecimal::from(50)),
    );

    // co2 has no configuration; its document must not post under co1's rules
    let outcome = service
        .extract_and_post(&extractor, &grn("grn2", "co2", 20), &criteria(&[("warehouse_id", "w1")]))
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_ap_invoice_mixes_header_and_line_rules() {
    let mut storage = MemoryStore::new();
    let seed = CompanySeed::new("co1")
        .with_posting_rule(PostingRule::fixed(
            "ap-expense",
            "co1",
            "AP_INVOICE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Expense,
            Side::Debit,
            10,
            "5100",
        ))
        .with_posting_rule(PostingRule::fixed(
            "ap-tax",
            "co1",
            "AP_INVOICE",
            RuleLevel::Header,
            AmountSource::Tax,
            RoleKey::TaxInput,
            Side::Debit,
            20,
            "1450",
        ))
        .with_posting_rule(PostingRule::fixed(
            "ap-payable",
            "co1",
            "AP_INVOICE",
            RuleLevel::Header,
            AmountSource::Total,
            RoleKey::Payable,
            Side::Credit,
            30,
            "2100",
        ));
    seed.apply(&mut storage).await.unwrap();

    let invoice = ApInvoice {
        header: doc_header("inv1", "co1"),
        supplier_id: "sup1".to_string(),
        exchange_rate: None,
        net_total: BigDecimal::from(1000),
        tax_total: BigDecimal::from(100),
        grand_total: BigDecimal::from(1100),
        lines: vec![
            InvoiceLine {
                product_id: Some("p1".to_string()),
                net_amount: BigDecimal::from(600),
            },
            InvoiceLine {
                product_id: None,
                net_amount: BigDecimal::from(400),
            },
        ],
    };

    let sink = MemoryLedger::new();
    let mut service = PostingService::new(storage, sink.clone());
    let outcome = service
        .extract_and_post(&ApInvoiceExtractor, &invoice, &MatchCriteria::new())
        .await
        .unwrap()
        .unwrap();

    // Debits: two expense lines then the tax header row, in rule order
    assert_eq!(outcome.run.debit_rows.len(), 3);
    assert_eq!(outcome.run.debit_rows[0].account, "5100");
    assert_eq!(outcome.run.debit_rows[0].debit, BigDecimal::from(600));
    assert_eq!(outcome.run.debit_rows[1].debit, BigDecimal::from(400));
    assert_eq!(outcome.run.debit_rows[2].account, "1450");
    assert_eq!(outcome.run.debit_rows[2].debit, BigDecimal::from(100));
    // The tax row carries its taxable base; the expense rows do not
    assert_eq!(
        outcome.run.debit_rows[2].taxable_value,
        Some(BigDecimal::from(1000))
    );
    assert_eq!(outcome.run.debit_rows[0].taxable_value, None);

    // Credit: payable for the grand total, reconcilable against payments
    assert_eq!(outcome.run.credit_rows.len(), 1);
    assert_eq!(outcome.run.credit_rows[0].account, "2100");
    assert_eq!(outcome.run.credit_rows[0].credit, BigDecimal::from(1100));
    assert!(outcome.run.credit_rows[0].use_for_recon);
    assert_eq!(
        outcome.run.credit_rows[0].use_for_recon_type.as_deref(),
        Some("ap-payment")
    );
    assert_eq!(
        outcome.run.credit_rows[0].partner_ref.as_deref(),
        Some("sup1")
    );

    assert!(outcome.run.balance_report().is_balanced);
}

#[tokio::test]
async fn test_foreign_invoice_posts_in_company_currency() {
    let mut storage = MemoryStore::new();
    let seed = CompanySeed::new("co1")
        .with_posting_rule(PostingRule::fixed(
            "ap-expense",
            "co1",
            "AP_INVOICE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Expense,
            Side::Debit,
            10,
            "5100",
        ))
        .with_posting_rule(PostingRule::fixed(
            "ap-payable",
            "co1",
            "AP_INVOICE",
            RuleLevel::Header,
            AmountSource::Total,
            RoleKey::Payable,
            Side::Credit,
            30,
            "2100",
        ));
    seed.apply(&mut storage).await.unwrap();

    let invoice = ApInvoice {
        header: doc_header("inv-fx", "co1"),
        supplier_id: "sup1".to_string(),
        exchange_rate: Some(BigDecimal::from(25)),
        net_total: BigDecimal::from(100),
        tax_total: BigDecimal::from(0),
        grand_total: BigDecimal::from(100),
        lines: vec![InvoiceLine {
            product_id: None,
            net_amount: BigDecimal::from(100),
        }],
    };

    let sink = MemoryLedger::new();
    let mut service = PostingService::new(storage, sink);
    let outcome = service
        .extract_and_post(&ApInvoiceExtractor, &invoice, &MatchCriteria::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.run.debit_rows[0].debit, BigDecimal::from(2500));
    assert!(outcome.run.debit_rows[0].is_fc);
    assert_eq!(outcome.run.credit_rows[0].credit, BigDecimal::from(2500));
    assert!(outcome.run.balance_report().is_balanced);
}

#[tokio::test]
async fn test_registry_routes_cash_documents() {
    let mut storage = MemoryStore::new();
    let seed = CompanySeed::new("co1")
        .with_posting_rule(PostingRule::fixed(
            "ci-cash",
            "co1",
            "CASH_IN",
            RuleLevel::Header,
            AmountSource::Cash,
            RoleKey::Cash,
            Side::Debit,
            10,
            "1010",
        ))
        .with_posting_rule(PostingRule::fixed(
            "ci-bank",
            "co1",
            "CASH_IN",
            RuleLevel::Header,
            AmountSource::Bank,
            RoleKey::Bank,
            Side::Debit,
            20,
            "1020",
        ))
        .with_posting_rule(PostingRule::fixed(
            "ci-receivable",
            "co1",
            "CASH_IN",
            RuleLevel::Header,
            AmountSource::Total,
            RoleKey::Receivable,
            Side::Credit,
            30,
            "1200",
        ));
    seed.apply(&mut storage).await.unwrap();

    let receipt = CashReceipt {
        header: doc_header("cr1", "co1"),
        partner_id: "cust1".to_string(),
        cash_amount: BigDecimal::from(300),
        bank_amount: BigDecimal::from(700),
    };

    // Push through the extractor registry, then post the prepared facts
    let registry = ExtractorRegistry::new(FixedCosts::new());
    let pushed = registry
        .push(&BusinessDocument::CashIn(receipt.clone()), &mut storage)
        .await
        .unwrap();
    assert!(pushed);

    let sink = MemoryLedger::new();
    let mut service = PostingService::new(storage, sink.clone());
    let outcome = service
        .post(
            &receipt.snapshot(),
            "co1",
            "cash_in",
            "CASH_IN",
            &MatchCriteria::new(),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.run.debit_rows.len(), 2);
    assert_eq!(outcome.run.debit_rows[0].debit, BigDecimal::from(300));
    assert_eq!(outcome.run.debit_rows[1].debit, BigDecimal::from(700));
    assert_eq!(outcome.run.credit_rows.len(), 1);
    assert_eq!(outcome.run.credit_rows[0].credit, BigDecimal::from(1000));
    assert!(outcome.run.balance_report().is_balanced);
    assert_eq!(sink.entries().len(), 1);
}

#[tokio::test]
async fn test_skipped_extractor_line_without_cost() {
    let mut storage = MemoryStore::new();
    grn_seed("co1").apply(&mut storage).await.unwrap();

    // Only p1 has a cost; p-unknown is skipped during extraction
    let extractor = GoodsReceiptExtractor::new(
        FixedCosts::new().with_cost("p1", BigDecimal::from(50)),
    );
    let mut doc = grn("grn1", "co1", 20);
    doc.lines.push(GoodsReceiptLine {
        product_id: "p-unknown".to_string(),
        quantity: BigDecimal::from(3),
    });

    let sink = MemoryLedger::new();
    let mut service = PostingService::new(storage.clone(), sink);
    let outcome = service
        .extract_and_post(&extractor, &doc, &criteria(&[("warehouse_id", "w1")]))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(storage.facts_for_document("grn1").await.unwrap().len(), 1);
    assert_eq!(outcome.run.debit_rows[0].debit, BigDecimal::from(1000));
    assert!(outcome.run.balance_report().is_balanced);
}

#[tokio::test]
async fn test_determine_account_prefers_most_specific_rule() {
    let storage = MemoryStore::new();
    let mut manager = DeterminationManager::new(storage);

    manager
        .create_header(DeterminationHeader::new(
            "h1",
            "co1",
            "SALES_REVENUE",
            DeterminationType::Sale,
        ))
        .await
        .unwrap();
    for (id, c, account) in [
        ("r-default", criteria(&[]), "4000"),
        ("r-branch", criteria(&[("branch", "south")]), "4010"),
        (
            "r-both",
            criteria(&[("branch", "south"), ("channel", "retail")]),
            "4030",
        ),
    ] {
        manager
            .save_rule(DeterminationRule::new(id, "h1", c, "", account))
            .await
            .unwrap();
    }

    let full = criteria(&[("branch", "south"), ("channel", "retail")]);
    let rule = manager
        .determine_account("co1", "SALES_REVENUE", &full, "")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rule.account, "4030");

    let partial = criteria(&[("branch", "south"), ("channel", "online")]);
    let rule = manager
        .determine_account("co1", "SALES_REVENUE", &partial, "")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rule.account, "4010");

    let unrelated = criteria(&[("branch", "north")]);
    let rule = manager
        .determine_account("co1", "SALES_REVENUE", &unrelated, "")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rule.account, "4000");
}
