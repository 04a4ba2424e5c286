//! Goods receipt auto-posting example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use posting_core::extract::goods_receipt::{
    GoodsReceipt, GoodsReceiptExtractor, GoodsReceiptLine,
};
use posting_core::{
    CompanySeed, DocumentHeader, FixedCosts, HeaderSeed, MatchCriteria, MemoryLedger,
    MemoryStore, PostingRule, PostingService, RuleSeed,
};
use posting_core::{AmountSource, DeterminationType, RoleKey, RuleLevel, Side};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Posting Core - Goods Receipt Auto-Posting Example\n");

    // 1. Seed the posting configuration for one company
    println!("Seeding posting configuration...");
    let mut storage = MemoryStore::new();

    let mut raw_materials = MatchCriteria::new();
    raw_materials.insert("warehouse_id".to_string(), "wh-raw".to_string());

    let seed = CompanySeed::new("acme")
        .with_header(HeaderSeed {
            id: "h-inventory".to_string(),
            transaction_key: "INVENTORY".to_string(),
            determination_type: DeterminationType::Inventory,
            rules: vec![
                RuleSeed {
                    id: "inv-default".to_string(),
                    modifier: String::new(),
                    match_criteria: MatchCriteria::new(),
                    account: "1560".to_string(),
                },
                RuleSeed {
                    id: "inv-raw".to_string(),
                    modifier: String::new(),
                    match_criteria: raw_materials,
                    account: "1561".to_string(),
                },
            ],
        })
        .with_posting_rule(PostingRule::lookup(
            "grn-inventory",
            "acme",
            "GRN_PURCHASE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Inventory,
            Side::Debit,
            10,
            "INVENTORY",
        ))
        .with_posting_rule(PostingRule::fixed(
            "grn-grni",
            "acme",
            "GRN_PURCHASE",
            RuleLevel::Line,
            AmountSource::Cost,
            RoleKey::Grni,
            Side::Credit,
            20,
            "33881",
        ));
    seed.apply(&mut storage).await?;
    println!("  - determination header INVENTORY with 2 rules");
    println!("  - 2 posting rules for GRN_PURCHASE\n");

    // 2. A goods receipt of two products into the raw-material warehouse
    let created = NaiveDate::from_ymd_opt(2024, 3, 12)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let grn = GoodsReceipt {
        header: DocumentHeader {
            id: "grn-001".to_string(),
            code: "GRN/2024/001".to_string(),
            title: "Receipt from Steel Supplies Ltd".to_string(),
            company_id: "acme".to_string(),
            date_created: created,
            date_approved: Some(created),
        },
        warehouse_id: "wh-raw".to_string(),
        supplier_id: "sup-steel".to_string(),
        lines: vec![
            GoodsReceiptLine {
                product_id: "steel-rod".to_string(),
                quantity: BigDecimal::from(20),
            },
            GoodsReceiptLine {
                product_id: "steel-sheet".to_string(),
                quantity: BigDecimal::from(5),
            },
        ],
    };

    // 3. Post it
    println!("Posting {}...", grn.header.code);
    let costs = FixedCosts::new()
        .with_cost("steel-rod", BigDecimal::from(50))
        .with_cost("steel-sheet", BigDecimal::from(200));
    let extractor = GoodsReceiptExtractor::new(costs);

    let mut context = MatchCriteria::new();
    context.insert("warehouse_id".to_string(), "wh-raw".to_string());

    let sink = MemoryLedger::new();
    let mut service = PostingService::new(storage, sink.clone());
    let outcome = service
        .extract_and_post(&extractor, &grn, &context)
        .await?
        .expect("document type is configured");

    // 4. Show the resulting journal
    println!("\nJournal rows:");
    for row in outcome
        .run
        .debit_rows
        .iter()
        .chain(outcome.run.credit_rows.iter())
    {
        println!(
            "  {:<8} Dr {:>8}  Cr {:>8}",
            row.account,
            row.debit.to_string(),
            row.credit.to_string()
        );
    }

    let report = outcome.run.balance_report();
    println!(
        "\nTotals: Dr {} / Cr {} (balanced: {})",
        report.total_debit, report.total_credit, report.is_balanced
    );
    println!(
        "Ledger document: {}",
        outcome.ledger_doc_id.as_deref().unwrap_or("-")
    );
    println!("Sink holds {} journal entr(y/ies)", sink.entries().len());

    Ok(())
}
