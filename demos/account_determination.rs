//! Account determination examples

use posting_core::{
    DeterminationHeader, DeterminationManager, DeterminationRule, DeterminationType,
    MatchCriteria, MemoryStore,
};

fn criteria(pairs: &[(&str, &str)]) -> MatchCriteria {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Posting Core - Account Determination Examples\n");

    let storage = MemoryStore::new();
    let mut manager = DeterminationManager::new(storage);

    // 1. One header for sales revenue determination
    manager
        .create_header(DeterminationHeader::new(
            "h-revenue",
            "acme",
            "SALES_REVENUE",
            DeterminationType::Sale,
        ))
        .await?;

    // 2. Rules from least to most specific
    let rules = [
        ("rev-default", criteria(&[]), "4000"),
        ("rev-south", criteria(&[("branch", "south")]), "4010"),
        ("rev-retail", criteria(&[("channel", "retail")]), "4020"),
        (
            "rev-south-retail",
            criteria(&[("branch", "south"), ("channel", "retail")]),
            "4030",
        ),
    ];
    for (id, c, account) in rules {
        let rule = DeterminationRule::new(id, "h-revenue", c, "", account);
        println!(
            "  rule {:<16} search_rule={:<28} priority={}",
            rule.id,
            rule.search_rule(),
            rule.priority()
        );
        manager.save_rule(rule).await?;
    }

    // 3. Resolve accounts for different contexts
    println!("\nResolution:");
    let contexts = [
        ("no dimensions", criteria(&[])),
        ("branch=south", criteria(&[("branch", "south")])),
        (
            "branch=south, channel=retail",
            criteria(&[("branch", "south"), ("channel", "retail")]),
        ),
        (
            "branch=north, channel=online",
            criteria(&[("branch", "north"), ("channel", "online")]),
        ),
    ];
    for (label, context) in contexts {
        let resolved = manager
            .determine_account("acme", "SALES_REVENUE", &context, "")
            .await?;
        match resolved {
            Some(rule) => println!("  {:<30} -> {} (rule {})", label, rule.account, rule.id),
            None => println!("  {:<30} -> no match", label),
        }
    }

    Ok(())
}
