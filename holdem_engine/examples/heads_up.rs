//! Heads-up Example
//!
//! Two players sit down at a seeded table and check a hand down to the
//! river. Every notification the first player receives is printed.

use holdem_engine::{Phase, ServerContext, TableConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Heads-up Example ===\n");

    let context = ServerContext::new();
    let ann = context.register_player("ann");
    let bob = context.register_player("bob");
    let mut notifications = ann.listen()?;

    let config = TableConfig {
        name: "demo".to_string(),
        shuffle_seed: Some(2024),
        ..TableConfig::default()
    };
    let table = ann.create_table(config, 500).await?;
    bob.join_table(table, 500, None).await?;
    let mediator = context.mediator(table).await.ok_or("table is gone")?;

    println!("ann holds {:?}", ann.pocket_cards().await?);
    println!("bob holds {:?}\n", bob.pocket_cards().await?);

    // ann has the button and the small blind, so she acts first pre-flop.
    ann.call().await?;
    bob.check().await?;
    while mediator.snapshot().hand == Some(1) && mediator.snapshot().phase != Phase::Waiting {
        bob.check().await?;
        ann.check().await?;
    }

    while let Ok(notification) = notifications.try_recv() {
        println!("{notification}");
    }

    let snapshot = mediator.snapshot();
    println!();
    for seat in &snapshot.seats {
        println!("{} has {}", seat.name, seat.stack);
    }
    Ok(())
}
