use blockseed_core::{MemoryRoundStore, SimChain};
use blockseed_engine::{seed_to_bool, seed_to_range, sub_seed, FixedDelay, SeedEngine};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Simulated chain: 256-block native window plus an 8191-block archive
    let chain = Arc::new(SimChain::new(1, 256, Some(8191)));
    chain.mine_to(100);

    let engine = SeedEngine::new(
        Uuid::new_v4(),
        chain.clone(),
        Arc::new(MemoryRoundStore::new()),
        Box::new(FixedDelay(2)),
    );

    println!("Committing round 1 at height {}...", chain.tip());
    let record = engine.commit(1).await?;
    println!("Target block: {}", record.seed_block);

    // Too early: the target block has not passed yet
    chain.mine();
    if let Err(e) = engine.reveal(1).await {
        println!("Reveal at height {}: {}", chain.tip(), e);
    }

    // Mine past the target and reveal
    chain.mine_to(record.seed_block + 1);
    let seed = engine.reveal(1).await?;
    println!("\nRevealed seed: {}", seed);

    // One seed, many independent outcomes
    println!("\nDraws in [0, 10):");
    for index in 0..3 {
        println!("  draw {}: {}", index, seed_to_range(&sub_seed(&seed, index), 10));
    }
    println!(
        "Survival check at 50%: {}",
        if seed_to_bool(&seed, 5_000) { "survived" } else { "eliminated" }
    );

    println!("\nExample completed successfully!");

    Ok(())
}
