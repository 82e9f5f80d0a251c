use anyhow::{anyhow, Context};
use blockseed_core::{
    EventLog, SimChain, SimChainState, SqliteRoundStore, Storage,
};
use blockseed_engine::{
    seed_to_bool, seed_to_range, sub_seed, FixedDelay, PersistentSink, RoundStatus, SeedEngine,
};
use comfy_table::{presets::UTF8_FULL, Table};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Keeper state persisted between invocations. Rounds and events live in
/// sqlite; the simulated chain itself is small enough for a JSON snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeeperFile {
    engine_id: Uuid,
    chain: SimChainState,
}

fn keeper_path(data_dir: &Path) -> PathBuf {
    data_dir.join("gauntlet_chain.json")
}

fn load_keeper(data_dir: &Path) -> anyhow::Result<KeeperFile> {
    let path = keeper_path(data_dir);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("no chain at {:?}, run `gauntlet init` first", path))?;
    Ok(serde_json::from_str(&content)?)
}

fn save_keeper(data_dir: &Path, keeper: &KeeperFile) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(keeper)?;
    std::fs::write(keeper_path(data_dir), content)?;
    Ok(())
}

async fn open_storage(data_dir: &Path) -> anyhow::Result<Arc<Storage>> {
    Ok(Arc::new(Storage::new(&data_dir.join("gauntlet.db")).await?))
}

async fn open_engine(
    data_dir: &Path,
    keeper: &KeeperFile,
    delay: u64,
) -> anyhow::Result<(SeedEngine, Arc<SimChain>)> {
    let chain = Arc::new(SimChain::from_state(keeper.chain.clone())?);
    let storage = open_storage(data_dir).await?;
    let store = Arc::new(SqliteRoundStore::new(storage.clone()));
    let sink = Arc::new(PersistentSink::new(EventLog::new(storage)));

    let engine = SeedEngine::new(
        keeper.engine_id,
        chain.clone(),
        store,
        Box::new(FixedDelay(delay)),
    )
    .with_sink(sink);

    Ok((engine, chain))
}

pub async fn init_chain(
    data_dir: &Path,
    chain_id: u64,
    native_window: u64,
    archive_window: Option<u64>,
) -> anyhow::Result<()> {
    if keeper_path(data_dir).exists() {
        return Err(anyhow!(
            "chain already initialized at {:?}",
            keeper_path(data_dir)
        ));
    }

    let chain = SimChain::new(chain_id, native_window, archive_window);
    let keeper = KeeperFile {
        engine_id: Uuid::new_v4(),
        chain: chain.state(),
    };
    save_keeper(data_dir, &keeper)?;

    println!("Initialized simulated chain");
    println!("Chain ID: {}", chain_id);
    println!("Engine ID: {}", keeper.engine_id);
    println!("Native window: {} blocks", native_window);
    match archive_window {
        Some(window) => println!("Archive window: {} blocks", window),
        None => println!("Archive window: unsupported"),
    }

    Ok(())
}

pub async fn mine(data_dir: &Path, count: u64) -> anyhow::Result<()> {
    let mut keeper = load_keeper(data_dir)?;
    let chain = SimChain::from_state(keeper.chain.clone())?;

    let tip = chain.mine_many(count);
    keeper.chain = chain.state();
    save_keeper(data_dir, &keeper)?;

    println!("Sealed {} block(s), tip is now {}", count, tip);
    Ok(())
}

pub async fn commit(data_dir: &Path, round_id: u64, delay: u64) -> anyhow::Result<()> {
    let keeper = load_keeper(data_dir)?;
    let (engine, _chain) = open_engine(data_dir, &keeper, delay).await?;

    let record = engine.commit(round_id).await?;
    let deadline = record.seed_block + engine.effective_window();

    println!("Committed round {}", round_id);
    println!("Commit block: {}", record.commit_block);
    println!("Seed block: {}", record.seed_block);
    println!("Reveal deadline: block {}", deadline);
    println!();
    println!("Mine past the seed block, then run:");
    println!("gauntlet reveal {}", round_id);

    Ok(())
}

pub async fn reveal(data_dir: &Path, round_id: u64) -> anyhow::Result<()> {
    let keeper = load_keeper(data_dir)?;
    let (engine, _chain) = open_engine(data_dir, &keeper, 2).await?;

    let seed = engine.reveal(round_id).await?;
    let record = engine
        .record(round_id)
        .await?
        .ok_or_else(|| anyhow!("round {} vanished after reveal", round_id))?;

    println!("Revealed round {}", round_id);
    println!("Block hash: {}", record.block_hash);
    println!("Seed: {}", seed);
    println!(
        "History path: {}",
        if record.used_extended_history {
            "extended"
        } else {
            "native"
        }
    );

    Ok(())
}

pub async fn status(data_dir: &Path, round_id: u64) -> anyhow::Result<()> {
    let keeper = load_keeper(data_dir)?;
    let (engine, chain) = open_engine(data_dir, &keeper, 2).await?;

    let status = engine.status(round_id).await?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Round".to_string(), round_id.to_string()]);
    table.add_row(vec!["Chain tip".to_string(), chain.tip().to_string()]);
    table.add_row(vec!["Status".to_string(), describe_status(&status)]);

    if let Some(record) = engine.record(round_id).await? {
        table.add_row(vec!["Commit block".to_string(), record.commit_block.to_string()]);
        table.add_row(vec!["Seed block".to_string(), record.seed_block.to_string()]);
        table.add_row(vec![
            "Reveal deadline".to_string(),
            (record.seed_block + engine.effective_window()).to_string(),
        ]);
        if record.revealed {
            table.add_row(vec!["Block hash".to_string(), record.block_hash.to_string()]);
            table.add_row(vec!["Seed".to_string(), record.seed.to_string()]);
            table.add_row(vec![
                "History path".to_string(),
                if record.used_extended_history {
                    "extended".to_string()
                } else {
                    "native".to_string()
                },
            ]);
        }
    }

    println!("{table}");
    Ok(())
}

pub async fn list(data_dir: &Path) -> anyhow::Result<()> {
    let keeper = load_keeper(data_dir)?;
    let (engine, chain) = open_engine(data_dir, &keeper, 2).await?;

    let rounds = engine.rounds().await?;
    if rounds.is_empty() {
        println!("No rounds committed yet (chain tip: {})", chain.tip());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Round", "Seed block", "Status", "Seed"]);
    for record in rounds {
        let status = engine.status(record.round_id).await?;
        let seed = if record.revealed {
            format!("{:.16}...", record.seed.to_hex())
        } else {
            "-".to_string()
        };
        table.add_row(vec![
            record.round_id.to_string(),
            record.seed_block.to_string(),
            describe_status(&status),
            seed,
        ]);
    }

    println!("{table}");
    Ok(())
}

pub async fn draw(data_dir: &Path, round_id: u64, max: u64, count: u64) -> anyhow::Result<()> {
    let keeper = load_keeper(data_dir)?;
    let (engine, _chain) = open_engine(data_dir, &keeper, 2).await?;

    let seed = engine.seed(round_id).await?;
    println!("Round {} draws in [0, {}):", round_id, max);
    for index in 0..count {
        let value = seed_to_range(&sub_seed(&seed, index), max);
        println!("  draw {}: {}", index, value);
    }

    Ok(())
}

pub async fn flip(data_dir: &Path, round_id: u64, bps: u64) -> anyhow::Result<()> {
    let keeper = load_keeper(data_dir)?;
    let (engine, _chain) = open_engine(data_dir, &keeper, 2).await?;

    let seed = engine.seed(round_id).await?;
    let survived = seed_to_bool(&seed, bps);

    println!(
        "Round {} survival check at {}.{:02}%: {}",
        round_id,
        bps / 100,
        bps % 100,
        if survived { "SURVIVED" } else { "ELIMINATED" }
    );

    Ok(())
}

pub async fn events(data_dir: &Path, round_id: u64) -> anyhow::Result<()> {
    let storage = open_storage(data_dir).await?;
    let log = EventLog::new(storage);

    let events = log.load_for_round(round_id).await?;
    if events.is_empty() {
        println!("No events recorded for round {}", round_id);
        return Ok(());
    }

    for event in events {
        println!(
            "[{}] {}: {}",
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.kind,
            event.payload
        );
    }

    Ok(())
}

fn describe_status(status: &RoundStatus) -> String {
    match status {
        RoundStatus::Uncommitted => "uncommitted".to_string(),
        RoundStatus::Pending { blocks_until_ready } => {
            format!("pending ({} block(s) until ready)", blocks_until_ready)
        }
        RoundStatus::Ready { blocks_remaining } => {
            format!("ready ({} block(s) left to reveal)", blocks_remaining)
        }
        RoundStatus::Revealed => "revealed".to_string(),
        RoundStatus::Expired => "expired".to_string(),
    }
}
