//! Drive a chain from genesis through a run of empty blocks

use anyhow::{Context, Result};
use colored::Colorize;
use keeper_engine::{Database, DynamicGlobalProperties, SignedBlock, Witness};
use serde::Serialize;

/// Where a replay ended up
#[derive(Debug, Serialize)]
pub struct ReplaySummary {
    pub dynamic: DynamicGlobalProperties,
    pub participation: u16,
    pub witnesses: Vec<Witness>,
    pub assets: Vec<AssetSummary>,
    pub limit_orders: usize,
    pub call_orders: usize,
    pub settlements: usize,
    pub proposals: usize,
}

#[derive(Debug, Serialize)]
pub struct AssetSummary {
    pub symbol: String,
    pub current_supply: i64,
    pub force_settled_volume: Option<i64>,
    pub globally_settled: bool,
}

/// Push `blocks` blocks; before block `i`, `missed[i % len]` slots go unfilled
pub fn replay(db: &mut Database, blocks: u32, missed: &[u32]) -> Result<()> {
    for i in 0..blocks {
        let skip = if missed.is_empty() { 0 } else { missed[i as usize % missed.len()] };
        let slot = skip + 1;
        let block = SignedBlock {
            previous: db.dynamic_global_properties().head_block_id,
            timestamp: db.get_slot_time(slot),
            witness: db.get_scheduled_witness(slot),
            transactions: Vec::new(),
        };
        let num = block.block_num();
        db.push_block(block)
            .with_context(|| format!("Failed to apply block {}", num))?;
        log::debug!("applied block {} at {}", num, db.head_block_time());
    }
    Ok(())
}

pub fn summarize(db: &Database) -> Result<ReplaySummary> {
    let state = db.state();
    let mut assets = Vec::with_capacity(state.assets.len());
    for asset in state.assets.iter() {
        let bitasset = db.bitasset_of(asset.id)?;
        assets.push(AssetSummary {
            symbol: asset.symbol.clone(),
            current_supply: asset.current_supply,
            force_settled_volume: bitasset.map(|b| b.force_settled_volume),
            globally_settled: bitasset.is_some_and(|b| b.has_settlement()),
        });
    }

    Ok(ReplaySummary {
        dynamic: db.dynamic_global_properties().clone(),
        participation: db.dynamic_global_properties().participation(),
        witnesses: state.witnesses.iter().cloned().collect(),
        assets,
        limit_orders: state.limit_orders.len(),
        call_orders: state.call_orders.len(),
        settlements: state.settlements.len(),
        proposals: state.proposals.len(),
    })
}

pub fn print_summary(summary: &ReplaySummary) {
    let dgp = &summary.dynamic;
    println!("{}", "=== Chain Head ===".bright_green().bold());
    println!("{} {}", "Block:".bright_cyan(), dgp.head_block_number);
    println!("{} {}", "Time:".bright_cyan(), dgp.time);
    println!("{} {}", "Irreversible:".bright_cyan(), dgp.last_irreversible_block_num);
    println!("{} {}", "Next maintenance:".bright_cyan(), dgp.next_maintenance_time);
    println!("{} {}", "Recently missed:".bright_cyan(), dgp.recently_missed_count);
    println!(
        "{} {}.{:02}%",
        "Participation:".bright_cyan(),
        summary.participation / 100,
        summary.participation % 100
    );
    println!("{} {}", "Witness budget:".bright_cyan(), dgp.witness_budget);

    println!("\n{}", "Witnesses:".bright_yellow());
    for w in &summary.witnesses {
        let missed = if w.total_missed == 0 {
            "0 missed".green()
        } else {
            format!("{} missed", w.total_missed).red()
        };
        println!(
            "  {} account {} last confirmed {} ({})",
            w.id, w.witness_account, w.last_confirmed_block_num, missed
        );
    }

    println!("\n{}", "Assets:".bright_yellow());
    for a in &summary.assets {
        let mut line = format!("  {} supply {}", a.symbol, a.current_supply);
        if let Some(volume) = a.force_settled_volume {
            line.push_str(&format!(", force settled {}", volume));
        }
        if a.globally_settled {
            println!("{} {}", line, "GLOBALLY SETTLED".red().bold());
        } else {
            println!("{}", line);
        }
    }

    println!("\n{}", "Open records:".bright_yellow());
    println!("  {} {}", "Limit orders:".bright_cyan(), summary.limit_orders);
    println!("  {} {}", "Call orders:".bright_cyan(), summary.call_orders);
    println!("  {} {}", "Settlements:".bright_cyan(), summary.settlements);
    println!("  {} {}", "Proposals:".bright_cyan(), summary.proposals);
}
