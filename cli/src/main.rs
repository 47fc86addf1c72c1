//! Keeper CLI - replay and inspect the chain maintenance engine
//!
//! Builds a chain from a genesis file, pushes a run of blocks through the
//! per-block maintenance pass and reports where the chain ended up.

use clap::{Parser, Subcommand};
use colored::Colorize;
use keeper_engine::{Checkpoints, Database};
use std::path::PathBuf;

mod config;
mod replay;

#[derive(Parser)]
#[command(name = "keeper")]
#[command(about = "Chain maintenance engine - replay blocks over a genesis state", long_about = None)]
#[command(version)]
struct Cli {
    /// Node config file (skip flags)
    #[arg(short, long)]
    node: Option<PathBuf>,

    /// Skip authority checks on every operation
    #[arg(long)]
    skip_authority: bool,

    /// Do not bound the distance between head and irreversible block
    #[arg(long)]
    skip_undo_history: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a genesis file
    Check {
        /// Genesis file (TOML)
        genesis: PathBuf,
    },

    /// Replay empty blocks on top of a genesis state
    Replay {
        /// Genesis file (TOML)
        genesis: PathBuf,

        /// Number of blocks to push
        #[arg(short, long, default_value = "10")]
        blocks: u32,

        /// Slots left empty before each block, cycled (e.g. 0,0,2)
        #[arg(short, long, value_delimiter = ',')]
        missed: Vec<u32>,

        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let node = config::load_node_properties(cli.node.as_deref(), cli.skip_authority, cli.skip_undo_history)?;

    match cli.command {
        Commands::Check { genesis } => {
            let state = config::load_genesis(&genesis)?;
            println!("{} {}", "✓".green(), genesis.display());
            println!("  {} {}", "Witnesses:".bright_cyan(), state.witnesses.len());
            println!("  {} {}", "Assets:".bright_cyan(), state.assets.len() + 1);
            println!("  {} {}", "Call orders:".bright_cyan(), state.call_orders.len());
            println!("  {} {}", "Limit orders:".bright_cyan(), state.limit_orders.len());
            println!("  {} {}", "Settlements:".bright_cyan(), state.settlements.len());
        }
        Commands::Replay {
            genesis,
            blocks,
            missed,
            json,
        } => {
            let state = config::load_genesis(&genesis)?;
            let mut db = Database::from_genesis(&state, node, Checkpoints::new())?;

            if cli.verbose && !json {
                println!("{} {}", "Genesis:".bright_cyan(), genesis.display());
                println!("{} {}", "Blocks:".bright_cyan(), blocks);
                println!("{} {:?}", "Missed pattern:".bright_cyan(), missed);
            }

            let result = replay::replay(&mut db, blocks, &missed);
            let summary = replay::summarize(&db)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                replay::print_summary(&summary);
            }
            result?;
        }
    }

    Ok(())
}
