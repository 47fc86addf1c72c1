//! Genesis and node configuration files

use anyhow::{Context, Result};
use keeper_engine::{GenesisState, NodeProperties, SkipFlags};
use std::fs;
use std::path::Path;

/// Load and validate a genesis file
pub fn load_genesis(path: &Path) -> Result<GenesisState> {
    if !path.exists() {
        anyhow::bail!("Genesis file not found: {}", path.display());
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read genesis file: {}", path.display()))?;

    let genesis = GenesisState::from_toml(&text)
        .with_context(|| format!("Failed to parse genesis file: {}", path.display()))?;

    genesis
        .validate()
        .with_context(|| format!("Invalid genesis in: {}", path.display()))?;
    Ok(genesis)
}

/// Node properties from an optional TOML file, with command line skips on top
pub fn load_node_properties(path: Option<&Path>, skip_authority: bool, skip_undo_history: bool) -> Result<NodeProperties> {
    let mut node = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read node config: {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("Failed to parse node config: {}", path.display()))?
        }
        None => NodeProperties::default(),
    };

    if skip_authority {
        node.skip_flags = node.skip_flags | SkipFlags::SKIP_AUTHORITY_CHECK;
    }
    if skip_undo_history {
        node.skip_flags = node.skip_flags | SkipFlags::SKIP_UNDO_HISTORY_CHECK;
    }
    Ok(node)
}
