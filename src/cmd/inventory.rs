use anyhow::{Context, Result};

use crate::cli::InventoryArgs;
use crate::config;
use crate::inventory::Inventory;

pub fn run(args: &InventoryArgs) -> Result<()> {
    let path = match &args.inventory {
        Some(path) => Some(path.clone()),
        None => config::load()?.emit.inventory,
    };
    let inventory = Inventory::load_or_default(path.as_deref())?;
    let rendered = inventory
        .to_toml()
        .context("failed to render inventory as TOML")?;
    print!("{rendered}");
    Ok(())
}
