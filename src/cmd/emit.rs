use anyhow::{Result, bail};

use crate::cli::EmitArgs;
use crate::config;
use crate::emit;
use crate::inventory::Inventory;

pub fn run(args: &EmitArgs) -> Result<()> {
    let config = config::load()?;
    let out = args.out.clone().unwrap_or(config.emit.output_dir);
    let inventory_path = args.inventory.clone().or(config.emit.inventory);
    let inventory = Inventory::load_or_default(inventory_path.as_deref())?;

    if args.check {
        let drift = emit::check(&out, &inventory)?;
        if !drift.is_clean() {
            for name in &drift.missing {
                println!("✗ {name} is missing");
            }
            for name in &drift.stale {
                println!("✗ {name} is out of date");
            }
            bail!(
                "native-image configs in {} are stale; run `native-prep emit`",
                out.display()
            );
        }
        println!("✓ Native-image configs in {} are up to date", out.display());
        return Ok(());
    }

    let report = emit::emit(&out, &inventory)?;
    println!(
        "✓ Native-image configs written to {} (reflect-config sha256 {})",
        report.directory.display(),
        report.reflection_digest
    );
    println!("Files:");
    for file in &report.files {
        let note = if report.preserved.contains(file) {
            " (kept)"
        } else {
            ""
        };
        println!("- {file}{note}");
    }
    Ok(())
}
