use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "native-prep")]
#[command(version)]
#[command(about = "Native-image metadata and build validation for BoofCV services")]
pub struct Cli {
    /// Emit debug diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write reflect/resource/placeholder configs for native-image
    Emit(EmitArgs),
    /// Clean, compile, test and package natively, then smoke-test the binary
    Validate(ValidateArgs),
    /// Print the effective class/pattern/resource inventory as TOML
    Inventory(InventoryArgs),
    /// Manage native-prep configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug, Default)]
pub struct EmitArgs {
    /// Output directory (default: src/main/resources/META-INF/native-image)
    #[arg(long = "out")]
    pub out: Option<PathBuf>,
    /// Inventory TOML replacing the built-in BoofCV inventory
    #[arg(long = "inventory")]
    pub inventory: Option<PathBuf>,
    /// Compare generated configs with the ones on disk instead of writing
    #[arg(long = "check")]
    pub check: bool,
}

#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    /// Print the run report as JSON once the run finishes
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args, Debug, Default)]
pub struct InventoryArgs {
    /// Inventory TOML to normalize instead of the built-in one
    #[arg(long = "inventory")]
    pub inventory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a key in native-prep config (e.g. validate.smoke_timeout_secs)
    Set(ConfigSetArgs),
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    /// Config key path (e.g. validate.build_tool)
    pub key: String,
    /// Value to assign; integers and booleans are stored typed
    pub value: String,
    /// Override config file path (default: ./native-prep.toml)
    #[arg(long = "file")]
    pub file: Option<PathBuf>,
}
