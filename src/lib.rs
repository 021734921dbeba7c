pub mod cli;
pub mod cmd;
pub mod config;
pub mod emit;
pub mod error;
pub mod inventory;
pub mod reflect;
pub mod util;
pub mod validate;
