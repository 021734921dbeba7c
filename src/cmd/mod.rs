pub mod config;
pub mod emit;
pub mod inventory;
pub mod validate;
