//! Configuration loading for the intrachat gateway.
//!
//! A single optional `intrachat.toml` (project-local, then
//! `~/.config/intrachat/`), with `${VAR}` substitution and environment
//! overrides for the listen address. Every field has a default, so the
//! server runs with no config file at all.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use crate::{
    loader::{discover_and_load, load_config},
    schema::{GatewayConfig, IntrachatConfig, SeedAccount},
};
