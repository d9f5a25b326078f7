//! # CLI Module
//!
//! The `brrtmvc-probe` binary: compile a routing table written in YAML and
//! ask which handler method a request would be dispatched to, without
//! running any handler.
//!
//! ## Commands
//!
//! ### `check`
//!
//! ```bash
//! brrtmvc-probe check --table routes.yaml
//! ```
//!
//! Prints handler, method and mount counts as JSON, or fails with the first
//! configuration error (malformed template, duplicate handler, bad mount).
//!
//! ### `select`
//!
//! ```bash
//! brrtmvc-probe select --table routes.yaml --method POST --path /api/item/7 \
//!     -H 'content-type: application/json'
//! ```
//!
//! Prints the selected mount, handler, method, template, path variables,
//! captured group count and confidence as JSON. Exits non-zero when nothing
//! matches.
//!
//! See [`RouteTable`] for the file format.

mod commands;
mod table;

#[cfg(test)]
mod tests;

pub use commands::{run, run_cli, Cli, Commands};
pub use table::{
    CompiledTable, HandlerEntry, MethodEntry, MountEntry, ProbeMatch, RouteTable, TableSummary,
};
