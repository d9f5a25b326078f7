use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http::Method;

use crate::otel::{init_logging_with_config, LogConfig, LogFormat};
use crate::request::HttpRequest;

use super::table::RouteTable;

/// Command-line interface for inspecting routing tables
#[derive(Parser)]
#[command(name = "brrtmvc-probe")]
#[command(about = "BRRTRouter MVC routing-table probe", long_about = None)]
pub struct Cli {
    /// Log engine events (pretty, to stdout) at this level
    #[arg(long, global = true, env = "BRRTR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available probe commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compile a routing table and report configuration errors
    Check {
        /// Path to the routing table (YAML)
        #[arg(short, long)]
        table: PathBuf,
    },
    /// Show which handler method a request would be dispatched to
    Select {
        /// Path to the routing table (YAML)
        #[arg(short, long)]
        table: PathBuf,

        /// HTTP verb
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path, optionally with a query string
        #[arg(short, long)]
        path: String,

        /// Request header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Keep `;jsessionid=` segments in the path
        #[arg(long, default_value_t = false)]
        keep_jsessionid: bool,
    },
}

/// Parse the process arguments and run the probe against stdout.
///
/// # Errors
///
/// Returns an error if the table cannot be loaded or compiled, or if
/// `select` finds no handler.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(level) = &cli.log_level {
        let mut config = LogConfig::default_dev();
        config.log_level = level.clone();
        config.format = LogFormat::Pretty;
        init_logging_with_config(&config)?;
    }
    let stdout = std::io::stdout();
    run(&cli.command, &mut stdout.lock())
}

/// Run one command, writing its JSON result to `out`.
///
/// # Errors
///
/// See [`run_cli`].
pub fn run(command: &Commands, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Commands::Check { table } => {
            let compiled = RouteTable::load(table)?.compile()?;
            serde_json::to_writer_pretty(&mut *out, &compiled.summary())?;
            writeln!(out)?;
            Ok(())
        }
        Commands::Select {
            table,
            method,
            path,
            headers,
            keep_jsessionid,
        } => {
            let compiled = RouteTable::load(table)?.compile()?;
            let verb = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid HTTP method '{method}'"))?;
            let mut request = HttpRequest::new(verb.clone(), path);
            for header in headers {
                let (name, value) = header
                    .split_once(':')
                    .ok_or_else(|| anyhow!("header '{header}' is not 'name: value'"))?;
                request = request.with_header(name.trim(), value.trim());
            }
            let selected = compiled
                .select(&request, !keep_jsessionid)
                .ok_or_else(|| anyhow!("no handler method matches {verb} {path}"))?;
            serde_json::to_writer_pretty(&mut *out, &selected)?;
            writeln!(out)?;
            Ok(())
        }
    }
}
