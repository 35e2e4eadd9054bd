//! CLI module for the knowledge core
//!
//! Provides the `serve` subcommand that runs the HTTP API.

pub mod serve;

use clap::{Parser, Subcommand};

/// Knowledge Core - multi-tenant ingestion, retrieval and grounded answers
#[derive(Parser)]
#[command(name = "knowledge-core")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server
    Serve,
}
