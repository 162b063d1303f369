//! CLI module - Command-line interface for Foodgram
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Foodgram - recipe sharing backend
#[derive(Parser)]
#[command(name = "foodgram")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    #[command(alias = "web")]
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Load ingredients from a JSON array of {name, measurement_unit}
    ImportIngredients {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Load tags from a JSON array of {name, color, slug}
    ImportTags {
        /// Path to the JSON file
        file: PathBuf,
    },
}

pub use commands::*;
