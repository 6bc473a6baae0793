//! CLI interface for Pagesmith
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pagesmith application builder
///
/// Accepts build requests over HTTP, generates a single-page application for
/// each, publishes it to GitHub Pages and notifies the evaluation endpoint.
#[derive(Parser, Debug)]
#[command(name = "pagesmith")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the worker and the HTTP server
    Serve {
        /// Override the configured bind address
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Run one request file through the pipeline, without HTTP
    Build {
        /// JSON file holding the build request
        request: PathBuf,
    },

    /// Print the stored record of a task
    Show {
        /// Task id
        task: String,
    },

    /// Render the template files locally, without any network call
    Preview {
        /// Brief describing the application
        #[arg(long)]
        brief: String,

        /// Check the page must satisfy (repeatable)
        #[arg(long = "check", value_name = "CHECK")]
        checks: Vec<String>,

        /// Directory to write the files into; prints index.html when omitted
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}
