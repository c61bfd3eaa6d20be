//! CLI argument definitions for sawprice.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `search` | Search every marketplace and merge the listings |
//! | `sources` | List supported marketplaces |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! sawprice search chainsaw --city Indianapolis --region IN
//! sawprice search "stihl ms 250" --source offerup --source mercari --pretty
//! sawprice search chainsaw --mock --format table
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use sawprice_core::{Renderer, SourceId};

/// Used chainsaw price finder across second-hand marketplaces.
#[derive(Debug, Parser)]
#[command(
    name = "sawprice",
    author,
    version,
    about = "Search second-hand marketplaces and merge the listings",
    long_about = "sawprice queries Facebook Marketplace, OfferUp and Mercari concurrently, \
normalizes every listing to one shape and optionally filters them to a region.\n\
\n\
Timeouts and limits are read from SAWPRICE_* environment variables.\n\
Log verbosity follows RUST_LOG (default: sawprice=info); logs go to stderr."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON envelope.
    Json,
    /// Listing table for terminal display.
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Facebook,
    Offerup,
    Mercari,
}

impl From<SourceArg> for SourceId {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Facebook => Self::Facebook,
            SourceArg::Offerup => Self::OfferUp,
            SourceArg::Mercari => Self::Mercari,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererArg {
    /// Static HTTP fetch, no script execution.
    Http,
    /// Headless Chromium (requires the `chromium` feature).
    Chromium,
}

impl From<RendererArg> for Renderer {
    fn from(value: RendererArg) -> Self {
        match value {
            RendererArg::Http => Self::Http,
            RendererArg::Chromium => Self::Chromium,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search marketplaces for listings.
    ///
    /// # Examples
    ///
    ///   sawprice search chainsaw
    ///   sawprice search chainsaw --city Carmel --region IN
    Search(SearchArgs),

    /// List supported marketplaces.
    Sources,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-text search query.
    pub query: String,

    /// City used as a location hint.
    #[arg(long)]
    pub city: Option<String>,

    /// Two-letter region; listings outside it are filtered out.
    #[arg(long)]
    pub region: Option<String>,

    /// Restrict the search to these marketplaces (repeatable).
    #[arg(long = "source", value_enum)]
    pub sources: Vec<SourceArg>,

    /// Serve built-in sample pages instead of contacting marketplaces.
    #[arg(long, default_value_t = false)]
    pub mock: bool,

    /// Rendering backend; defaults to SAWPRICE_RENDERER or http.
    #[arg(long, value_enum)]
    pub renderer: Option<RendererArg>,
}
