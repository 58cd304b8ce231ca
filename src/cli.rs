//! Command line definitions.

use clap::{Parser, Subcommand};

/// Dealwatch - continuous price monitoring for product pages
#[derive(Parser, Debug)]
#[command(name = "dealwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitoring loop for every tracked target until interrupted
    Run,

    /// Start tracking a product page and run its first check
    Track {
        /// Product page URL
        url: String,

        /// Notify at or below this price; defaults to 90% of the first observed price
        #[arg(short, long)]
        target_price: Option<f64>,

        /// Owner of the target
        #[arg(short, long, default_value = "local")]
        owner: String,
    },

    /// Stop tracking a target and delete its price history
    Untrack {
        /// Target ID
        id: String,
    },

    /// List tracked targets with their current price
    List,

    /// Check one target now, or every target when no ID is given
    Check {
        /// Target ID
        id: Option<String>,
    },

    /// Render a page and print what would be extracted, without storing anything
    Extract {
        /// Product page URL
        url: String,
    },
}
