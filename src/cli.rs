use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cardmatch")]
#[command(about = "Reconcile retailer product cards with a canonical registry", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match every card against the registry snapshot
    Match {
        /// Registry snapshot JSON
        #[arg(long, required = true)]
        registry: PathBuf,

        /// Card directory
        #[arg(long, required = true)]
        cards: PathBuf,

        /// Output JSON file (default: matches.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Card file suffix (default from config, `.md`)
        #[arg(long)]
        card_suffix: Option<String>,

        /// Name similarity threshold (0.0-1.0)
        #[arg(long)]
        threshold: Option<f64>,

        /// Disable the fuzzy SKU strategy
        #[arg(long)]
        no_fuzzy_sku: bool,
    },

    /// Match material cards to registry materials by item number
    Materials {
        /// Registry snapshot JSON holding the materials
        #[arg(long, required = true)]
        registry: PathBuf,

        /// Material card directory
        #[arg(long, required = true)]
        cards: PathBuf,

        /// Only materials whose `supplier_name` equals this
        #[arg(long)]
        supplier: Option<String>,

        /// Output JSON file (default: materials.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Card file suffix (default from config, `.md`)
        #[arg(long)]
        card_suffix: Option<String>,
    },

    /// Find registry entities no card claims
    Reverse {
        /// Registry snapshot JSON
        #[arg(long, required = true)]
        registry: PathBuf,

        /// Card directory
        #[arg(long, required = true)]
        cards: PathBuf,

        /// Output of a previous `match` run
        #[arg(long, required = true)]
        matches: PathBuf,

        /// Output of a previous `materials` run
        #[arg(long)]
        materials: Option<PathBuf>,

        /// Output JSON file (default: reverse.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Card file suffix (default from config, `.md`)
        #[arg(long)]
        card_suffix: Option<String>,
    },

    /// Resolve product references in style documents
    Styles {
        /// Registry snapshot JSON
        #[arg(long, required = true)]
        registry: PathBuf,

        /// Card directory
        #[arg(long, required = true)]
        cards: PathBuf,

        /// Directory of style source JSON files
        #[arg(long, required = true)]
        sources: PathBuf,

        /// Output JSON file (default: styles.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Card file suffix (default from config, `.md`)
        #[arg(long)]
        card_suffix: Option<String>,
    },

    /// Map scene folders to the cards staged in their ORIGINAL_ render
    Scenes {
        /// Card directory
        #[arg(long, required = true)]
        cards: PathBuf,

        /// Directory of style folders
        #[arg(long, required = true)]
        scenes: PathBuf,

        /// Registry snapshot JSON, for style ids
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Output JSON file (default: scenes.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Card file suffix (default from config, `.md`)
        #[arg(long)]
        card_suffix: Option<String>,
    },

    /// Statistics, review queues and quality score for a match run
    Analyze {
        /// Output of a `match` run
        #[arg(long, required = true)]
        matches: PathBuf,

        /// Earlier run to compare against
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Output of a `styles` run, for style coverage
        #[arg(long)]
        styles: Option<PathBuf>,
    },

    /// Show or edit the configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,

        /// Persist a new name similarity threshold
        #[arg(long)]
        set_threshold: Option<f64>,
    },
}
