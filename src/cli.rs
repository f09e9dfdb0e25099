use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::search::DEFAULT_RESULT_LIMIT;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Data directory holding config.yaml, products.jsonl, products.bin
    /// and the model cache
    #[clap(long, default_value = "data")]
    pub data_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP search daemon
    Daemon {},

    /// Run a one-shot search and print results as JSON
    Search {
        /// Free-text query
        #[clap(short, long)]
        text: Option<String>,

        /// Path to a query image file
        #[clap(short, long)]
        image: Option<PathBuf>,

        /// Maximum number of results
        #[clap(short, long, default_value_t = DEFAULT_RESULT_LIMIT)]
        limit: usize,
    },

    /// List the article types present in the catalog
    Categories {},
}
