use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "srcgraph",
    version,
    about = "Source analysis and graph extraction engine",
    after_help = r#"Examples:
  srcgraph analyze --repo .
  srcgraph analyze --repo . --jobs 4 --no-ignore
  srcgraph file src/main.py
  srcgraph cfg src/main.py --start-line 10 --end-line 42
  srcgraph languages
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze every supported file in a repository, streaming one JSON
    /// result per line.
    Analyze {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Worker thread count; defaults to SRCGRAPH_POOL_SIZE.
        #[arg(long)]
        jobs: Option<usize>,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
    /// Analyze one file and print the full extraction output.
    File {
        path: PathBuf,
        /// Repository root used to derive the recorded relative path.
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
    /// Build the control-flow graph for a function span within a file.
    Cfg {
        path: PathBuf,
        /// First line of the function, 1-based inclusive.
        #[arg(long)]
        start_line: i64,
        /// Last line of the function, 1-based inclusive.
        #[arg(long)]
        end_line: i64,
    },
    /// List supported languages and their file extensions.
    Languages,
}
