use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the file test hook and report whether the file would be queued
    Test {
        /// File to test
        #[arg(short, long)]
        path: PathBuf,

        /// Library the file belongs to
        #[arg(short, long, default_value = "1")]
        library_id: u64,
    },

    /// Run the worker hook for one file and print the resulting command
    Worker {
        /// File handed to the extractor
        #[arg(short, long)]
        input: PathBuf,

        /// Destination of the task (defaults to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path of the file as it sits in the library (defaults to the input)
        #[arg(long)]
        original: Option<PathBuf>,

        /// Library the file belongs to
        #[arg(short, long, default_value = "1")]
        library_id: u64,

        /// Execute the command instead of only printing it
        #[arg(long)]
        execute: bool,
    },

    /// Run both hooks over every file in a library directory
    Scan {
        /// Library directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Library the directory belongs to
        #[arg(short, long, default_value = "1")]
        library_id: u64,

        /// Execute the extractor for dispatched files
        #[arg(long)]
        execute: bool,
    },

    /// Write the default configuration to a file
    Config {
        /// Output configuration file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}
