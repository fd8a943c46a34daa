//! Multitree command-line interface
//!
//! - `build`: Build every inner tree of a lunch combo
//! - `describe`: Show the resolved inner trees and their output layout

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod build;
pub mod describe;

/// Default location of the prebuilt nsjail binary, relative to the workspace.
pub const DEFAULT_NSJAIL: &str = "prebuilts/build-tools/linux-x86/bin/nsjail";

/// Multitree - builds the inner trees of a multitree lunch combo
#[derive(Parser)]
#[command(name = "multitree")]
#[command(about = "Builds the inner trees of a multitree lunch combo inside nsjail")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every inner tree, in tree order
    Build {
        /// Path to the lunch combo file
        #[arg(short, long)]
        combo: PathBuf,

        /// Outer output directory
        #[arg(short, long, env = "OUT_DIR", default_value = "out")]
        out_dir: PathBuf,

        /// nsjail binary used to sandbox inner builds
        #[arg(long, env = "MULTITREE_NSJAIL", default_value = DEFAULT_NSJAIL)]
        nsjail: PathBuf,

        /// Arguments passed through to every .inner_build
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Show inner trees, API domains and output paths
    Describe {
        /// Path to the lunch combo file
        #[arg(short, long)]
        combo: PathBuf,

        /// Outer output directory
        #[arg(short, long, env = "OUT_DIR", default_value = "out")]
        out_dir: PathBuf,
    },
}
