//! Error types for inner tree configuration and invocation.
//!
//! Every variant here is fatal for a multitree build: callers propagate the
//! error up to the binary, which prints it and exits non-zero.

use crate::identity::TreeIdentity;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised while invoking a single inner tree.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The tree has no executable `.inner_build` at its root.
    #[error(
        "Unable to execute {}. Is there an inner tree or lunch combo misconfiguration?",
        .path.display()
    )]
    MissingEntrypoint {
        /// Host path of the expected entrypoint
        path: PathBuf,
    },

    /// The sandbox mount layout could not be computed.
    #[error("Failed to set up sandbox for inner tree {}: {source}", .root.display())]
    SandboxSetup {
        /// Inner tree root
        root: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The nsjail config file could not be written.
    #[error("Failed to write sandbox config {}: {source}", .path.display())]
    ConfigWrite {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The sandbox tool could not be started at all.
    #[error("Failed to launch {}: {source}", .tool.display())]
    Spawn {
        /// Sandbox tool that failed to start
        tool: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The inner build exited with a non-zero status.
    #[error("Build error in inner tree: {}\nstopping multitree build.", .root.display())]
    BuildFailed {
        /// Inner tree root
        root: PathBuf,
        /// Exit status of the sandbox tool
        status: ExitStatus,
    },
}

/// Errors raised while resolving the set of inner trees from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The lunch combo file could not be read.
    #[error("Failed to read lunch combo {}: {source}", .path.display())]
    Read {
        /// Combo file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The lunch combo file is not valid JSON for a combo.
    #[error("Failed to parse lunch combo {}: {source}", .path.display())]
    Parse {
        /// Combo file path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// An inner tree was declared with an empty path list.
    #[error("Inner tree path list is empty")]
    EmptyTreePaths,

    /// Two declarations contribute the same API domain.
    #[error("API domain {0} is declared more than once")]
    DuplicateDomain(String),

    /// A tree lists a domain that the global registry does not know.
    #[error("Inner tree {tree} references API domain {domain} which is not registered")]
    OrphanDomain {
        /// Tree holding the dangling reference
        tree: TreeIdentity,
        /// Domain name
        domain: String,
    },

    /// Two trees would build into the same output directory.
    #[error("Inner trees {first} and {second} share output directory {}", .out_root.display())]
    OutputCollision {
        /// First tree, in identity order
        first: TreeIdentity,
        /// Second tree, in identity order
        second: TreeIdentity,
        /// Shared output root
        out_root: PathBuf,
    },
}

/// Result type for inner tree invocation.
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Result type for configuration resolution.
pub type ConfigResult<T> = Result<T, ConfigError>;
