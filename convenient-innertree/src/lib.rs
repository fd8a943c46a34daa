//! Inner tree orchestration for multitree builds.
//!
//! A multitree build delegates compilation to several independently buildable
//! source trees ("inner trees"). Each tree is built by running its
//! `.inner_build` entrypoint inside nsjail, with the tree mounted read-only at
//! `/src`, its private output directory writable at `/src/out`, and projects
//! from shared source roots melded in where the tree lacks them.
//!
//! # Example
//!
//! ```no_run
//! use convenient_innertree::{InnerTreeInvoker, LunchCombo};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let combo = Path::new("build/make/orchestrator/multitree_combos/aosp.mcombo");
//! let nsjail = Path::new("prebuilts/build-tools/linux-x86/bin/nsjail");
//! let trees = LunchCombo::load(combo)?.into_collection(Path::new("out"), nsjail)?;
//!
//! let invoker = InnerTreeInvoker::new();
//! let args = vec!["droid".to_string()];
//! trees.try_for_each_tree(|_, tree, args: &[String]| invoker.invoke(tree, args), &args[..])?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

pub mod collection;
pub mod combo;
pub mod error;
pub mod identity;
pub mod invoker;
pub mod layout;
pub mod meld;
pub mod nsjail;
pub mod tree;

pub use collection::TreeCollection;
pub use combo::{API_DOMAIN_SYSTEM, API_DOMAIN_VENDOR, LunchCombo};
pub use error::{ConfigError, ConfigResult, InvokeError, InvokeResult};
pub use identity::TreeIdentity;
pub use invoker::{CommandRunner, INNER_BUILD, InnerTreeInvoker, ProcessRunner};
pub use layout::OutputLayout;
pub use meld::{MeldOutcome, SandboxConfigBuilder, is_placeholder_empty_dir};
pub use nsjail::{MountPoint, NsjailConfig};
pub use tree::{ApiDomain, InnerTree};

/// JSON-quote a string for diagnostics and nsjail text configs.
pub(crate) fn enquote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}
