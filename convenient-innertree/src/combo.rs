//! Multitree lunch combo loading.
//!
//! A lunch combo names the inner tree (and product) that provides the
//! `system` and `vendor` API domains, plus any unbundled module domains:
//!
//! ```json
//! {
//!   "lunchable": true,
//!   "system": { "inner-tree": "aosp-main", "product": "aosp_cf_x86_64" },
//!   "vendor": { "inner-tree": ["vendor/tree", "shared"], "product": "cf_vendor" },
//!   "modules": { "com.android.foo": { "inner-tree": "module-tree" } }
//! }
//! ```
//!
//! `inner-tree` is a path or a list of paths; extra paths are meld roots.
//! Domains resolving to the same tree identity share one [`InnerTree`].

use crate::collection::TreeCollection;
use crate::error::{ConfigError, ConfigResult};
use crate::identity::TreeIdentity;
use crate::tree::{ApiDomain, InnerTree};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// API domain provided by the system tree.
pub const API_DOMAIN_SYSTEM: &str = "system";

/// API domain provided by the vendor tree.
pub const API_DOMAIN_VENDOR: &str = "vendor";

/// One path, or a root followed by meld roots.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TreePaths {
    /// A tree without melds
    Single(PathBuf),
    /// Tree root first, then meld roots
    Melded(Vec<PathBuf>),
}

impl TreePaths {
    /// All paths, root first.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::Single(path) => std::slice::from_ref(path),
            Self::Melded(paths) => paths,
        }
    }
}

/// A bundled tree entry (`system` or `vendor`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComboTree {
    /// Tree paths
    #[serde(rename = "inner-tree")]
    pub inner_tree: TreePaths,
    /// Product to build
    pub product: Option<String>,
}

/// An unbundled module entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComboModule {
    /// Tree paths
    #[serde(rename = "inner-tree")]
    pub inner_tree: TreePaths,
}

/// A parsed multitree lunch combo.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LunchCombo {
    /// Whether the combo shows up in lunch menus
    #[serde(default)]
    pub lunchable: bool,
    /// Tree providing the system domain
    pub system: ComboTree,
    /// Tree providing the vendor domain
    pub vendor: ComboTree,
    /// Unbundled module domains by name
    #[serde(default)]
    pub modules: BTreeMap<String, ComboModule>,
}

impl FromStr for LunchCombo {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl LunchCombo {
    /// Read and parse a lunch combo file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` or `ConfigError::Parse`.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        info!("Loading lunch combo from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the combo into inner trees with outputs under `out_dir`, run
    /// through the nsjail binary at `sandbox_tool`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyTreePaths` or `ConfigError::DuplicateDomain`
    /// for malformed entries, and any error from [`TreeCollection::new`].
    pub fn into_collection(
        self,
        out_dir: &Path,
        sandbox_tool: &Path,
    ) -> ConfigResult<TreeCollection> {
        let mut resolver = Resolver {
            out_dir,
            sandbox_tool,
            trees: BTreeMap::new(),
            domains: BTreeMap::new(),
        };

        resolver.add(API_DOMAIN_SYSTEM, &self.system.inner_tree, self.system.product)?;
        resolver.add(API_DOMAIN_VENDOR, &self.vendor.inner_tree, self.vendor.product)?;
        for (name, module) in &self.modules {
            resolver.add(name, &module.inner_tree, None)?;
        }

        info!(
            "Resolved {} inner trees providing {} API domains",
            resolver.trees.len(),
            resolver.domains.len()
        );
        TreeCollection::new(resolver.trees, resolver.domains)
    }
}

struct Resolver<'a> {
    out_dir: &'a Path,
    sandbox_tool: &'a Path,
    trees: BTreeMap<TreeIdentity, InnerTree>,
    domains: BTreeMap<String, ApiDomain>,
}

impl Resolver<'_> {
    fn add(&mut self, name: &str, paths: &TreePaths, product: Option<String>) -> ConfigResult<()> {
        if self.domains.contains_key(name) {
            return Err(ConfigError::DuplicateDomain(name.to_string()));
        }

        let key = TreeIdentity::from_paths(paths.paths(), product.clone())?;
        debug!("API domain {} provided by {}", name, key);

        let tree = self
            .trees
            .entry(key.clone())
            .or_insert_with(|| InnerTree::new(&key, self.out_dir, self.sandbox_tool));

        let domain = ApiDomain::new(name, key, product);
        let _ = tree.add_domain(domain.clone());
        let _ = self.domains.insert(name.to_string(), domain);
        Ok(())
    }
}
