//! Inner trees and the API domains they contribute.

use crate::enquote;
use crate::identity::TreeIdentity;
use crate::layout::OutputLayout;
use crate::nsjail::NsjailConfig;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A named API surface contributed by an inner tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiDomain {
    name: String,
    tree: TreeIdentity,
    product: Option<String>,
}

impl ApiDomain {
    /// Domain `name` built by `tree`.
    pub fn new(name: impl Into<String>, tree: TreeIdentity, product: Option<String>) -> Self {
        Self {
            name: name.into(),
            tree,
            product,
        }
    }

    /// Domain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tree contributing the domain.
    #[must_use]
    pub fn tree(&self) -> &TreeIdentity {
        &self.tree
    }

    /// Product the domain is built for.
    #[must_use]
    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }
}

impl fmt::Display for ApiDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ApiDomain(name={} tree.root={} product={})",
            enquote(&self.name),
            enquote(&self.tree.root().to_string_lossy()),
            self.product.as_deref().map_or_else(|| "null".to_string(), enquote),
        )
    }
}

/// One independently buildable source tree.
///
/// The sandbox config is built on the first invocation and reused for the
/// rest of the process. The cache is not `Sync`; trees are built one at a
/// time.
#[derive(Debug)]
pub struct InnerTree {
    root: PathBuf,
    meld_dirs: Vec<PathBuf>,
    product: Option<String>,
    domains: BTreeMap<String, ApiDomain>,
    out: OutputLayout,
    sandbox_tool: PathBuf,
    sandbox_config: OnceCell<NsjailConfig>,
}

impl InnerTree {
    /// Tree for `identity` with its output under `out_dir`, run through the
    /// nsjail binary at `sandbox_tool`.
    pub fn new(identity: &TreeIdentity, out_dir: &Path, sandbox_tool: impl Into<PathBuf>) -> Self {
        Self {
            root: identity.root().to_path_buf(),
            meld_dirs: identity.meld_roots().to_vec(),
            product: identity.product().map(String::from),
            domains: BTreeMap::new(),
            out: OutputLayout::for_tree(out_dir, identity.root(), identity.product()),
            sandbox_tool: sandbox_tool.into(),
            sandbox_config: OnceCell::new(),
        }
    }

    /// Register a domain built by this tree, returning any domain it replaced.
    pub fn add_domain(&mut self, domain: ApiDomain) -> Option<ApiDomain> {
        self.domains.insert(domain.name().to_string(), domain)
    }

    /// Tree root, relative to the workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Meld roots in precedence order.
    #[must_use]
    pub fn meld_dirs(&self) -> &[PathBuf] {
        &self.meld_dirs
    }

    /// Product, `None` when unbundled.
    #[must_use]
    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    /// Domains keyed by name.
    #[must_use]
    pub fn domains(&self) -> &BTreeMap<String, ApiDomain> {
        &self.domains
    }

    /// Domain names in lexicographic order.
    pub fn domain_names(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Output directory layout.
    #[must_use]
    pub fn out(&self) -> &OutputLayout {
        &self.out
    }

    /// nsjail binary used to run the tree.
    #[must_use]
    pub fn sandbox_tool(&self) -> &Path {
        &self.sandbox_tool
    }

    /// Cached sandbox config, once the tree has been invoked.
    #[must_use]
    pub fn sandbox_config(&self) -> Option<&NsjailConfig> {
        self.sandbox_config.get()
    }

    pub(crate) fn sandbox_config_cell(&self) -> &OnceCell<NsjailConfig> {
        &self.sandbox_config
    }
}

impl fmt::Display for InnerTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let domains: Vec<_> = self.domain_names().collect();
        let melds: Vec<_> = self
            .meld_dirs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        write!(
            f,
            "InnerTree(root={} product={} domains={} meld={})",
            enquote(&self.root.to_string_lossy()),
            self.product.as_deref().map_or_else(|| "null".to_string(), enquote),
            serde_json::Value::from(domains),
            serde_json::Value::from(melds),
        )
    }
}
