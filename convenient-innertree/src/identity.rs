//! Inner tree identity.
//!
//! Trees are identified by their root and the product they build. A tree
//! built for two different products shares nothing between the two builds,
//! so each (root, product) pair is its own key. Meld roots are part of the
//! key too: the same root overlaid with different shared sources is a
//! different sandbox.
//!
//! Paths are compared by their raw OS string, not component-wise, so the
//! iteration order matches a plain string sort of the configured roots.

use crate::enquote;
use crate::error::{ConfigError, ConfigResult};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Key uniquely identifying one buildable inner tree.
#[derive(Debug, Clone)]
pub struct TreeIdentity {
    primary_root: PathBuf,
    meld_roots: Vec<PathBuf>,
    product: Option<String>,
}

impl TreeIdentity {
    /// Identity for a single root with no meld roots.
    ///
    /// `product` of `None` means an unbundled build.
    pub fn new(root: impl Into<PathBuf>, product: Option<String>) -> Self {
        Self {
            primary_root: root.into(),
            meld_roots: Vec::new(),
            product,
        }
    }

    /// Identity from an ordered path list: the first path is the tree root,
    /// the rest are meld roots in precedence order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyTreePaths` if `paths` is empty.
    pub fn from_paths<I, P>(paths: I, product: Option<String>) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut paths = paths.into_iter().map(Into::into);
        let primary_root = paths.next().ok_or(ConfigError::EmptyTreePaths)?;

        Ok(Self {
            primary_root,
            meld_roots: paths.collect(),
            product,
        })
    }

    /// Tree root, relative to the workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.primary_root
    }

    /// Extra source roots melded into the tree.
    #[must_use]
    pub fn meld_roots(&self) -> &[PathBuf] {
        &self.meld_roots
    }

    /// Product name, `None` for unbundled builds.
    #[must_use]
    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }
}

impl Ord for TreeIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.primary_root
            .as_os_str()
            .cmp(other.primary_root.as_os_str())
            .then_with(|| {
                self.meld_roots
                    .iter()
                    .map(|p| p.as_os_str())
                    .cmp(other.meld_roots.iter().map(|p| p.as_os_str()))
            })
            // None sorts before any product name
            .then_with(|| self.product.cmp(&other.product))
    }
}

impl PartialOrd for TreeIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TreeIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TreeIdentity {}

impl Hash for TreeIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.primary_root.as_os_str().hash(state);
        self.meld_roots.len().hash(state);
        for meld in &self.meld_roots {
            meld.as_os_str().hash(state);
        }
        self.product.hash(state);
    }
}

impl fmt::Display for TreeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TreeKey(root={} product={})",
            enquote(&self.primary_root.to_string_lossy()),
            self.product.as_deref().map_or_else(|| "null".to_string(), enquote),
        )
    }
}
