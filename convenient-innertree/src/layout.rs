//! Layout of an inner tree's private output directory.

use std::path::{Component, Path, PathBuf};

/// Directory under the outer `OUT_DIR` holding one directory per inner tree.
pub const TREES_DIR: &str = "trees";

/// Output root suffix for trees built without a product.
pub const UNBUNDLED: &str = "unbundled";

/// Paths inside an inner tree's output directory.
///
/// Pure path arithmetic, nothing here touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at an already computed output directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout for the tree at `tree_root` building `product`:
    /// `<out_dir>/trees/<tree_root>_<product>`, or `..._unbundled` without a
    /// product.
    ///
    /// Only the normal components of `tree_root` are used, so an absolute or
    /// `..`-prefixed root still lands under `out_dir`.
    #[must_use]
    pub fn for_tree(out_dir: &Path, tree_root: &Path, product: Option<&str>) -> Self {
        let relative: PathBuf = tree_root
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();

        let mut root = out_dir.join(TREES_DIR).join(relative).into_os_string();
        root.push("_");
        root.push(product.unwrap_or(UNBUNDLED));

        Self::new(root)
    }

    /// Output root for the tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `tree_info.json`
    #[must_use]
    pub fn tree_info_file(&self) -> PathBuf {
        self.root.join("tree_info.json")
    }

    /// `api_contributions/`
    #[must_use]
    pub fn api_contributions_dir(&self) -> PathBuf {
        self.root.join("api_contributions")
    }

    /// `build_targets.json`
    #[must_use]
    pub fn build_targets_file(&self) -> PathBuf {
        self.root.join("build_targets.json")
    }

    /// `inner_tree.ninja`
    #[must_use]
    pub fn main_ninja_file(&self) -> PathBuf {
        self.root.join("inner_tree.ninja")
    }

    /// `nsjail.cfg`
    #[must_use]
    pub fn nsjail_config_file(&self) -> PathBuf {
        self.root.join("nsjail.cfg")
    }
}
