//! The full set of inner trees for one multitree build.

use crate::error::{ConfigError, ConfigResult};
use crate::identity::TreeIdentity;
use crate::tree::{ApiDomain, InnerTree};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// All inner trees of a build, keyed and iterated in [`TreeIdentity`] order.
#[derive(Debug, Default)]
pub struct TreeCollection {
    trees: BTreeMap<TreeIdentity, InnerTree>,
    domains: BTreeMap<String, ApiDomain>,
}

impl TreeCollection {
    /// Collection over `trees` with the global domain registry `domains`.
    ///
    /// # Errors
    ///
    /// - `ConfigError::OrphanDomain` if a tree lists a domain missing from
    ///   `domains`
    /// - `ConfigError::OutputCollision` if two trees share an output root
    pub fn new(
        trees: BTreeMap<TreeIdentity, InnerTree>,
        domains: BTreeMap<String, ApiDomain>,
    ) -> ConfigResult<Self> {
        let mut out_roots: BTreeMap<&Path, &TreeIdentity> = BTreeMap::new();

        for (key, tree) in &trees {
            if let Some(domain) = tree.domain_names().find(|d| !domains.contains_key(*d)) {
                return Err(ConfigError::OrphanDomain {
                    tree: key.clone(),
                    domain: domain.to_string(),
                });
            }

            if let Some(first) = out_roots.insert(tree.out().root(), key) {
                return Err(ConfigError::OutputCollision {
                    first: first.clone(),
                    second: key.clone(),
                    out_root: tree.out().root().to_path_buf(),
                });
            }
        }

        Ok(Self { trees, domains })
    }

    /// The tree for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &TreeIdentity) -> Option<&InnerTree> {
        self.trees.get(key)
    }

    /// The trees (not their keys) in key order.
    #[must_use]
    pub fn keys(&self) -> Vec<&InnerTree> {
        self.trees.values().collect()
    }

    /// Tree keys in order.
    pub fn identities(&self) -> impl Iterator<Item = &TreeIdentity> {
        self.trees.keys()
    }

    /// Global domain registry.
    #[must_use]
    pub fn domains(&self) -> &BTreeMap<String, ApiDomain> {
        &self.domains
    }

    /// Number of trees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// True if there are no trees.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Call `func` once per tree, in key order, one at a time.
    ///
    /// Returns each call's result keyed by the tree's identity.
    pub fn for_each_tree<C, R, F>(&self, mut func: F, cookie: &C) -> BTreeMap<TreeIdentity, R>
    where
        C: ?Sized,
        F: FnMut(&TreeIdentity, &InnerTree, &C) -> R,
    {
        self.trees
            .iter()
            .map(|(key, tree)| (key.clone(), func(key, tree, cookie)))
            .collect()
    }

    /// Like [`for_each_tree`](Self::for_each_tree), but stops at the first
    /// error. Trees after the failing one are not visited.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `func`.
    pub fn try_for_each_tree<C, R, E, F>(
        &self,
        mut func: F,
        cookie: &C,
    ) -> Result<BTreeMap<TreeIdentity, R>, E>
    where
        C: ?Sized,
        F: FnMut(&TreeIdentity, &InnerTree, &C) -> Result<R, E>,
    {
        self.trees
            .iter()
            .map(|(key, tree)| func(key, tree, cookie).map(|result| (key.clone(), result)))
            .collect()
    }
}

impl fmt::Display for TreeCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut trees: Vec<String> = self.trees.values().map(ToString::to_string).collect();
        trees.sort();
        let mut domains: Vec<String> = self.domains.values().map(ToString::to_string).collect();
        domains.sort();

        writeln!(f, "InnerTrees {{")?;
        writeln!(f, "    trees: [")?;
        for tree in &trees {
            writeln!(f, "        {tree}")?;
        }
        writeln!(f, "    ]")?;
        writeln!(f, "    domains: [")?;
        for domain in &domains {
            writeln!(f, "        {domain}")?;
        }
        writeln!(f, "    ]")?;
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    fn collection(roots: &[&str]) -> TreeCollection {
        let mut trees = BTreeMap::new();
        let mut domains = BTreeMap::new();
        for root in roots {
            let key = TreeIdentity::new(*root, None);
            let mut tree = InnerTree::new(&key, Path::new("out"), "nsjail");
            let domain = ApiDomain::new(format!("{root}.domain"), key.clone(), None);
            let _ = tree.add_domain(domain.clone());
            let _ = domains.insert(domain.name().to_string(), domain);
            let _ = trees.insert(key, tree);
        }
        TreeCollection::new(trees, domains).unwrap()
    }

    #[test]
    fn test_for_each_tree_visits_in_key_order() {
        let trees = collection(&["b", "a", "c"]);
        let visited = RefCell::new(Vec::new());

        let results = trees.for_each_tree(
            |key, tree, suffix: &str| {
                visited.borrow_mut().push(tree.root().to_path_buf());
                format!("{}{suffix}", key.root().display())
            },
            "!",
        );

        assert_eq!(
            visited.into_inner(),
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
        assert_eq!(results.len(), 3);
        assert_eq!(results[&TreeIdentity::new("b", None)], "b!");
        assert!(trees.identities().eq(results.keys()));
    }

    #[test]
    fn test_try_for_each_tree_stops_at_first_error() {
        let trees = collection(&["a", "b", "c"]);
        let mut visited = Vec::new();

        let result: Result<_, String> = trees.try_for_each_tree(
            |key, _, _: &()| {
                visited.push(key.root().to_path_buf());
                if key.root() == Path::new("b") {
                    Err("b failed".to_string())
                } else {
                    Ok(())
                }
            },
            &(),
        );

        assert_eq!(result.unwrap_err(), "b failed");
        assert_eq!(visited, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_try_for_each_tree_collects_all_results() {
        let trees = collection(&["c", "a"]);
        let result: Result<_, ()> =
            trees.try_for_each_tree(|key, _, _: &()| Ok(key.to_string()), &());
        let results = result.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_get_and_keys() {
        let trees = collection(&["b", "a"]);
        assert_eq!(trees.len(), 2);
        assert!(!trees.is_empty());
        assert!(trees.get(&TreeIdentity::new("a", None)).is_some());
        assert!(trees.get(&TreeIdentity::new("a", Some("p".to_string()))).is_none());

        let roots: Vec<_> = trees.keys().iter().map(|t| t.root().to_path_buf()).collect();
        assert_eq!(roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_orphan_domain_is_rejected() {
        let key = TreeIdentity::new("a", None);
        let mut tree = InnerTree::new(&key, Path::new("out"), "nsjail");
        let _ = tree.add_domain(ApiDomain::new("system", key.clone(), None));
        let trees = BTreeMap::from([(key, tree)]);

        let err = TreeCollection::new(trees, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::OrphanDomain { ref domain, .. } if domain == "system"));
    }

    #[test]
    fn test_shared_output_root_is_rejected() {
        let plain = TreeIdentity::new("a", None);
        let melded = TreeIdentity::from_paths(["a", "shared"], None).unwrap();
        let trees = BTreeMap::from([
            (plain.clone(), InnerTree::new(&plain, Path::new("out"), "nsjail")),
            (melded.clone(), InnerTree::new(&melded, Path::new("out"), "nsjail")),
        ]);

        let err = TreeCollection::new(trees, BTreeMap::new()).unwrap_err();
        match err {
            ConfigError::OutputCollision { first, second, out_root } => {
                assert_eq!(first, plain);
                assert_eq!(second, melded);
                assert_eq!(out_root, Path::new("out/trees/a_unbundled"));
            }
            other => panic!("Expected OutputCollision, got {other:?}"),
        }
    }

    #[test]
    fn test_display_dump() {
        let dump = collection(&["b", "a"]).to_string();
        assert!(dump.starts_with("InnerTrees {\n    trees: [\n        InnerTree(root=\"a\""));
        assert!(dump.contains("ApiDomain(name=\"b.domain\" tree.root=\"b\" product=null)"));
        assert!(dump.ends_with("    ]\n}"));
    }
}
