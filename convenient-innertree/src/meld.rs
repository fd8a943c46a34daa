//! Sandbox construction and directory melding.
//!
//! An inner tree is exposed read-only at `/src` with its output directory
//! writable at `/src/out`. Meld roots are shared source checkouts: every git
//! project found under a meld root is bind-mounted into the tree at the same
//! relative path, unless the tree already has real content there.
//!
//! A meld root that is itself a git project (git submodules) is not handled
//! yet and is skipped with a warning.

use crate::nsjail::{MountPoint, NsjailConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Version control marker that makes a directory a meldable project.
pub const GIT_DIR: &str = ".git";

/// What happened to one meld root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeldOutcome {
    /// The meld root is a git project itself; nothing was mounted.
    GitSubmoduleRoot,

    /// The meld root was walked and `melded` projects were mounted.
    Walked {
        /// Number of mounts added
        melded: usize,
    },
}

/// Builds the [`NsjailConfig`] for one inner tree.
#[derive(Debug, Clone)]
pub struct SandboxConfigBuilder {
    root: PathBuf,
    out_root: PathBuf,
    meld_dirs: Vec<PathBuf>,
}

impl SandboxConfigBuilder {
    /// Builder for the tree at `root` writing to `out_root`.
    pub fn new(root: impl Into<PathBuf>, out_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            out_root: out_root.into(),
            meld_dirs: Vec::new(),
        }
    }

    /// Add a meld root. Earlier roots are mounted first.
    #[must_use]
    pub fn meld_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.meld_dirs.push(dir.into());
        self
    }

    /// Add several meld roots in order.
    #[must_use]
    pub fn meld_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.meld_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Compute the sandbox config from the current filesystem state.
    ///
    /// # Errors
    ///
    /// Fails if a host path cannot be made absolute, or with
    /// `io::ErrorKind::InvalidData` if the tree root or output directory is not
    /// valid UTF-8.
    pub fn build(&self) -> io::Result<NsjailConfig> {
        let mut config = NsjailConfig::new();

        let src_dst = config.cwd().to_path_buf();
        let src = utf8_path(std::path::absolute(&self.root)?)?;
        config.add_mount(MountPoint::bind(src, src_dst, false));

        let out_dst = config.out_dir();
        let out = utf8_path(std::path::absolute(&self.out_root)?)?;
        config.add_mount(MountPoint::bind(out, out_dst, true));

        for shared in &self.meld_dirs {
            let outcome = self.meld_root(&mut config, shared)?;
            debug!("Meld root {}: {:?}", shared.display(), outcome);
        }

        Ok(config)
    }

    /// Meld every project found under `shared` into `config`.
    ///
    /// # Errors
    ///
    /// Fails if a project path cannot be made absolute.
    pub fn meld_root(&self, config: &mut NsjailConfig, shared: &Path) -> io::Result<MeldOutcome> {
        if is_project_dir(shared) {
            // TODO: meld the submodules of a git project root instead of skipping it
            warn!(
                "Not melding {}: git submodule melding is not supported",
                shared.display()
            );
            return Ok(MeldOutcome::GitSubmoduleRoot);
        }

        let mut melded = 0;
        let mut walker = WalkDir::new(shared)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_type().is_dir());

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error walking meld root {}: {}", shared.display(), e);
                    continue;
                }
            };

            if !is_project_dir(entry.path()) {
                continue;
            }

            // Projects are melded whole, never their subdirectories.
            walker.skip_current_dir();

            if self.meld_project(config, shared, entry.path())? {
                melded += 1;
            }
        }

        Ok(MeldOutcome::Walked { melded })
    }

    fn meld_project(
        &self,
        config: &mut NsjailConfig,
        shared: &Path,
        project: &Path,
    ) -> io::Result<bool> {
        let relative = project.strip_prefix(shared).map_err(io::Error::other)?;
        let src = std::path::absolute(project)?;
        if src.to_str().is_none() {
            warn!("Not melding {}: path is not valid UTF-8", project.display());
            return Ok(false);
        }

        let dst = self.root.join(relative);
        let dst_jail = config.cwd().join(relative);

        if dst.is_dir() && !is_placeholder_empty_dir(&dst) {
            debug!("{} already present, not melding {}", dst.display(), project.display());
            return Ok(false);
        }

        info!("melding {} into {}", project.display(), dst.display());
        config.add_mount(MountPoint::bind(src, dst_jail, false));
        Ok(true)
    }
}

/// `path` unchanged, or `InvalidData` if it cannot be written to an nsjail config.
fn utf8_path(path: PathBuf) -> io::Result<PathBuf> {
    if path.to_str().is_none() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is not valid UTF-8", path.display()),
        ));
    }
    Ok(path)
}

/// A directory holding a `.git` directory, or a symlink to one as repo
/// creates.
fn is_project_dir(dir: &Path) -> bool {
    dir.join(GIT_DIR).is_dir()
}

/// True when `path` is a directory with nothing in it, as left behind by
/// nsjail creating a mount point on an earlier run.
///
/// Answers false on any error so that real content is never shadowed.
#[must_use]
pub fn is_placeholder_empty_dir(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => {}
        _ => return false,
    }

    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}
