//! nsjail configuration for an inner tree sandbox.
//!
//! The config is written in nsjail's protobuf text format. Only the mount
//! layout varies between trees; everything else is fixed.

use crate::enquote;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where the inner tree source is mounted inside the sandbox.
pub const SANDBOX_SRC_DIR: &str = "/src";

/// Name of the output mount point below [`SANDBOX_SRC_DIR`].
pub const SANDBOX_OUT_NAME: &str = "out";

/// A single nsjail mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    /// Host path
    pub src: PathBuf,
    /// Path inside the sandbox
    pub dst: PathBuf,
    /// Bind mount rather than a filesystem mount
    pub is_bind: bool,
    /// Writable inside the sandbox
    pub rw: bool,
    /// Fail sandbox setup if the mount cannot be made
    pub mandatory: bool,
}

impl MountPoint {
    /// Mandatory bind mount of `src` at `dst`.
    pub fn bind(src: impl Into<PathBuf>, dst: impl Into<PathBuf>, rw: bool) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            is_bind: true,
            rw,
            mandatory: true,
        }
    }
}

impl fmt::Display for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mount {{")?;
        writeln!(f, "  src: {}", enquote(&self.src.to_string_lossy()))?;
        writeln!(f, "  dst: {}", enquote(&self.dst.to_string_lossy()))?;
        writeln!(f, "  is_bind: {}", self.is_bind)?;
        writeln!(f, "  rw: {}", self.rw)?;
        writeln!(f, "  mandatory: {}", self.mandatory)?;
        writeln!(f, "}}")
    }
}

/// Sandbox configuration for one inner tree.
///
/// Mounts are kept in insertion order; nsjail applies them in that order, so
/// later mounts shadow earlier ones at overlapping paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsjailConfig {
    name: String,
    description: String,
    cwd: PathBuf,
    mounts: Vec<MountPoint>,
}

impl Default for NsjailConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NsjailConfig {
    /// Empty config with the working directory at [`SANDBOX_SRC_DIR`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "inner-tree".to_string(),
            description: "Multitree inner tree build".to_string(),
            cwd: PathBuf::from(SANDBOX_SRC_DIR),
            mounts: Vec::new(),
        }
    }

    /// Sandbox path of the inner tree source.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Sandbox path of the inner tree output directory.
    #[must_use]
    pub fn out_dir(&self) -> PathBuf {
        self.cwd.join(SANDBOX_OUT_NAME)
    }

    /// Append a mount point.
    pub fn add_mount(&mut self, mount: MountPoint) {
        self.mounts.push(mount);
    }

    /// Mount points in application order.
    #[must_use]
    pub fn mounts(&self) -> &[MountPoint] {
        &self.mounts
    }

    /// Write the config to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::InvalidData` if a mount path is not valid UTF-8,
    /// otherwise any I/O error from creating the directory or writing the file.
    pub fn generate_config(&self, path: &Path) -> io::Result<()> {
        if let Some(mount) = self
            .mounts
            .iter()
            .find(|m| m.src.to_str().is_none() || m.dst.to_str().is_none())
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "mount {} -> {} is not valid UTF-8",
                    mount.src.display(),
                    mount.dst.display()
                ),
            ));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_string())
    }
}

impl fmt::Display for NsjailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", enquote(&self.name))?;
        writeln!(f, "description: {}", enquote(&self.description))?;
        writeln!(f, "mode: ONCE")?;
        writeln!(f, "cwd: {}", enquote(&self.cwd.to_string_lossy()))?;
        writeln!(f, "time_limit: 0")?;
        writeln!(f, "keep_env: true")?;
        for mount in &self.mounts {
            writeln!(f)?;
            write!(f, "{mount}")?;
        }
        Ok(())
    }
}
