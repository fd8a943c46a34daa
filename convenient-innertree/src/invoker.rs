//! Running an inner tree build inside nsjail.

use crate::error::{InvokeError, InvokeResult};
use crate::meld::SandboxConfigBuilder;
use crate::nsjail::NsjailConfig;
use crate::tree::InnerTree;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::{debug, info};

/// Build entrypoint expected at the root of every inner tree.
pub const INNER_BUILD: &str = ".inner_build";

/// Runs a fully assembled command line and waits for it.
pub trait CommandRunner {
    /// Run `argv` (program first) without a shell.
    ///
    /// # Errors
    ///
    /// Returns an error if the program could not be started.
    fn run(&self, argv: &[OsString]) -> io::Result<ExitStatus>;
}

/// Runs commands as direct child processes, inheriting stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[OsString]) -> io::Result<ExitStatus> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;
        Command::new(program).args(args).status()
    }
}

/// Invokes inner tree builds.
#[derive(Debug, Default)]
pub struct InnerTreeInvoker<R = ProcessRunner> {
    runner: R,
}

impl InnerTreeInvoker<ProcessRunner> {
    /// Invoker that spawns real processes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_runner(ProcessRunner)
    }
}

impl<R: CommandRunner> InnerTreeInvoker<R> {
    /// Invoker using a custom command runner.
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// The command runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Build `tree`, passing `args` through to its `.inner_build`.
    ///
    /// The sandbox config is computed on the first call and rewritten to the
    /// tree's output directory on every call.
    ///
    /// # Errors
    ///
    /// Every error is fatal for the multitree build:
    /// - `InvokeError::MissingEntrypoint` if `.inner_build` is missing or not
    ///   executable; nothing is launched
    /// - `InvokeError::SandboxSetup` / `InvokeError::ConfigWrite` if the
    ///   sandbox config cannot be built or written
    /// - `InvokeError::Spawn` if nsjail cannot be started
    /// - `InvokeError::BuildFailed` if the build exits non-zero
    pub fn invoke(&self, tree: &InnerTree, args: &[String]) -> InvokeResult<()> {
        let entrypoint = tree.root().join(INNER_BUILD);
        if !is_executable(&entrypoint) {
            return Err(InvokeError::MissingEntrypoint { path: entrypoint });
        }

        let config = sandbox_config(tree)?;

        let config_file = tree.out().nsjail_config_file();
        config
            .generate_config(&config_file)
            .map_err(|source| InvokeError::ConfigWrite {
                path: config_file.clone(),
                source,
            })?;

        let argv = command_line(tree, config, &config_file, args);
        debug!("Running inner tree {}: {:?}", tree.root().display(), argv);

        let status = self.runner.run(&argv).map_err(|source| InvokeError::Spawn {
            tool: tree.sandbox_tool().to_path_buf(),
            source,
        })?;

        if !status.success() {
            return Err(InvokeError::BuildFailed {
                root: tree.root().to_path_buf(),
                status,
            });
        }

        debug!("Inner tree {} finished", tree.root().display());
        Ok(())
    }
}

/// The tree's cached sandbox config, built on first use.
fn sandbox_config(tree: &InnerTree) -> InvokeResult<&NsjailConfig> {
    let cell = tree.sandbox_config_cell();
    if let Some(config) = cell.get() {
        return Ok(config);
    }

    info!("Setting up sandbox for inner tree {}", tree.root().display());
    let config = SandboxConfigBuilder::new(tree.root(), tree.out().root())
        .meld_dirs(tree.meld_dirs())
        .build()
        .map_err(|source| InvokeError::SandboxSetup {
            root: tree.root().to_path_buf(),
            source,
        })?;

    Ok(cell.get_or_init(|| config))
}

/// Full nsjail command line for one invocation.
///
/// `<nsjail> --config <cfg> -- /src/.inner_build --out_dir /src/out
/// [--api_domain <name>]... [args]...`, domains sorted by name.
#[must_use]
pub fn command_line(
    tree: &InnerTree,
    config: &NsjailConfig,
    config_file: &Path,
    args: &[String],
) -> Vec<OsString> {
    let mut argv: Vec<OsString> = vec![
        tree.sandbox_tool().into(),
        "--config".into(),
        config_file.into(),
        "--".into(),
        config.cwd().join(INNER_BUILD).into(),
        "--out_dir".into(),
        config.out_dir().into(),
    ];

    for domain in tree.domain_names() {
        argv.push("--api_domain".into());
        argv.push(domain.into());
    }

    argv.extend(args.iter().map(OsString::from));
    argv
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use nix::unistd::{AccessFlags, access};

    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
