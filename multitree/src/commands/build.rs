//! Multitree build - runs every inner tree's `.inner_build` inside nsjail
//!
//! Trees are built one after another in tree order. The first failing tree
//! stops the whole build.

use convenient_innertree::{InnerTreeInvoker, LunchCombo};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Build all inner trees of `combo`, passing `args` to each `.inner_build`.
pub fn execute(
    combo: &Path,
    out_dir: &Path,
    nsjail: &Path,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let start_time = Instant::now();

    let trees = LunchCombo::load(combo)?.into_collection(out_dir, nsjail)?;
    info!("Building {} inner trees from {}", trees.len(), combo.display());

    let invoker = InnerTreeInvoker::new();
    let built = trees.try_for_each_tree(
        |key, tree, args: &[String]| {
            info!("Building {}", key);
            invoker.invoke(tree, args)
        },
        args,
    )?;

    info!(
        "Built {} inner trees in {:.2}s",
        built.len(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
