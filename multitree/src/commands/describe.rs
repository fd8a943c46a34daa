//! Describe the inner trees a lunch combo resolves to

use convenient_innertree::{LunchCombo, TreeCollection};
use std::fmt::Write;
use std::path::Path;

/// Print the resolved trees of `combo` and where each one writes its outputs.
pub fn execute(
    combo: &Path,
    out_dir: &Path,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Describing never runs anything, so the nsjail path is irrelevant.
    let nsjail = Path::new(super::DEFAULT_NSJAIL);
    let trees = LunchCombo::load(combo)?.into_collection(out_dir, nsjail)?;
    print!("{}", render(&trees));
    Ok(())
}

/// Collection dump followed by each tree's output paths.
pub fn render(trees: &TreeCollection) -> String {
    let mut text = format!("{trees}\n");

    for tree in trees.keys() {
        let out = tree.out();
        let _ = writeln!(text);
        let _ = writeln!(text, "{}", tree.root().display());
        let _ = writeln!(text, "  out:               {}", out.root().display());
        let _ = writeln!(text, "  tree info:         {}", out.tree_info_file().display());
        let _ = writeln!(text, "  api contributions: {}", out.api_contributions_dir().display());
        let _ = writeln!(text, "  build targets:     {}", out.build_targets_file().display());
        let _ = writeln!(text, "  ninja:             {}", out.main_ninja_file().display());
        let _ = writeln!(text, "  nsjail config:     {}", out.nsjail_config_file().display());
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_render_lists_trees_in_order() {
        let tmp = TempDir::new().unwrap();
        let combo_file = tmp.path().join("test.mcombo");
        fs::write(
            &combo_file,
            r#"{
                "system": { "inner-tree": "b", "product": "sys" },
                "vendor": { "inner-tree": "a", "product": "ven" }
            }"#,
        )
        .unwrap();

        let trees = LunchCombo::load(&combo_file)
            .unwrap()
            .into_collection(Path::new("out"), Path::new("nsjail"))
            .unwrap();
        let text = render(&trees);

        assert!(text.starts_with("InnerTrees {"));
        let a = text.find("\na\n").unwrap();
        let b = text.find("\nb\n").unwrap();
        assert!(a < b);
        assert!(text.contains("  nsjail config:     out/trees/a_ven/nsjail.cfg\n"));
        assert!(text.contains("  ninja:             out/trees/b_sys/inner_tree.ninja\n"));
    }
}
