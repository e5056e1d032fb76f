use std::path::PathBuf;

use anyhow::{Context, Result};
use raw_linker::raw::discovery::Discovery;
use raw_linker::state::graph::LinkGraph;
use raw_linker::Config;

pub fn execute(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let discovery = Discovery::new(config);

    let graph = match path {
        Some(path) => {
            discovery
                .find_entity(&path)
                .with_context(|| format!("Failed to look up {}", path.display()))?
                .graph
        }
        None => discovery.find_images().context("Failed to discover images")?.graph,
    };

    print!("{}", render(&graph));
    Ok(())
}

/// Every RAW tree, then whatever is not attached to a RAW
pub fn render(graph: &LinkGraph) -> String {
    let mut out = String::new();

    for (id, _) in graph.raws() {
        out.push_str(&graph.raw_tree(id).to_string());
        out.push('\n');
    }

    let unlinked: Vec<_> = graph.unlinked_sidecars().collect();
    if !unlinked.is_empty() {
        out.push_str("Sidecars without a raw:\n");
        for (_, sidecar) in unlinked {
            out.push_str(&format!("  {}", sidecar.path().full_path().display()));
            if let Some(output) = sidecar.output().and_then(|id| graph.output(id)) {
                out.push_str(&format!(" => {}", output.path().full_path().display()));
            }
            out.push('\n');
        }
    }

    let orphans: Vec<_> = graph.orphaned_outputs().collect();
    if !orphans.is_empty() {
        out.push_str("Outputs without a raw:\n");
        for (_, output) in orphans {
            out.push_str(&format!("  {}\n", output.path().full_path().display()));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_linker::raw::path::ImagePath;

    #[test]
    fn test_render_lists_leftovers_after_trees() {
        let mut graph = LinkGraph::default();
        let raw = graph.add_raw(ImagePath::new("/src/DSC1.ARW", "/src"));
        let output = graph.add_output(ImagePath::new("/dst/DSC1.jpg", "/dst"));
        graph.attach_output(raw, output).unwrap();
        graph.add_sidecar(ImagePath::new("/src/DSC2.xmp", "/src"));
        graph.add_output(ImagePath::new("/dst/DSC3.jpg", "/dst"));

        assert_eq!(
            render(&graph),
            "/src/DSC1.ARW\n  /dst/DSC1.jpg\n\
             Sidecars without a raw:\n  /src/DSC2.xmp\n\
             Outputs without a raw:\n  /dst/DSC3.jpg\n"
        );
    }
}
