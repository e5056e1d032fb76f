use std::path::PathBuf;

use anyhow::{Context, Result};
use raw_linker::raw::discovery::Discovery;
use raw_linker::state::graph::LinkGraph;
use raw_linker::Config;

/// One output that should exist, and what it is rendered from
#[derive(Debug, PartialEq, Eq)]
pub struct Render {
    pub raw: PathBuf,
    pub sidecar: Option<PathBuf>,
    pub output: PathBuf,
}

pub fn execute(config: &Config, only_new: bool) -> Result<()> {
    let found = Discovery::new(config).find_images().context("Failed to discover images")?;
    let renders = renders(&found.graph, config, only_new);

    if renders.is_empty() {
        tracing::info!("✅ Nothing to render");
        return Ok(());
    }
    for render in &renders {
        match &render.sidecar {
            Some(sidecar) => println!(
                "{} + {} -> {}",
                render.raw.display(),
                sidecar.display(),
                render.output.display()
            ),
            None => println!("{} -> {}", render.raw.display(), render.output.display()),
        }
    }
    tracing::info!("{} outputs to render", renders.len());
    Ok(())
}

/// An unedited RAW has one output; an edited one has one per sidecar.
pub fn renders(graph: &LinkGraph, config: &Config, only_new: bool) -> Vec<Render> {
    let convention = graph.convention();
    let mut renders = Vec::new();

    for (_, raw) in graph.raws() {
        let raw_path = raw.path().full_path().to_path_buf();
        if raw.is_unedited() {
            renders.push(Render {
                raw: raw_path,
                sidecar: None,
                output: raw.output_path(&config.outputs_dir, convention),
            });
            continue;
        }
        for sidecar in raw.sidecars().filter_map(|id| graph.sidecar(id)) {
            renders.push(Render {
                raw: raw_path.clone(),
                sidecar: Some(sidecar.path().full_path().to_path_buf()),
                output: sidecar.output_path(&config.outputs_dir, convention),
            });
        }
    }

    if only_new {
        renders.retain(|render| !render.output.exists());
    }
    renders
}
