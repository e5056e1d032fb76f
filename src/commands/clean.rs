use anyhow::{bail, Context, Result};
use raw_linker::raw::discovery::Discovery;
use raw_linker::state::data::EntityId;
use raw_linker::state::graph::LinkGraph;
use raw_linker::state::lifecycle::Mode;
use raw_linker::Config;

pub struct Options {
    pub stage: bool,
    pub delete: bool,
    pub orphans: bool,
    pub dry_run: bool,
}

pub fn execute(config: &Config, options: Options) -> Result<()> {
    let mut graph = Discovery::new(config)
        .find_images()
        .context("Failed to discover images")?
        .graph;
    let targets = candidates(&graph, options.orphans);

    if targets.is_empty() {
        tracing::info!("✅ Nothing to clean");
        return Ok(());
    }

    let mode = if options.dry_run { Mode::Simulate } else { Mode::Apply };
    let mut failed = 0;
    for entity in targets {
        let result = if options.stage {
            graph.stage_for_deletion(entity, &config.staging_dir, mode).map(drop)
        } else if options.delete {
            graph.delete(entity, mode).map(drop)
        } else {
            if let Some(path) = graph.path_of(entity) {
                println!("{}", path.full_path().display());
            }
            Ok(())
        };

        if let Err(e) = result {
            tracing::error!("❌ {}", e);
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} files could not be cleaned", failed);
    }
    Ok(())
}

/// RAWs with no output (with their sidecars) and sidecars with no output;
/// with `orphans`, also outputs with no RAW. Sorted by path.
pub fn candidates(graph: &LinkGraph, orphans: bool) -> Vec<EntityId> {
    let mut targets: Vec<EntityId> = Vec::new();

    for (id, raw) in graph.raws() {
        if raw.outputs().next().is_none() {
            targets.push(id.into());
            targets.extend(raw.sidecars().map(EntityId::from));
        }
    }
    for (id, sidecar) in graph.sidecars() {
        if sidecar.output().is_none() && !targets.contains(&id.into()) {
            targets.push(id.into());
        }
    }
    if orphans {
        targets.extend(graph.orphaned_outputs().map(|(id, _)| EntityId::from(id)));
    }

    targets.sort_by_key(|&entity| graph.path_of(entity).map(|path| path.full_path().to_path_buf()));
    targets
}
