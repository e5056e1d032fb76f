//! Candidate discovery
//!
//! Walks the sources and outputs directories for RAW files, sidecars and
//! outputs, records them in a fresh graph and hands them to the linker.
//! Candidates are always sorted by path before linking, so the result does
//! not depend on directory iteration order.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::convention::Convention;
use super::linker::{self, LinkReport};
use super::path::ImagePath;
use crate::config::Config;
use crate::error::{LinkError, Result};
use crate::state::data::{EntityId, OutputId, RawId, SidecarId};
use crate::state::graph::LinkGraph;

/// Result of a full-tree discovery
#[derive(Debug)]
pub struct Discovered {
    pub graph: LinkGraph,
    pub report: LinkReport,
}

/// Result of a scoped lookup: the requested entity plus the graph of its
/// directory
#[derive(Debug)]
pub struct Scoped<T> {
    pub id: T,
    pub graph: LinkGraph,
    pub report: LinkReport,
}

/// Paths found for one discovery run, each list sorted
#[derive(Debug, Default)]
struct Candidates {
    raws: Vec<PathBuf>,
    sidecars: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
}

pub struct Discovery<'a> {
    config: &'a Config,
}

impl<'a> Discovery<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Enumerate everything under the sources and outputs roots and link it.
    pub fn find_images(&self) -> Result<Discovered> {
        let excluded = self.config.excluded_segments();
        let candidates = Candidates {
            raws: find_files_with_ext(&self.config.sources_dir, &self.config.raw_extensions, &excluded, None)?,
            sidecars: find_files_with_ext(
                &self.config.sources_dir,
                std::slice::from_ref(&self.config.sidecar_extension),
                &excluded,
                None,
            )?,
            outputs: find_files_with_ext(
                &self.config.outputs_dir,
                std::slice::from_ref(&self.config.output_extension),
                &excluded,
                None,
            )?,
        };

        tracing::info!(
            "🔍 Found {} raws, {} sidecars, {} outputs",
            candidates.raws.len(),
            candidates.sidecars.len(),
            candidates.outputs.len()
        );
        let (graph, report) = self.build(candidates)?;
        Ok(Discovered { graph, report })
    }

    /// Look up one RAW file and everything linked to it.
    ///
    /// Only the RAW's own directory and the mirrored output directory are
    /// listed; everything a full walk could link to the RAW lives there.
    pub fn find_raw(&self, path: &Path) -> Result<Scoped<RawId>> {
        if !path.exists() {
            return Err(not_found("raw", path));
        }
        let path = &self.rooted(path);
        let mut candidates = self.directory_candidates(path)?;
        insert_sorted(&mut candidates.raws, path.to_path_buf());

        let (graph, report) = self.build(candidates)?;
        let id = graph.find_raw(path).ok_or_else(|| not_found("raw", path))?;
        Ok(Scoped { id, graph, report })
    }

    /// Look up one sidecar and everything linked to it.
    pub fn find_sidecar(&self, path: &Path) -> Result<Scoped<SidecarId>> {
        if !path.exists() {
            return Err(not_found("sidecar", path));
        }
        let path = &self.rooted(path);
        let mut candidates = self.directory_candidates(path)?;
        insert_sorted(&mut candidates.sidecars, path.to_path_buf());

        let (graph, report) = self.build(candidates)?;
        let id = graph.find_sidecar(path).ok_or_else(|| not_found("sidecar", path))?;
        Ok(Scoped { id, graph, report })
    }

    /// Scoped lookup of a RAW or sidecar, chosen by extension
    pub fn find_entity(&self, path: &Path) -> Result<Scoped<EntityId>> {
        if !path.exists() {
            return Err(not_found("raw or sidecar", path));
        }
        let has_ext = |ext: &str| {
            path.extension()
                .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext.trim_start_matches('.')))
        };

        if has_ext(&self.config.sidecar_extension) {
            let scoped = self.find_sidecar(path)?;
            return Ok(Scoped {
                id: scoped.id.into(),
                graph: scoped.graph,
                report: scoped.report,
            });
        }
        if self.config.raw_extensions.iter().any(|ext| has_ext(ext)) {
            let scoped = self.find_raw(path)?;
            return Ok(Scoped {
                id: scoped.id.into(),
                graph: scoped.graph,
                report: scoped.report,
            });
        }
        tracing::debug!("{} is neither a raw nor a sidecar", path.display());
        Err(LinkError::Unsupported {
            path: path.to_path_buf(),
        })
    }

    /// Spell `path` the way a walk of the sources directory would, so scoped
    /// and full-tree lookups key the same records. Paths outside the sources
    /// directory are kept as given.
    fn rooted(&self, path: &Path) -> PathBuf {
        let image = ImagePath::new(path, &self.config.sources_dir);
        if !image.is_within_base() {
            return path.to_path_buf();
        }
        image.base_dir().join(image.relative_path())
    }

    /// RAWs and sidecars next to `path`, outputs in the mirrored directory
    fn directory_candidates(&self, path: &Path) -> Result<Candidates> {
        let excluded = self.config.excluded_segments();
        let dir = path.parent().unwrap_or(Path::new(""));
        let relative_dir = ImagePath::new(path, &self.config.sources_dir)
            .relative_dir()
            .to_path_buf();
        let output_dir = self.config.outputs_dir.join(relative_dir);

        Ok(Candidates {
            raws: list_dir(dir, &self.config.raw_extensions, &excluded)?,
            sidecars: list_dir(dir, std::slice::from_ref(&self.config.sidecar_extension), &excluded)?,
            outputs: list_dir(&output_dir, std::slice::from_ref(&self.config.output_extension), &excluded)?,
        })
    }

    /// Record every candidate in a new graph and link them
    fn build(&self, candidates: Candidates) -> Result<(LinkGraph, LinkReport)> {
        let mut graph = LinkGraph::new(Convention::from(self.config));
        let sources = &self.config.sources_dir;
        let outputs = &self.config.outputs_dir;

        let raws: Vec<RawId> = candidates
            .raws
            .into_iter()
            .map(|p| graph.add_raw(ImagePath::new(p, sources)))
            .collect();
        let sidecars: Vec<SidecarId> = candidates
            .sidecars
            .into_iter()
            .map(|p| graph.add_sidecar(ImagePath::new(p, sources)))
            .collect();
        let output_ids: Vec<OutputId> = candidates
            .outputs
            .into_iter()
            .map(|p| graph.add_output(ImagePath::new(p, outputs)))
            .collect();

        let report = linker::link(&mut graph, &raws, &sidecars, &output_ids)?;
        Ok((graph, report))
    }
}

/// Every file under `folder` whose extension is one of `extensions`
/// (case-insensitive), sorted by path.
///
/// Directories named in `excluded` are not descended into. A missing
/// `folder` yields no files.
pub fn find_files_with_ext(
    folder: &Path,
    extensions: &[String],
    excluded: &[String],
    max_depth: Option<usize>,
) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        tracing::debug!("{} does not exist, nothing to find", folder.display());
        return Ok(Vec::new());
    }

    let mut walker = WalkDir::new(folder).follow_links(true);
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let mut found = Vec::new();
    let entries = walker.into_iter().filter_entry(|entry| {
        entry.depth() == 0 || !excluded.iter().any(|segment| entry.file_name().to_string_lossy() == segment.as_str())
    });
    for entry in entries {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_extension(entry.path(), extensions) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

/// Files directly inside `dir`, keeping `dir` as the prefix even when it is
/// empty (the current directory).
fn list_dir(dir: &Path, extensions: &[String], excluded: &[String]) -> Result<Vec<PathBuf>> {
    let root = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
    let mut files: Vec<PathBuf> = find_files_with_ext(root, extensions, excluded, Some(1))?
        .into_iter()
        .filter_map(|p| p.file_name().map(|name| dir.join(name)))
        .collect();
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext = ext.to_string_lossy();
    extensions
        .iter()
        .any(|wanted| ext.eq_ignore_ascii_case(wanted.trim_start_matches('.')))
}

fn insert_sorted(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if let Err(i) = paths.binary_search(&path) {
        paths.insert(i, path);
    }
}

fn not_found(kind: &'static str, path: &Path) -> LinkError {
    LinkError::NotFound {
        kind,
        path: path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Library {
        dir: TempDir,
        config: Config,
    }

    impl Library {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = Config {
                sources_dir: dir.path().join("src"),
                outputs_dir: dir.path().join("dst"),
                ..Config::default()
            };
            fs::create_dir_all(&config.sources_dir).unwrap();
            Self { dir, config }
        }

        fn touch(&self, relative: &str) -> PathBuf {
            let path = self.dir.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"").unwrap();
            path
        }

        fn path(&self, relative: &str) -> PathBuf {
            self.dir.path().join(relative)
        }
    }

    fn raw_trees(graph: &LinkGraph) -> Vec<String> {
        graph.raws().map(|(id, _)| graph.raw_tree(id).to_string()).collect()
    }

    #[test]
    fn test_find_files_sorted_and_case_insensitive() {
        let lib = Library::new();
        lib.touch("src/b/DSC2.arw");
        lib.touch("src/a/DSC1.ARW");
        lib.touch("src/a/DSC1.ARW.xmp");

        let found = find_files_with_ext(&lib.config.sources_dir, &[".ARW".to_string()], &[], None).unwrap();
        assert_eq!(found, vec![lib.path("src/a/DSC1.ARW"), lib.path("src/b/DSC2.arw")]);
    }

    #[test]
    fn test_find_files_skips_excluded_segments() {
        let lib = Library::new();
        lib.touch("src/DSC1.ARW");
        lib.touch("src/#recycle/DSC2.ARW");
        lib.touch("src/delete/trip/DSC3.ARW");

        let found = find_files_with_ext(
            &lib.config.sources_dir,
            &[".ARW".to_string()],
            &lib.config.excluded_segments(),
            None,
        )
        .unwrap();
        assert_eq!(found, vec![lib.path("src/DSC1.ARW")]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let lib = Library::new();
        let found = find_files_with_ext(&lib.path("nowhere"), &[".jpg".to_string()], &[], None).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_find_images_edited_raw() {
        let lib = Library::new();
        lib.touch("src/trip/DSC1.ARW");
        lib.touch("src/trip/DSC1.ARW.xmp");
        lib.touch("dst/trip/DSC1.jpg");

        let found = Discovery::new(&lib.config).find_images().unwrap();
        let g = &found.graph;
        assert!(g.is_consistent());
        assert!(found.report.ambiguities.is_empty());

        let (_, raw) = g.raws().next().unwrap();
        assert_eq!(raw.sidecars().count(), 1);
        assert_eq!(raw.outputs().count(), 1);
        let (_, sidecar) = g.sidecars().next().unwrap();
        assert!(sidecar.output().is_some());
        assert_eq!(g.orphaned_outputs().count(), 0);
    }

    #[test]
    fn test_find_images_unedited_raw() {
        let lib = Library::new();
        lib.touch("src/DSC1.ARW");
        lib.touch("dst/DSC1.jpg");

        let found = Discovery::new(&lib.config).find_images().unwrap();
        let (_, raw) = found.graph.raws().next().unwrap();
        assert!(raw.is_unedited());
        assert_eq!(raw.outputs().count(), 1);
        assert_eq!(
            raw.output_path(&lib.config.outputs_dir, found.graph.convention()),
            lib.path("dst/DSC1.jpg")
        );
    }

    #[test]
    fn test_find_images_virtual_copies() {
        let lib = Library::new();
        lib.touch("src/DSC1.ARW");
        lib.touch("src/DSC1_01.ARW.xmp");
        lib.touch("src/DSC1_02.ARW.xmp");
        lib.touch("dst/DSC1_01.jpg");
        lib.touch("dst/DSC1_02.jpg");

        let found = Discovery::new(&lib.config).find_images().unwrap();
        let g = &found.graph;
        let (_, raw) = g.raws().next().unwrap();
        assert_eq!(raw.sidecars().count(), 2);
        assert_eq!(raw.outputs().count(), 2);
        for (_, sidecar) in g.sidecars() {
            let output = g.output(sidecar.output().unwrap()).unwrap();
            assert!(output.is_virtual_copy());
            assert_eq!(output.path().base_name(), sidecar.path().base_name());
        }
    }

    #[test]
    fn test_find_images_orphans() {
        let lib = Library::new();
        lib.touch("src/DSC2.xmp");
        lib.touch("dst/DSC1.jpg");

        let found = Discovery::new(&lib.config).find_images().unwrap();
        let g = &found.graph;
        assert_eq!(g.raws().count(), 0);
        assert_eq!(g.unlinked_sidecars().count(), 1);
        assert_eq!(g.orphaned_outputs().count(), 1);
    }

    #[test]
    fn test_find_images_without_outputs_dir() {
        let lib = Library::new();
        lib.touch("src/DSC1.ARW");

        let found = Discovery::new(&lib.config).find_images().unwrap();
        assert_eq!(found.graph.raws().count(), 1);
        assert_eq!(found.graph.outputs().count(), 0);
    }

    #[test]
    fn test_staged_files_are_not_rediscovered() {
        let lib = Library::new();
        lib.touch("src/DSC1.ARW");
        lib.touch("src/delete/DSC2.ARW");
        lib.touch("src/#recycle/DSC3.ARW");

        let found = Discovery::new(&lib.config).find_images().unwrap();
        assert_eq!(found.graph.raws().count(), 1);
    }

    #[test]
    fn test_find_raw_matches_full_tree() {
        let lib = Library::new();
        lib.touch("src/trip/DSC1.ARW");
        lib.touch("src/trip/DSC1.ARW.xmp");
        lib.touch("src/trip/DSC1_01.xmp");
        lib.touch("src/trip/DSC2.ARW");
        lib.touch("src/other/DSC1.ARW");
        lib.touch("dst/trip/DSC1.jpg");
        lib.touch("dst/trip/DSC1_01.jpg");
        lib.touch("dst/other/DSC1.jpg");

        let discovery = Discovery::new(&lib.config);
        let raw_path = lib.path("src/trip/DSC1.ARW");
        let scoped = discovery.find_raw(&raw_path).unwrap();
        let full = discovery.find_images().unwrap();
        let full_id = full.graph.find_raw(&raw_path).unwrap();

        assert_eq!(
            scoped.graph.raw_tree(scoped.id).to_string(),
            full.graph.raw_tree(full_id).to_string()
        );
        assert!(scoped.graph.find_raw(&lib.path("src/other/DSC1.ARW")).is_none());
    }

    /// RAW and output a sidecar is linked to, by path
    fn sidecar_links(graph: &LinkGraph, id: SidecarId) -> (Option<PathBuf>, Option<PathBuf>) {
        let sidecar = graph.sidecar(id).unwrap();
        let raw = sidecar
            .raw()
            .and_then(|raw| graph.raw(raw))
            .map(|raw| raw.path().full_path().to_path_buf());
        let output = sidecar
            .output()
            .and_then(|output| graph.output(output))
            .map(|output| output.path().full_path().to_path_buf());
        (raw, output)
    }

    #[test]
    fn test_find_sidecar_matches_full_tree() {
        let lib = Library::new();
        lib.touch("src/trip/DSC1.ARW");
        lib.touch("src/trip/DSC1.ARW.xmp");
        lib.touch("src/trip/DSC1.xmp");
        lib.touch("src/trip/DSC1_01.xmp");
        lib.touch("src/trip/DSC2.ARW");
        lib.touch("src/other/DSC1_01.xmp");
        lib.touch("dst/trip/DSC1.jpg");
        lib.touch("dst/trip/DSC1_01.jpg");
        lib.touch("dst/other/DSC1_01.jpg");

        let discovery = Discovery::new(&lib.config);
        let full = discovery.find_images().unwrap();
        for name in ["src/trip/DSC1.ARW.xmp", "src/trip/DSC1.xmp", "src/trip/DSC1_01.xmp"] {
            let path = lib.path(name);
            let scoped = discovery.find_sidecar(&path).unwrap();
            let full_id = full.graph.find_sidecar(&path).unwrap();
            assert_eq!(
                sidecar_links(&scoped.graph, scoped.id),
                sidecar_links(&full.graph, full_id),
                "{}",
                name
            );
        }

        let copy = discovery.find_sidecar(&lib.path("src/trip/DSC1_01.xmp")).unwrap();
        assert_eq!(
            sidecar_links(&copy.graph, copy.id),
            (Some(lib.path("src/trip/DSC1.ARW")), Some(lib.path("dst/trip/DSC1_01.jpg")))
        );
    }

    #[test]
    fn test_absolute_lookup_with_relative_sources_dir() {
        // a library addressed relative to the current directory
        let dir = tempfile::Builder::new().tempdir_in(".").unwrap();
        let root = PathBuf::from(dir.path().file_name().unwrap());
        let config = Config {
            sources_dir: root.join("src"),
            outputs_dir: root.join("dst"),
            ..Config::default()
        };
        assert!(config.sources_dir.is_relative());
        for name in ["src/trip/DSC1.ARW", "src/trip/DSC1.jpg", "dst/trip/DSC1_01.jpg"] {
            let path = root.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"").unwrap();
        }

        let discovery = Discovery::new(&config);
        let full = discovery.find_images().unwrap();
        let full_id = full.graph.find_raw(&root.join("src/trip/DSC1.ARW")).unwrap();

        let absolute = std::path::absolute(root.join("src/trip/DSC1.ARW")).unwrap();
        let scoped = discovery.find_raw(&absolute).unwrap();

        // the camera JPEG next to the RAW is not an output
        let outputs: Vec<_> = scoped
            .graph
            .raw(scoped.id)
            .unwrap()
            .outputs()
            .map(|id| scoped.graph.output(id).unwrap().path().full_path().to_path_buf())
            .collect();
        assert_eq!(outputs, vec![root.join("dst/trip/DSC1_01.jpg")]);
        assert_eq!(
            scoped.graph.raw_tree(scoped.id).to_string(),
            full.graph.raw_tree(full_id).to_string()
        );
    }

    #[test]
    fn test_find_sidecar_links_raw_and_output() {
        let lib = Library::new();
        lib.touch("src/trip/DSC1.ARW");
        let xmp = lib.touch("src/trip/DSC1_01.ARW.xmp");
        lib.touch("dst/trip/DSC1_01.jpg");

        let scoped = Discovery::new(&lib.config).find_sidecar(&xmp).unwrap();
        let sidecar = scoped.graph.sidecar(scoped.id).unwrap();
        assert!(sidecar.raw().is_some());
        let output = scoped.graph.output(sidecar.output().unwrap()).unwrap();
        assert_eq!(output.path().full_path(), lib.path("dst/trip/DSC1_01.jpg").as_path());
    }

    #[test]
    fn test_scoped_lookup_of_missing_file() {
        let lib = Library::new();
        let discovery = Discovery::new(&lib.config);
        let result = discovery.find_raw(&lib.path("src/DSC9.ARW"));
        assert!(matches!(result, Err(LinkError::NotFound { kind: "raw", .. })));
    }

    #[test]
    fn test_find_entity_dispatches_on_extension() {
        let lib = Library::new();
        let raw = lib.touch("src/DSC1.ARW");
        let xmp = lib.touch("src/DSC1.xmp");
        let other = lib.touch("src/notes.txt");

        let discovery = Discovery::new(&lib.config);
        assert!(matches!(discovery.find_entity(&raw).unwrap().id, EntityId::Raw(_)));
        assert!(matches!(discovery.find_entity(&xmp).unwrap().id, EntityId::Sidecar(_)));
        assert!(matches!(discovery.find_entity(&other), Err(LinkError::Unsupported { .. })));
        assert!(matches!(
            discovery.find_entity(&lib.path("src/DSC9.ARW")),
            Err(LinkError::NotFound { .. })
        ));
        assert_eq!(raw_trees(&discovery.find_entity(&raw).unwrap().graph).len(), 1);
    }
}
