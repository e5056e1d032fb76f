//! Delete and stage-for-deletion
//!
//! Both operations touch the filesystem first and only then update the
//! graph, so a failed remove or move leaves the graph exactly as it was.

use std::fs;
use std::io;
use std::path::PathBuf;

use super::data::EntityId;
use super::graph::LinkGraph;
use crate::error::{LinkError, Result};

/// Whether lifecycle operations actually run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Apply,
    /// Report the action without touching the disk or the graph
    Simulate,
}

/// What a lifecycle operation did (or would do)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Deleted { path: PathBuf },
    Staged { from: PathBuf, to: PathBuf },
}

impl LinkGraph {
    /// Remove the entity's file, then drop it from the graph.
    pub fn delete(&mut self, entity: impl Into<EntityId>, mode: Mode) -> Result<Action> {
        let entity = entity.into();
        let path = self
            .path_of(entity)
            .ok_or(LinkError::UnknownEntity)?
            .full_path()
            .to_path_buf();

        if mode == Mode::Simulate {
            tracing::info!("Delete {} (dry run)", path.display());
            return Ok(Action::Deleted { path });
        }

        fs::remove_file(&path).map_err(|e| LinkError::io(&path, e))?;
        self.remove(entity)?;
        tracing::info!("🗑️  Deleted {}", path.display());
        Ok(Action::Deleted { path })
    }

    /// Where staging would move the entity:
    /// `<base dir>/<staging dir>/<relative dir>/<file name>`
    pub fn staging_path(&self, entity: impl Into<EntityId>, staging_dir: &str) -> Result<PathBuf> {
        let path = self.path_of(entity.into()).ok_or(LinkError::UnknownEntity)?;
        Ok(path
            .base_dir()
            .join(staging_dir)
            .join(path.relative_dir())
            .join(path.file_name()))
    }

    /// Move the entity's file into the staging subtree and point the record
    /// at its new location. The entity stays in the graph with all its links.
    pub fn stage_for_deletion(
        &mut self,
        entity: impl Into<EntityId>,
        staging_dir: &str,
        mode: Mode,
    ) -> Result<Action> {
        let entity = entity.into();
        let target = self.staging_path(entity, staging_dir)?;
        let current = self.path_of(entity).ok_or(LinkError::UnknownEntity)?;
        let from = current.full_path().to_path_buf();

        if target.exists() {
            let taken = io::Error::new(io::ErrorKind::AlreadyExists, "staging target already exists");
            return Err(LinkError::io(&target, taken));
        }
        if mode == Mode::Simulate {
            tracing::info!("Move {} to {} (dry run)", from.display(), target.display());
            return Ok(Action::Staged { from, to: target });
        }

        let relocated = current.relocated(&target);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| LinkError::io(parent, e))?;
        }
        fs::rename(&from, &target).map_err(|e| LinkError::io(&from, e))?;
        self.relocate(entity, relocated)?;

        tracing::info!("📦 Staged {} at {}", from.display(), target.display());
        Ok(Action::Staged { from, to: target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::path::ImagePath;
    use std::path::Path;

    struct Tree {
        _dir: tempfile::TempDir,
        src: PathBuf,
        graph: LinkGraph,
    }

    fn tree() -> Tree {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("trip")).unwrap();
        fs::create_dir_all(dst.join("trip")).unwrap();
        fs::write(src.join("trip/DSC1.ARW"), b"raw").unwrap();
        fs::write(src.join("trip/DSC1.ARW.xmp"), b"xmp").unwrap();
        fs::write(dst.join("trip/DSC1.jpg"), b"jpg").unwrap();

        let mut graph = LinkGraph::default();
        let raw = graph.add_raw(ImagePath::new(src.join("trip/DSC1.ARW"), &src));
        let xmp = graph.add_sidecar(ImagePath::new(src.join("trip/DSC1.ARW.xmp"), &src));
        let jpg = graph.add_output(ImagePath::new(dst.join("trip/DSC1.jpg"), &dst));
        graph.attach_sidecar(raw, xmp).unwrap();
        graph.attach_output(raw, jpg).unwrap();

        Tree { _dir: dir, src, graph }
    }

    #[test]
    fn test_delete_removes_file_and_links() {
        let mut t = tree();
        let raw_path = t.src.join("trip/DSC1.ARW");
        let raw = t.graph.find_raw(&raw_path).unwrap();
        let xmp = t.graph.find_sidecar(&t.src.join("trip/DSC1.ARW.xmp")).unwrap();

        let action = t.graph.delete(raw, Mode::Apply).unwrap();
        assert_eq!(action, Action::Deleted { path: raw_path.clone() });
        assert!(!raw_path.exists());
        assert!(t.graph.raw(raw).is_none());
        assert_eq!(t.graph.sidecar(xmp).unwrap().raw(), None);
        assert!(t.graph.is_consistent());
    }

    #[test]
    fn test_delete_simulate_changes_nothing() {
        let mut t = tree();
        let xmp_path = t.src.join("trip/DSC1.ARW.xmp");
        let xmp = t.graph.find_sidecar(&xmp_path).unwrap();

        t.graph.delete(xmp, Mode::Simulate).unwrap();
        assert!(xmp_path.exists());
        assert!(t.graph.sidecar(xmp).unwrap().output().is_some());
    }

    #[test]
    fn test_failed_delete_leaves_graph_untouched() {
        let mut t = tree();
        let xmp_path = t.src.join("trip/DSC1.ARW.xmp");
        let xmp = t.graph.find_sidecar(&xmp_path).unwrap();
        fs::remove_file(&xmp_path).unwrap();

        let result = t.graph.delete(xmp, Mode::Apply);
        assert!(matches!(result, Err(LinkError::Io { .. })));
        let sidecar = t.graph.sidecar(xmp).unwrap();
        assert!(sidecar.raw().is_some());
        assert!(sidecar.output().is_some());
    }

    #[test]
    fn test_stage_mirrors_relative_dir() {
        let mut t = tree();
        let xmp_path = t.src.join("trip/DSC1.ARW.xmp");
        let xmp = t.graph.find_sidecar(&xmp_path).unwrap();
        let staged = t.src.join("delete/trip/DSC1.ARW.xmp");

        let action = t.graph.stage_for_deletion(xmp, "delete", Mode::Apply).unwrap();
        assert_eq!(
            action,
            Action::Staged {
                from: xmp_path.clone(),
                to: staged.clone()
            }
        );
        assert!(!xmp_path.exists());
        assert!(staged.exists());

        let sidecar = t.graph.sidecar(xmp).unwrap();
        assert_eq!(sidecar.path().full_path(), staged.as_path());
        assert!(sidecar.raw().is_some());
        assert_eq!(t.graph.find_sidecar(&staged), Some(xmp));
    }

    #[test]
    fn test_failed_stage_leaves_graph_untouched() {
        let mut t = tree();
        let xmp_path = t.src.join("trip/DSC1.ARW.xmp");
        let xmp = t.graph.find_sidecar(&xmp_path).unwrap();
        // a file where the staging directory should be
        fs::write(t.src.join("delete"), b"").unwrap();

        let result = t.graph.stage_for_deletion(xmp, "delete", Mode::Apply);
        assert!(matches!(result, Err(LinkError::Io { .. })));
        assert!(xmp_path.exists());
        assert_eq!(t.graph.path_of(xmp.into()).unwrap().full_path(), xmp_path.as_path());
        assert_eq!(t.graph.find_sidecar(&xmp_path), Some(xmp));
        assert!(t.graph.find_sidecar(&t.src.join("delete/trip/DSC1.ARW.xmp")).is_none());
        assert!(t.graph.sidecar(xmp).unwrap().raw().is_some());
    }

    #[test]
    fn test_stage_does_not_overwrite_previous_staging() {
        let mut t = tree();
        let xmp_path = t.src.join("trip/DSC1.ARW.xmp");
        let xmp = t.graph.find_sidecar(&xmp_path).unwrap();
        let staged = t.src.join("delete/trip/DSC1.ARW.xmp");
        fs::create_dir_all(staged.parent().unwrap()).unwrap();
        fs::write(&staged, b"earlier").unwrap();

        let result = t.graph.stage_for_deletion(xmp, "delete", Mode::Apply);
        match result {
            Err(LinkError::Io { path, source }) => {
                assert_eq!(path, staged);
                assert_eq!(source.kind(), io::ErrorKind::AlreadyExists);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(fs::read(&staged).unwrap(), b"earlier");
        assert!(xmp_path.exists());
        assert_eq!(t.graph.find_sidecar(&xmp_path), Some(xmp));
    }

    #[test]
    fn test_stage_simulate_changes_nothing() {
        let mut t = tree();
        let raw_path = t.src.join("trip/DSC1.ARW");
        let raw = t.graph.find_raw(&raw_path).unwrap();

        let action = t.graph.stage_for_deletion(raw, "delete", Mode::Simulate).unwrap();
        assert!(matches!(action, Action::Staged { .. }));
        assert!(raw_path.exists());
        assert_eq!(t.graph.raw(raw).unwrap().path().full_path(), raw_path.as_path());
    }

    #[test]
    fn test_staging_path_for_flat_file() {
        let mut graph = LinkGraph::default();
        let raw = graph.add_raw(ImagePath::new("/photos/DSC1.ARW", "/photos"));
        assert_eq!(
            graph.staging_path(raw, "delete").unwrap(),
            Path::new("/photos/delete/DSC1.ARW")
        );
    }
}
