//! Entity records for the link graph
//!
//! A Raw owns the sets of its sidecars and outputs; sidecars and outputs
//! only hold the identifier of the record they point back to.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::raw::convention::Convention;
use crate::raw::path::ImagePath;

/// Index of a Raw record in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawId(pub(crate) usize);

/// Index of a Sidecar record in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SidecarId(pub(crate) usize);

/// Index of an Output record in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub(crate) usize);

/// Any entity in the graph, used by the lifecycle operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityId {
    Raw(RawId),
    Sidecar(SidecarId),
    Output(OutputId),
}

impl From<RawId> for EntityId {
    fn from(id: RawId) -> Self {
        EntityId::Raw(id)
    }
}

impl From<SidecarId> for EntityId {
    fn from(id: SidecarId) -> Self {
        EntityId::Sidecar(id)
    }
}

impl From<OutputId> for EntityId {
    fn from(id: OutputId) -> Self {
        EntityId::Output(id)
    }
}

/// A camera-original image file
#[derive(Debug, Clone, PartialEq)]
pub struct Raw {
    pub(crate) path: ImagePath,
    pub(crate) sidecars: BTreeSet<SidecarId>,
    pub(crate) outputs: BTreeSet<OutputId>,
}

impl Raw {
    pub(crate) fn new(path: ImagePath) -> Self {
        Self {
            path,
            sidecars: BTreeSet::new(),
            outputs: BTreeSet::new(),
        }
    }

    pub fn path(&self) -> &ImagePath {
        &self.path
    }

    /// Base directory the RAW was discovered under
    pub fn source_dir(&self) -> &Path {
        self.path.base_dir()
    }

    pub fn sidecars(&self) -> impl Iterator<Item = SidecarId> + '_ {
        self.sidecars.iter().copied()
    }

    pub fn outputs(&self) -> impl Iterator<Item = OutputId> + '_ {
        self.outputs.iter().copied()
    }

    /// No sidecar: the single output is rendered with default settings
    pub fn is_unedited(&self) -> bool {
        self.sidecars.is_empty()
    }

    /// Extension of the RAW file, e.g. `.ARW`
    pub fn extension(&self) -> Option<String> {
        self.path.extension()
    }

    pub fn output_path(&self, outputs_dir: &Path, convention: &Convention) -> PathBuf {
        convention.output_path(&self.path, outputs_dir)
    }
}

/// A sidecar metadata file describing edits for one RAW
#[derive(Debug, Clone, PartialEq)]
pub struct Sidecar {
    pub(crate) path: ImagePath,
    pub(crate) raw: Option<RawId>,
    pub(crate) output: Option<OutputId>,
}

impl Sidecar {
    pub(crate) fn new(path: ImagePath) -> Self {
        Self {
            path,
            raw: None,
            output: None,
        }
    }

    pub fn path(&self) -> &ImagePath {
        &self.path
    }

    pub fn raw(&self) -> Option<RawId> {
        self.raw
    }

    pub fn output(&self) -> Option<OutputId> {
        self.output
    }

    /// An alternate edit of the same RAW (`_NN` suffix)
    pub fn is_virtual_copy(&self) -> bool {
        self.path.is_virtual_copy()
    }

    pub fn output_path(&self, outputs_dir: &Path, convention: &Convention) -> PathBuf {
        convention.output_path(&self.path, outputs_dir)
    }
}

/// A rendered image produced from a RAW
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub(crate) path: ImagePath,
    pub(crate) raw: Option<RawId>,
    pub(crate) sidecar: Option<SidecarId>,
}

impl Output {
    pub(crate) fn new(path: ImagePath) -> Self {
        Self {
            path,
            raw: None,
            sidecar: None,
        }
    }

    pub fn path(&self) -> &ImagePath {
        &self.path
    }

    pub fn raw(&self) -> Option<RawId> {
        self.raw
    }

    pub fn sidecar(&self) -> Option<SidecarId> {
        self.sidecar
    }

    pub fn is_virtual_copy(&self) -> bool {
        self.path.is_virtual_copy()
    }
}
