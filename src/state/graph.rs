//! The link graph
//!
//! An arena of Raw, Sidecar and Output records. Every attach operation keeps
//! the three kinds of links consistent in both directions and closes the
//! triangle eagerly: once two of {raw, sidecar, output} are connected to the
//! third, all three are linked.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::data::{EntityId, Output, OutputId, Raw, RawId, Sidecar, SidecarId};
use crate::error::{LinkError, Result};
use crate::raw::convention::Convention;
use crate::raw::path::{doubled_extension, ImagePath};

#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    convention: Convention,
    raws: Vec<Option<Raw>>,
    sidecars: Vec<Option<Sidecar>>,
    outputs: Vec<Option<Output>>,
    raw_index: HashMap<PathBuf, RawId>,
    sidecar_index: HashMap<PathBuf, SidecarId>,
    output_index: HashMap<PathBuf, OutputId>,
}

impl LinkGraph {
    pub fn new(convention: Convention) -> Self {
        Self {
            convention,
            ..Self::default()
        }
    }

    pub fn convention(&self) -> &Convention {
        &self.convention
    }

    // ========== Records ==========

    /// Add a RAW record, or return the existing one for the same path
    pub fn add_raw(&mut self, path: ImagePath) -> RawId {
        if let Some(&id) = self.raw_index.get(path.full_path()) {
            return id;
        }
        let id = RawId(self.raws.len());
        self.raw_index.insert(path.full_path().to_path_buf(), id);
        self.raws.push(Some(Raw::new(path)));
        id
    }

    /// Add a sidecar record, or return the existing one for the same path
    pub fn add_sidecar(&mut self, path: ImagePath) -> SidecarId {
        if let Some(&id) = self.sidecar_index.get(path.full_path()) {
            return id;
        }
        let id = SidecarId(self.sidecars.len());
        self.sidecar_index.insert(path.full_path().to_path_buf(), id);
        self.sidecars.push(Some(Sidecar::new(path)));
        id
    }

    /// Add an output record, or return the existing one for the same path
    pub fn add_output(&mut self, path: ImagePath) -> OutputId {
        if let Some(&id) = self.output_index.get(path.full_path()) {
            return id;
        }
        let id = OutputId(self.outputs.len());
        self.output_index.insert(path.full_path().to_path_buf(), id);
        self.outputs.push(Some(Output::new(path)));
        id
    }

    pub fn raw(&self, id: RawId) -> Option<&Raw> {
        self.raws.get(id.0).and_then(Option::as_ref)
    }

    pub fn sidecar(&self, id: SidecarId) -> Option<&Sidecar> {
        self.sidecars.get(id.0).and_then(Option::as_ref)
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(id.0).and_then(Option::as_ref)
    }

    pub fn find_raw(&self, path: &Path) -> Option<RawId> {
        self.raw_index.get(path).copied()
    }

    pub fn find_sidecar(&self, path: &Path) -> Option<SidecarId> {
        self.sidecar_index.get(path).copied()
    }

    pub fn find_output(&self, path: &Path) -> Option<OutputId> {
        self.output_index.get(path).copied()
    }

    /// Live RAW records in insertion order
    pub fn raws(&self) -> impl Iterator<Item = (RawId, &Raw)> {
        self.raws
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| raw.as_ref().map(|raw| (RawId(i), raw)))
    }

    /// Live sidecar records in insertion order
    pub fn sidecars(&self) -> impl Iterator<Item = (SidecarId, &Sidecar)> {
        self.sidecars
            .iter()
            .enumerate()
            .filter_map(|(i, sidecar)| sidecar.as_ref().map(|sidecar| (SidecarId(i), sidecar)))
    }

    /// Live output records in insertion order
    pub fn outputs(&self) -> impl Iterator<Item = (OutputId, &Output)> {
        self.outputs
            .iter()
            .enumerate()
            .filter_map(|(i, output)| output.as_ref().map(|output| (OutputId(i), output)))
    }

    /// Sidecars with no RAW
    pub fn unlinked_sidecars(&self) -> impl Iterator<Item = (SidecarId, &Sidecar)> {
        self.sidecars().filter(|(_, sidecar)| sidecar.raw.is_none())
    }

    /// Outputs with no RAW, candidates for cleanup
    pub fn orphaned_outputs(&self) -> impl Iterator<Item = (OutputId, &Output)> {
        self.outputs().filter(|(_, output)| output.raw.is_none())
    }

    pub fn path_of(&self, entity: EntityId) -> Option<&ImagePath> {
        match entity {
            EntityId::Raw(id) => self.raw(id).map(Raw::path),
            EntityId::Sidecar(id) => self.sidecar(id).map(Sidecar::path),
            EntityId::Output(id) => self.output(id).map(Output::path),
        }
    }

    /// RAW extension of a sidecar: from its linked RAW if any, otherwise from
    /// a doubled extension in its own name.
    pub fn sidecar_raw_extension(&self, id: SidecarId) -> Option<String> {
        let sidecar = self.sidecar(id)?;
        if let Some(raw) = sidecar.raw.and_then(|raw| self.raw(raw)) {
            return raw.extension();
        }
        doubled_extension(&sidecar.path.file_name()).map(str::to_string)
    }

    // ========== Linking ==========

    /// Attach a sidecar to a RAW.
    ///
    /// The sidecar leaves any previous RAW. Its output, if any, follows it;
    /// otherwise a matching unclaimed output of the RAW is cross-linked.
    pub fn attach_sidecar(&mut self, raw_id: RawId, sidecar_id: SidecarId) -> Result<()> {
        let already = self.raw_ref(raw_id)?.sidecars.contains(&sidecar_id);
        let sidecar = self.sidecar_ref(sidecar_id)?;
        let (previous, output) = (sidecar.raw, sidecar.output);
        if already && previous == Some(raw_id) {
            return Ok(());
        }

        if let Some(previous) = previous.filter(|&p| p != raw_id) {
            if let Ok(old) = self.raw_mut(previous) {
                old.sidecars.remove(&sidecar_id);
            }
        }
        self.raw_mut(raw_id)?.sidecars.insert(sidecar_id);
        self.sidecar_mut(sidecar_id)?.raw = Some(raw_id);

        match output {
            Some(output_id) => self.attach_output(raw_id, output_id),
            None => self.claim_output_for_sidecar(raw_id, sidecar_id),
        }
    }

    /// Attach an output to a RAW.
    ///
    /// The output leaves any previous RAW. Its sidecar, if any, follows it;
    /// otherwise a matching unclaimed sidecar of the RAW is cross-linked.
    pub fn attach_output(&mut self, raw_id: RawId, output_id: OutputId) -> Result<()> {
        let already = self.raw_ref(raw_id)?.outputs.contains(&output_id);
        let output = self.output_ref(output_id)?;
        let (previous, sidecar) = (output.raw, output.sidecar);
        if already && previous == Some(raw_id) {
            return Ok(());
        }

        if let Some(previous) = previous.filter(|&p| p != raw_id) {
            if let Ok(old) = self.raw_mut(previous) {
                old.outputs.remove(&output_id);
            }
        }
        self.raw_mut(raw_id)?.outputs.insert(output_id);
        self.output_mut(output_id)?.raw = Some(raw_id);

        match sidecar {
            Some(sidecar_id) => self.attach_sidecar(raw_id, sidecar_id),
            None => self.claim_sidecar_for_output(raw_id, output_id),
        }
    }

    /// Link a sidecar and an output to each other.
    ///
    /// Both give up any previous partner. If either side already has a RAW
    /// the other joins it, the sidecar's RAW taking precedence.
    pub fn link_sidecar_output(&mut self, sidecar_id: SidecarId, output_id: OutputId) -> Result<()> {
        let sidecar = self.sidecar_ref(sidecar_id)?;
        let (sidecar_raw, previous_output) = (sidecar.raw, sidecar.output);
        let output = self.output_ref(output_id)?;
        let (output_raw, previous_sidecar) = (output.raw, output.sidecar);
        if previous_output == Some(output_id) && previous_sidecar == Some(sidecar_id) {
            return Ok(());
        }

        if let Some(previous) = previous_output.filter(|&o| o != output_id) {
            if let Ok(old) = self.output_mut(previous) {
                old.sidecar = None;
            }
        }
        if let Some(previous) = previous_sidecar.filter(|&s| s != sidecar_id) {
            if let Ok(old) = self.sidecar_mut(previous) {
                old.output = None;
            }
        }
        self.sidecar_mut(sidecar_id)?.output = Some(output_id);
        self.output_mut(output_id)?.sidecar = Some(sidecar_id);

        match (sidecar_raw, output_raw) {
            (Some(raw_id), _) => self.attach_output(raw_id, output_id),
            (None, Some(raw_id)) => self.attach_sidecar(raw_id, sidecar_id),
            (None, None) => Ok(()),
        }
    }

    /// First (by path) output of the RAW that matches the sidecar and has no
    /// sidecar of its own
    fn claim_output_for_sidecar(&mut self, raw_id: RawId, sidecar_id: SidecarId) -> Result<()> {
        let sidecar_path = &self.sidecar_ref(sidecar_id)?.path;
        let chosen = self
            .raw_ref(raw_id)?
            .outputs
            .iter()
            .filter_map(|&id| self.output(id).map(|output| (id, output)))
            .filter(|(_, output)| {
                output.sidecar.is_none()
                    && self.convention.output_matches_sidecar(&output.path, sidecar_path)
            })
            .min_by(|a, b| a.1.path.full_path().cmp(b.1.path.full_path()))
            .map(|(id, _)| id);

        match chosen {
            Some(output_id) => self.link_sidecar_output(sidecar_id, output_id),
            None => Ok(()),
        }
    }

    /// First (by path) sidecar of the RAW that the output matches and that
    /// has no output of its own
    fn claim_sidecar_for_output(&mut self, raw_id: RawId, output_id: OutputId) -> Result<()> {
        let output_path = &self.output_ref(output_id)?.path;
        let chosen = self
            .raw_ref(raw_id)?
            .sidecars
            .iter()
            .filter_map(|&id| self.sidecar(id).map(|sidecar| (id, sidecar)))
            .filter(|(_, sidecar)| {
                sidecar.output.is_none()
                    && self.convention.output_matches_sidecar(output_path, &sidecar.path)
            })
            .min_by(|a, b| a.1.path.full_path().cmp(b.1.path.full_path()))
            .map(|(id, _)| id);

        match chosen {
            Some(sidecar_id) => self.link_sidecar_output(sidecar_id, output_id),
            None => Ok(()),
        }
    }

    // ========== Removal ==========

    /// Drop a RAW from the graph, clearing every back-reference to it
    pub fn remove_raw(&mut self, id: RawId) -> Result<Raw> {
        let raw = self
            .raws
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(LinkError::UnknownEntity)?;
        self.raw_index.remove(raw.path.full_path());
        for sidecar_id in &raw.sidecars {
            if let Ok(sidecar) = self.sidecar_mut(*sidecar_id) {
                sidecar.raw = None;
            }
        }
        for output_id in &raw.outputs {
            if let Ok(output) = self.output_mut(*output_id) {
                output.raw = None;
            }
        }
        Ok(raw)
    }

    /// Drop a sidecar from the graph, clearing every reference to it
    pub fn remove_sidecar(&mut self, id: SidecarId) -> Result<Sidecar> {
        let sidecar = self
            .sidecars
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(LinkError::UnknownEntity)?;
        self.sidecar_index.remove(sidecar.path.full_path());
        if let Some(output) = sidecar.output.and_then(|o| self.output_mut(o).ok()) {
            output.sidecar = None;
        }
        if let Some(raw) = sidecar.raw.and_then(|r| self.raw_mut(r).ok()) {
            raw.sidecars.remove(&id);
        }
        Ok(sidecar)
    }

    /// Drop an output from the graph, clearing every reference to it
    pub fn remove_output(&mut self, id: OutputId) -> Result<Output> {
        let output = self
            .outputs
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(LinkError::UnknownEntity)?;
        self.output_index.remove(output.path.full_path());
        if let Some(sidecar) = output.sidecar.and_then(|s| self.sidecar_mut(s).ok()) {
            sidecar.output = None;
        }
        if let Some(raw) = output.raw.and_then(|r| self.raw_mut(r).ok()) {
            raw.outputs.remove(&id);
        }
        Ok(output)
    }

    pub fn remove(&mut self, entity: EntityId) -> Result<()> {
        match entity {
            EntityId::Raw(id) => self.remove_raw(id).map(drop),
            EntityId::Sidecar(id) => self.remove_sidecar(id).map(drop),
            EntityId::Output(id) => self.remove_output(id).map(drop),
        }
    }

    /// Point an entity at a new location, keeping all of its links
    pub fn relocate(&mut self, entity: EntityId, path: ImagePath) -> Result<()> {
        let new_key = path.full_path().to_path_buf();
        match entity {
            EntityId::Raw(id) => {
                let raw = self.raw_mut(id)?;
                let old_key = std::mem::replace(&mut raw.path, path).full_path().to_path_buf();
                self.raw_index.remove(&old_key);
                self.raw_index.insert(new_key, id);
            }
            EntityId::Sidecar(id) => {
                let sidecar = self.sidecar_mut(id)?;
                let old_key = std::mem::replace(&mut sidecar.path, path).full_path().to_path_buf();
                self.sidecar_index.remove(&old_key);
                self.sidecar_index.insert(new_key, id);
            }
            EntityId::Output(id) => {
                let output = self.output_mut(id)?;
                let old_key = std::mem::replace(&mut output.path, path).full_path().to_path_buf();
                self.output_index.remove(&old_key);
                self.output_index.insert(new_key, id);
            }
        }
        Ok(())
    }

    // ========== Consistency ==========

    /// Check that every link is mirrored on the other side and that no link
    /// points at a removed record.
    pub fn is_consistent(&self) -> bool {
        let raws_ok = self.raws().all(|(raw_id, raw)| {
            raw.sidecars()
                .all(|s| self.sidecar(s).is_some_and(|sidecar| sidecar.raw == Some(raw_id)))
                && raw
                    .outputs()
                    .all(|o| self.output(o).is_some_and(|output| output.raw == Some(raw_id)))
        });
        let sidecars_ok = self.sidecars().all(|(sidecar_id, sidecar)| {
            sidecar
                .raw
                .map_or(true, |r| self.raw(r).is_some_and(|raw| raw.sidecars.contains(&sidecar_id)))
                && sidecar
                    .output
                    .map_or(true, |o| self.output(o).is_some_and(|output| output.sidecar == Some(sidecar_id)))
                // a cross-linked pair always shares its RAW
                && sidecar.output.and_then(|o| self.output(o)).map_or(true, |output| {
                    sidecar.raw.is_none() || output.raw == sidecar.raw
                })
        });
        let outputs_ok = self.outputs().all(|(output_id, output)| {
            output
                .raw
                .map_or(true, |r| self.raw(r).is_some_and(|raw| raw.outputs.contains(&output_id)))
                && output
                    .sidecar
                    .map_or(true, |s| self.sidecar(s).is_some_and(|sidecar| sidecar.output == Some(output_id)))
        });
        raws_ok && sidecars_ok && outputs_ok
    }

    /// Printable tree of a RAW and everything linked to it
    pub fn raw_tree(&self, id: RawId) -> RawTree<'_> {
        RawTree { graph: self, id }
    }

    // ========== Slot access ==========

    fn raw_ref(&self, id: RawId) -> Result<&Raw> {
        self.raw(id).ok_or(LinkError::UnknownEntity)
    }

    fn sidecar_ref(&self, id: SidecarId) -> Result<&Sidecar> {
        self.sidecar(id).ok_or(LinkError::UnknownEntity)
    }

    fn output_ref(&self, id: OutputId) -> Result<&Output> {
        self.output(id).ok_or(LinkError::UnknownEntity)
    }

    fn raw_mut(&mut self, id: RawId) -> Result<&mut Raw> {
        self.raws
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(LinkError::UnknownEntity)
    }

    fn sidecar_mut(&mut self, id: SidecarId) -> Result<&mut Sidecar> {
        self.sidecars
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(LinkError::UnknownEntity)
    }

    fn output_mut(&mut self, id: OutputId) -> Result<&mut Output> {
        self.outputs
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(LinkError::UnknownEntity)
    }
}

/// A RAW with its sidecars (`=> output` when cross-linked) and outputs
/// (`=> sidecar` when cross-linked), sorted by path
pub struct RawTree<'a> {
    graph: &'a LinkGraph,
    id: RawId,
}

impl fmt::Display for RawTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(raw) = self.graph.raw(self.id) else {
            return write!(f, "<removed>");
        };
        write!(f, "{}", raw.path.full_path().display())?;

        let mut sidecars: Vec<&Sidecar> = raw.sidecars().filter_map(|id| self.graph.sidecar(id)).collect();
        sidecars.sort_by(|a, b| a.path.full_path().cmp(b.path.full_path()));
        for sidecar in sidecars {
            write!(f, "\n  {}", sidecar.path.full_path().display())?;
            if let Some(output) = sidecar.output.and_then(|id| self.graph.output(id)) {
                write!(f, " => {}", output.path.full_path().display())?;
            }
        }

        let mut outputs: Vec<&Output> = raw.outputs().filter_map(|id| self.graph.output(id)).collect();
        outputs.sort_by(|a, b| a.path.full_path().cmp(b.path.full_path()));
        for output in outputs {
            write!(f, "\n  {}", output.path.full_path().display())?;
            if let Some(sidecar) = output.sidecar.and_then(|id| self.graph.sidecar(id)) {
                write!(f, " => {}", sidecar.path.full_path().display())?;
            }
        }
        Ok(())
    }
}
