//! Pairwise linking of discovered candidates
//!
//! Every raw is checked against every sidecar and output, every sidecar
//! against every output, and every output against every raw. Candidate
//! slices are expected in path order; when more than one candidate claims a
//! single-valued link, a RAW named exactly like the file wins over one matched
//! through a `_NN` suffix; otherwise the first one wins. The rest are
//! reported.

use std::path::PathBuf;

use super::path::ImagePath;
use crate::error::Result;
use crate::state::data::{OutputId, RawId, SidecarId};
use crate::state::graph::LinkGraph;

/// Which single-valued link was contested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// A sidecar matched more than one RAW
    SidecarRaw,
    /// An output matched more than one RAW
    OutputRaw,
    /// A sidecar matched more than one output
    SidecarOutput,
    /// An output matched more than one sidecar
    OutputSidecar,
}

/// A convention match that was not applied because the link was taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub relation: Relation,
    /// File whose link was contested
    pub subject: PathBuf,
    /// Candidate that holds the link
    pub kept: PathBuf,
    /// Candidate that also matched
    pub rejected: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub ambiguities: Vec<Ambiguity>,
}

impl LinkReport {
    fn record(&mut self, relation: Relation, subject: PathBuf, kept: PathBuf, rejected: PathBuf) {
        tracing::warn!(
            "⚠️  {} matches both {} and {}, keeping {}",
            subject.display(),
            kept.display(),
            rejected.display(),
            kept.display()
        );
        self.ambiguities.push(Ambiguity {
            relation,
            subject,
            kept,
            rejected,
        });
    }
}

/// Run the convention matcher across all candidates and link the matches.
pub fn link(
    graph: &mut LinkGraph,
    raws: &[RawId],
    sidecars: &[SidecarId],
    outputs: &[OutputId],
) -> Result<LinkReport> {
    let mut report = LinkReport::default();
    let convention = graph.convention().clone();

    for &raw_id in raws {
        for &sidecar_id in sidecars {
            let (Some(raw), Some(sidecar)) = (graph.raw(raw_id), graph.sidecar(sidecar_id)) else {
                continue;
            };
            if !convention.sidecar_matches_raw(&sidecar.path, &raw.path) {
                continue;
            }
            match sidecar.raw() {
                None => graph.attach_sidecar(raw_id, sidecar_id)?,
                Some(owner) if owner == raw_id => {}
                Some(owner) => {
                    let subject = sidecar.path().full_path().to_path_buf();
                    let challenger = raw.path().full_path().to_path_buf();
                    let holder = path_of_raw(graph, owner);
                    if outranks(graph, raw_id, owner, sidecar.path()) {
                        graph.attach_sidecar(raw_id, sidecar_id)?;
                        report.record(Relation::SidecarRaw, subject, challenger, holder);
                    } else {
                        report.record(Relation::SidecarRaw, subject, holder, challenger);
                    }
                }
            }
        }

        for &output_id in outputs {
            let (Some(raw), Some(output)) = (graph.raw(raw_id), graph.output(output_id)) else {
                continue;
            };
            if !convention.output_matches_raw(&output.path, &raw.path) {
                continue;
            }
            match output.raw() {
                None => graph.attach_output(raw_id, output_id)?,
                Some(owner) if owner == raw_id => {}
                Some(owner) => {
                    let subject = output.path().full_path().to_path_buf();
                    let challenger = raw.path().full_path().to_path_buf();
                    let holder = path_of_raw(graph, owner);
                    if outranks(graph, raw_id, owner, output.path()) {
                        graph.attach_output(raw_id, output_id)?;
                        report.record(Relation::OutputRaw, subject, challenger, holder);
                    } else {
                        report.record(Relation::OutputRaw, subject, holder, challenger);
                    }
                }
            }
        }
    }

    for &sidecar_id in sidecars {
        for &output_id in outputs {
            let (Some(sidecar), Some(output)) = (graph.sidecar(sidecar_id), graph.output(output_id)) else {
                continue;
            };
            if !convention.output_matches_sidecar(&output.path, &sidecar.path) {
                continue;
            }
            if sidecar.output() == Some(output_id) {
                continue;
            }

            let sidecar_path = sidecar.path.full_path().to_path_buf();
            let output_path = output.path.full_path().to_path_buf();
            if let Some(taken) = sidecar.output().and_then(|id| graph.output(id)) {
                let kept = taken.path.full_path().to_path_buf();
                report.record(Relation::SidecarOutput, sidecar_path, kept, output_path);
                continue;
            }
            if let Some(taken) = output.sidecar().and_then(|id| graph.sidecar(id)) {
                let kept = taken.path.full_path().to_path_buf();
                report.record(Relation::OutputSidecar, output_path, kept, sidecar_path);
                continue;
            }
            match (sidecar.raw(), output.raw()) {
                (Some(a), Some(b)) if a != b => {
                    let kept = path_of_raw(graph, b);
                    report.record(Relation::OutputRaw, output_path, kept, path_of_raw(graph, a));
                }
                _ => graph.link_sidecar_output(sidecar_id, output_id)?,
            }
        }
    }

    // Outputs with no sidecar in between still need their RAW
    for &output_id in outputs {
        for &raw_id in raws {
            let (Some(raw), Some(output)) = (graph.raw(raw_id), graph.output(output_id)) else {
                continue;
            };
            if output.raw().is_none() && convention.output_matches_raw(&output.path, &raw.path) {
                graph.attach_output(raw_id, output_id)?;
            }
        }
    }

    debug_assert!(graph.is_consistent());
    tracing::debug!(
        "Linked {} raws, {} sidecars, {} outputs ({} ambiguous)",
        raws.len(),
        sidecars.len(),
        outputs.len(),
        report.ambiguities.len()
    );
    Ok(report)
}

/// A RAW named exactly like the file beats one it only matches through a
/// `_NN` suffix.
fn outranks(graph: &LinkGraph, challenger: RawId, holder: RawId, file: &ImagePath) -> bool {
    let exact = |id| graph.raw(id).is_some_and(|raw| raw.path().base_name() == file.base_name());
    exact(challenger) && !exact(holder)
}

fn path_of_raw(graph: &LinkGraph, id: RawId) -> PathBuf {
    graph
        .raw(id)
        .map(|raw| raw.path().full_path().to_path_buf())
        .unwrap_or_default()
}
