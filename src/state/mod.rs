//! Entity state
//!
//! - Raw, Sidecar and Output records and their identifiers (data.rs)
//! - The link graph that owns them and keeps links consistent (graph.rs)
//! - Deleting and staging entities on disk (lifecycle.rs)

pub mod data;
pub mod graph;
pub mod lifecycle;
