//! Path-level logic
//!
//! - Decomposing a path into its convention parts (path.rs)
//! - Deciding whether two paths are related (convention.rs)
//! - Walking the sources and outputs directories (discovery.rs)
//! - Linking discovered candidates into the graph (linker.rs)

pub mod convention;
pub mod discovery;
pub mod linker;
pub mod path;
