//! Relationship resolution between RAW photos, their sidecar edit files and
//! the images rendered from them.
//!
//! Relationships are never stored anywhere; they are inferred from file
//! names and directory layout every time the library is asked.

pub mod config;
pub mod error;
pub mod raw;
pub mod state;

pub use config::Config;
pub use error::{LinkError, Result};
