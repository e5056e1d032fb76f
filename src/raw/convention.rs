//! Filename convention matching
//!
//! Relationships are inferred purely from paths. A sidecar or output belongs
//! to a RAW file when its name is one of
//! `base<ext>`, `base<raw-ext><ext>`, `base_NN<ext>`, `base_NN<raw-ext><ext>`
//! where `base` is the RAW's base name (exact case) and extensions compare
//! case-insensitively. Directories must match exactly.

use std::path::{Path, PathBuf};

use super::path::{split_variant, strip_suffix_ignore_case, ImagePath};
use crate::config::Config;

/// The extensions that define the naming convention for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convention {
    sidecar_extension: String,
    output_extension: String,
}

impl Default for Convention {
    fn default() -> Self {
        Self::new(".xmp", ".jpg")
    }
}

impl From<&Config> for Convention {
    fn from(config: &Config) -> Self {
        Self::new(&config.sidecar_extension, &config.output_extension)
    }
}

impl Convention {
    pub fn new(sidecar_extension: &str, output_extension: &str) -> Self {
        Self {
            sidecar_extension: sidecar_extension.to_string(),
            output_extension: output_extension.to_string(),
        }
    }

    pub fn sidecar_extension(&self) -> &str {
        &self.sidecar_extension
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    /// Sidecar sits next to the RAW and is named after it
    pub fn sidecar_matches_raw(&self, sidecar: &ImagePath, raw: &ImagePath) -> bool {
        sidecar.full_dir() == raw.full_dir()
            && names_raw(&sidecar.file_name(), raw, &self.sidecar_extension)
    }

    /// Output is exactly `<sidecar relative dir>/<sidecar base name><output ext>`
    pub fn output_matches_sidecar(&self, output: &ImagePath, sidecar: &ImagePath) -> bool {
        output.is_within_base()
            && sidecar.is_within_base()
            && output.relative_dir() == sidecar.relative_dir()
            && strip_suffix_ignore_case(&output.file_name(), &self.output_extension)
                == Some(sidecar.base_name())
    }

    /// Output mirrors the RAW's relative directory and is named after it
    pub fn output_matches_raw(&self, output: &ImagePath, raw: &ImagePath) -> bool {
        output.is_within_base()
            && raw.is_within_base()
            && output.relative_dir() == raw.relative_dir()
            && names_raw(&output.file_name(), raw, &self.output_extension)
    }

    /// Where the output rendered from `path` belongs under `outputs_dir`
    pub fn output_path(&self, path: &ImagePath, outputs_dir: &Path) -> PathBuf {
        path.output_path(outputs_dir, &self.output_extension)
    }
}

/// Does `file_name` follow the four-way pattern for `raw` with the given
/// trailing extension?
fn names_raw(file_name: &str, raw: &ImagePath, trailing_ext: &str) -> bool {
    let Some(stem) = strip_suffix_ignore_case(file_name, trailing_ext) else {
        return false;
    };

    let mut candidates = vec![stem];
    if let Some(raw_ext) = raw.extension() {
        if let Some(without_raw_ext) = strip_suffix_ignore_case(stem, &raw_ext) {
            candidates.push(without_raw_ext);
        }
    }

    let base = raw.base_name();
    candidates.into_iter().any(|candidate| {
        candidate == base || split_variant(candidate).is_some_and(|(image_base, _)| image_base == base)
    })
}
