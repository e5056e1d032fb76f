//! Path decomposition for RAW files, sidecars and rendered outputs
//!
//! Every file handled by the linker follows the layout
//! `<BaseDir>/<RelativeDir>/<ImageBase>[_<VariantSequence>][.<RawExt>].<Ext>`
//! and this module splits a path into those parts without touching the disk.

use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Two trailing digits preceded by an underscore, e.g. `_DSC1234_01`
static VARIANT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)_([0-9]{2})$").expect("variant suffix pattern is valid"));

/// A RAW extension embedded before the last one, e.g. `.ARW` in `x_01.ARW.xmp`
static DOUBLED_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+(\.[^.]+)\.[^.]+$").expect("doubled extension pattern is valid"));

/// A file path plus the base directory it is rooted at.
///
/// All derived parts are computed once at construction, so the descriptor
/// stays usable after the file has been moved or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePath {
    full_path: PathBuf,
    base_path: PathBuf,
    base_dir: PathBuf,
    relative_path: PathBuf,
    base_name: String,
    image_base: String,
    variant_sequence: Option<String>,
}

impl ImagePath {
    /// Describe `full_path` relative to `base_path`.
    ///
    /// If `base_path` names a file, its parent directory is used as the base.
    pub fn new(full_path: impl Into<PathBuf>, base_path: impl Into<PathBuf>) -> Self {
        let full_path = full_path.into();
        let base_path = base_path.into();

        let base_dir = if looks_like_directory(&base_path) {
            base_path.clone()
        } else {
            base_path.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        let relative_path = relative_to(&full_path, &base_dir);

        let file_name = file_name_of(&full_path);
        let base_name = strip_all_extensions(&file_name).to_string();
        let (image_base, variant_sequence) = match split_variant(&base_name) {
            Some((image_base, sequence)) => (image_base.to_string(), Some(sequence.to_string())),
            None => (base_name.clone(), None),
        };

        Self {
            full_path,
            base_path,
            base_dir,
            relative_path,
            base_name,
            image_base,
            variant_sequence,
        }
    }

    /// Same base path, different location (used after a move)
    pub fn relocated(&self, full_path: impl Into<PathBuf>) -> Self {
        Self::new(full_path, self.base_path.clone())
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Directory the file is considered relative to
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory that actually contains the file
    pub fn full_dir(&self) -> &Path {
        self.full_path.parent().unwrap_or(Path::new(""))
    }

    /// `/mnt/src/some/dir/x.ARW` based at `/mnt/src` => `some/dir/x.ARW`
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// `/mnt/src/some/dir/x.ARW` based at `/mnt/src` => `some/dir`
    ///
    /// Empty when the file sits directly in the base directory.
    pub fn relative_dir(&self) -> &Path {
        self.relative_path.parent().unwrap_or(Path::new(""))
    }

    /// False when the file sits outside its base directory
    pub fn is_within_base(&self) -> bool {
        !self
            .relative_path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    }

    pub fn file_name(&self) -> String {
        file_name_of(&self.full_path)
    }

    /// `some/dir/DSC1234_01.ARW.xmp` => `DSC1234_01`
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// `some/dir/DSC1234_01.ARW.xmp` => `DSC1234`
    pub fn image_base(&self) -> &str {
        &self.image_base
    }

    /// `some/dir/DSC1234_01.ARW.xmp` => `Some("01")`
    pub fn variant_sequence(&self) -> Option<&str> {
        self.variant_sequence.as_deref()
    }

    pub fn is_virtual_copy(&self) -> bool {
        self.variant_sequence.is_some()
    }

    /// Last extension including the dot, e.g. `.ARW`
    pub fn extension(&self) -> Option<String> {
        self.full_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
    }

    pub fn exists(&self) -> bool {
        self.full_path.exists()
    }

    /// Where the rendered output for this file belongs:
    /// `<outputs_dir>/<relative_dir>/<base_name><output_ext>`
    pub fn output_path(&self, outputs_dir: &Path, output_ext: &str) -> PathBuf {
        outputs_dir
            .join(self.relative_dir())
            .join(format!("{}{}", self.base_name, output_ext))
    }
}

/// Decide whether a path names a directory from its final segment alone.
///
/// A segment with a dot that has characters on both sides is a file;
/// anything else is a directory. No filesystem access is involved, so the
/// answer is the same whether or not the path still exists.
pub fn looks_like_directory(path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return true;
    };
    let name = name.to_string_lossy();
    let is_file = name
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < name.len());
    !is_file
}

/// Split `name_01` into `("name", "01")`
pub fn split_variant(base_name: &str) -> Option<(&str, &str)> {
    let captures = VARIANT_SUFFIX.captures(base_name)?;
    let image_base = captures.get(1)?.as_str();
    let sequence = captures.get(2)?.as_str();
    Some((image_base, sequence))
}

/// `x_01.ARW.xmp` => `Some(".ARW")`, `x_01.xmp` => `None`
pub fn doubled_extension(file_name: &str) -> Option<&str> {
    DOUBLED_EXTENSION
        .captures(file_name)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Strip every trailing dot-segment: `photo.ARW.xmp` => `photo`
pub fn strip_all_extensions(file_name: &str) -> &str {
    let mut name = file_name;
    while let Some(i) = name.rfind('.') {
        if i == 0 {
            break;
        }
        name = &name[..i];
    }
    name
}

/// Remove `suffix` from the end of `name`, ignoring ASCII case.
pub fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = name.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Relative path of `path` under `base`, falling back to `..` segments when
/// `path` is not under it. Never absolute.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix(base) {
        return stripped.to_path_buf();
    }

    // One side absolute, the other relative: compare both from the current directory
    if path.is_absolute() != base.is_absolute() {
        if let (Ok(path), Ok(base)) = (std::path::absolute(path), std::path::absolute(base)) {
            return lexical_relative(&path, &base);
        }
    }
    lexical_relative(path, base)
}

fn lexical_relative(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let base_parts: Vec<Component> = base
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let shared = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for part in &base_parts[shared..] {
        if matches!(part, Component::Normal(_)) {
            relative.push("..");
        }
    }
    for part in &path_parts[shared..] {
        if matches!(part, Component::Normal(_) | Component::ParentDir) {
            relative.push(part.as_os_str());
        }
    }
    relative
}
