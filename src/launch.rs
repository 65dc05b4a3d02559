use reqwest::Url;
use serde::{Serialize, Serializer};
use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

pub const DOCUMENT_EXTENSION: &str = "pdf";

const FILE_SCHEME_PREFIX: &str = "file://";

/// Absolute `file://` locator of a document to open.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentReference(Url);

impl DocumentReference {
    /// Builds a reference from a filesystem path, resolving relative paths
    /// against `base`.
    pub fn from_path(path: &Path, base: &Path) -> Option<Self> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };
        Url::from_file_path(normalize_path(&absolute)).ok().map(Self)
    }

    /// Accepts either a `file://` URI or a filesystem path.
    pub fn parse(input: &str, base: &Path) -> Option<Self> {
        if input.to_lowercase().starts_with(FILE_SCHEME_PREFIX) {
            let url = Url::parse(input).ok()?;
            (url.scheme() == "file").then_some(Self(url))
        } else {
            Self::from_path(Path::new(input), base)
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn to_file_path(&self) -> Option<PathBuf> {
        self.0.to_file_path().ok()
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Serialize for DocumentReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

/// Picks the document to open out of a raw process argument list.
///
/// `argv[0]` is the executable and is always skipped. Relative paths are
/// resolved against `cwd`, which must be the working directory of the
/// process that received `argv` (a forwarded launch carries its own).
pub fn resolve_launch_args<S: AsRef<str>>(argv: &[S], cwd: &Path) -> Option<DocumentReference> {
    let candidate = argv
        .iter()
        .skip(1)
        .filter_map(|raw| normalize_arg(raw.as_ref()))
        .find(|arg| looks_like_document(arg))?;

    DocumentReference::parse(candidate, cwd)
}

fn normalize_arg(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    // Windows shells sometimes hand over the quotes.
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);

    if unquoted.is_empty() || unquoted.starts_with("--") {
        None
    } else {
        Some(unquoted)
    }
}

fn looks_like_document(arg: &str) -> bool {
    let lower = arg.to_lowercase();
    let suffix = format!(".{DOCUMENT_EXTENSION}");
    lower.ends_with(&suffix) || (lower.starts_with(FILE_SCHEME_PREFIX) && lower.contains(&suffix))
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
