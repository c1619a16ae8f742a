//! String and URL helpers shared by the resolver and the METS model.

use std::path::{Path, PathBuf};

/// One part of a name built by [`concat_padded`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePart {
    /// Zero-based index, rendered 1-based and zero-padded to four digits.
    Index(usize),
    /// Rendered verbatim.
    Text(String),
}

impl From<usize> for NamePart {
    fn from(value: usize) -> Self {
        NamePart::Index(value)
    }
}

impl From<&str> for NamePart {
    fn from(value: &str) -> Self {
        NamePart::Text(value.to_string())
    }
}

impl From<String> for NamePart {
    fn from(value: String) -> Self {
        NamePart::Text(value)
    }
}

/// Join `base` and `parts` with `_`, padding indices.
///
/// `concat_padded("x", [0, "1", 2])` yields `x_0001_1_0003`.
pub fn concat_padded<I, P>(base: &str, parts: I) -> String
where
    I: IntoIterator<Item = P>,
    P: Into<NamePart>,
{
    let mut ret = base.to_string();
    for part in parts {
        ret.push('_');
        match part.into() {
            NamePart::Index(n) => ret.push_str(&format!("{:04}", n + 1)),
            NamePart::Text(s) => ret.push_str(&s),
        }
    }
    ret
}

/// Whether `url` points to the local filesystem: either a `file://` URL or a
/// plain path without any URL scheme.
pub fn is_local_filename(url: &str) -> bool {
    if url.starts_with("file://") {
        return true;
    }
    match url.split_once("://") {
        Some((scheme, _)) => scheme.is_empty(),
        None => true,
    }
}

/// Strip a `file://` prefix and make the remaining path absolute.
pub fn abspath(url: &str) -> PathBuf {
    let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Turn a URL or path into a string usable as a single filename: ASCII
/// alphanumerics and `-_.` are kept, everything else becomes `_`.
pub fn safe_filename(url: &str) -> String {
    url.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Last path segment of a URL, ignoring query and fragment.
pub fn url_basename(url: &str) -> &str {
    let without_query = remove_non_path_from_url(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
}

/// Drop query string and fragment from a URL.
pub fn remove_non_path_from_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// The `n`-th path segment of a URL, counting from the end when `n` is negative.
pub fn nth_url_segment(url: &str, n: isize) -> Option<&str> {
    let path = remove_non_path_from_url(url);
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let idx = if n < 0 {
        segments.len().checked_sub(n.unsigned_abs())?
    } else {
        n as usize
    };
    segments.get(idx).copied()
}
