//! Output filename construction.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of a sanitized title, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Backend placeholder for the final container extension.
pub const EXT_FIELD: &str = "%(ext)s";

/// Backend placeholder for the per-item title inside a collection.
pub const TITLE_FIELD: &str = "%(title)s";

/// Backend placeholder for the per-item stream height inside a collection.
pub const HEIGHT_FIELD: &str = "%(height)s";

static RESERVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"));

/// Makes a media title safe to use as a filename.
///
/// Strips `< > : " / \ | ? *`, trims surrounding whitespace and truncates to
/// [`MAX_TITLE_CHARS`] characters.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let cleaned = RESERVED_RE.replace_all(title, "");
    cleaned.trim().chars().take(MAX_TITLE_CHARS).collect()
}

/// Builds `"<title> (<label>).<ext>"` from an already sanitized title.
#[must_use]
pub fn labeled_name(title: &str, label: &str, ext: &str) -> String {
    format!("{title} ({label}).{ext}")
}

/// Builds `"<title>.<ext>"` from an already sanitized title.
#[must_use]
pub fn plain_name(title: &str, ext: &str) -> String {
    format!("{title}.{ext}")
}
