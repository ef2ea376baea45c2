//! Extension → MIME lookups shared by both facades.

use std::path::Path;

/// Content type used whenever an extension is unknown or a text body is sent
/// without one.
pub(crate) const TEXT_HTML: &str = "text/html";

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Resolves a bare extension (`"json"`, no leading dot) to its MIME type.
pub(crate) fn from_extension(ext: &str) -> Option<&'static str> {
    if ext.is_empty() || ext.starts_with('.') {
        return None;
    }
    mime_guess::from_ext(ext).first_raw()
}

/// Resolves the MIME type of a file from its final extension.
pub(crate) fn from_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_resolve() {
        assert_eq!(from_extension("json"), Some("application/json"));
        assert_eq!(from_extension("html"), Some("text/html"));
        assert_eq!(from_extension("txt"), Some("text/plain"));
    }

    #[test]
    fn dotted_or_empty_extensions_do_not_resolve() {
        assert_eq!(from_extension(".json"), None);
        assert_eq!(from_extension(""), None);
    }

    #[test]
    fn paths_use_final_extension() {
        assert_eq!(from_path(Path::new("site/index.html")), Some("text/html"));
        assert_eq!(from_path(Path::new("Makefile")), None);
    }
}
