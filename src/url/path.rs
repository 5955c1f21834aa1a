use crate::url::domain::extract_authority;
use crate::url::CanonicalUrl;
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use thiserror::Error;
use url::Url;

/// Errors raised while mapping a URL to an archive path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathMappingError {
    #[error("Cannot parse {url}: {reason}")]
    Unparsable { url: String, reason: String },

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("Path of {0} escapes the archive root")]
    EscapesRoot(String),
}

/// Maps a canonical URL to a path relative to the archive root
///
/// # Mapping Rules
///
/// - No path, or just `/` → `<host>/index.html`
/// - Last segment without a `.` (or naming the host, with or without its
///   port) is a directory →
///   `<host><path>/index.html`, reusing a trailing `/` when present
/// - Anything else → `<host><path>`
///
/// The port is not part of the mapped path. Percent-encoded characters are
/// decoded so the file names match what the site shows, unless they do not
/// form valid UTF-8, in which case the path is kept encoded.
///
/// # Examples
///
/// ```
/// use site_mirror::url::{map_to_path, CanonicalUrl};
///
/// let path = map_to_path(&CanonicalUrl::from("https://x.test/blog/")).unwrap();
/// assert_eq!(path, "x.test/blog/index.html");
/// ```
pub fn map_to_path(url: &CanonicalUrl) -> Result<String, PathMappingError> {
    let parsed = Url::parse(url.as_str()).map_err(|e| PathMappingError::Unparsable {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let host = parsed
        .host_str()
        .ok_or_else(|| PathMappingError::MissingHost(url.to_string()))?;

    // Escapes that do not decode to UTF-8 stay encoded, so distinct URLs
    // never share a file
    let raw = parsed.path();
    let path = percent_decode_str(raw)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(raw));
    if path.is_empty() || path == "/" {
        return Ok(format!("{}/index.html", host));
    }

    if path.split('/').any(|segment| segment == "..") {
        return Err(PathMappingError::EscapesRoot(url.to_string()));
    }

    let name = format!("{}{}", host, path);
    let file = path.rsplit('/').next().unwrap_or_default();

    let authority = extract_authority(&parsed);
    let names_site = file == host || authority.as_deref() == Some(file);

    if file.is_empty() || !file.contains('.') || names_site {
        if path.ends_with('/') {
            return Ok(format!("{}index.html", name));
        }
        return Ok(format!("{}/index.html", name));
    }

    Ok(name)
}
