//! Fingerprinted logical paths.
//!
//! A fingerprint is a full SHA-256 hex digest spliced into a file name just
//! before its last extension: `app-<64 hex>.js`. Fingerprinted paths name
//! immutable content, which lets them be cached forever by clients. Shorter
//! hex runs such as `jquery-1234567.js` are ordinary file names.

/// Length of a fingerprint: the hex form of a SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 64;

/// Splits a path into its directory prefix (including the trailing `/`) and
/// its file name.
fn split_file_name(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => path.split_at(i + 1),
        None => ("", path),
    }
}

/// Locates the fingerprint in a file name, returning `(stem, fingerprint,
/// extension)` where `extension` includes its leading dot (or is empty).
fn split_fingerprint(file_name: &str) -> Option<(&str, &str, &str)> {
    let (stem, ext) = match file_name.rfind('.') {
        Some(0) | None => (file_name, ""),
        Some(i) => file_name.split_at(i),
    };
    let dash = stem.rfind('-')?;
    let fingerprint = &stem[dash + 1..];
    let valid_len = fingerprint.len() == FINGERPRINT_LEN;
    let is_hex = fingerprint
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if dash == 0 || !valid_len || !is_hex {
        return None;
    }
    Some((&stem[..dash], fingerprint, ext))
}

/// Returns the fingerprint embedded in a path's file name, if any.
///
/// ```
/// use quire_common::path_fingerprint;
/// let hex = "0a".repeat(32);
/// assert_eq!(path_fingerprint(&format!("js/app-{hex}.js")), Some(hex.as_str()));
/// assert_eq!(path_fingerprint("js/app-0a1b2c3d.js"), None);
/// assert_eq!(path_fingerprint("js/app.js"), None);
/// ```
pub fn path_fingerprint(path: &str) -> Option<&str> {
    let (_, file_name) = split_file_name(path);
    split_fingerprint(file_name).map(|(_, fingerprint, _)| fingerprint)
}

/// Removes the fingerprint from a path's file name.
///
/// Paths without a fingerprint are returned unchanged.
pub fn strip_fingerprint(path: &str) -> String {
    let (dir, file_name) = split_file_name(path);
    match split_fingerprint(file_name) {
        Some((stem, _, ext)) => format!("{dir}{stem}{ext}"),
        None => path.to_string(),
    }
}

/// Splices `fingerprint` into a path's file name before its last extension.
pub fn with_fingerprint(path: &str, fingerprint: &str) -> String {
    let (dir, file_name) = split_file_name(path);
    match file_name.rfind('.') {
        Some(i) if i > 0 => {
            let (stem, ext) = file_name.split_at(i);
            format!("{dir}{stem}-{fingerprint}{ext}")
        }
        _ => format!("{dir}{file_name}-{fingerprint}"),
    }
}
