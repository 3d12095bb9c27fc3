//! Built-in extension to content type table.

/// Content type used when an extension is unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Returns the built-in content type for a dotted extension.
pub fn builtin_mime_type(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        ".js" => "application/javascript",
        ".css" => "text/css",
        ".html" | ".htm" => "text/html",
        ".json" => "application/json",
        ".txt" => "text/plain",
        ".svg" => "image/svg+xml",
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".ico" => "image/vnd.microsoft.icon",
        ".woff" => "font/woff",
        ".woff2" => "font/woff2",
        _ => return None,
    };
    Some(mime)
}
