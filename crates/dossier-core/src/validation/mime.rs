//! Content sniffing by magic number.

use crate::constants::DEFAULT_CONTENT_TYPE;

/// Detect the MIME type of a payload from its leading bytes.
///
/// Returns `application/octet-stream` when no known signature matches.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return "image/png";
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }

    // GIF87a / GIF89a
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif";
    }

    // WebP: RIFF ....WEBP
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    if data.starts_with(b"%PDF-") {
        return "application/pdf";
    }

    DEFAULT_CONTENT_TYPE
}

/// Preferred file extension for a sniffed MIME type.
pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}
