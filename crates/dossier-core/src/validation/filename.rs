use std::sync::LazyLock;

use regex::Regex;

use crate::AppError;

const MAX_FILENAME_LENGTH: usize = 255;

static UNSAFE_CHARS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}._-]"));

/// Reduce a client-supplied name to a safe display name.
///
/// Directory components are stripped, unsafe characters become `_`, and names
/// that end up too short fall back to `file`.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    let unsafe_chars = UNSAFE_CHARS
        .as_ref()
        .map_err(|e| AppError::Internal(format!("Failed to compile filename regex: {}", e)))?;

    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let truncated: String = filename_only.chars().take(MAX_FILENAME_LENGTH).collect();
    let sanitized = unsafe_chars.replace_all(&truncated, "_").replace("..", "_");

    if sanitized.trim_matches(['.', '_']).len() < 3 {
        return Ok("file".to_string());
    }

    Ok(sanitized)
}
