//! Upload validation
//!
//! Everything here is synchronous and side-effect free: the checks run before
//! any encryption, backend call or metadata write. Owner existence needs the
//! database and is checked by the orchestrator.

pub mod filename;
pub mod mime;

pub use filename::sanitize_filename;
pub use mime::{extension_for, sniff_mime};

use crate::models::FileCategory;
use crate::AppError;

/// Outcome of a successful payload check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    pub mime_type: &'static str,
    pub association: String,
}

/// Validator for incoming uploads.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: usize,
    allowed_content_types: Vec<String>,
    categories: Vec<FileCategory>,
}

impl UploadValidator {
    pub fn new(
        max_file_size: usize,
        allowed_content_types: Vec<String>,
        categories: Vec<FileCategory>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_lowercase())
                .collect(),
            categories,
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_size(&self, size: usize) -> Result<(), AppError> {
        if size == 0 {
            return Err(AppError::InvalidInput("Empty file".to_string()));
        }

        if size > self.max_file_size {
            return Err(AppError::PayloadTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Resolve a category name to its owner association.
    pub fn resolve_category(&self, category: &str) -> Result<&FileCategory, AppError> {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .ok_or_else(|| AppError::InvalidCategory(category.to_string()))
    }

    /// Sniff the payload and check the result against the allow-list.
    pub fn validate_content_type(&self, data: &[u8]) -> Result<&'static str, AppError> {
        let sniffed = sniff_mime(data);
        if !self.allowed_content_types.iter().any(|ct| ct == sniffed) {
            return Err(AppError::UnsupportedContentType(sniffed.to_string()));
        }
        Ok(sniffed)
    }

    /// Run every payload check in pipeline order: size, category, content type.
    pub fn validate(&self, data: &[u8], category: &str) -> Result<ValidatedUpload, AppError> {
        self.validate_size(data.len())?;
        let association = self.resolve_category(category)?.association.clone();
        let mime_type = self.validate_content_type(data)?;

        Ok(ValidatedUpload {
            mime_type,
            association,
        })
    }
}

/// Reject non-positive identifiers before touching any store.
pub fn validate_file_id(id: i64) -> Result<(), AppError> {
    if id <= 0 {
        return Err(AppError::InvalidInput(format!(
            "File id must be positive, got {}",
            id
        )));
    }
    Ok(())
}
