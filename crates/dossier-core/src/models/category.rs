use serde::{Deserialize, Serialize};

/// An allowed upload category and the owner association it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCategory {
    pub name: String,
    pub association: String,
}

impl FileCategory {
    pub fn new(name: impl Into<String>, association: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            association: association.into(),
        }
    }

    /// Built-in categories used when `FILE_CATEGORIES` is unset.
    pub fn defaults() -> Vec<FileCategory> {
        vec![
            FileCategory::new("foto", "photo"),
            FileCategory::new("documento", "id_document"),
            FileCategory::new("certificato_medico", "medical_certificate"),
            FileCategory::new("firma", "signature"),
            FileCategory::new("qrcode", "qr_code"),
        ]
    }

    /// Parse `name:association` pairs separated by commas.
    pub fn parse_list(raw: &str) -> Result<Vec<FileCategory>, anyhow::Error> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (name, association) = entry.split_once(':').ok_or_else(|| {
                    anyhow::anyhow!("Category '{}' must be written as name:association", entry)
                })?;
                let (name, association) = (name.trim(), association.trim());
                if name.is_empty() || association.is_empty() {
                    return Err(anyhow::anyhow!("Category '{}' has an empty part", entry));
                }
                Ok(FileCategory::new(name, association))
            })
            .collect()
    }
}
