use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Every metadata row records which of these holds its object. The type lives
/// in core because configuration, the database and the storage crate all use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "storage_backend", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Nas,
    S3,
    Gcs,
    Azure,
}

impl StorageBackend {
    pub const ALL: [StorageBackend; 5] = [
        StorageBackend::Local,
        StorageBackend::Nas,
        StorageBackend::S3,
        StorageBackend::Gcs,
        StorageBackend::Azure,
    ];

    /// External backends sit behind circuit breakers; the local disk does not.
    pub fn is_external(&self) -> bool {
        !matches!(self, StorageBackend::Local)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Local => "local",
            StorageBackend::Nas => "nas",
            StorageBackend::S3 => "s3",
            StorageBackend::Gcs => "gcs",
            StorageBackend::Azure => "azure",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "nas" => Ok(StorageBackend::Nas),
            "s3" => Ok(StorageBackend::S3),
            "gcs" => Ok(StorageBackend::Gcs),
            "azure" => Ok(StorageBackend::Azure),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("S3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!(" nas ".parse::<StorageBackend>().unwrap(), StorageBackend::Nas);
        assert!("ftp".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn display_matches_parse() {
        for backend in StorageBackend::ALL {
            assert_eq!(backend.to_string().parse::<StorageBackend>().unwrap(), backend);
        }
    }

    #[test]
    fn only_local_is_internal() {
        assert!(!StorageBackend::Local.is_external());
        assert!(StorageBackend::Nas.is_external());
        assert!(StorageBackend::Azure.is_external());
    }
}
