use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::util::{Result, Status};

/// Options shared by a registry and the handles it hands out
///
/// Can be built in code or loaded from JSON:
///
/// ```ignore
/// use replitopo::ClientOptions;
///
/// let options = ClientOptions {
///     max_replicas: 64,
///     ..Default::default()
/// };
///
/// let options = ClientOptions::from_json_str(r#"{ "verify_replica_set": false }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Reject replica streams that report more than one primary for the
    /// same term
    /// Default: true
    pub verify_replica_set: bool,

    /// Upper bound on the number of records drained from one replica stream
    /// Default: 1024
    pub max_replicas: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            verify_replica_set: true,
            max_replicas: 1024,
        }
    }
}

impl ClientOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_replicas == 0 {
            return Err(Status::invalid_argument(
                "max_replicas must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Parse options from a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: ClientOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Status::invalid_argument(format!(
                "Failed to read options file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert!(options.verify_replica_set);
        assert_eq!(options.max_replicas, 1024);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = ClientOptions::from_json_str(r#"{ "max_replicas": 8 }"#).unwrap();
        assert_eq!(options.max_replicas, 8);
        assert!(options.verify_replica_set);
    }

    #[test]
    fn test_zero_max_replicas_rejected() {
        let err = ClientOptions::from_json_str(r#"{ "max_replicas": 0 }"#).unwrap_err();
        assert_eq!(err.code(), crate::Code::InvalidArgument);
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = ClientOptions::from_json_str("{ max_replicas").unwrap_err();
        assert_eq!(err.code(), crate::Code::InvalidArgument);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "verify_replica_set": false, "max_replicas": 16 }}"#).unwrap();

        let options = ClientOptions::from_json_file(file.path()).unwrap();
        assert!(!options.verify_replica_set);
        assert_eq!(options.max_replicas, 16);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = ClientOptions::from_json_file(dir.path().join("absent.json"));
        assert!(result.is_err());
    }
}
