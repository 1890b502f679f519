//! Error types for resource building and profile loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a profile or registering a schema.
///
/// These are configuration errors: they signal a mistake in a schema
/// declaration, not in the data being built, and are fatal for the
/// registry being assembled.
#[derive(Debug, Error)]
pub enum ConfigError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("profile root must be an object with a \"resources\" key")]
    NotAProfile,

    // Declaration errors (exit code 2)
    #[error("resource \"{resource_type}\" must be declared as an object, got {actual}")]
    ResourceNotConfigured {
        resource_type: String,
        actual: String,
    },

    #[error("option \"{option}\" on field \"{field}\" of resource \"{resource_type}\" has an invalid type: {actual}")]
    InvalidFieldOption {
        resource_type: String,
        field: String,
        option: String,
        actual: String,
    },

    #[error("field \"{field}\" of resource \"{resource_type}\" is not configured properly: expected an object, got {actual}")]
    FieldNotConfigured {
        resource_type: String,
        field: String,
        actual: String,
    },

    #[error("relationship \"{relationship}\" of resource \"{resource_type}\" is not configured properly: expected a string or an object with a \"type\" key, got {actual}")]
    RelationshipNotConfigured {
        resource_type: String,
        relationship: String,
        actual: String,
    },

    #[error("unknown field kind \"{value}\" on \"{field}\" of resource \"{resource_type}\": expected optional or always")]
    UnknownFieldKind {
        resource_type: String,
        field: String,
        value: String,
    },

    #[error("field \"{field}\" of resource \"{resource_type}\" names unknown derivation \"{name}\"")]
    UnknownDerivation {
        resource_type: String,
        field: String,
        name: String,
    },

    #[error("resource \"{resource_type}\" declares more than one identifier field: \"{first}\" and \"{second}\"")]
    DuplicateIdentifier {
        resource_type: String,
        first: String,
        second: String,
    },

    #[error("resource \"{resource_type}\" declares \"{name}\" more than once")]
    DuplicateField { resource_type: String, name: String },

    #[error("resource type \"{resource_type}\" is already registered")]
    DuplicateType { resource_type: String },

    #[error("resource type must be a non-empty string")]
    EmptyType,
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } | Self::ReadError { .. } => 3, // IO
            _ => 2,                                                  // Configuration error
        }
    }
}

/// Errors raised while building a resource from a raw record.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no builder registered for resource type \"{name}\"")]
    UnknownBuilderType { name: String },

    #[error("field \"{field}\" of resource \"{resource_type}\" is encrypted but no encrypter is configured")]
    EncrypterMissing {
        resource_type: String,
        field: String,
    },

    #[error("encrypted field \"{field}\" of resource \"{resource_type}\" must hold an integer, got {actual}")]
    EncryptedValueNotInteger {
        resource_type: String,
        field: String,
        actual: String,
    },

    #[error("identifier field \"{field}\" of resource \"{resource_type}\" must hold a scalar, got {actual}")]
    IdentifierNotScalar {
        resource_type: String,
        field: String,
        actual: String,
    },

    #[error("to-one relationship \"{relationship}\" of resource \"{resource_type}\" must hold an object, got {actual}")]
    RelationshipNotAnObject {
        resource_type: String,
        relationship: String,
        actual: String,
    },

    #[error("to-many relationship \"{relationship}\" of resource \"{resource_type}\" must hold an array of objects, got {actual}")]
    RelationshipNotAnArray {
        resource_type: String,
        relationship: String,
        actual: String,
    },

    #[error("relationship recursion exceeded {limit} levels at resource \"{resource_type}\"")]
    RecursionLimit {
        resource_type: String,
        limit: usize,
    },
}

impl BuildError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_exit_codes() {
        let err = ConfigError::FileNotFound {
            path: PathBuf::from("profile.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = ConfigError::FieldNotConfigured {
            resource_type: "person".into(),
            field: "name".into(),
            actual: "string".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = ConfigError::DuplicateIdentifier {
            resource_type: "person".into(),
            first: "id".into(),
            second: "userId".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn build_error_exit_code() {
        let err = BuildError::UnknownBuilderType {
            name: "comment".into(),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn field_not_configured_display() {
        let err = ConfigError::FieldNotConfigured {
            resource_type: "person".into(),
            field: "age".into(),
            actual: "number".into(),
        };
        assert_eq!(
            err.to_string(),
            "field \"age\" of resource \"person\" is not configured properly: expected an object, got number"
        );
    }

    #[test]
    fn encrypter_missing_display() {
        let err = BuildError::EncrypterMissing {
            resource_type: "person".into(),
            field: "ownerId".into(),
        };
        assert_eq!(
            err.to_string(),
            "field \"ownerId\" of resource \"person\" is encrypted but no encrypter is configured"
        );
    }
}
