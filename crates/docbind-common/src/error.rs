//! Error types for docbind

use thiserror::Error;

/// Result type alias for docbind operations
pub type Result<T> = std::result::Result<T, DocbindError>;

/// Unified error type for all docbind operations
#[derive(Error, Debug, Clone)]
pub enum DocbindError {
    #[error("MongoDB error: {0}")]
    MongoDB(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // Schema errors: fatal, raised while declaring or resolving entity types

    /// A declared entity field has no usable type annotation
    #[error("Field '{field}' of entity '{entity}' needs a type annotation (`type` or `type[]`)")]
    MissingAnnotation { entity: String, field: String },

    /// An annotation names a type that is neither a built-in kind nor a registered entity
    #[error("Unknown field type '{type_name}' (value: {value})")]
    UnknownType { type_name: String, value: String },

    /// An entity was mapped by name before being registered
    #[error("Entity '{0}' is not registered")]
    UnregisteredEntity(String),

    /// The repository's bound collection does not exist in the database
    #[error("Collection '{0}' not found. Create it first; its name must match the lower-cased repository name")]
    CollectionNotFound(String),

    /// The repository's entity type was never registered with its mapper
    #[error("Repository '{repository}' maps to entity '{entity}', which is not registered with its mapper")]
    UnsetEntity { repository: String, entity: String },

    /// Typed extraction from a mapped record failed
    #[error("Mapping error: {0}")]
    Mapping(String),
}

impl DocbindError {
    /// Returns true for declaration problems that should surface during development
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            DocbindError::MissingAnnotation { .. }
                | DocbindError::UnknownType { .. }
                | DocbindError::UnregisteredEntity(_)
        )
    }

    /// Returns true if the repository or its entity is misconfigured
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DocbindError::CollectionNotFound(_) | DocbindError::UnsetEntity { .. }
        )
    }
}

impl From<serde_json::Error> for DocbindError {
    fn from(err: serde_json::Error) -> Self {
        DocbindError::Serialization(err.to_string())
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for DocbindError {
    fn from(err: mongodb::error::Error) -> Self {
        DocbindError::MongoDB(err.to_string())
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::ser::Error> for DocbindError {
    fn from(err: bson::ser::Error) -> Self {
        DocbindError::Serialization(format!("BSON serialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::de::Error> for DocbindError {
    fn from(err: bson::de::Error) -> Self {
        DocbindError::Deserialization(format!("BSON deserialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::oid::Error> for DocbindError {
    fn from(err: bson::oid::Error) -> Self {
        DocbindError::Validation(format!("Invalid ObjectId: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_mongodb() {
        let err = DocbindError::MongoDB("connection refused".to_string());
        assert_eq!(err.to_string(), "MongoDB error: connection refused");
    }

    #[test]
    fn test_error_display_connection() {
        let err = DocbindError::Connection("timeout".to_string());
        assert_eq!(err.to_string(), "Connection error: timeout");
    }

    #[test]
    fn test_error_display_missing_annotation() {
        let err = DocbindError::MissingAnnotation {
            entity: "User".to_string(),
            field: "email".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'email'"));
        assert!(msg.contains("'User'"));
    }

    #[test]
    fn test_error_display_unknown_type() {
        let err = DocbindError::UnknownType {
            type_name: "Address".to_string(),
            value: "\"x\"".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown field type 'Address' (value: \"x\")");
    }

    #[test]
    fn test_error_display_collection_not_found() {
        let err = DocbindError::CollectionNotFound("users".to_string());
        assert!(err.to_string().starts_with("Collection 'users' not found"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: DocbindError = json_err.into();
        assert!(matches!(err, DocbindError::Serialization(_)));
    }

    #[test]
    fn test_is_schema_error() {
        assert!(DocbindError::UnregisteredEntity("X".to_string()).is_schema_error());
        assert!(DocbindError::MissingAnnotation {
            entity: "X".to_string(),
            field: "y".to_string()
        }
        .is_schema_error());
        assert!(!DocbindError::CollectionNotFound("x".to_string()).is_schema_error());
        assert!(!DocbindError::Mapping("x".to_string()).is_schema_error());
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(DocbindError::CollectionNotFound("x".to_string()).is_configuration_error());
        assert!(DocbindError::UnsetEntity {
            repository: "users".to_string(),
            entity: "User".to_string()
        }
        .is_configuration_error());
        assert!(!DocbindError::Query("x".to_string()).is_configuration_error());
    }
}
