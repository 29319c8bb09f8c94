use dashmap::DashMap;
use docbind_common::{DocbindError, Result};
use std::sync::Arc;

use crate::entity::Entity;
use crate::schema::EntitySchema;

/// Registry of entity schemas, keyed by entity name (thread-safe)
///
/// Populated at startup; the mapper resolves annotated entity types here.
pub struct EntityRegistry {
    schemas: DashMap<String, Arc<EntitySchema>>,
}

impl EntityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            schemas: DashMap::new(),
        }
    }

    /// Register an entity type
    ///
    /// Registering the same type again is a no-op returning the stored schema.
    ///
    /// # Errors
    /// Returns `MissingAnnotation` if a declared field lacks a usable annotation.
    pub fn register<E: Entity>(&self) -> Result<Arc<EntitySchema>> {
        if let Some(existing) = self.get(E::entity_name()) {
            return Ok(existing);
        }
        self.register_schema(E::schema()?)
    }

    /// Register a schema built without a Rust type, replacing any previous one
    pub fn register_schema(&self, schema: EntitySchema) -> Result<Arc<EntitySchema>> {
        let name = schema.name().to_string();
        if name.is_empty() {
            return Err(DocbindError::Validation(
                "Entity name cannot be empty".to_string(),
            ));
        }

        let schema = Arc::new(schema);
        self.schemas.insert(name, schema.clone());
        Ok(schema)
    }

    /// Get a schema by entity name
    pub fn get(&self, name: &str) -> Option<Arc<EntitySchema>> {
        self.schemas.get(name).map(|entry| entry.value().clone())
    }

    /// Get a schema by entity name, failing if it is not registered
    pub fn resolve(&self, name: &str) -> Result<Arc<EntitySchema>> {
        self.get(name)
            .ok_or_else(|| DocbindError::UnregisteredEntity(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Get all registered entity names
    pub fn entity_names(&self) -> Vec<String> {
        self.schemas.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.schemas.len()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide registry
static GLOBAL_REGISTRY: once_cell::sync::Lazy<Arc<EntityRegistry>> =
    once_cell::sync::Lazy::new(|| Arc::new(EntityRegistry::new()));

/// Get the process-wide registry
pub fn global_registry() -> Arc<EntityRegistry> {
    GLOBAL_REGISTRY.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::schema::FieldDecl;

    struct Tag;

    impl Entity for Tag {
        const FIELDS: &'static [FieldDecl] = &[FieldDecl::new("label", "string")];

        fn from_record(_record: Record) -> Result<Self> {
            Ok(Tag)
        }
    }

    struct Broken;

    impl Entity for Broken {
        const FIELDS: &'static [FieldDecl] = &[
            FieldDecl::new("ok", "string"),
            FieldDecl::untyped("missing"),
        ];

        fn from_record(_record: Record) -> Result<Self> {
            Ok(Broken)
        }
    }

    #[test]
    fn test_registry() {
        let registry = EntityRegistry::new();
        assert_eq!(registry.count(), 0);

        let schema = registry.register::<Tag>().unwrap();
        assert_eq!(schema.name(), "Tag");
        assert!(registry.contains("Tag"));
        assert_eq!(registry.count(), 1);

        // Idempotent
        let again = registry.register::<Tag>().unwrap();
        assert!(Arc::ptr_eq(&schema, &again));
        assert_eq!(registry.entity_names(), vec!["Tag".to_string()]);
    }

    #[test]
    fn test_register_reports_missing_annotation() {
        let registry = EntityRegistry::new();
        let err = registry.register::<Broken>().unwrap_err();
        assert!(matches!(err, DocbindError::MissingAnnotation { ref field, .. } if field == "missing"));
        assert!(!registry.contains("Broken"));
    }

    #[test]
    fn test_resolve_unregistered() {
        let registry = EntityRegistry::new();
        let err = registry.resolve("Nope").unwrap_err();
        assert!(matches!(err, DocbindError::UnregisteredEntity(ref name) if name == "Nope"));
    }

    #[test]
    fn test_register_schema_rejects_empty_name() {
        let registry = EntityRegistry::new();
        let schema = EntitySchema::build("", &[]).unwrap();
        assert!(registry.register_schema(schema).is_err());
    }
}
