//! Document-to-entity mapping
//!
//! The mapper walks an entity schema in declaration order, coercing each
//! document field through its type descriptor. Schema problems are returned
//! as errors; bad data only ever produces `Null` fields.

use bson::{Bson, Document as BsonDocument};
use docbind_common::{DocbindError, Result};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

use crate::coercion::{cast_object, coerce_scalar, to_plain, Coercion, SCALAR_KEY};
use crate::entity::Entity;
use crate::record::Record;
use crate::registry::{global_registry, EntityRegistry};
use crate::schema::EntitySchema;
use crate::types::{ScalarKind, TypeDescriptor, TypeKind, Value};

/// Field populated from the document's ObjectId
pub const ID_FIELD: &str = "id";

/// Document key holding the ObjectId
pub const OBJECT_ID_KEY: &str = "_id";

/// Nested entities deeper than this map to `Null`; matches the server's
/// document nesting limit
pub const MAX_ENTITY_DEPTH: usize = 100;

/// Mapping behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapOptions {
    /// When false, undeclared document fields are copied into the record's extras
    pub strict: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// Maps raw documents onto registered entity schemas
#[derive(Clone)]
pub struct Mapper {
    registry: Arc<EntityRegistry>,
    options: MapOptions,
}

impl Mapper {
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        Self {
            registry,
            options: MapOptions::default(),
        }
    }

    /// Mapper over the process-wide registry
    pub fn global() -> Self {
        Self::new(global_registry())
    }

    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.options.strict = strict;
    }

    pub fn options(&self) -> MapOptions {
        self.options
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// Map a document onto the entity registered under `entity`
    ///
    /// A `None` document skips mapping and yields an empty record.
    pub fn map_document(&self, document: Option<&BsonDocument>, entity: &str) -> Result<Record> {
        let schema = self.registry.resolve(entity)?;
        self.build_record(document, &schema, 0)
    }

    /// Map a document onto a typed entity
    pub fn map<E: Entity>(&self, document: Option<&BsonDocument>) -> Result<E> {
        let record = self.map_document(document, E::entity_name())?;
        E::from_record(record)
    }

    /// Coerce one raw value to a declared type
    ///
    /// # Errors
    /// Returns `UnknownType` if the descriptor names an unregistered entity.
    pub fn coerce(&self, value: &Bson, descriptor: &TypeDescriptor) -> Result<Value> {
        self.coerce_field("", value, descriptor, 0)
    }

    fn build_record(
        &self,
        document: Option<&BsonDocument>,
        schema: &EntitySchema,
        depth: usize,
    ) -> Result<Record> {
        let mut record = Record::new(schema.name());
        let Some(document) = document else {
            return Ok(record);
        };

        for field in schema.fields() {
            if field.name == ID_FIELD {
                if let Some(Bson::ObjectId(oid)) = document.get(OBJECT_ID_KEY) {
                    let hex = Bson::String(oid.to_hex());
                    let value = self.coerce_field(&field.name, &hex, &field.descriptor, depth)?;
                    record.set(ID_FIELD, value);
                    continue;
                }
            }

            let value = match document.get(&field.name) {
                None | Some(Bson::Null) | Some(Bson::Undefined) => Value::Null,
                Some(raw) => self.coerce_field(&field.name, raw, &field.descriptor, depth)?,
            };
            record.set(field.name.clone(), value);
        }

        if !self.options.strict {
            for (key, raw) in document {
                if !schema.declares(key) {
                    record.set_extra(key.clone(), to_plain(raw));
                }
            }
        }

        Ok(record)
    }

    fn coerce_field(
        &self,
        field: &str,
        value: &Bson,
        descriptor: &TypeDescriptor,
        depth: usize,
    ) -> Result<Value> {
        match &descriptor.kind {
            TypeKind::Scalar(kind) if descriptor.is_array => {
                Ok(scalar_collection(field, value, *kind))
            }
            TypeKind::Scalar(kind) => Ok(scalar_value(field, value, *kind)),
            // The array flag does not change how plain objects are cast
            TypeKind::Object => Ok(cast_object(value)),
            TypeKind::Entity(name) => {
                let schema = self.registry.get(name).ok_or_else(|| DocbindError::UnknownType {
                    type_name: name.clone(),
                    value: value.to_string(),
                })?;
                self.build_entities(value, &schema, descriptor.is_array, depth)
            }
        }
    }

    fn build_entities(
        &self,
        value: &Bson,
        schema: &EntitySchema,
        is_array: bool,
        depth: usize,
    ) -> Result<Value> {
        match value {
            Bson::Array(items) if is_array => items
                .iter()
                .map(|item| self.build_element(item, schema, depth))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            // Keyed sub-documents keep their keys
            Bson::Document(doc) if is_array => doc
                .iter()
                .map(|(key, item)| {
                    self.build_element(item, schema, depth)
                        .map(|e| (key.clone(), e))
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Object),
            _ if is_array => Ok(Value::Array(Vec::new())),
            other => self.build_element(other, schema, depth),
        }
    }

    fn build_element(&self, value: &Bson, schema: &EntitySchema, depth: usize) -> Result<Value> {
        // A scalar wrapped as `{scalar: v}` can re-enter the same shape forever
        if depth >= MAX_ENTITY_DEPTH {
            debug!(
                entity = schema.name(),
                depth = depth,
                "Entity nesting limit reached, value set to null"
            );
            return Ok(Value::Null);
        }
        let source = entity_source(value);
        self.build_record(source.as_deref(), schema, depth + 1)
            .map(Value::Entity)
    }
}

/// View a value as the document an entity is built from
fn entity_source(value: &Bson) -> Option<Cow<'_, BsonDocument>> {
    match value {
        Bson::Null | Bson::Undefined => None,
        Bson::Document(doc) => Some(Cow::Borrowed(doc)),
        Bson::Array(items) => Some(Cow::Owned(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item.clone()))
                .collect(),
        )),
        other => {
            let mut doc = BsonDocument::new();
            doc.insert(SCALAR_KEY, other.clone());
            Some(Cow::Owned(doc))
        }
    }
}

fn scalar_value(field: &str, value: &Bson, kind: ScalarKind) -> Value {
    match coerce_scalar(value, kind) {
        Coercion::Failed(reason) => {
            debug!(
                field = field,
                kind = kind.type_name(),
                reason = %reason,
                "Coercion failed, value set to null"
            );
            Value::Null
        }
        other => other.into_value(),
    }
}

fn scalar_collection(field: &str, value: &Bson, kind: ScalarKind) -> Value {
    match value {
        Bson::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| scalar_value(field, item, kind))
                .collect(),
        ),
        Bson::Document(doc) => Value::Object(
            doc.iter()
                .map(|(key, item)| (key.clone(), scalar_value(field, item, kind)))
                .collect(),
        ),
        other => Value::Array(vec![scalar_value(field, other, kind)]),
    }
}
